//! Conversion between list items and navigation paths
//!
//! Paths have the forms `<prefix><discussion id>` for online discussions,
//! `<prefix>new/<time created>` for offline discussions and
//! `<prefix>new/0` for the new discussion form. Offline discussions never
//! have creation time 0, see [`NEW_DISCUSSION_TIME`].

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{DiscussionId, DiscussionItem, ItemKey, NEW_DISCUSSION_TIME};

const NEW_SEGMENT: &str = "new/";

/// Route parameters received when entering a discussion route
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteParams {
    pub discussion_id: Option<DiscussionId>,
    pub time_created: Option<i64>,
}

impl RouteParams {
    pub fn discussion(id: DiscussionId) -> Self {
        Self {
            discussion_id: Some(id),
            time_created: None,
        }
    }

    pub fn offline(time_created: i64) -> Self {
        Self {
            discussion_id: None,
            time_created: Some(time_created),
        }
    }

    /// Parse raw router parameters (`discussionId`, `timeCreated`).
    ///
    /// Values that are not numbers are ignored.
    pub fn from_map(params: &HashMap<String, String>) -> Self {
        Self {
            discussion_id: parse_param(params, "discussionId").map(DiscussionId::new),
            time_created: parse_param(params, "timeCreated"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.discussion_id.is_none() && self.time_created.is_none()
    }
}

fn parse_param(params: &HashMap<String, String>, name: &str) -> Option<i64> {
    let raw = params.get(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring malformed route parameter {}={:?}", name, raw);
            None
        }
    }
}

/// Maps items to paths under a fixed prefix and back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathResolver {
    prefix: String,
}

impl PathResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn path_for(&self, item: &DiscussionItem) -> String {
        self.path_for_key(&item.key())
    }

    pub fn path_for_key(&self, key: &ItemKey) -> String {
        match key {
            ItemKey::Online(id) => format!("{}{}", self.prefix, id),
            ItemKey::Offline(time_created) => {
                format!("{}{}{}", self.prefix, NEW_SEGMENT, time_created)
            }
            ItemKey::NewDiscussion => {
                format!("{}{}{}", self.prefix, NEW_SEGMENT, NEW_DISCUSSION_TIME)
            }
        }
    }

    /// Path of the item a route points at, or `None` for the list-only view
    pub fn selected_path(&self, params: &RouteParams) -> Option<String> {
        self.key_for_params(params).map(|key| self.path_for_key(&key))
    }

    /// Item identity a route points at
    pub fn key_for_params(&self, params: &RouteParams) -> Option<ItemKey> {
        if let Some(id) = params.discussion_id {
            return Some(ItemKey::Online(id));
        }
        match params.time_created {
            Some(NEW_DISCUSSION_TIME) => Some(ItemKey::NewDiscussion),
            Some(time_created) => Some(ItemKey::Offline(time_created)),
            None => None,
        }
    }

    /// Parse a path produced by [`PathResolver::path_for`] back into route
    /// parameters. Returns `None` for paths outside this prefix.
    pub fn route_params(&self, path: &str) -> Option<RouteParams> {
        let relative = path.strip_prefix(&self.prefix)?;
        match relative.strip_prefix(NEW_SEGMENT) {
            Some(time_created) => time_created.parse().ok().map(RouteParams::offline),
            None => relative
                .parse()
                .ok()
                .map(|id| RouteParams::discussion(DiscussionId::new(id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OfflineDiscussion, OnlineDiscussion, PostId};

    fn items() -> Vec<DiscussionItem> {
        vec![
            OnlineDiscussion::new(DiscussionId::new(42), PostId::new(420), "Online").into(),
            OfflineDiscussion::new(1_700_000_000, "Offline").into(),
            DiscussionItem::NewDiscussion,
        ]
    }

    #[test]
    fn test_paths() {
        let resolver = PathResolver::new("mod_forum/");
        let paths: Vec<String> = items().iter().map(|i| resolver.path_for(i)).collect();
        assert_eq!(
            paths,
            vec!["mod_forum/42", "mod_forum/new/1700000000", "mod_forum/new/0"]
        );
    }

    #[test]
    fn test_round_trip_through_route_params() {
        for prefix in ["", "mod_forum/"] {
            let resolver = PathResolver::new(prefix);
            for item in items() {
                let path = resolver.path_for(&item);
                let params = resolver.route_params(&path).unwrap();
                assert_eq!(resolver.selected_path(&params), Some(path));
                assert_eq!(resolver.key_for_params(&params), Some(item.key()));
            }
        }
    }

    #[test]
    fn test_selected_path_cases() {
        let resolver = PathResolver::new("");
        assert_eq!(
            resolver.selected_path(&RouteParams::discussion(DiscussionId::new(7))),
            Some("7".to_string())
        );
        assert_eq!(
            resolver.selected_path(&RouteParams::offline(55)),
            Some("new/55".to_string())
        );
        assert_eq!(resolver.selected_path(&RouteParams::default()), None);
    }

    #[test]
    fn test_discussion_id_wins_over_time_created() {
        let resolver = PathResolver::new("");
        let params = RouteParams {
            discussion_id: Some(DiscussionId::new(3)),
            time_created: Some(10),
        };
        assert_eq!(resolver.selected_path(&params), Some("3".to_string()));
    }

    #[test]
    fn test_route_params_from_map() {
        let mut raw = HashMap::new();
        raw.insert("discussionId".to_string(), "12".to_string());
        assert_eq!(
            RouteParams::from_map(&raw),
            RouteParams::discussion(DiscussionId::new(12))
        );

        let mut raw = HashMap::new();
        raw.insert("timeCreated".to_string(), "abc".to_string());
        assert!(RouteParams::from_map(&raw).is_empty());
    }

    #[test]
    fn test_foreign_paths_are_rejected() {
        let resolver = PathResolver::new("mod_forum/");
        assert_eq!(resolver.route_params("other/42"), None);
        assert_eq!(resolver.route_params("mod_forum/new/x"), None);
        assert_eq!(resolver.route_params("mod_forum/abc"), None);
    }
}
