//! Ordered collection merging online, offline and placeholder items

use log::{debug, warn};
use std::collections::HashSet;

use crate::models::{
    DiscussionId, DiscussionItem, ItemKey, ItemKind, NEW_DISCUSSION_TIME, OfflineDiscussion,
    OnlineDiscussion,
};

/// Ordered list of discussion items shown by the forum index.
///
/// Offline items always precede online items. Online items keep the order
/// the server returned them in. Offline items are kept newest first. The
/// placeholder stays wherever it was inserted.
///
/// Every mutation bumps [`DiscussionList::version`], so readers can tell
/// whether a snapshot they hold is still current.
#[derive(Debug, Clone, Default)]
pub struct DiscussionList {
    items: Vec<DiscussionItem>,
    version: u64,
}

impl DiscussionList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[DiscussionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&DiscussionItem> {
        self.items.first()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, key: &ItemKey) -> Option<&DiscussionItem> {
        self.items.iter().find(|item| item.key() == *key)
    }

    pub fn position(&self, key: &ItemKey) -> Option<usize> {
        self.items.iter().position(|item| item.key() == *key)
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.position(key).is_some()
    }

    pub fn online_discussions(&self) -> impl Iterator<Item = &OnlineDiscussion> {
        self.items.iter().filter_map(DiscussionItem::as_online)
    }

    pub fn offline_discussions(&self) -> impl Iterator<Item = &OfflineDiscussion> {
        self.items.iter().filter_map(DiscussionItem::as_offline)
    }

    pub fn count(&self, kind: ItemKind) -> usize {
        self.items.iter().filter(|item| item.kind() == kind).count()
    }

    /// Replace the online subset, appending `discussions` after all other items
    pub fn set_online_discussions(&mut self, discussions: Vec<OnlineDiscussion>) {
        let mut items: Vec<DiscussionItem> = self
            .items
            .drain(..)
            .filter(|item| !item.is_online())
            .collect();

        let mut seen = HashSet::new();
        items.extend(
            discussions
                .into_iter()
                .filter(|d| keep_first(&mut seen, d.discussion))
                .map(DiscussionItem::Online),
        );

        self.items = items;
        self.bump("set online");
    }

    /// Append a further page of online discussions.
    ///
    /// Discussions already in the list are skipped.
    pub fn append_online_discussions(&mut self, discussions: Vec<OnlineDiscussion>) -> usize {
        let mut seen: HashSet<DiscussionId> =
            self.online_discussions().map(|d| d.discussion).collect();

        let before = self.items.len();
        self.items.extend(
            discussions
                .into_iter()
                .filter(|d| keep_first(&mut seen, d.discussion))
                .map(DiscussionItem::Online),
        );

        let added = self.items.len() - before;
        self.bump("append online");
        added
    }

    /// Replace the offline subset, placing it before all other items,
    /// newest first. Discussions without a creation time are dropped, their
    /// path would collide with the new discussion form.
    pub fn set_offline_discussions(&mut self, mut discussions: Vec<OfflineDiscussion>) {
        discussions.sort_by(|a, b| b.time_created.cmp(&a.time_created));

        let mut seen = HashSet::new();
        let mut items: Vec<DiscussionItem> = discussions
            .into_iter()
            .filter(|d| {
                if d.time_created == NEW_DISCUSSION_TIME {
                    warn!("Dropping offline discussion {:?} without creation time", d.subject);
                    return false;
                }
                keep_first(&mut seen, d.time_created)
            })
            .map(DiscussionItem::Offline)
            .collect();
        items.extend(self.items.drain(..).filter(|item| !item.is_offline()));

        self.items = items;
        self.bump("set offline");
    }

    /// Show the placeholder row at `position` (clamped to the list length).
    ///
    /// Returns false if the placeholder is already present.
    pub fn insert_new_discussion_form(&mut self, position: usize) -> bool {
        if self.contains(&ItemKey::NewDiscussion) {
            return false;
        }
        let position = position.min(self.items.len());
        self.items.insert(position, DiscussionItem::NewDiscussion);
        self.bump("insert placeholder");
        true
    }

    pub fn remove_new_discussion_form(&mut self) -> bool {
        match self.position(&ItemKey::NewDiscussion) {
            Some(index) => {
                self.items.remove(index);
                self.bump("remove placeholder");
                true
            }
            None => false,
        }
    }

    /// Apply `patch` to the online discussion with the given ID.
    ///
    /// Returns false if that discussion is not loaded.
    pub fn patch_online<F>(&mut self, id: DiscussionId, patch: F) -> bool
    where
        F: FnOnce(&mut OnlineDiscussion),
    {
        let found = self.items.iter_mut().find_map(|item| match item {
            DiscussionItem::Online(d) if d.discussion == id => Some(d),
            _ => None,
        });

        match found {
            Some(discussion) => {
                patch(discussion);
                self.bump("patch online");
                true
            }
            None => false,
        }
    }

    pub fn remove_online(&mut self, id: DiscussionId) -> Option<OnlineDiscussion> {
        let index = self.position(&ItemKey::Online(id))?;
        let removed = match self.items.remove(index) {
            DiscussionItem::Online(d) => d,
            _ => return None,
        };
        self.bump("remove online");
        Some(removed)
    }

    fn bump(&mut self, reason: &str) {
        self.version += 1;
        debug!(
            "Discussion list {} (version {}, {} items)",
            reason,
            self.version,
            self.items.len()
        );
    }
}

fn keep_first<K: std::hash::Hash + Eq + std::fmt::Debug + Copy>(
    seen: &mut HashSet<K>,
    key: K,
) -> bool {
    if seen.insert(key) {
        true
    } else {
        warn!("Dropping duplicate discussion {:?}", key);
        false
    }
}
