//! Current selection and the navigation request it produces

use serde::{Deserialize, Serialize};

use crate::list::DiscussionList;
use crate::models::{CourseId, CourseModuleId, DiscussionItem, ForumId, ItemKey, OnlineDiscussion};

static NEW_DISCUSSION_FORM: DiscussionItem = DiscussionItem::NewDiscussion;

/// Query parameters passed along with a discussion path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationParams {
    pub course_id: CourseId,
    pub cm_id: CourseModuleId,
    pub forum_id: ForumId,
    /// Present for online discussions only
    pub discussion: Option<OnlineDiscussion>,
    /// Present for online discussions only
    pub track_posts: Option<bool>,
}

/// Request for the host to navigate to a discussion path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub path: String,
    pub params: NavigationParams,
}

/// The single active item of the list, if any.
///
/// The selection is stored by identity. It survives list merges while the
/// item is still present. When the item disappears the selection is kept
/// but resolves to nothing. It is never replaced unless asked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<ItemKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&ItemKey> {
        self.selected.as_ref()
    }

    pub fn select(&mut self, key: ItemKey) {
        self.selected = Some(key);
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn is_selected(&self, key: &ItemKey) -> bool {
        self.selected.as_ref() == Some(key)
    }

    /// Resolve the selection against `list`.
    ///
    /// The new discussion form resolves even when no placeholder row is
    /// shown.
    pub fn selected_item<'a>(&self, list: &'a DiscussionList) -> Option<&'a DiscussionItem> {
        match self.selected? {
            ItemKey::NewDiscussion => Some(
                list.get(&ItemKey::NewDiscussion)
                    .unwrap_or(&NEW_DISCUSSION_FORM),
            ),
            key => list.get(&key),
        }
    }

    /// Whether an item is selected that is no longer in `list`
    pub fn is_stale(&self, list: &DiscussionList) -> bool {
        self.selected.is_some() && self.selected_item(list).is_none()
    }
}
