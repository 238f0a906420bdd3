//! Event payloads

use serde::{Deserialize, Serialize};

use crate::models::{CourseModuleId, DiscussionId, ForumId, PostId, UserId};

/// Forum an event is addressed to. Either field may identify it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTarget {
    #[serde(default)]
    pub forum_id: Option<ForumId>,
    #[serde(default)]
    pub cm_id: Option<CourseModuleId>,
}

impl EventTarget {
    pub fn forum(forum_id: ForumId) -> Self {
        Self {
            forum_id: Some(forum_id),
            cm_id: None,
        }
    }

    pub fn module(cm_id: CourseModuleId) -> Self {
        Self {
            forum_id: None,
            cm_id: Some(cm_id),
        }
    }

    /// Whether this target names the given forum or course module
    pub fn matches(&self, forum_id: Option<ForumId>, cm_id: CourseModuleId) -> bool {
        let forum_matches = matches!((self.forum_id, forum_id), (Some(a), Some(b)) if a == b);
        forum_matches || self.cm_id == Some(cm_id)
    }
}

/// Lock, pin or star state of a discussion changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleEvent {
    #[serde(flatten)]
    pub target: EventTarget,
    #[serde(default)]
    pub discussion_id: Option<DiscussionId>,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub pinned: Option<bool>,
    #[serde(default)]
    pub starred: Option<bool>,
}

/// Reference to a post, used by deletion events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub id: PostId,
    pub parent: PostId,
}

impl PostRef {
    pub fn is_root(&self) -> bool {
        self.parent.is_root()
    }
}

/// A post was deleted. Deleting the opening post removes the discussion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEvent {
    #[serde(flatten)]
    pub target: EventTarget,
    #[serde(default)]
    pub discussion_id: Option<DiscussionId>,
    #[serde(default)]
    pub post: Option<PostRef>,
}

/// A discussion was created, online or in the offline queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDiscussionEvent {
    #[serde(flatten)]
    pub target: EventTarget,
    /// IDs of the created discussions. Posting to several groups creates
    /// several discussions.
    #[serde(default)]
    pub discussion_ids: Vec<DiscussionId>,
    /// Creation time of the offline discussion, if it was queued
    #[serde(default)]
    pub time_created: Option<i64>,
    /// Created from this session, so the view may open it
    #[serde(default = "default_true")]
    pub from_current_session: bool,
}

fn default_true() -> bool {
    true
}

impl NewDiscussionEvent {
    /// Discussions created on the server
    pub fn online(target: EventTarget, discussion_ids: Vec<DiscussionId>) -> Self {
        Self {
            target,
            discussion_ids,
            time_created: None,
            from_current_session: true,
        }
    }

    /// Discussion stored in the offline queue
    pub fn offline(target: EventTarget, time_created: i64) -> Self {
        Self {
            target,
            discussion_ids: Vec::new(),
            time_created: Some(time_created),
            from_current_session: true,
        }
    }
}

/// A reply was posted to a discussion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEvent {
    #[serde(flatten)]
    pub target: EventTarget,
    #[serde(default)]
    pub discussion_id: Option<DiscussionId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    #[default]
    Auto,
    Manual,
}

/// Source tag of syncs started by the forum index itself
pub const INDEX_SYNC_SOURCE: &str = "index";

/// Offline data of a forum was synchronized
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedEvent {
    #[serde(flatten)]
    pub target: EventTarget,
    #[serde(default)]
    pub sync_kind: SyncKind,
    /// User whose offline data was sent
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Component that triggered the sync
    #[serde(default)]
    pub source: Option<String>,
}

impl SyncedEvent {
    /// Manual sync started from the forum index
    pub fn from_index(target: EventTarget, user_id: Option<UserId>) -> Self {
        Self {
            target,
            sync_kind: SyncKind::Manual,
            user_id,
            source: Some(INDEX_SYNC_SOURCE.to_string()),
        }
    }

    pub fn is_from_index(&self) -> bool {
        self.source.as_deref() == Some(INDEX_SYNC_SOURCE)
    }
}

/// Any event the forum index reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForumEvent {
    Toggle(ToggleEvent),
    Deleted(DeletedEvent),
    NewDiscussion(NewDiscussionEvent),
    Reply(ReplyEvent),
    Synced(SyncedEvent),
}

impl ForumEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ForumEvent::Toggle(_) => EventKind::Toggle,
            ForumEvent::Deleted(_) => EventKind::Delete,
            ForumEvent::NewDiscussion(_) => EventKind::New,
            ForumEvent::Reply(_) => EventKind::Reply,
            ForumEvent::Synced(_) => EventKind::Sync,
        }
    }

    pub fn target(&self) -> &EventTarget {
        match self {
            ForumEvent::Toggle(e) => &e.target,
            ForumEvent::Deleted(e) => &e.target,
            ForumEvent::NewDiscussion(e) => &e.target,
            ForumEvent::Reply(e) => &e.target,
            ForumEvent::Synced(e) => &e.target,
        }
    }
}

/// Event categories a subscription can filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Toggle,
    Delete,
    New,
    Reply,
    Sync,
}

impl EventKind {
    fn bit(self) -> u8 {
        match self {
            EventKind::Toggle => 1,
            EventKind::Delete => 1 << 1,
            EventKind::New => 1 << 2,
            EventKind::Reply => 1 << 3,
            EventKind::Sync => 1 << 4,
        }
    }
}

/// Set of event kinds delivered to a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter(u8);

impl EventFilter {
    pub fn all() -> Self {
        Self(0b1_1111)
    }

    pub fn only(kinds: &[EventKind]) -> Self {
        Self(kinds.iter().fold(0, |bits, kind| bits | kind.bit()))
    }

    pub fn matches(&self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}
