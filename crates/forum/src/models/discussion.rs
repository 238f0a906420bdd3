//! Discussion list items: online discussions, offline discussions and the
//! "new discussion" placeholder row

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{DiscussionId, GroupId, PostId, UserId};

/// A discussion that exists on the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineDiscussion {
    /// ID of the opening post
    pub id: PostId,
    /// Server discussion ID (item identity)
    pub discussion: DiscussionId,
    pub subject: String,
    /// Author full name. `None` hides the author.
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub num_unread: u32,
    #[serde(default)]
    pub num_replies: u32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub group_id: GroupId,
    #[serde(default)]
    pub group_name: Option<String>,
    /// Creation time (unix seconds)
    #[serde(default)]
    pub created: i64,
    /// Last modification time (unix seconds)
    #[serde(default)]
    pub time_modified: i64,
    /// Parent post ID, 0 for the opening post
    #[serde(default)]
    pub parent: PostId,
}

impl OnlineDiscussion {
    /// Create an online discussion with empty counters and flags
    pub fn new(discussion: DiscussionId, id: PostId, subject: impl Into<String>) -> Self {
        Self {
            id,
            discussion,
            subject: subject.into(),
            author: None,
            user_id: UserId::default(),
            num_unread: 0,
            num_replies: 0,
            locked: false,
            pinned: false,
            starred: false,
            group_id: GroupId::default(),
            group_name: None,
            created: 0,
            time_modified: 0,
            parent: PostId::ROOT,
        }
    }

    pub fn with_author(mut self, user_id: UserId, author: impl Into<String>) -> Self {
        self.user_id = user_id;
        self.author = Some(author.into());
        self
    }

    pub fn with_created(mut self, created: i64) -> Self {
        self.created = created;
        self.time_modified = created;
        self
    }

    pub fn with_counts(mut self, num_replies: u32, num_unread: u32) -> Self {
        self.num_replies = num_replies;
        self.num_unread = num_unread;
        self
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn with_flags(mut self, locked: bool, pinned: bool, starred: bool) -> Self {
        self.locked = locked;
        self.pinned = pinned;
        self.starred = starred;
        self
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created, 0).single()
    }
}

/// A discussion created locally and still waiting to be uploaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineDiscussion {
    /// Local creation time (unix seconds), the item identity
    pub time_created: i64,
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub group_id: GroupId,
    #[serde(default)]
    pub group_name: Option<String>,
    /// Attachments are stored locally and not uploaded yet
    #[serde(default)]
    pub has_attachments: bool,
}

impl OfflineDiscussion {
    pub fn new(time_created: i64, subject: impl Into<String>) -> Self {
        Self {
            time_created,
            subject: subject.into(),
            message: String::new(),
            user_id: UserId::default(),
            author: None,
            group_id: GroupId::default(),
            group_name: None,
            has_attachments: false,
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn with_attachments(mut self, has_attachments: bool) -> Self {
        self.has_attachments = has_attachments;
        self
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.time_created, 0).single()
    }
}

/// Variant of a [`DiscussionItem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Online,
    Offline,
    NewDiscussion,
}

/// Creation time that routes reserve for the new discussion form. Offline
/// discussions never carry it.
pub const NEW_DISCUSSION_TIME: i64 = 0;

/// Identity of a list item, unique across all variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKey {
    Online(DiscussionId),
    Offline(i64),
    NewDiscussion,
}

impl ItemKey {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemKey::Online(_) => ItemKind::Online,
            ItemKey::Offline(_) => ItemKind::Offline,
            ItemKey::NewDiscussion => ItemKind::NewDiscussion,
        }
    }
}

/// An entry of the discussion list
#[derive(Debug, Clone, PartialEq)]
pub enum DiscussionItem {
    Online(OnlineDiscussion),
    Offline(OfflineDiscussion),
    /// "Add a new discussion" row
    NewDiscussion,
}

impl DiscussionItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            DiscussionItem::Online(_) => ItemKind::Online,
            DiscussionItem::Offline(_) => ItemKind::Offline,
            DiscussionItem::NewDiscussion => ItemKind::NewDiscussion,
        }
    }

    pub fn key(&self) -> ItemKey {
        match self {
            DiscussionItem::Online(d) => ItemKey::Online(d.discussion),
            DiscussionItem::Offline(d) => ItemKey::Offline(d.time_created),
            DiscussionItem::NewDiscussion => ItemKey::NewDiscussion,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, DiscussionItem::Online(_))
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, DiscussionItem::Offline(_))
    }

    pub fn is_new_discussion_form(&self) -> bool {
        matches!(self, DiscussionItem::NewDiscussion)
    }

    pub fn as_online(&self) -> Option<&OnlineDiscussion> {
        match self {
            DiscussionItem::Online(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_offline(&self) -> Option<&OfflineDiscussion> {
        match self {
            DiscussionItem::Offline(d) => Some(d),
            _ => None,
        }
    }

    /// Subject shown in the list, empty for the placeholder
    pub fn subject(&self) -> &str {
        match self {
            DiscussionItem::Online(d) => &d.subject,
            DiscussionItem::Offline(d) => &d.subject,
            DiscussionItem::NewDiscussion => "",
        }
    }

    /// Build an item from an untyped payload, classified by [`classify_value`]
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        Ok(match classify_value(&value) {
            ItemKind::Online => DiscussionItem::Online(serde_json::from_value(value)?),
            ItemKind::Offline => DiscussionItem::Offline(serde_json::from_value(value)?),
            ItemKind::NewDiscussion => DiscussionItem::NewDiscussion,
        })
    }
}

impl From<OnlineDiscussion> for DiscussionItem {
    fn from(d: OnlineDiscussion) -> Self {
        DiscussionItem::Online(d)
    }
}

impl From<OfflineDiscussion> for DiscussionItem {
    fn from(d: OfflineDiscussion) -> Self {
        DiscussionItem::Offline(d)
    }
}

/// Classify an untyped item payload by its shape.
///
/// A server `id` field means online. A `newDiscussion` marker means the
/// placeholder. Anything else is an offline discussion.
pub fn classify_value(value: &Value) -> ItemKind {
    if value.get("id").is_some() {
        ItemKind::Online
    } else if value.get("newDiscussion").is_some() {
        ItemKind::NewDiscussion
    } else {
        ItemKind::Offline
    }
}
