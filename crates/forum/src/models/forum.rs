//! Forum activity metadata, access information, groups and sort orders

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CourseId, CourseModuleId, ForumId, GroupId};

/// Kind of forum, which changes wording and author display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForumType {
    #[default]
    General,
    News,
    Blog,
    Qanda,
    /// A single discussion forum. The opening post hides its author.
    Single,
    EachUser,
    Social,
}

impl ForumType {
    /// Label of the "add discussion" action for this forum type
    pub fn new_discussion_label(&self) -> &'static str {
        match self {
            ForumType::News | ForumType::Blog => "Add a new topic",
            ForumType::Qanda => "Add a new question",
            _ => "Add a new discussion topic",
        }
    }
}

/// Forum activity metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumData {
    pub id: ForumId,
    pub cm_id: CourseModuleId,
    pub course_id: CourseId,
    pub name: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub forum_type: ForumType,
    #[serde(default)]
    pub num_discussions: u32,
    /// Read tracking flag. Older servers don't report it.
    #[serde(default)]
    pub is_tracked: Option<bool>,
    #[serde(default)]
    pub can_create_discussions: bool,
    /// Unix seconds, 0 when unset
    #[serde(default)]
    pub cutoff_date: i64,
    /// Unix seconds, 0 when unset
    #[serde(default)]
    pub due_date: i64,
}

impl ForumData {
    pub fn new(
        id: ForumId,
        cm_id: CourseModuleId,
        course_id: CourseId,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            cm_id,
            course_id,
            name: name.into(),
            intro: String::new(),
            forum_type: ForumType::General,
            num_discussions: 0,
            is_tracked: None,
            can_create_discussions: true,
            cutoff_date: 0,
            due_date: 0,
        }
    }

    pub fn with_type(mut self, forum_type: ForumType) -> Self {
        self.forum_type = forum_type;
        self
    }

    pub fn is_cutoff_date_reached(&self, now: DateTime<Utc>) -> bool {
        self.cutoff_date > 0 && now.timestamp() > self.cutoff_date
    }

    pub fn is_due_date_reached(&self, now: DateTime<Utc>) -> bool {
        self.due_date > 0 && now.timestamp() > self.due_date
    }

    /// Whether the user may start a new discussion
    pub fn can_add_discussion(&self, access: &AccessInfo, now: DateTime<Utc>) -> bool {
        let cutoff_blocks = self.is_cutoff_date_reached(now) && !access.can_override_cutoff;
        self.can_create_discussions && !cutoff_blocks
    }

    /// Message describing cut-off and due dates, if any applies
    pub fn availability_message(&self, now: DateTime<Utc>) -> Option<String> {
        if self.is_cutoff_date_reached(now) {
            return Some("This forum has reached its cut-off date.".to_string());
        }

        let due = Utc.timestamp_opt(self.due_date, 0).single()?;
        if self.is_due_date_reached(now) {
            Some(format!("This forum was due on {}.", due.format("%A, %e %B %Y, %H:%M")))
        } else if self.due_date > 0 {
            Some(format!("This forum is due on {}.", due.format("%A, %e %B %Y, %H:%M")))
        } else {
            None
        }
    }
}

/// Capabilities of the current user on a forum
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessInfo {
    #[serde(default)]
    pub can_override_cutoff: bool,
}

/// Group mode of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    #[default]
    None,
    Separate,
    Visible,
}

impl GroupMode {
    pub fn uses_groups(&self) -> bool {
        matches!(self, GroupMode::Separate | GroupMode::Visible)
    }
}

/// A course group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// Discussion list sort orders understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    LastPostDesc,
    LastPostAsc,
    CreatedDesc,
    CreatedAsc,
    RepliesDesc,
    RepliesAsc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 6] = [
        SortOrder::LastPostDesc,
        SortOrder::LastPostAsc,
        SortOrder::CreatedDesc,
        SortOrder::CreatedAsc,
        SortOrder::RepliesDesc,
        SortOrder::RepliesAsc,
    ];

    /// Wire value used by the server and the stored preference
    pub fn value(&self) -> i32 {
        match self {
            SortOrder::LastPostDesc => 1,
            SortOrder::LastPostAsc => 2,
            SortOrder::CreatedDesc => 3,
            SortOrder::CreatedAsc => 4,
            SortOrder::RepliesDesc => 5,
            SortOrder::RepliesAsc => 6,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|order| order.value() == value)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::LastPostDesc => "Sort by last post creation date in descending order",
            SortOrder::LastPostAsc => "Sort by last post creation date in ascending order",
            SortOrder::CreatedDesc => "Sort by discussion creation date in descending order",
            SortOrder::CreatedAsc => "Sort by discussion creation date in ascending order",
            SortOrder::RepliesDesc => "Sort by number of replies in descending order",
            SortOrder::RepliesAsc => "Sort by number of replies in ascending order",
        }
    }

    /// Orders offered to the user. Without server support only the default
    /// order is available.
    pub fn available(sorting_available: bool) -> Vec<SortOrder> {
        if sorting_available {
            Self::ALL.to_vec()
        } else {
            vec![SortOrder::LastPostDesc]
        }
    }
}
