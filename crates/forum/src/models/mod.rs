//! Domain models for forum entities

mod discussion;
mod forum;
mod ids;

pub use discussion::{
    DiscussionItem, ItemKey, ItemKind, NEW_DISCUSSION_TIME, OfflineDiscussion, OnlineDiscussion,
    classify_value,
};
pub use forum::{AccessInfo, ForumData, ForumType, Group, GroupMode, SortOrder};
pub use ids::{CourseId, CourseModuleId, DiscussionId, ForumId, GroupId, PostId, UserId};
