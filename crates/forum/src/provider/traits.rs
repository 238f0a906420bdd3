//! Collaborator contracts of the forum index
//!
//! The index never talks to the network, the offline queue or the
//! preference store directly. Everything goes through these traits so the
//! list logic can run against in-memory fakes.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    AccessInfo, CourseId, CourseModuleId, DiscussionId, ForumData, ForumId, Group, GroupMode,
    OfflineDiscussion, OnlineDiscussion, SortOrder, UserId,
};
use crate::selection::NavigationRequest;

/// Parameters of a discussion page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscussionQuery {
    pub sort_order: SortOrder,
    pub page: u32,
}

/// One page of online discussions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscussionPage {
    pub discussions: Vec<OnlineDiscussion>,
    /// Whether the server has further pages
    pub can_load_more: bool,
}

/// Remote forum data source
#[async_trait]
pub trait ForumProvider: Send + Sync {
    /// Forum of a course module
    async fn get_forum(&self, course_id: CourseId, cm_id: CourseModuleId) -> Result<ForumData>;

    async fn get_access_information(&self, forum_id: ForumId) -> Result<AccessInfo>;

    async fn get_group_mode(&self, cm_id: CourseModuleId) -> Result<GroupMode>;

    /// Groups visible to the user in an activity
    async fn get_groups(&self, cm_id: CourseModuleId) -> Result<Vec<Group>>;

    /// Whether the user may pin discussions in the forum
    async fn can_pin_discussions(&self, forum_id: ForumId) -> Result<bool>;

    async fn get_discussions(
        &self,
        forum_id: ForumId,
        query: DiscussionQuery,
    ) -> Result<DiscussionPage>;

    /// Full name of a user, for authors of offline discussions
    async fn get_user_fullname(&self, user_id: UserId) -> Result<String>;

    /// Drop cached data of a forum so the next fetch hits the server
    async fn invalidate(&self, forum_id: Option<ForumId>) -> Result<()>;
}

/// Local queue of content waiting to be uploaded
#[async_trait]
pub trait OfflineStore: Send + Sync {
    /// Discussions created offline in a forum
    async fn get_new_discussions(&self, forum_id: ForumId) -> Result<Vec<OfflineDiscussion>>;

    /// Whether any reply to a discussion of the forum is queued
    async fn has_forum_replies(&self, forum_id: ForumId) -> Result<bool>;

    /// Number of queued replies to a discussion
    async fn count_discussion_replies(&self, discussion_id: DiscussionId) -> Result<u32>;
}

/// Stored user preferences
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Stored sort order wire value, if any
    async fn get_sort_order(&self) -> Result<Option<i32>>;

    async fn set_sort_order(&self, order: SortOrder) -> Result<()>;
}

/// Host navigation. Opening a discussion is fire-and-forget.
pub trait Navigator: Send + Sync {
    fn navigate(&self, request: &NavigationRequest) -> Result<()>;
}
