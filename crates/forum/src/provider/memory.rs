//! In-memory providers
//!
//! Back the forum index with plain maps. Used by the tests and by the
//! replay app. Every call is counted and any operation can be made to fail.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::traits::{
    DiscussionPage, DiscussionQuery, ForumProvider, Navigator, OfflineStore, PreferenceStore,
};
use crate::models::{
    AccessInfo, CourseId, CourseModuleId, DiscussionId, ForumData, ForumId, Group, GroupMode,
    OfflineDiscussion, OnlineDiscussion, SortOrder, UserId,
};
use crate::selection::NavigationRequest;

/// Default number of discussions per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Operations of the in-memory providers, for call counting and failure
/// injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    GetForum,
    GetAccessInformation,
    GetGroupMode,
    GetGroups,
    CanPinDiscussions,
    GetDiscussions,
    GetUserFullname,
    Invalidate,
    GetNewDiscussions,
    HasForumReplies,
    CountDiscussionReplies,
    GetSortOrder,
    SetSortOrder,
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Always,
    Times(u32),
}

#[derive(Default)]
struct ForumState {
    forums: HashMap<CourseModuleId, ForumData>,
    access: HashMap<ForumId, AccessInfo>,
    group_modes: HashMap<CourseModuleId, GroupMode>,
    groups: HashMap<CourseModuleId, Vec<Group>>,
    can_pin: HashMap<ForumId, bool>,
    discussions: HashMap<ForumId, Vec<OnlineDiscussion>>,
    users: HashMap<UserId, String>,
    offline_discussions: HashMap<ForumId, Vec<OfflineDiscussion>>,
    offline_replies: HashMap<DiscussionId, u32>,
    sort_order: Option<i32>,
}

/// Forum server, offline queue and preference store held in memory
pub struct InMemoryForumProvider {
    state: RwLock<ForumState>,
    page_size: usize,
    calls: Mutex<HashMap<Operation, usize>>,
    failures: Mutex<HashMap<Operation, Failure>>,
}

impl InMemoryForumProvider {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: RwLock::new(ForumState::default()),
            page_size: page_size.max(1),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    // === Seeding ===

    pub fn add_forum(&self, forum: ForumData) -> Result<()> {
        let mut state = self.write()?;
        state.forums.insert(forum.cm_id, forum);
        Ok(())
    }

    pub fn set_access_information(&self, forum_id: ForumId, access: AccessInfo) -> Result<()> {
        self.write()?.access.insert(forum_id, access);
        Ok(())
    }

    pub fn set_group_mode(
        &self,
        cm_id: CourseModuleId,
        mode: GroupMode,
        groups: Vec<Group>,
    ) -> Result<()> {
        let mut state = self.write()?;
        state.group_modes.insert(cm_id, mode);
        state.groups.insert(cm_id, groups);
        Ok(())
    }

    pub fn set_can_pin(&self, forum_id: ForumId, can_pin: bool) -> Result<()> {
        self.write()?.can_pin.insert(forum_id, can_pin);
        Ok(())
    }

    /// Replace the server discussions of a forum
    pub fn set_discussions(
        &self,
        forum_id: ForumId,
        discussions: Vec<OnlineDiscussion>,
    ) -> Result<()> {
        self.write()?.discussions.insert(forum_id, discussions);
        Ok(())
    }

    pub fn add_discussion(&self, forum_id: ForumId, discussion: OnlineDiscussion) -> Result<()> {
        self.write()?
            .discussions
            .entry(forum_id)
            .or_default()
            .push(discussion);
        Ok(())
    }

    pub fn remove_discussion(&self, forum_id: ForumId, id: DiscussionId) -> Result<bool> {
        let mut state = self.write()?;
        let Some(discussions) = state.discussions.get_mut(&forum_id) else {
            return Ok(false);
        };
        let before = discussions.len();
        discussions.retain(|d| d.discussion != id);
        Ok(discussions.len() != before)
    }

    pub fn add_user(&self, user_id: UserId, fullname: impl Into<String>) -> Result<()> {
        self.write()?.users.insert(user_id, fullname.into());
        Ok(())
    }

    pub fn add_offline_discussion(
        &self,
        forum_id: ForumId,
        discussion: OfflineDiscussion,
    ) -> Result<()> {
        self.write()?
            .offline_discussions
            .entry(forum_id)
            .or_default()
            .push(discussion);
        Ok(())
    }

    /// Remove a queued discussion, as a successful upload would
    pub fn remove_offline_discussion(&self, forum_id: ForumId, time_created: i64) -> Result<()> {
        if let Some(queue) = self.write()?.offline_discussions.get_mut(&forum_id) {
            queue.retain(|d| d.time_created != time_created);
        }
        Ok(())
    }

    pub fn set_offline_replies(&self, discussion_id: DiscussionId, count: u32) -> Result<()> {
        let mut state = self.write()?;
        if count == 0 {
            state.offline_replies.remove(&discussion_id);
        } else {
            state.offline_replies.insert(discussion_id, count);
        }
        Ok(())
    }

    /// Store a raw sort order preference value
    pub fn set_stored_sort_order(&self, value: Option<i32>) -> Result<()> {
        self.write()?.sort_order = value;
        Ok(())
    }

    pub fn stored_sort_order(&self) -> Result<Option<i32>> {
        Ok(self.read()?.sort_order)
    }

    // === Call counting and failure injection ===

    /// Number of times `operation` was called
    pub fn calls(&self, operation: Operation) -> usize {
        self.lock_calls().get(&operation).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.lock_calls().clear();
    }

    /// Make every call of `operation` fail
    pub fn fail(&self, operation: Operation) {
        self.lock_failures().insert(operation, Failure::Always);
    }

    /// Make the next `times` calls of `operation` fail
    pub fn fail_times(&self, operation: Operation, times: u32) {
        if times > 0 {
            self.lock_failures().insert(operation, Failure::Times(times));
        }
    }

    pub fn recover(&self, operation: Operation) {
        self.lock_failures().remove(&operation);
    }

    fn record(&self, operation: Operation) -> Result<()> {
        *self.lock_calls().entry(operation).or_insert(0) += 1;

        let mut failures = self.lock_failures();
        match failures.get(&operation).copied() {
            None => Ok(()),
            Some(Failure::Always) => bail!("{:?} failed", operation),
            Some(Failure::Times(remaining)) => {
                if remaining <= 1 {
                    failures.remove(&operation);
                } else {
                    failures.insert(operation, Failure::Times(remaining - 1));
                }
                bail!("{:?} failed", operation)
            }
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ForumState>> {
        self.state
            .read()
            .map_err(|_| anyhow!("Forum state lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ForumState>> {
        self.state
            .write()
            .map_err(|_| anyhow!("Forum state lock poisoned"))
    }

    fn lock_calls(&self) -> MutexGuard<'_, HashMap<Operation, usize>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_failures(&self) -> MutexGuard<'_, HashMap<Operation, Failure>> {
        self.failures.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryForumProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Order discussions the way the server does for `order`. Pinned
/// discussions always come first.
fn sort_discussions(discussions: &mut [OnlineDiscussion], order: SortOrder) {
    match order {
        SortOrder::LastPostDesc => discussions.sort_by_key(|d| Reverse(d.time_modified)),
        SortOrder::LastPostAsc => discussions.sort_by_key(|d| d.time_modified),
        SortOrder::CreatedDesc => discussions.sort_by_key(|d| Reverse(d.created)),
        SortOrder::CreatedAsc => discussions.sort_by_key(|d| d.created),
        SortOrder::RepliesDesc => discussions.sort_by_key(|d| Reverse(d.num_replies)),
        SortOrder::RepliesAsc => discussions.sort_by_key(|d| d.num_replies),
    }
    discussions.sort_by_key(|d| !d.pinned);
}

#[async_trait]
impl ForumProvider for InMemoryForumProvider {
    async fn get_forum(&self, course_id: CourseId, cm_id: CourseModuleId) -> Result<ForumData> {
        self.record(Operation::GetForum)?;
        self.read()?
            .forums
            .get(&cm_id)
            .filter(|forum| forum.course_id == course_id)
            .cloned()
            .ok_or_else(|| anyhow!("Forum not found for module {} in course {}", cm_id, course_id))
    }

    async fn get_access_information(&self, forum_id: ForumId) -> Result<AccessInfo> {
        self.record(Operation::GetAccessInformation)?;
        Ok(self.read()?.access.get(&forum_id).cloned().unwrap_or_default())
    }

    async fn get_group_mode(&self, cm_id: CourseModuleId) -> Result<GroupMode> {
        self.record(Operation::GetGroupMode)?;
        Ok(self
            .read()?
            .group_modes
            .get(&cm_id)
            .copied()
            .unwrap_or_default())
    }

    async fn get_groups(&self, cm_id: CourseModuleId) -> Result<Vec<Group>> {
        self.record(Operation::GetGroups)?;
        Ok(self.read()?.groups.get(&cm_id).cloned().unwrap_or_default())
    }

    async fn can_pin_discussions(&self, forum_id: ForumId) -> Result<bool> {
        self.record(Operation::CanPinDiscussions)?;
        Ok(self.read()?.can_pin.get(&forum_id).copied().unwrap_or(false))
    }

    async fn get_discussions(
        &self,
        forum_id: ForumId,
        query: DiscussionQuery,
    ) -> Result<DiscussionPage> {
        self.record(Operation::GetDiscussions)?;

        let mut discussions = self
            .read()?
            .discussions
            .get(&forum_id)
            .cloned()
            .unwrap_or_default();
        sort_discussions(&mut discussions, query.sort_order);

        let start = (query.page as usize).saturating_mul(self.page_size);
        let end = start.saturating_add(self.page_size).min(discussions.len());
        let page = discussions.get(start..end).map(<[_]>::to_vec).unwrap_or_default();

        debug!(
            "Serving page {} of forum {}: {} discussions",
            query.page,
            forum_id,
            page.len()
        );
        Ok(DiscussionPage {
            discussions: page,
            can_load_more: end < discussions.len(),
        })
    }

    async fn get_user_fullname(&self, user_id: UserId) -> Result<String> {
        self.record(Operation::GetUserFullname)?;
        self.read()?
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| anyhow!("User {} not found", user_id))
    }

    async fn invalidate(&self, forum_id: Option<ForumId>) -> Result<()> {
        self.record(Operation::Invalidate)?;
        debug!("Invalidated cached data of forum {:?}", forum_id.map(|id| id.value()));
        Ok(())
    }
}

#[async_trait]
impl OfflineStore for InMemoryForumProvider {
    async fn get_new_discussions(&self, forum_id: ForumId) -> Result<Vec<OfflineDiscussion>> {
        self.record(Operation::GetNewDiscussions)?;
        Ok(self
            .read()?
            .offline_discussions
            .get(&forum_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn has_forum_replies(&self, forum_id: ForumId) -> Result<bool> {
        self.record(Operation::HasForumReplies)?;
        let state = self.read()?;
        let has_replies = state.discussions.get(&forum_id).is_some_and(|discussions| {
            discussions
                .iter()
                .any(|d| state.offline_replies.contains_key(&d.discussion))
        });
        Ok(has_replies)
    }

    async fn count_discussion_replies(&self, discussion_id: DiscussionId) -> Result<u32> {
        self.record(Operation::CountDiscussionReplies)?;
        Ok(self
            .read()?
            .offline_replies
            .get(&discussion_id)
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl PreferenceStore for InMemoryForumProvider {
    async fn get_sort_order(&self) -> Result<Option<i32>> {
        self.record(Operation::GetSortOrder)?;
        Ok(self.read()?.sort_order)
    }

    async fn set_sort_order(&self, order: SortOrder) -> Result<()> {
        self.record(Operation::SetSortOrder)?;
        self.write()?.sort_order = Some(order.value());
        Ok(())
    }
}

/// Navigator that records every request
#[derive(Default)]
pub struct RecordingNavigator {
    requests: Mutex<Vec<NavigationRequest>>,
    failing: Mutex<bool>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<NavigationRequest> {
        self.lock_requests().clone()
    }

    pub fn last(&self) -> Option<NavigationRequest> {
        self.lock_requests().last().cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.lock_requests().iter().map(|r| r.path.clone()).collect()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap_or_else(|e| e.into_inner()) = failing;
    }

    fn lock_requests(&self) -> MutexGuard<'_, Vec<NavigationRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, request: &NavigationRequest) -> Result<()> {
        if *self.failing.lock().unwrap_or_else(|e| e.into_inner()) {
            bail!("Navigation to {} refused", request.path);
        }
        debug!("Navigating to {}", request.path);
        self.lock_requests().push(request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostId;

    fn discussions(count: i64) -> Vec<OnlineDiscussion> {
        (1..=count)
            .map(|i| {
                OnlineDiscussion::new(DiscussionId::new(i), PostId::new(i * 10), format!("D{}", i))
                    .with_created(1_000 + i)
            })
            .collect()
    }

    fn query(page: u32) -> DiscussionQuery {
        DiscussionQuery {
            sort_order: SortOrder::CreatedDesc,
            page,
        }
    }

    #[tokio::test]
    async fn test_pages_are_sliced_by_page_size() {
        let provider = InMemoryForumProvider::with_page_size(20);
        let forum = ForumId::new(1);
        provider.set_discussions(forum, discussions(35)).unwrap();

        let first = provider.get_discussions(forum, query(0)).await.unwrap();
        assert_eq!(first.discussions.len(), 20);
        assert!(first.can_load_more);
        assert_eq!(first.discussions[0].discussion, DiscussionId::new(35));

        let second = provider.get_discussions(forum, query(1)).await.unwrap();
        assert_eq!(second.discussions.len(), 15);
        assert!(!second.can_load_more);

        let third = provider.get_discussions(forum, query(2)).await.unwrap();
        assert!(third.discussions.is_empty());
        assert_eq!(provider.calls(Operation::GetDiscussions), 3);
    }

    #[tokio::test]
    async fn test_pinned_discussions_come_first() {
        let provider = InMemoryForumProvider::new();
        let forum = ForumId::new(1);
        let mut all = discussions(3);
        all[0].pinned = true;
        provider.set_discussions(forum, all).unwrap();

        let page = provider.get_discussions(forum, query(0)).await.unwrap();
        assert_eq!(page.discussions[0].discussion, DiscussionId::new(1));
        assert_eq!(page.discussions[1].discussion, DiscussionId::new(3));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let provider = InMemoryForumProvider::new();
        provider.fail_times(Operation::GetSortOrder, 1);

        assert!(provider.get_sort_order().await.is_err());
        assert_eq!(provider.get_sort_order().await.unwrap(), None);
        assert_eq!(provider.calls(Operation::GetSortOrder), 2);

        provider.fail(Operation::SetSortOrder);
        assert!(provider.set_sort_order(SortOrder::RepliesAsc).await.is_err());
        assert!(provider.set_sort_order(SortOrder::RepliesAsc).await.is_err());
        provider.recover(Operation::SetSortOrder);
        provider.set_sort_order(SortOrder::RepliesAsc).await.unwrap();
        assert_eq!(provider.stored_sort_order().unwrap(), Some(6));
    }

    #[tokio::test]
    async fn test_offline_replies() {
        let provider = InMemoryForumProvider::new();
        let forum = ForumId::new(1);
        provider.set_discussions(forum, discussions(2)).unwrap();
        assert!(!provider.has_forum_replies(forum).await.unwrap());

        provider.set_offline_replies(DiscussionId::new(2), 3).unwrap();
        assert!(provider.has_forum_replies(forum).await.unwrap());
        assert_eq!(
            provider
                .count_discussion_replies(DiscussionId::new(2))
                .await
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_unknown_forum_is_an_error() {
        let provider = InMemoryForumProvider::new();
        let result = provider
            .get_forum(CourseId::new(1), CourseModuleId::new(2))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_recording_navigator() {
        use crate::selection::NavigationParams;

        let navigator = RecordingNavigator::new();
        let request = NavigationRequest {
            path: "5".to_string(),
            params: NavigationParams {
                course_id: CourseId::new(1),
                cm_id: CourseModuleId::new(2),
                forum_id: ForumId::new(3),
                discussion: None,
                track_posts: None,
            },
        };

        navigator.navigate(&request).unwrap();
        navigator.set_failing(true);
        assert!(navigator.navigate(&request).is_err());
        assert_eq!(navigator.paths(), vec!["5".to_string()]);
    }
}
