//! Fetch stages of the forum index
//!
//! A load runs [`fetch_metadata`], then [`fetch_forum_context`], then
//! [`fetch_offline_discussions`] and [`fetch_discussion_page`] concurrently.
//! Each stage fails as a whole. Lookups whose failure is harmless are
//! swallowed inside the stage.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::HashMap;

use crate::models::{
    AccessInfo, CourseId, CourseModuleId, ForumData, ForumType, Group, GroupId, GroupMode,
    OfflineDiscussion, OnlineDiscussion, SortOrder,
};
use crate::provider::{DiscussionQuery, ForumProvider, OfflineStore, PreferenceStore};

/// Forum and the sort order to list it with
#[derive(Debug, Clone, PartialEq)]
pub struct ForumMetadata {
    pub forum: ForumData,
    pub sort_order: SortOrder,
}

/// Per-user state of a loaded forum
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForumContext {
    pub group_mode: GroupMode,
    /// Empty unless the forum uses groups
    pub groups: Vec<Group>,
    pub access: AccessInfo,
    pub can_pin: bool,
    pub can_add_discussion: bool,
}

impl ForumContext {
    pub fn uses_groups(&self) -> bool {
        self.group_mode.uses_groups()
    }

    fn group_names(&self) -> HashMap<GroupId, &str> {
        self.groups
            .iter()
            .map(|group| (group.id, group.name.as_str()))
            .collect()
    }
}

/// One fetched page, ready to merge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedPage {
    pub discussions: Vec<OnlineDiscussion>,
    pub can_load_more: bool,
    /// Replies to this forum are waiting in the offline queue
    pub has_offline_replies: bool,
}

/// Fetch the forum and the stored sort order.
///
/// A failed or unknown preference falls back to the first available order.
pub async fn fetch_metadata(
    provider: &dyn ForumProvider,
    preferences: &dyn PreferenceStore,
    course_id: CourseId,
    cm_id: CourseModuleId,
    sorting_available: bool,
) -> Result<ForumMetadata> {
    let stored_order = async {
        if !sorting_available {
            return None;
        }
        match preferences.get_sort_order().await {
            Ok(value) => value,
            Err(e) => {
                debug!("Ignoring sort order preference error: {:#}", e);
                None
            }
        }
    };

    let (forum, stored_order) = tokio::join!(provider.get_forum(course_id, cm_id), stored_order);
    let forum = forum.with_context(|| format!("Failed to fetch forum of module {}", cm_id))?;

    let available = SortOrder::available(sorting_available);
    let sort_order = stored_order
        .and_then(SortOrder::from_value)
        .filter(|order| available.contains(order))
        .or_else(|| available.first().copied())
        .unwrap_or_default();

    Ok(ForumMetadata { forum, sort_order })
}

/// Fetch group mode, access information and pin capability of `forum`
pub async fn fetch_forum_context(
    provider: &dyn ForumProvider,
    forum: &ForumData,
    pin_state_available: bool,
    now: DateTime<Utc>,
) -> Result<ForumContext> {
    let groups = async {
        let mode = provider
            .get_group_mode(forum.cm_id)
            .await
            .context("Failed to fetch group mode")?;
        let groups = if mode.uses_groups() {
            provider
                .get_groups(forum.cm_id)
                .await
                .context("Failed to fetch groups")?
        } else {
            Vec::new()
        };
        anyhow::Ok((mode, groups))
    };

    let access = async {
        provider
            .get_access_information(forum.id)
            .await
            .context("Failed to fetch access information")
    };

    let can_pin = async {
        if !pin_state_available {
            return anyhow::Ok(false);
        }
        match provider.can_pin_discussions(forum.id).await {
            Ok(can_pin) => Ok(can_pin),
            Err(e) => {
                debug!("Pin capability check failed, assuming no: {:#}", e);
                Ok(false)
            }
        }
    };

    let ((group_mode, groups), access, can_pin) = tokio::try_join!(groups, access, can_pin)?;
    let can_add_discussion = forum.can_add_discussion(&access, now);

    Ok(ForumContext {
        group_mode,
        groups,
        access,
        can_pin,
        can_add_discussion,
    })
}

/// Fetch the offline queue of `forum`, newest first, with group names and
/// authors filled in
pub async fn fetch_offline_discussions(
    provider: &dyn ForumProvider,
    offline: &dyn OfflineStore,
    forum: &ForumData,
    context: &ForumContext,
) -> Result<Vec<OfflineDiscussion>> {
    let mut discussions = offline
        .get_new_discussions(forum.id)
        .await
        .context("Failed to read offline discussions")?;
    if discussions.is_empty() {
        return Ok(discussions);
    }

    if context.uses_groups() {
        let names = context.group_names();
        for discussion in &mut discussions {
            discussion.group_name = names.get(&discussion.group_id).map(|n| n.to_string());
        }
    }

    if forum.forum_type != ForumType::Single {
        for discussion in &mut discussions {
            match provider.get_user_fullname(discussion.user_id).await {
                Ok(name) => discussion.author = Some(name),
                Err(e) => debug!("No profile for user {}: {:#}", discussion.user_id, e),
            }
        }
    }

    discussions.sort_by(|a, b| b.time_created.cmp(&a.time_created));
    Ok(discussions)
}

/// Fetch one page of online discussions.
///
/// Group names are filled in, the opening post author is hidden in single
/// discussion forums, and queued offline replies are added to the reply
/// counts.
pub async fn fetch_discussion_page(
    provider: &dyn ForumProvider,
    offline: &dyn OfflineStore,
    forum: &ForumData,
    context: &ForumContext,
    query: DiscussionQuery,
) -> Result<FetchedPage> {
    let page = provider
        .get_discussions(forum.id, query)
        .await
        .with_context(|| format!("Failed to fetch discussions page {}", query.page))?;
    let mut discussions = page.discussions;

    if context.uses_groups() {
        let names = context.group_names();
        for discussion in &mut discussions {
            discussion.group_name = names.get(&discussion.group_id).map(|n| n.to_string());
        }
    }

    if forum.forum_type == ForumType::Single
        && let Some(root) = discussions
            .iter_mut()
            .find(|d| d.author.is_some() && d.parent.is_root())
    {
        root.author = None;
    }

    let has_offline_replies = offline
        .has_forum_replies(forum.id)
        .await
        .context("Failed to check offline replies")?;
    if has_offline_replies {
        for discussion in &mut discussions {
            let queued = offline
                .count_discussion_replies(discussion.discussion)
                .await
                .context("Failed to count offline replies")?;
            discussion.num_replies += queued;
        }
    }

    Ok(FetchedPage {
        discussions,
        can_load_more: page.can_load_more,
        has_offline_replies,
    })
}

/// Whether read tracking is shown for `forum`.
///
/// The server flag wins when present. Otherwise tracking is on as soon as
/// any fetched discussion has unread posts.
pub fn detect_track_posts(
    forum: &ForumData,
    current: bool,
    discussions: &[OnlineDiscussion],
) -> bool {
    match forum.is_tracked {
        Some(tracked) => tracked,
        None if current => true,
        None => {
            let tracked = discussions.iter().any(|d| d.num_unread > 0);
            if tracked {
                debug!("Forum {} has unread posts, enabling read tracking", forum.id);
            }
            tracked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiscussionId, ForumId, PostId, UserId};
    use crate::provider::{InMemoryForumProvider, Operation};

    const COURSE: CourseId = CourseId(100);
    const CM: CourseModuleId = CourseModuleId(10);
    const FORUM: ForumId = ForumId(1);

    fn provider(forum_type: ForumType) -> InMemoryForumProvider {
        let provider = InMemoryForumProvider::new();
        provider
            .add_forum(ForumData::new(FORUM, CM, COURSE, "Forum").with_type(forum_type))
            .unwrap();
        provider
    }

    fn forum(forum_type: ForumType) -> ForumData {
        ForumData::new(FORUM, CM, COURSE, "Forum").with_type(forum_type)
    }

    fn query() -> DiscussionQuery {
        DiscussionQuery {
            sort_order: SortOrder::LastPostDesc,
            page: 0,
        }
    }

    #[tokio::test]
    async fn test_metadata_uses_stored_sort_order() {
        let provider = provider(ForumType::General);
        provider.set_stored_sort_order(Some(5)).unwrap();

        let metadata = fetch_metadata(&provider, &provider, COURSE, CM, true)
            .await
            .unwrap();
        assert_eq!(metadata.sort_order, SortOrder::RepliesDesc);
        assert_eq!(metadata.forum.id, FORUM);
    }

    #[tokio::test]
    async fn test_metadata_ignores_preference_failure() {
        let provider = provider(ForumType::General);
        provider.set_stored_sort_order(Some(5)).unwrap();
        provider.fail(Operation::GetSortOrder);

        let metadata = fetch_metadata(&provider, &provider, COURSE, CM, true)
            .await
            .unwrap();
        assert_eq!(metadata.sort_order, SortOrder::LastPostDesc);
    }

    #[tokio::test]
    async fn test_metadata_without_sorting_skips_preference() {
        let provider = provider(ForumType::General);
        provider.set_stored_sort_order(Some(5)).unwrap();

        let metadata = fetch_metadata(&provider, &provider, COURSE, CM, false)
            .await
            .unwrap();
        assert_eq!(metadata.sort_order, SortOrder::LastPostDesc);
        assert_eq!(provider.calls(Operation::GetSortOrder), 0);
    }

    #[tokio::test]
    async fn test_metadata_fails_when_forum_fails() {
        let provider = provider(ForumType::General);
        provider.fail(Operation::GetForum);
        assert!(fetch_metadata(&provider, &provider, COURSE, CM, true).await.is_err());
    }

    #[tokio::test]
    async fn test_context_pin_failure_means_false() {
        let provider = provider(ForumType::General);
        provider.set_can_pin(FORUM, true).unwrap();
        provider.fail(Operation::CanPinDiscussions);

        let context = fetch_forum_context(&provider, &forum(ForumType::General), true, Utc::now())
            .await
            .unwrap();
        assert!(!context.can_pin);
        assert!(context.can_add_discussion);
    }

    #[tokio::test]
    async fn test_context_fetches_groups_only_when_used() {
        let provider = provider(ForumType::General);
        let groups = vec![Group {
            id: GroupId::new(3),
            name: "Blue".to_string(),
        }];
        provider
            .set_group_mode(CM, GroupMode::None, groups.clone())
            .unwrap();

        let context = fetch_forum_context(&provider, &forum(ForumType::General), true, Utc::now())
            .await
            .unwrap();
        assert!(context.groups.is_empty());
        assert_eq!(provider.calls(Operation::GetGroups), 0);

        provider
            .set_group_mode(CM, GroupMode::Separate, groups.clone())
            .unwrap();
        let context = fetch_forum_context(&provider, &forum(ForumType::General), true, Utc::now())
            .await
            .unwrap();
        assert_eq!(context.groups, groups);
    }

    #[tokio::test]
    async fn test_context_fails_on_access_error() {
        let provider = provider(ForumType::General);
        provider.fail(Operation::GetAccessInformation);
        let result =
            fetch_forum_context(&provider, &forum(ForumType::General), false, Utc::now()).await;
        assert!(result.is_err());
        assert_eq!(provider.calls(Operation::CanPinDiscussions), 0);
    }

    #[tokio::test]
    async fn test_offline_discussions_sorted_with_authors() {
        let provider = provider(ForumType::General);
        provider.add_user(UserId::new(7), "Ada Lovelace").unwrap();
        for ts in [100, 300, 200] {
            provider
                .add_offline_discussion(
                    FORUM,
                    OfflineDiscussion::new(ts, format!("T{}", ts)).with_user(UserId::new(7)),
                )
                .unwrap();
        }
        provider
            .add_offline_discussion(
                FORUM,
                OfflineDiscussion::new(250, "Unknown").with_user(UserId::new(8)),
            )
            .unwrap();

        let discussions = fetch_offline_discussions(
            &provider,
            &provider,
            &forum(ForumType::General),
            &ForumContext::default(),
        )
        .await
        .unwrap();

        let times: Vec<i64> = discussions.iter().map(|d| d.time_created).collect();
        assert_eq!(times, vec![300, 250, 200, 100]);
        assert_eq!(discussions[0].author.as_deref(), Some("Ada Lovelace"));
        assert_eq!(discussions[1].author, None);
    }

    #[tokio::test]
    async fn test_offline_discussions_get_group_names() {
        let provider = provider(ForumType::General);
        provider
            .add_offline_discussion(
                FORUM,
                OfflineDiscussion::new(100, "Grouped").with_group(GroupId::new(3)),
            )
            .unwrap();
        let context = ForumContext {
            group_mode: GroupMode::Visible,
            groups: vec![Group {
                id: GroupId::new(3),
                name: "Blue".to_string(),
            }],
            ..Default::default()
        };

        let discussions =
            fetch_offline_discussions(&provider, &provider, &forum(ForumType::Single), &context)
                .await
                .unwrap();
        assert_eq!(discussions[0].group_name.as_deref(), Some("Blue"));
        assert_eq!(provider.calls(Operation::GetUserFullname), 0);
    }

    #[tokio::test]
    async fn test_page_hides_single_forum_root_author_and_adds_offline_replies() {
        let provider = provider(ForumType::Single);
        provider
            .set_discussions(
                FORUM,
                vec![
                    OnlineDiscussion::new(DiscussionId::new(1), PostId::new(10), "Only")
                        .with_author(UserId::new(7), "Ada")
                        .with_counts(2, 0),
                ],
            )
            .unwrap();
        provider.set_offline_replies(DiscussionId::new(1), 3).unwrap();

        let page = fetch_discussion_page(
            &provider,
            &provider,
            &forum(ForumType::Single),
            &ForumContext::default(),
            query(),
        )
        .await
        .unwrap();

        assert!(page.has_offline_replies);
        assert_eq!(page.discussions[0].author, None);
        assert_eq!(page.discussions[0].num_replies, 5);
    }

    #[tokio::test]
    async fn test_page_keeps_authors_in_general_forum() {
        let provider = provider(ForumType::General);
        provider
            .set_discussions(
                FORUM,
                vec![
                    OnlineDiscussion::new(DiscussionId::new(1), PostId::new(10), "A")
                        .with_author(UserId::new(7), "Ada"),
                ],
            )
            .unwrap();

        let page = fetch_discussion_page(
            &provider,
            &provider,
            &forum(ForumType::General),
            &ForumContext::default(),
            query(),
        )
        .await
        .unwrap();
        assert!(!page.has_offline_replies);
        assert_eq!(page.discussions[0].author.as_deref(), Some("Ada"));
        assert_eq!(provider.calls(Operation::CountDiscussionReplies), 0);
    }

    #[test]
    fn test_track_posts_detection() {
        let mut forum = forum(ForumType::General);
        let unread = vec![
            OnlineDiscussion::new(DiscussionId::new(1), PostId::new(10), "A").with_counts(1, 1),
        ];

        assert!(detect_track_posts(&forum, false, &unread));
        assert!(!detect_track_posts(&forum, false, &[]));
        assert!(detect_track_posts(&forum, true, &[]));

        forum.is_tracked = Some(false);
        assert!(!detect_track_posts(&forum, true, &unread));
    }
}
