//! Replay scenarios
//!
//! A scenario describes a forum as the server and the offline queue hold
//! it, plus a list of steps to run against a forum index.

use anyhow::{Context, Result};
use forum::{
    AccessInfo, CourseId, CourseModuleId, DiscussionId, ForumData, ForumEvent, Group, GroupMode,
    InMemoryForumProvider, Layout, OfflineDiscussion, OnlineDiscussion, Operation, UserId,
};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct UserEntry {
    pub id: UserId,
    pub fullname: String,
}

#[derive(Debug, Deserialize)]
pub struct OfflineReplies {
    pub discussion: DiscussionId,
    pub count: u32,
}

/// One action of a scenario
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Load,
    Refresh,
    LoadMore,
    RetryLoadMore,
    SetSortOrder {
        order: i32,
    },
    /// Select the item a route points at
    Select {
        #[serde(default)]
        discussion_id: Option<DiscussionId>,
        #[serde(default)]
        time_created: Option<i64>,
    },
    SelectFirst,
    OpenNewDiscussion,
    /// Enter a route without navigating
    Route {
        #[serde(default)]
        discussion_id: Option<DiscussionId>,
        #[serde(default)]
        time_created: Option<i64>,
    },
    /// Publish an event and let the index process it
    Event {
        event: ForumEvent,
    },
    /// Change server data between steps
    AddDiscussion {
        discussion: OnlineDiscussion,
    },
    RemoveDiscussion {
        id: DiscussionId,
    },
    AddOfflineDiscussion {
        discussion: OfflineDiscussion,
    },
    Fail {
        operation: Operation,
        #[serde(default)]
        times: Option<u32>,
    },
    Recover {
        operation: Operation,
    },
    /// Print the current state
    Show,
}

/// A forum and the steps to replay against it
#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub course_id: CourseId,
    pub cm_id: CourseModuleId,
    /// User the index runs as
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default)]
    pub page_size: Option<usize>,
    pub forum: ForumData,
    #[serde(default)]
    pub access: AccessInfo,
    #[serde(default)]
    pub group_mode: GroupMode,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub can_pin: bool,
    #[serde(default)]
    pub discussions: Vec<OnlineDiscussion>,
    #[serde(default)]
    pub offline_discussions: Vec<OfflineDiscussion>,
    #[serde(default)]
    pub offline_replies: Vec<OfflineReplies>,
    #[serde(default)]
    pub users: Vec<UserEntry>,
    /// Stored sort order preference
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build an in-memory provider holding the scenario's forum
    pub fn provider(&self) -> Result<InMemoryForumProvider> {
        let provider = match self.page_size {
            Some(size) => InMemoryForumProvider::with_page_size(size),
            None => InMemoryForumProvider::new(),
        };

        let forum_id = self.forum.id;
        provider.add_forum(self.forum.clone())?;
        provider.set_access_information(forum_id, self.access.clone())?;
        provider.set_group_mode(self.cm_id, self.group_mode, self.groups.clone())?;
        provider.set_can_pin(forum_id, self.can_pin)?;
        provider.set_discussions(forum_id, self.discussions.clone())?;
        for discussion in &self.offline_discussions {
            provider.add_offline_discussion(forum_id, discussion.clone())?;
        }
        for replies in &self.offline_replies {
            provider.set_offline_replies(replies.discussion, replies.count)?;
        }
        for user in &self.users {
            provider.add_user(user.id, user.fullname.clone())?;
        }
        provider.set_stored_sort_order(self.sort_order)?;

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forum::{ForumProvider, SortOrder};

    const SCENARIO: &str = r#"{
        "course_id": 2,
        "cm_id": 10,
        "layout": "wide",
        "page_size": 2,
        "forum": {"id": 1, "cm_id": 10, "course_id": 2, "name": "News", "forum_type": "news"},
        "discussions": [
            {"id": 10, "discussion": 1, "subject": "Welcome"},
            {"id": 20, "discussion": 2, "subject": "Timetable"},
            {"id": 30, "discussion": 3, "subject": "Exams"}
        ],
        "offline_discussions": [{"time_created": 1700000000, "subject": "Draft"}],
        "sort_order": 3,
        "steps": [
            {"action": "load"},
            {"action": "select", "discussion_id": 2},
            {"action": "event", "event": {"kind": "toggle", "forum_id": 1, "discussion_id": 2, "locked": true}},
            {"action": "fail", "operation": "get_discussions", "times": 1},
            {"action": "show"}
        ]
    }"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        assert_eq!(scenario.layout, Some(Layout::Wide));
        assert_eq!(scenario.discussions.len(), 3);
        assert_eq!(scenario.steps.len(), 5);
        assert!(matches!(
            scenario.steps[3],
            Step::Fail {
                operation: Operation::GetDiscussions,
                times: Some(1)
            }
        ));
    }

    #[test]
    fn test_provider_is_seeded() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        let provider = scenario.provider().unwrap();
        assert_eq!(provider.page_size(), 2);
        assert_eq!(
            provider.stored_sort_order().unwrap(),
            Some(SortOrder::CreatedDesc.value())
        );

        let forum = tokio_test::block_on(provider.get_forum(CourseId::new(2), CourseModuleId::new(10)))
            .unwrap();
        assert_eq!(forum.name, "News");
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let json = SCENARIO.replace("\"show\"", "\"dance\"");
        assert!(Scenario::from_json(&json).is_err());
    }
}
