//! Event reconciler implementation

use log::{debug, info};

use crate::config::Layout;
use crate::events::{DeletedEvent, ForumEvent, NewDiscussionEvent, SyncedEvent, ToggleEvent};
use crate::list::DiscussionList;
use crate::models::{CourseModuleId, DiscussionId, DiscussionItem, ForumId, ItemKey, UserId};

/// How much of the view must be refreshed after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum RefreshKind {
    #[default]
    None,
    /// Re-render from the patched list, no fetch
    Lightweight,
    /// Invalidate and refetch everything
    Full,
}

/// Item to open once the refresh triggered by a new discussion lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    pub time_created: Option<i64>,
    pub discussion_ids: Vec<DiscussionId>,
}

impl PendingSelection {
    /// Item matching the created discussion, else the first item of the list
    pub fn resolve(&self, list: &DiscussionList) -> Option<ItemKey> {
        let matching = list.items().iter().find(|item| match item {
            DiscussionItem::Offline(d) => self.time_created == Some(d.time_created),
            DiscussionItem::Online(d) => self.discussion_ids.contains(&d.discussion),
            DiscussionItem::NewDiscussion => false,
        });
        matching.or_else(|| list.first()).map(DiscussionItem::key)
    }
}

/// Selection change requested by an event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionDirective {
    #[default]
    Keep,
    /// Select the first item now
    SelectFirst,
    /// Select a matching item after the refresh completes
    AfterRefresh(PendingSelection),
}

/// Result of reconciling one event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    pub refresh: RefreshKind,
    pub selection: SelectionDirective,
}

impl ReconcileOutcome {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn full_refresh() -> Self {
        Self {
            refresh: RefreshKind::Full,
            selection: SelectionDirective::Keep,
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.refresh == RefreshKind::None && self.selection == SelectionDirective::Keep
    }
}

/// State of the view an event is reconciled against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileContext {
    /// Loaded forum, `None` until the metadata fetch succeeded
    pub forum_id: Option<ForumId>,
    pub cm_id: CourseModuleId,
    pub layout: Layout,
    /// User of the session, syncs of other users are ignored
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("Toggle event without a discussion id")]
    MissingDiscussionId,
    #[error("Toggle event for discussion {0} carries no flags")]
    EmptyToggle(DiscussionId),
    #[error("Deletion event without a post")]
    MissingPost,
}

/// Apply `event` to `list`.
///
/// Events addressed to another forum are ignored. Errors mean the payload
/// could not be applied. Callers should then fall back to a full refresh.
pub fn reconcile(
    list: &mut DiscussionList,
    event: &ForumEvent,
    context: &ReconcileContext,
) -> Result<ReconcileOutcome, ReconcileError> {
    if !event.target().matches(context.forum_id, context.cm_id) {
        debug!("Ignoring {:?} event for another forum", event.kind());
        return Ok(ReconcileOutcome::ignored());
    }

    match event {
        ForumEvent::Toggle(toggle) => apply_toggle(list, toggle),
        ForumEvent::Deleted(deleted) => apply_deletion(list, deleted, context),
        ForumEvent::NewDiscussion(created) => Ok(apply_new_discussion(created, context)),
        ForumEvent::Reply(_) => Ok(ReconcileOutcome::full_refresh()),
        ForumEvent::Synced(synced) => Ok(apply_sync(synced, context)),
    }
}

fn apply_sync(synced: &SyncedEvent, context: &ReconcileContext) -> ReconcileOutcome {
    if synced.is_from_index() {
        debug!("Ignoring {:?} sync started by the index", synced.sync_kind);
        return ReconcileOutcome::ignored();
    }
    if let (Some(event_user), Some(user)) = (synced.user_id, context.user_id)
        && event_user != user
    {
        debug!("Ignoring {:?} sync of user {}", synced.sync_kind, event_user);
        return ReconcileOutcome::ignored();
    }
    ReconcileOutcome::full_refresh()
}

fn apply_toggle(
    list: &mut DiscussionList,
    toggle: &ToggleEvent,
) -> Result<ReconcileOutcome, ReconcileError> {
    let id = toggle.discussion_id.ok_or(ReconcileError::MissingDiscussionId)?;
    if toggle.locked.is_none() && toggle.pinned.is_none() && toggle.starred.is_none() {
        return Err(ReconcileError::EmptyToggle(id));
    }

    let patched = list.patch_online(id, |discussion| {
        if let Some(locked) = toggle.locked {
            discussion.locked = locked;
        }
        if let Some(pinned) = toggle.pinned {
            discussion.pinned = pinned;
        }
        if let Some(starred) = toggle.starred {
            discussion.starred = starred;
        }
    });

    if patched {
        debug!("Patched flags of discussion {}", id);
        Ok(ReconcileOutcome {
            refresh: RefreshKind::Lightweight,
            selection: SelectionDirective::Keep,
        })
    } else {
        // Not on a loaded page
        Ok(ReconcileOutcome::ignored())
    }
}

fn apply_deletion(
    list: &mut DiscussionList,
    deleted: &DeletedEvent,
    context: &ReconcileContext,
) -> Result<ReconcileOutcome, ReconcileError> {
    let post = deleted.post.ok_or(ReconcileError::MissingPost)?;

    let mut selection = SelectionDirective::Keep;
    if post.is_root() {
        if let Some(id) = deleted.discussion_id
            && list.remove_online(id).is_some()
        {
            info!("Removed deleted discussion {}", id);
        }
        if context.layout.is_wide() && !list.is_empty() {
            selection = SelectionDirective::SelectFirst;
        }
    }

    Ok(ReconcileOutcome {
        refresh: RefreshKind::Full,
        selection,
    })
}

fn apply_new_discussion(
    created: &NewDiscussionEvent,
    context: &ReconcileContext,
) -> ReconcileOutcome {
    let selection = if created.from_current_session && context.layout.is_wide() {
        SelectionDirective::AfterRefresh(PendingSelection {
            time_created: created.time_created,
            discussion_ids: created.discussion_ids.clone(),
        })
    } else {
        SelectionDirective::Keep
    };

    ReconcileOutcome {
        refresh: RefreshKind::Full,
        selection,
    }
}
