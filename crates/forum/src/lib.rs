//! Forum crate - Discussion list logic of the forum index
//!
//! This crate provides the platform-independent core of a forum index view:
//! - Domain models (OnlineDiscussion, OfflineDiscussion, ForumData)
//! - Merged discussion list with paging
//! - Selection state and discussion paths for master/detail navigation
//! - Event bus and reconciliation of domain events into the list
//! - Provider traits for the server, offline queue and preferences
//! - Fetch orchestration and the `ForumIndex` session tying it together
//!
//! This crate has zero UI dependencies. Rendering and navigation are left to
//! the host through the `Navigator` trait.

pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod list;
pub mod models;
pub mod provider;
pub mod reconcile;
pub mod selection;
pub mod session;

pub use config::{ForumSettings, Layout};
pub use error::{ForumError, ForumResult};
pub use events::{
    DeletedEvent, EventBus, EventFilter, EventKind, EventTarget, ForumEvent, INDEX_SYNC_SOURCE,
    NewDiscussionEvent, PostRef, ReplyEvent, Subscription, SubscriptionError, SyncKind,
    SyncedEvent, ToggleEvent,
};
pub use fetch::{FetchedPage, ForumContext, ForumMetadata};
pub use list::{DiscussionList, LoadMoreRejection, PageMode, PageRequest, Pagination};
pub use models::{
    AccessInfo, CourseId, CourseModuleId, DiscussionId, DiscussionItem, ForumData, ForumId,
    ForumType, Group, GroupId, GroupMode, ItemKey, ItemKind, NEW_DISCUSSION_TIME,
    OfflineDiscussion, OnlineDiscussion, PostId, SortOrder, UserId, classify_value,
};
pub use provider::{
    DiscussionPage, DiscussionQuery, ForumProvider, InMemoryForumProvider, Navigator,
    OfflineStore, Operation, PreferenceStore, RecordingNavigator,
};
pub use reconcile::{
    PendingSelection, ReconcileContext, ReconcileError, ReconcileOutcome, RefreshKind,
    SelectionDirective, reconcile,
};
pub use selection::{NavigationParams, NavigationRequest, PathResolver, RouteParams, Selection};
pub use session::{ForumIndex, ListStatus, LoadMoreOutcome, ProcessedEvents, Providers};
