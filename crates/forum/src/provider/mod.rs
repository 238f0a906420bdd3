//! Provider traits and implementations
//!
//! The forum index reads remote data, the offline queue and preferences
//! through traits. In-memory implementations back tests and the replay app.

mod memory;
mod traits;

pub use memory::{DEFAULT_PAGE_SIZE, InMemoryForumProvider, Operation, RecordingNavigator};
pub use traits::{
    DiscussionPage, DiscussionQuery, ForumProvider, Navigator, OfflineStore, PreferenceStore,
};
