//! Fetch orchestration
//!
//! Loads forum metadata, per-user context, the offline queue and pages of
//! online discussions through the provider traits.

mod stages;

pub use stages::{
    FetchedPage, ForumContext, ForumMetadata, detect_track_posts, fetch_discussion_page,
    fetch_forum_context, fetch_metadata, fetch_offline_discussions,
};
