//! Unified discussion list and online page tracking
//!
//! The list is the only owner of discussion items. Callers replace or patch
//! the online and offline subsets through its write API and read it as a
//! slice.

mod merger;
mod pagination;

pub use merger::DiscussionList;
pub use pagination::{LoadMoreRejection, PageMode, PageRequest, Pagination};
