//! Selection state and path mapping for master/detail navigation

mod path;
mod state;

pub use path::{PathResolver, RouteParams};
pub use state::{NavigationParams, NavigationRequest, Selection};
