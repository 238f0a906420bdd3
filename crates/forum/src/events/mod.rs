//! Domain events that change the discussion list, and the bus delivering
//! them to open forum views

mod bus;
mod types;

pub use bus::{EventBus, Subscription, SubscriptionError};
pub use types::{
    DeletedEvent, EventFilter, EventKind, EventTarget, ForumEvent, INDEX_SYNC_SOURCE,
    NewDiscussionEvent, PostRef, ReplyEvent, SyncKind, SyncedEvent, ToggleEvent,
};
