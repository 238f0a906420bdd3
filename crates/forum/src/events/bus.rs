//! Broadcast event bus with scoped subscriptions

use log::debug;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::types::{EventFilter, ForumEvent};

/// Size of the broadcast buffer. Subscribers falling further behind lose
/// events and get [`SubscriptionError::Lagged`].
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Subscriber fell behind and missed {skipped} events")]
    Lagged { skipped: u64 },
    #[error("Event bus closed")]
    Closed,
}

/// Event bus shared by everything that emits forum events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<ForumEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    /// Publish an event to every live subscription.
    ///
    /// Returns the number of subscriptions it was delivered to.
    pub fn publish(&self, event: ForumEvent) -> usize {
        let kind = event.kind();
        match self.sender.send(Arc::new(event)) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No subscribers for {:?} event", kind);
                0
            }
        }
    }

    /// Register a listener. The listener lives as long as the returned
    /// handle.
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a bus listener. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<Arc<ForumEvent>>,
    filter: EventFilter,
}

impl Subscription {
    pub fn filter(&self) -> EventFilter {
        self.filter
    }

    /// Next queued event matching the filter, or `None` when drained
    pub fn try_next(&mut self) -> Result<Option<Arc<ForumEvent>>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(event.kind()) => return Ok(Some(event)),
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(skipped)) => {
                    return Err(SubscriptionError::Lagged { skipped });
                }
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Wait for the next event matching the filter
    pub async fn next(&mut self) -> Result<Arc<ForumEvent>, SubscriptionError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(event.kind()) => return Ok(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    return Err(SubscriptionError::Lagged { skipped });
                }
                Err(RecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }
}
