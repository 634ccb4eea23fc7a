//! Live listening on store changes.
//!
//! Screens subscribe to the collections they render and re-run their query
//! when a change arrives, instead of polling.

use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use tastemark_events::{ChangeEvent, Subscription};

/// A change-feed subscription narrowed to a set of collections.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct LiveQuery {
    subscription: Subscription<ChangeEvent>,
    collections: Vec<String>,
}

impl LiveQuery {
    pub fn new(subscription: Subscription<ChangeEvent>, collections: &[&str]) -> Self {
        Self {
            subscription,
            collections: collections.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn wants(&self, change: &ChangeEvent) -> bool {
        self.collections.iter().any(|c| change.touches(c))
    }

    /// Wait up to `timeout` for the next relevant change.
    ///
    /// Returns `None` on timeout or once the store has gone away.
    pub fn next_change(&self, timeout: Duration) -> Option<ChangeEvent> {
        loop {
            match self.subscription.recv_timeout(timeout) {
                Ok(change) if self.wants(&change) => return Some(change),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Relevant changes already delivered, without blocking.
    pub fn pending_changes(&self) -> Vec<ChangeEvent> {
        self.subscription
            .drain()
            .into_iter()
            .filter(|c| self.wants(c))
            .collect()
    }
}
