//! In-process change feed.
//!
//! Every subscription owns an unbounded channel, so a publisher never waits on
//! a slow reader. Messages handed over together through
//! [`InMemoryEventBus::publish_all`] reach each subscriber back to back; a
//! concurrent publisher cannot wedge its own messages in between.

use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InMemoryBusError {
    #[error("subscriber list poisoned by a panicking publisher")]
    Poisoned,
}

#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    senders: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<M: Clone> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `messages` in order to every live subscription.
    ///
    /// Returns how many subscriptions received them. Subscriptions whose
    /// receiver was dropped are forgotten on the way.
    pub fn publish_all(&self, messages: impl IntoIterator<Item = M>) -> Result<usize, InMemoryBusError> {
        let messages: Vec<M> = messages.into_iter().collect();
        let mut senders = self.senders.lock().map_err(|_| InMemoryBusError::Poisoned)?;
        if messages.is_empty() {
            return Ok(senders.len());
        }

        let attached = senders.len();
        senders.retain(|tx| messages.iter().all(|m| tx.send(m.clone()).is_ok()));
        if senders.len() < attached {
            tracing::debug!(dropped = attached - senders.len(), "change feed pruned closed subscriptions");
        }
        Ok(senders.len())
    }

    /// Subscriptions still attached as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        self.publish_all([message]).map(|_| ())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        // Poisoned list: the subscription stays silent.
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
        }
        Subscription::new(rx)
    }
}
