//! EventBroadcaster
//!
//! Fans events out to every subscriber channel. Sends never wait: a
//! subscriber whose queue is full misses that event, a subscriber whose
//! receiver is gone is dropped from the set.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::metrics::Counters;
use crate::types::Event;

/// Receiving half handed to a subscriber.
#[derive(Debug)]
pub struct Subscription {
    pub id: Uuid,
    pub rx: Receiver<Event>,
}

#[derive(Clone, Default)]
pub struct EventBroadcaster {
    subscribers: Arc<Mutex<HashMap<Uuid, Sender<Event>>>>,
    counters: Counters,
}

impl EventBroadcaster {
    pub fn new(counters: Counters) -> Self {
        Self {
            subscribers: Arc::default(),
            counters,
        }
    }

    /// Registers a subscriber with a bounded queue of `capacity` events.
    pub fn subscribe(&self, capacity: usize) -> Subscription {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = Uuid::new_v4();

        let total = {
            let mut subs = self.subscribers.lock();
            subs.insert(id, tx);
            subs.len()
        };
        info!(subscriber = %id, total, "subscriber added");

        Subscription { id, rx }
    }

    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let removed = self.subscribers.lock().remove(&id).is_some();
        if removed {
            info!(subscriber = %id, "subscriber removed");
        }
        removed
    }

    /// Delivers `event` to every subscriber; returns how many received it.
    pub fn publish(&self, event: &Event) -> usize {
        let mut subs = self.subscribers.lock();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, tx) in subs.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        subscriber = %id,
                        event = event.name(),
                        "subscriber queue full; event skipped"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            subs.remove(&id);
            Counters::incr(&self.counters.subscribers_dropped);
            info!(subscriber = %id, "subscriber disconnected; dropped");
        }

        debug!(event = event.name(), delivered, "event published");
        delivered
    }

    /// Delivers `event` to a single subscriber.
    pub fn send_to(&self, id: Uuid, event: Event) -> bool {
        let mut subs = self.subscribers.lock();
        let Some(tx) = subs.get(&id) else {
            return false;
        };

        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Closed(_)) => {
                subs.remove(&id);
                Counters::incr(&self.counters.subscribers_dropped);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Heartbeat;
    use tracing_test::traced_test;

    fn ping(t: u64) -> Event {
        Event::Heartbeat(Heartbeat {
            t,
            next_allowed_at: 0,
            connected: true,
        })
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_event() {
        let b = EventBroadcaster::default();
        let mut s1 = b.subscribe(8);
        let mut s2 = b.subscribe(8);

        assert_eq!(b.publish(&ping(1)), 2);

        assert_eq!(s1.rx.recv().await, Some(ping(1)));
        assert_eq!(s2.rx.recv().await, Some(ping(1)));
    }

    #[tokio::test]
    async fn full_subscriber_does_not_block_others() {
        let b = EventBroadcaster::default();
        let slow = b.subscribe(1);
        let mut fast = b.subscribe(8);

        assert_eq!(b.publish(&ping(1)), 2);
        assert_eq!(b.publish(&ping(2)), 1);

        assert_eq!(fast.rx.recv().await, Some(ping(1)));
        assert_eq!(fast.rx.recv().await, Some(ping(2)));
        assert_eq!(b.len(), 2);
        drop(slow);
    }

    #[traced_test]
    #[tokio::test]
    async fn closed_subscriber_is_dropped() {
        let counters = Counters::default();
        let b = EventBroadcaster::new(counters.clone());
        let gone = b.subscribe(8);
        let mut alive = b.subscribe(8);
        drop(gone);

        assert_eq!(b.publish(&ping(1)), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(counters.snapshot().subscribers_dropped, 1);
        assert_eq!(alive.rx.recv().await, Some(ping(1)));

        assert!(logs_contain("subscriber disconnected; dropped"));
    }

    #[tokio::test]
    async fn send_to_targets_one_subscriber() {
        let b = EventBroadcaster::default();
        let mut a = b.subscribe(8);
        let mut other = b.subscribe(8);

        assert!(b.send_to(a.id, ping(3)));
        assert!(!b.send_to(Uuid::new_v4(), ping(3)));

        assert_eq!(a.rx.recv().await, Some(ping(3)));
        assert!(other.rx.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_removes_the_channel() {
        let b = EventBroadcaster::default();
        let s = b.subscribe(8);

        assert!(b.unsubscribe(s.id));
        assert!(!b.unsubscribe(s.id));
        assert!(b.is_empty());
        assert_eq!(b.publish(&ping(1)), 0);
    }
}
