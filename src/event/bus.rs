//! Per-bot event dispatch.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::BotEvent;

/// Synchronous event handler.
///
/// Runs in the publishing task; a handler that needs to await should use
/// [`EventBus::subscribe_channel`] instead.
pub type EventHandler = Arc<dyn Fn(&BotEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone)]
enum Subscriber {
    Handler(EventHandler),
    Channel(mpsc::UnboundedSender<BotEvent>),
}

/// Token returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventStats {
    /// Events delivered to subscribers
    pub delivered: u64,
    /// Events suppressed because nothing changed
    pub suppressed: u64,
    /// Handler invocations that returned an error or panicked
    pub handler_failures: u64,
}

/// Ordered, failure-isolated subscriber list.
///
/// `broadcast` invokes a snapshot of the subscriber list in subscription
/// order; the registration lock is released before any handler runs, so a
/// handler may subscribe or unsubscribe without deadlocking. A failing or
/// panicking handler is logged and skipped; the rest still run.
pub struct EventBus {
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber)>>,
    next_id: AtomicU64,
    delivered: AtomicU64,
    suppressed: AtomicU64,
    failures: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            delivered: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Register a handler; it receives every event published after this call.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&BotEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(Subscriber::Handler(Arc::new(handler)))
    }

    /// Receive events on an unbounded channel instead of a callback.
    ///
    /// Events keep queueing until the receiver is dropped; the first
    /// broadcast after that removes the subscription.
    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<BotEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.register(Subscriber::Channel(tx)), rx)
    }

    fn register(&self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, subscriber));
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Number of registered handlers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delivery counters
    pub fn stats(&self) -> EventStats {
        EventStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            handler_failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Deliver `event` to every subscriber.
    ///
    /// Returns `false` without invoking anyone when the event reports that
    /// it should not be broadcast.
    pub fn broadcast(&self, event: &BotEvent) -> bool {
        if !event.should_broadcast() {
            trace!(event = event.name(), "Event suppressed, value unchanged");
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let snapshot: Vec<(SubscriptionId, Subscriber)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        trace!(
            event = event.name(),
            subscribers = snapshot.len(),
            "Broadcasting event"
        );

        let mut disconnected = Vec::new();
        for (id, subscriber) in snapshot {
            let handler = match subscriber {
                Subscriber::Handler(handler) => handler,
                Subscriber::Channel(tx) => {
                    if tx.send(event.clone()).is_err() {
                        disconnected.push(id);
                    }
                    continue;
                },
            };
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {},
                Ok(Err(e)) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        event = event.name(),
                        subscription = id.0,
                        error = %e,
                        "Event handler failed"
                    );
                },
                Err(panic) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        event = event.name(),
                        subscription = id.0,
                        panic = panic_message(&*panic),
                        "Event handler panicked"
                    );
                },
            }
        }

        if !disconnected.is_empty() {
            debug!(
                count = disconnected.len(),
                "Removing channel subscriptions with dropped receivers"
            );
            self.subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| !disconnected.contains(id));
        }

        self.delivered.fetch_add(1, Ordering::Relaxed);
        true
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{BotOfflineEvent, BotOnlineEvent};
    use std::sync::Mutex;

    fn online() -> BotEvent {
        BotEvent::Online(BotOnlineEvent { bot_uin: 1 })
    }

    #[test]
    fn test_subscription_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |_| {
                seen.lock().unwrap().push(i);
                Ok(())
            });
        }

        assert!(bus.broadcast(&online()));
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_failing_handlers_are_isolated() {
        let bus = EventBus::new();
        let reached = Arc::new(Mutex::new(0));

        bus.subscribe(|_| anyhow::bail!("handler error"));
        bus.subscribe(|_| panic!("handler panic"));
        let r = Arc::clone(&reached);
        bus.subscribe(move |_| {
            *r.lock().unwrap() += 1;
            Ok(())
        });

        bus.broadcast(&online());
        assert_eq!(*reached.lock().unwrap(), 1);
        assert_eq!(bus.stats().handler_failures, 2);
        assert_eq!(bus.stats().delivered, 1);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        let c = Arc::clone(&count);
        let id = bus.subscribe(move |_| {
            *c.lock().unwrap() += 1;
            Ok(())
        });

        bus.broadcast(&online());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.broadcast(&online());
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_handler_may_subscribe_during_dispatch() {
        let bus = Arc::new(EventBus::new());
        let inner = Arc::clone(&bus);
        bus.subscribe(move |_| {
            inner.subscribe(|_| Ok(()));
            Ok(())
        });

        bus.broadcast(&online());
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_channel_subscription() {
        let bus = EventBus::new();
        let (_id, mut rx) = bus.subscribe_channel();

        bus.broadcast(&BotEvent::Offline(BotOfflineEvent::Dropped {
            bot_uin: 1,
            cause: "eof".into(),
        }));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "BotOffline.Dropped");
    }

    #[test]
    fn test_dropped_channel_is_unsubscribed() {
        let bus = EventBus::new();
        let (kept, _rx) = bus.subscribe_channel();
        let (gone, rx) = bus.subscribe_channel();
        assert_eq!(bus.subscriber_count(), 2);

        drop(rx);
        assert!(bus.broadcast(&online()));
        assert_eq!(bus.subscriber_count(), 1);
        assert!(!bus.unsubscribe(gone));
        assert!(bus.unsubscribe(kept));
    }
}
