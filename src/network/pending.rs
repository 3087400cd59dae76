//! Outstanding requests keyed by sequence id.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::error::{BotError, Result};
use crate::protocol::ProtocolMessage;

pub(crate) type Reply = Result<ProtocolMessage>;

/// Map from sequence id to the waiter for its reply.
///
/// Replies may arrive in any order; they are matched by sequence id only.
#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    waiters: Mutex<HashMap<u32, oneshot::Sender<Reply>>>,
}

impl PendingRequests {
    fn lock(&self) -> MutexGuard<'_, HashMap<u32, oneshot::Sender<Reply>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(&self, sequence: u32) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(sequence, tx);
        rx
    }

    /// Complete a waiter. Returns `false` if nobody waits for `sequence`.
    pub(crate) fn resolve(&self, sequence: u32, reply: Reply) -> bool {
        match self.lock().remove(&sequence) {
            Some(tx) => {
                let _ = tx.send(reply);
                true
            },
            None => false,
        }
    }

    pub(crate) fn remove(&self, sequence: u32) {
        self.lock().remove(&sequence);
    }

    /// Fail every waiter, returning how many there were.
    pub(crate) fn fail_all(&self, error: impl Fn() -> BotError) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(error()));
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    #[tokio::test]
    async fn test_resolve_out_of_order() {
        let pending = PendingRequests::default();
        let first = pending.register(1);
        let second = pending.register(2);

        assert!(pending.resolve(2, Ok(ProtocolMessage::Ack)));
        assert!(pending.resolve(1, Ok(ProtocolMessage::HeartbeatAck)));
        assert!(!pending.resolve(3, Ok(ProtocolMessage::Ack)));

        assert_eq!(first.await.unwrap().unwrap(), ProtocolMessage::HeartbeatAck);
        assert_eq!(second.await.unwrap().unwrap(), ProtocolMessage::Ack);
    }

    #[tokio::test]
    async fn test_fail_all() {
        let pending = PendingRequests::default();
        let a = pending.register(1);
        let b = pending.register(2);

        assert_eq!(pending.fail_all(|| BotError::SessionClosed), 2);
        assert_eq!(pending.len(), 0);
        assert!(matches!(a.await.unwrap(), Err(BotError::SessionClosed)));
        assert!(matches!(b.await.unwrap(), Err(BotError::SessionClosed)));
    }

    #[test]
    fn test_waiter_pending_until_resolved() {
        let pending = PendingRequests::default();
        let mut waiter = task::spawn(pending.register(5));
        assert_pending!(waiter.poll());

        pending.remove(5);
        let reply = assert_ready!(waiter.poll());
        assert!(reply.is_err());
        assert_eq!(pending.len(), 0);
    }
}
