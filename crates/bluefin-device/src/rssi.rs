//! RSSI read coalescing
//!
//! Concurrent RSSI reads piggy-back on a single in-flight sample: the first
//! caller issues the wire read, later callers attach to its completion.

use tokio::sync::oneshot;

use bluefin_core::errors::{BluefinError, Result};

pub(crate) type RssiWaiter = oneshot::Sender<Result<i16>>;

// ----------------------------------------------------------------------------
// Queue
// ----------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct RssiReadQueue {
    pending: Vec<RssiWaiter>,
}

impl RssiReadQueue {
    /// Attach a waiter; returns `true` when the caller owns the in-flight
    /// sample and must issue the wire read.
    pub(crate) fn enqueue(&mut self, waiter: RssiWaiter) -> bool {
        self.pending.push(waiter);
        self.pending.len() == 1
    }

    /// Resolve every waiter with the same sample or error
    pub(crate) fn complete(&mut self, result: Result<i16>) {
        for waiter in self.pending.drain(..) {
            let _ = waiter.send(result.clone());
        }
    }

    /// Disconnect cleanup: fail every waiter with NotPresent
    pub(crate) fn drain(&mut self) {
        self.complete(Err(BluefinError::device_not_present()));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_first_caller_issues_the_read() {
        let mut queue = RssiReadQueue::default();
        let (tx1, mut rx1) = oneshot::channel();
        let (tx2, mut rx2) = oneshot::channel();

        assert!(queue.enqueue(tx1));
        assert!(!queue.enqueue(tx2));

        queue.complete(Ok(-42));
        assert!(queue.is_empty());
        assert_eq!(rx1.try_recv().unwrap(), Ok(-42));
        assert_eq!(rx2.try_recv().unwrap(), Ok(-42));
    }

    #[test]
    fn drain_fails_every_waiter() {
        let mut queue = RssiReadQueue::default();
        let (tx, mut rx) = oneshot::channel();
        assert!(queue.enqueue(tx));

        queue.drain();
        assert_eq!(
            rx.try_recv().unwrap(),
            Err(BluefinError::device_not_present())
        );
        assert!(queue.is_empty());
    }
}
