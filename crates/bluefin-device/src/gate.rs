//! Write-without-response flow control
//!
//! The host stack accepts one unacknowledged write at a time and signals
//! readiness for the next. The gate serializes callers onto that signal:
//! the head slot is the write in flight, later slots are suspended callers.
//! A wake-up may be wasted (the woken caller re-enters and may queue again);
//! a write is never lost.

use std::collections::VecDeque;

use tokio::sync::oneshot;

enum GateSlot {
    /// The write currently in flight; holds no waker
    InFlight,
    /// A caller waiting for the ready signal
    Waiting(oneshot::Sender<()>),
}

/// Admission decision for one caller
pub(crate) enum GateAdmission {
    /// Gate was empty; emit the write now
    Admitted,
    /// Wait for the ready signal, then re-enter
    Wait(oneshot::Receiver<()>),
}

// ----------------------------------------------------------------------------
// Gate
// ----------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct WriteWithoutResponseGate {
    slots: VecDeque<GateSlot>,
}

impl WriteWithoutResponseGate {
    pub(crate) fn admit(&mut self) -> GateAdmission {
        if self.slots.is_empty() {
            self.slots.push_back(GateSlot::InFlight);
            GateAdmission::Admitted
        } else {
            let (tx, rx) = oneshot::channel();
            self.slots.push_back(GateSlot::Waiting(tx));
            GateAdmission::Wait(rx)
        }
    }

    /// Ready-to-send signal: resume every waiter; the next caller with data
    /// re-enters and admits itself.
    pub(crate) fn ready(&mut self) {
        for slot in self.slots.drain(..) {
            if let GateSlot::Waiting(tx) = slot {
                let _ = tx.send(());
            }
        }
    }

    /// Disconnect cleanup: identical to the ready signal. Unacknowledged
    /// writes have no error channel, so suspended callers resolve with unit.
    pub(crate) fn drain(&mut self) {
        self.ready();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_caller_is_admitted_immediately() {
        let mut gate = WriteWithoutResponseGate::default();
        assert!(matches!(gate.admit(), GateAdmission::Admitted));
        assert!(!gate.is_empty());
    }

    #[test]
    fn later_callers_wait_for_the_ready_signal() {
        let mut gate = WriteWithoutResponseGate::default();
        assert!(matches!(gate.admit(), GateAdmission::Admitted));

        let GateAdmission::Wait(mut second) = gate.admit() else {
            panic!("second caller must wait")
        };
        let GateAdmission::Wait(mut third) = gate.admit() else {
            panic!("third caller must wait")
        };
        assert!(second.try_recv().is_err());

        gate.ready();
        assert!(gate.is_empty());
        assert_eq!(second.try_recv().unwrap(), ());
        assert_eq!(third.try_recv().unwrap(), ());

        // The woken caller re-enters and finds the gate free.
        assert!(matches!(gate.admit(), GateAdmission::Admitted));
    }

    #[test]
    fn drain_resolves_waiters_with_unit() {
        let mut gate = WriteWithoutResponseGate::default();
        assert!(matches!(gate.admit(), GateAdmission::Admitted));
        let GateAdmission::Wait(mut waiter) = gate.admit() else {
            panic!("expected waiter")
        };

        gate.drain();
        assert!(gate.is_empty());
        assert_eq!(waiter.try_recv().unwrap(), ());
    }
}
