//! Per-characteristic request coordination
//!
//! The access table enforces the GATT client discipline: at most one
//! read or write-with-response in flight per characteristic, concurrent
//! reads coalesced onto a single wire read, and no interleaving of reads
//! and writes on the same characteristic. It is a pure state machine; the
//! coordinator issues wire operations based on the decisions returned here
//! and feeds completions back in.

use std::collections::HashMap;

use smallvec::SmallVec;
use tokio::sync::oneshot;
use tracing::debug;

use bluefin_core::errors::{BluefinError, Result};
use bluefin_core::CharacteristicLocator;

pub(crate) type ReadWaiter = oneshot::Sender<Result<Vec<u8>>>;
pub(crate) type WriteCompleter = oneshot::Sender<Result<()>>;
pub(crate) type QueuedResumer = oneshot::Sender<()>;

// ----------------------------------------------------------------------------
// Access Entries
// ----------------------------------------------------------------------------

/// In-flight request bookkeeping for one characteristic
enum AccessEntry {
    /// A read is in flight; additional readers coalesce onto `waiters`,
    /// writers wait in `queued`.
    Read {
        waiters: SmallVec<[ReadWaiter; 2]>,
        queued: Vec<QueuedResumer>,
    },
    /// A write is in flight; readers and further writers wait in `queued`.
    Write {
        completer: WriteCompleter,
        queued: Vec<QueuedResumer>,
    },
}

/// Decision for a read request
pub(crate) enum ReadBegin {
    /// Coalesced onto the in-flight read; no wire operation is issued
    Joined(oneshot::Receiver<Result<Vec<u8>>>),
    /// A fresh entry was installed; the caller issues the wire read
    Issue(oneshot::Receiver<Result<Vec<u8>>>),
    /// A write holds the characteristic; wait, then re-enter
    Queued(oneshot::Receiver<()>),
}

/// Decision for a write request
pub(crate) enum WriteBegin {
    /// A fresh entry was installed; the caller issues the wire write
    Issue(oneshot::Receiver<Result<()>>),
    /// The characteristic is busy; wait, then re-enter
    Queued(oneshot::Receiver<()>),
}

// ----------------------------------------------------------------------------
// Access Table
// ----------------------------------------------------------------------------

/// In-flight request table for all characteristics of one peripheral
#[derive(Default)]
pub(crate) struct AccessTable {
    entries: HashMap<CharacteristicLocator, AccessEntry>,
}

impl AccessTable {
    /// Begin a read of `locator`, per the coalescing discipline
    pub(crate) fn begin_read(&mut self, locator: CharacteristicLocator) -> ReadBegin {
        let (tx, rx) = oneshot::channel();
        match self.entries.get_mut(&locator) {
            Some(AccessEntry::Read { waiters, .. }) => {
                waiters.push(tx);
                ReadBegin::Joined(rx)
            }
            Some(AccessEntry::Write { queued, .. }) => {
                let (wake_tx, wake_rx) = oneshot::channel();
                queued.push(wake_tx);
                ReadBegin::Queued(wake_rx)
            }
            None => {
                self.entries.insert(
                    locator,
                    AccessEntry::Read {
                        waiters: SmallVec::from_iter([tx]),
                        queued: Vec::new(),
                    },
                );
                ReadBegin::Issue(rx)
            }
        }
    }

    /// Begin a write of `locator`; writes never coalesce
    pub(crate) fn begin_write(&mut self, locator: CharacteristicLocator) -> WriteBegin {
        match self.entries.get_mut(&locator) {
            Some(AccessEntry::Read { queued, .. }) | Some(AccessEntry::Write { queued, .. }) => {
                let (wake_tx, wake_rx) = oneshot::channel();
                queued.push(wake_tx);
                WriteBegin::Queued(wake_rx)
            }
            None => {
                let (tx, rx) = oneshot::channel();
                self.entries.insert(
                    locator,
                    AccessEntry::Write {
                        completer: tx,
                        queued: Vec::new(),
                    },
                );
                WriteBegin::Issue(rx)
            }
        }
    }

    /// Route a value-update callback to an in-flight read.
    ///
    /// Returns `false` when no read entry matches; the callback is then an
    /// unsolicited notification. A value update never drains a write entry:
    /// ATT does not deliver read responses without an outstanding read.
    pub(crate) fn complete_read(
        &mut self,
        locator: CharacteristicLocator,
        result: Result<Vec<u8>>,
    ) -> bool {
        if !matches!(self.entries.get(&locator), Some(AccessEntry::Read { .. })) {
            return false;
        }
        if let Some(AccessEntry::Read { waiters, queued }) = self.entries.remove(&locator) {
            // All coalesced waiters resolve before any queued resumer runs.
            resolve_waiters(waiters, result);
            wake_queued(queued);
        }
        true
    }

    /// Route a write-completion callback to the in-flight write.
    ///
    /// Returns `false` when no write entry matches; the caller logs and
    /// discards the callback.
    pub(crate) fn complete_write(
        &mut self,
        locator: CharacteristicLocator,
        result: Result<()>,
    ) -> bool {
        if !matches!(self.entries.get(&locator), Some(AccessEntry::Write { .. })) {
            return false;
        }
        if let Some(AccessEntry::Write { completer, queued }) = self.entries.remove(&locator) {
            let _ = completer.send(result);
            wake_queued(queued);
        }
        true
    }

    /// Disconnect cleanup: fail every waiter with NotPresent and wake every
    /// queued resumer, leaving the table empty.
    pub(crate) fn drain(&mut self) {
        let drained = self.entries.len();
        for (locator, entry) in self.entries.drain() {
            match entry {
                AccessEntry::Read { waiters, queued } => {
                    resolve_waiters(waiters, Err(BluefinError::not_present_at(locator)));
                    wake_queued(queued);
                }
                AccessEntry::Write { completer, queued } => {
                    let _ = completer.send(Err(BluefinError::not_present_at(locator)));
                    wake_queued(queued);
                }
            }
        }
        if drained > 0 {
            debug!(entries = drained, "drained access table");
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn resolve_waiters(waiters: SmallVec<[ReadWaiter; 2]>, result: Result<Vec<u8>>) {
    let mut waiters = waiters.into_iter();
    let last = waiters.next_back();
    for waiter in waiters {
        let _ = waiter.send(result.clone());
    }
    if let Some(waiter) = last {
        let _ = waiter.send(result);
    }
}

/// Resumers wake in insertion order
fn wake_queued(queued: Vec<QueuedResumer>) {
    for resumer in queued {
        let _ = resumer.send(());
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn locator() -> CharacteristicLocator {
        CharacteristicLocator::new(Uuid::from_u128(1), Uuid::from_u128(2))
    }

    #[test]
    fn concurrent_reads_coalesce_onto_one_wire_read() {
        let mut table = AccessTable::default();
        let c = locator();

        let ReadBegin::Issue(mut first_rx) = table.begin_read(c) else {
            panic!("fresh table must install")
        };

        let mut joined = Vec::new();
        for _ in 0..3 {
            match table.begin_read(c) {
                ReadBegin::Joined(rx) => joined.push(rx),
                _ => panic!("expected coalesced read"),
            }
        }

        assert!(table.complete_read(c, Ok(b"AB".to_vec())));
        assert_eq!(first_rx.try_recv().unwrap(), Ok(b"AB".to_vec()));
        for mut rx in joined {
            assert_eq!(rx.try_recv().unwrap(), Ok(b"AB".to_vec()));
        }
        assert!(table.is_empty());
    }

    #[test]
    fn read_waits_behind_write() {
        let mut table = AccessTable::default();
        let c = locator();

        let WriteBegin::Issue(mut write_rx) = table.begin_write(c) else {
            panic!("expected write install")
        };
        let ReadBegin::Queued(mut wake_rx) = table.begin_read(c) else {
            panic!("read must queue behind write")
        };
        assert!(wake_rx.try_recv().is_err());

        assert!(table.complete_write(c, Ok(())));
        assert_eq!(write_rx.try_recv().unwrap(), Ok(()));
        assert_eq!(wake_rx.try_recv().unwrap(), ());
        // The woken reader re-enters and finds the slot free.
        assert!(matches!(table.begin_read(c), ReadBegin::Issue(_)));
    }

    #[test]
    fn writes_serialize_behind_reads_and_writes() {
        let mut table = AccessTable::default();
        let c = locator();

        let ReadBegin::Issue(_read_rx) = table.begin_read(c) else {
            panic!("expected read install")
        };
        assert!(matches!(table.begin_write(c), WriteBegin::Queued(_)));

        assert!(table.complete_read(c, Ok(Vec::new())));
        let WriteBegin::Issue(_w) = table.begin_write(c) else {
            panic!("slot should be free after read completes")
        };
        assert!(matches!(table.begin_write(c), WriteBegin::Queued(_)));
    }

    #[test]
    fn value_update_never_drains_a_write_entry() {
        let mut table = AccessTable::default();
        let c = locator();

        let WriteBegin::Issue(mut write_rx) = table.begin_write(c) else {
            panic!("expected write install")
        };
        // An unsolicited notification arrives while the write is pending.
        assert!(!table.complete_read(c, Ok(b"notify".to_vec())));
        assert!(write_rx.try_recv().is_err());
        assert!(!table.is_empty());
    }

    #[test]
    fn unmatched_completions_are_reported() {
        let mut table = AccessTable::default();
        let c = locator();
        assert!(!table.complete_read(c, Ok(Vec::new())));
        assert!(!table.complete_write(c, Ok(())));
    }

    #[test]
    fn drain_fails_waiters_and_wakes_queued() {
        let mut table = AccessTable::default();
        let c = locator();

        let ReadBegin::Issue(mut read_rx) = table.begin_read(c) else {
            panic!("expected read install")
        };
        let WriteBegin::Queued(mut wake_rx) = table.begin_write(c) else {
            panic!("expected queued write")
        };

        table.drain();
        assert!(table.is_empty());
        assert_eq!(
            read_rx.try_recv().unwrap(),
            Err(BluefinError::not_present_at(c))
        );
        // Queued resumers are woken without an error; they retry and find
        // the table empty.
        assert_eq!(wake_rx.try_recv().unwrap(), ());
    }

    // ------------------------------------------------------------------
    // Property tests
    // ------------------------------------------------------------------

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Mode {
        Read,
        Write,
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Read,
        Write,
        Complete,
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Read), Just(Op::Write), Just(Op::Complete)]
    }

    proptest! {
        /// For any arrival order, at most one operation is in flight per
        /// characteristic and modes never interleave.
        #[test]
        fn one_in_flight_and_no_mode_interleave(ops in prop::collection::vec(arb_op(), 1..48)) {
            let mut table = AccessTable::default();
            let c = locator();
            let mut in_flight: Option<Mode> = None;

            for op in ops {
                match op {
                    Op::Read => match table.begin_read(c) {
                        ReadBegin::Issue(_) => {
                            prop_assert!(in_flight.is_none());
                            in_flight = Some(Mode::Read);
                        }
                        ReadBegin::Joined(_) => prop_assert_eq!(in_flight, Some(Mode::Read)),
                        ReadBegin::Queued(_) => prop_assert_eq!(in_flight, Some(Mode::Write)),
                    },
                    Op::Write => match table.begin_write(c) {
                        WriteBegin::Issue(_) => {
                            prop_assert!(in_flight.is_none());
                            in_flight = Some(Mode::Write);
                        }
                        WriteBegin::Queued(_) => prop_assert!(in_flight.is_some()),
                    },
                    Op::Complete => {
                        match in_flight.take() {
                            Some(Mode::Read) => prop_assert!(table.complete_read(c, Ok(vec![0]))),
                            Some(Mode::Write) => prop_assert!(table.complete_write(c, Ok(()))),
                            None => {
                                prop_assert!(!table.complete_read(c, Ok(Vec::new())));
                                prop_assert!(!table.complete_write(c, Ok(())));
                            }
                        }
                    }
                }
            }

            table.drain();
            prop_assert!(table.is_empty());
        }

        /// Every coalesced reader observes the same bytes as the issuer.
        #[test]
        fn coalesced_readers_share_one_result(extra in 0usize..8, payload in prop::collection::vec(any::<u8>(), 0..32)) {
            let mut table = AccessTable::default();
            let c = locator();

            let ReadBegin::Issue(mut first) = table.begin_read(c) else {
                panic!("fresh table must install");
            };
            let mut joined = Vec::new();
            for _ in 0..extra {
                match table.begin_read(c) {
                    ReadBegin::Joined(rx) => joined.push(rx),
                    _ => panic!("readers must coalesce"),
                }
            }

            prop_assert!(table.complete_read(c, Ok(payload.clone())));
            prop_assert_eq!(first.try_recv().unwrap(), Ok(payload.clone()));
            for mut rx in joined {
                prop_assert_eq!(rx.try_recv().unwrap(), Ok(payload.clone()));
            }
        }
    }
}
