//! Coordinator command protocol
//!
//! Public operations do not touch coordinator state directly: each one sends
//! a command into the task and awaits the ticket it gets back. A `Queued`
//! ticket means "suspend, then re-enter": the woken caller races back
//! through the same command path, which keeps the access-table discipline in
//! one place.

use tokio::sync::oneshot;

use bluefin_core::errors::Result;
use bluefin_core::{Characteristic, CharacteristicLocator, SubscriptionId};

use crate::registry::NotificationHandler;

/// Ticket returned for a read request
pub(crate) enum ReadTicket {
    /// Attached to an in-flight or freshly issued read; await the value
    Value(oneshot::Receiver<Result<Vec<u8>>>),
    /// Busy with a write; await the wake-up, then re-enter
    Queued(oneshot::Receiver<()>),
}

/// Ticket returned for a write request
pub(crate) enum WriteTicket {
    /// Write issued; await its completion
    Done(oneshot::Receiver<Result<()>>),
    /// Busy; await the wake-up, then re-enter
    Queued(oneshot::Receiver<()>),
}

/// Ticket returned for a write-without-response request
pub(crate) enum GateTicket {
    /// The write was handed to the stack (or dropped on a dead link)
    Sent,
    /// Another unacknowledged write is in flight; await the ready signal,
    /// then re-enter
    Queued(oneshot::Receiver<()>),
}

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

/// Messages from public operations into the coordinator task
pub(crate) enum Command {
    /// Hand a connect request to the central
    Connect { done: oneshot::Sender<()> },
    /// Unsubscribe notifying characteristics and hand a disconnect request
    /// to the central
    Disconnect,
    /// Enter the access table for a read
    Read {
        characteristic: Characteristic,
        reply: oneshot::Sender<ReadTicket>,
    },
    /// Enter the access table for a write-with-response
    Write {
        characteristic: Characteristic,
        data: Vec<u8>,
        reply: oneshot::Sender<WriteTicket>,
    },
    /// Enter the write-without-response gate
    WriteUnacknowledged {
        characteristic: Characteristic,
        data: Vec<u8>,
        reply: oneshot::Sender<GateTicket>,
    },
    /// Attach to the in-flight RSSI sample, issuing one if none is pending
    ReadRssi {
        reply: oneshot::Sender<oneshot::Receiver<Result<i16>>>,
    },
    /// Register a notification handler
    Register {
        locator: CharacteristicLocator,
        id: SubscriptionId,
        handler: NotificationHandler,
    },
    /// Remove a notification handler
    Deregister {
        locator: CharacteristicLocator,
        id: SubscriptionId,
    },
}
