//! Host BLE stack abstraction
//!
//! The coordinator does not bind a concrete BLE stack. It drives any stack
//! that can (a) issue the GATT client operations below and (b) report their
//! completions as delegate events on an ordered channel. The issue side is
//! the [`HostPeripheral`] trait; the completion side is the
//! [`PeripheralEvent`] enum, delivered through the coordinator's delegate
//! bridge.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Characteristic, ConnectionState, PeripheralId, WriteKind};

// ----------------------------------------------------------------------------
// Host Errors
// ----------------------------------------------------------------------------

/// Error reported by the host stack.
///
/// These are forwarded to callers verbatim; the coordinator never
/// synthesizes transport errors of its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// ATT protocol error response
    #[error("ATT error {code:#04x}")]
    Att { code: u8 },
    /// Link-level failure (connection loss, encryption failure)
    #[error("link error: {reason}")]
    Link { reason: String },
    /// The stack rejected the operation before it reached the wire
    #[error("operation rejected by host stack: {reason}")]
    Rejected { reason: String },
}

/// Result of submitting an operation to the host stack
pub type HostResult<T> = Result<T, HostError>;

// ----------------------------------------------------------------------------
// Host Peripheral Operations
// ----------------------------------------------------------------------------

/// Issue side of the host stack's GATT client interface.
///
/// Every method submits the operation and returns; the outcome arrives later
/// as a [`PeripheralEvent`]. A returned error means the submission itself
/// failed and no completion event will follow for it.
#[async_trait]
pub trait HostPeripheral: Send + Sync {
    /// Stable identity of the remote device
    fn id(&self) -> PeripheralId;

    /// Current connection state as tracked by the host stack
    fn state(&self) -> ConnectionState;

    /// Discover services; `None` discovers all of them
    async fn discover_services(&self, uuids: Option<&[Uuid]>) -> HostResult<()>;

    /// Discover characteristics of a service; `None` discovers all of them
    async fn discover_characteristics(
        &self,
        service: Uuid,
        uuids: Option<&[Uuid]>,
    ) -> HostResult<()>;

    /// Discover descriptors of a characteristic
    async fn discover_descriptors(&self, characteristic: &Characteristic) -> HostResult<()>;

    /// Issue a GATT read of the characteristic value
    async fn read_value(&self, characteristic: &Characteristic) -> HostResult<()>;

    /// Issue a GATT write of the characteristic value
    async fn write_value(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        kind: WriteKind,
    ) -> HostResult<()>;

    /// Enable or disable server-initiated value updates
    async fn set_notify(&self, characteristic: &Characteristic, enabled: bool) -> HostResult<()>;

    /// Issue an RSSI read for the connection
    async fn read_rssi(&self) -> HostResult<()>;
}

// ----------------------------------------------------------------------------
// Delegate Events
// ----------------------------------------------------------------------------

/// Delegate callbacks of the host stack, as ordered messages.
///
/// The host stack invokes its delegate on a serial context; the bridge
/// forwards each callback as one of these events, preserving that order.
#[derive(Debug, Clone)]
pub enum PeripheralEvent {
    /// The link to the peripheral came up
    Connected,
    /// The link went down, cleanly or by loss
    Disconnected { error: Option<HostError> },
    /// The host object's connection state changed
    StateChanged(ConnectionState),
    /// The peripheral's GAP name changed
    NameUpdated(Option<String>),
    /// An RSSI read completed
    RssiRead(Result<i16, HostError>),
    /// Service discovery completed
    ServicesDiscovered(Result<Vec<Uuid>, HostError>),
    /// Characteristic discovery for one service completed
    CharacteristicsDiscovered {
        service: Uuid,
        result: Result<Vec<Characteristic>, HostError>,
    },
    /// Descriptor discovery for one characteristic completed
    DescriptorsDiscovered {
        characteristic: Characteristic,
        result: Result<(), HostError>,
    },
    /// The characteristic value was updated, by read response or notification
    ValueUpdated {
        characteristic: Characteristic,
        result: Result<Vec<u8>, HostError>,
    },
    /// A write-with-response completed
    WriteCompleted {
        characteristic: Characteristic,
        result: Result<(), HostError>,
    },
    /// A set-notify request completed; `Ok` carries the new notifying state
    NotificationStateUpdated {
        characteristic: Characteristic,
        result: Result<bool, HostError>,
    },
    /// The stack can accept another write-without-response
    ReadyToSendWriteWithoutResponse,
    /// The peripheral invalidated previously discovered services
    ServicesModified { invalidated: Vec<Uuid> },
}

/// Ordered event channel into the coordinator
pub type PeripheralEventSender = tokio::sync::mpsc::UnboundedSender<PeripheralEvent>;
/// Receive half of the ordered event channel
pub type PeripheralEventReceiver = tokio::sync::mpsc::UnboundedReceiver<PeripheralEvent>;
