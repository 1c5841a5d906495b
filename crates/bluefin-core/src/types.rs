//! Core types for the bluefin peripheral layer
//!
//! This module defines the fundamental GATT object model the coordinator
//! works with, using newtype patterns for semantic validation and type
//! safety.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Peripheral Identifier
// ----------------------------------------------------------------------------

/// Stable, host-assigned identity of a remote peripheral.
///
/// The host stack assigns each observed device an opaque identifier that is
/// stable for the lifetime of the process (it is not the Bluetooth address,
/// which may be randomized).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeripheralId(Uuid);

impl PeripheralId {
    /// Create a new PeripheralId from a host-provided uuid
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random identifier
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying uuid
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Characteristic Locator
// ----------------------------------------------------------------------------

/// Value identity of a characteristic within a peripheral.
///
/// A characteristic uuid alone is not unique across a device (vendors reuse
/// uuids across services), so all per-characteristic bookkeeping is keyed by
/// the `(service, characteristic)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacteristicLocator {
    /// Uuid of the containing service
    pub service: Uuid,
    /// Uuid of the characteristic
    pub characteristic: Uuid,
}

impl CharacteristicLocator {
    /// Create a new locator
    pub fn new(service: Uuid, characteristic: Uuid) -> Self {
        Self {
            service,
            characteristic,
        }
    }
}

impl fmt::Display for CharacteristicLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.characteristic)
    }
}

// ----------------------------------------------------------------------------
// Characteristic Properties
// ----------------------------------------------------------------------------

/// Property bits advertised by a characteristic declaration.
///
/// Mirrors the GATT characteristic property field; only the bits the
/// coordinator consults are exposed as named constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacteristicProperties(u8);

impl CharacteristicProperties {
    /// Characteristic value can be read
    pub const READ: Self = Self(1 << 0);
    /// Characteristic value can be written without response
    pub const WRITE_WITHOUT_RESPONSE: Self = Self(1 << 1);
    /// Characteristic value can be written with response
    pub const WRITE: Self = Self(1 << 2);
    /// Server can push unacknowledged value updates
    pub const NOTIFY: Self = Self(1 << 3);
    /// Server can push acknowledged value updates
    pub const INDICATE: Self = Self(1 << 4);

    /// The empty property set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw property bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Reconstruct from raw bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Check whether all bits of `other` are set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the server can push value updates (notify or indicate).
    ///
    /// The coordinator treats both the same way: "server sent a value".
    pub const fn supports_notifications(self) -> bool {
        self.0 & (Self::NOTIFY.0 | Self::INDICATE.0) != 0
    }
}

impl std::ops::BitOr for CharacteristicProperties {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for CharacteristicProperties {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ----------------------------------------------------------------------------
// Characteristic and Service Handles
// ----------------------------------------------------------------------------

/// Handle to a characteristic of a remote peripheral.
///
/// Handles produced by discovery always carry their parent `service`; the
/// field is `None` only for caller-constructed handles that never went
/// through discovery, and such handles are rejected by operations that need
/// a full locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    /// Uuid of the characteristic
    pub uuid: Uuid,
    /// Uuid of the parent service, if known
    pub service: Option<Uuid>,
    /// Declared property bits
    pub properties: CharacteristicProperties,
}

impl Characteristic {
    /// Create a discovered-characteristic handle with a known parent service
    pub fn new(service: Uuid, uuid: Uuid, properties: CharacteristicProperties) -> Self {
        Self {
            uuid,
            service: Some(service),
            properties,
        }
    }

    /// Full value identity, when the parent service is known
    pub fn locator(&self) -> Option<CharacteristicLocator> {
        self.service
            .map(|service| CharacteristicLocator::new(service, self.uuid))
    }
}

/// Snapshot entry for a discovered service.
///
/// `characteristics` is empty until per-service characteristic discovery
/// completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GattService {
    /// Uuid of the service
    pub uuid: Uuid,
    /// Characteristics discovered for this service so far
    pub characteristics: Vec<Characteristic>,
}

impl GattService {
    /// Create a service entry with no characteristics discovered yet
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            characteristics: Vec::new(),
        }
    }

    /// Look up a characteristic of this service by uuid
    pub fn characteristic(&self, uuid: Uuid) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.uuid == uuid)
    }
}

// ----------------------------------------------------------------------------
// Connection State
// ----------------------------------------------------------------------------

/// Logical connection state of a peripheral, mirrored from the host stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Disconnecting = 3,
}

impl ConnectionState {
    /// Raw representation, for atomic storage
    pub const fn into_raw(self) -> u8 {
        self as u8
    }

    /// Reconstruct from raw representation; unknown values map to Disconnected
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Disconnecting,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        };
        f.write_str(s)
    }
}

// ----------------------------------------------------------------------------
// Write Kind
// ----------------------------------------------------------------------------

/// GATT write mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteKind {
    /// ATT Write Request: the server confirms completion
    WithResponse,
    /// ATT Write Command: unconfirmed, flow-controlled by the ready signal
    WithoutResponse,
}

// ----------------------------------------------------------------------------
// Subscription Identifier
// ----------------------------------------------------------------------------

/// Unique identifier of one registered notification handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generate a fresh identifier
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_contains_and_or() {
        let props = CharacteristicProperties::READ | CharacteristicProperties::NOTIFY;
        assert!(props.contains(CharacteristicProperties::READ));
        assert!(props.contains(CharacteristicProperties::NOTIFY));
        assert!(!props.contains(CharacteristicProperties::WRITE));
        assert!(props.supports_notifications());
    }

    #[test]
    fn indicate_counts_as_notification_support() {
        let props = CharacteristicProperties::INDICATE;
        assert!(props.supports_notifications());
        assert!(!CharacteristicProperties::READ.supports_notifications());
    }

    #[test]
    fn locator_equality_is_componentwise() {
        let s = Uuid::new_v4();
        let c = Uuid::new_v4();
        assert_eq!(
            CharacteristicLocator::new(s, c),
            CharacteristicLocator::new(s, c)
        );
        assert_ne!(
            CharacteristicLocator::new(s, c),
            CharacteristicLocator::new(c, s)
        );
    }

    #[test]
    fn connection_state_raw_round_trip() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnecting,
        ] {
            assert_eq!(ConnectionState::from_raw(state.into_raw()), state);
        }
        assert_eq!(ConnectionState::from_raw(0xFF), ConnectionState::Disconnected);
    }

    #[test]
    fn characteristic_without_service_has_no_locator() {
        let orphan = Characteristic {
            uuid: Uuid::new_v4(),
            service: None,
            properties: CharacteristicProperties::empty(),
        };
        assert!(orphan.locator().is_none());

        let discovered = Characteristic::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            CharacteristicProperties::READ,
        );
        assert!(discovered.locator().is_some());
    }
}
