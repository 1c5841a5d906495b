//! Core types and host-stack abstraction for the bluefin peripheral layer
//!
//! Bluefin turns a callback-driven host BLE stack into awaitable GATT client
//! operations. This crate is the foundation: the GATT object model, the
//! error taxonomy, the discovery-plan description types, and the seam to the
//! host stack itself. The per-device coordinator lives in `bluefin-device`.
//!
//! ## Architecture Overview
//!
//! - [`types`]: newtype ids and GATT handles (`PeripheralId`,
//!   `CharacteristicLocator`, `Characteristic`, `ConnectionState`)
//! - [`host`]: the [`HostPeripheral`] operations trait and the
//!   [`PeripheralEvent`] delegate surface the coordinator consumes
//! - [`config`]: device descriptions (what to discover) and coordinator
//!   configuration
//! - [`advertisement`]: the opaque advertisement payload carried in the
//!   observable snapshot
//! - [`errors`]: the [`BluefinError`] taxonomy
//! - [`testing`]: a scripted host stack for deterministic tests

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod advertisement;
pub mod config;
pub mod errors;
pub mod host;
pub mod testing;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use advertisement::AdvertisementData;
pub use config::{
    CharacteristicDescription, CoordinatorConfig, DeviceDescription, ServiceDescription,
};
pub use errors::{BluefinError, Result};
pub use host::{
    HostError, HostPeripheral, HostResult, PeripheralEvent, PeripheralEventReceiver,
    PeripheralEventSender,
};
pub use types::{
    Characteristic, CharacteristicLocator, CharacteristicProperties, ConnectionState, GattService,
    PeripheralId, SubscriptionId, WriteKind,
};
