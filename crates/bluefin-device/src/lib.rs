//! Per-device BLE peripheral coordination
//!
//! This crate is the request coordinator that sits between a host BLE stack
//! and application code: it converts one-shot GATT callbacks into awaitable
//! per-characteristic completions, serializes concurrent reads and writes
//! with read coalescing, multiplexes unacknowledged writes onto the stack's
//! backpressure signal, drives post-connect discovery and auto-subscribe,
//! and maintains an observable snapshot of peripheral state.
//!
//! ## Architecture Overview
//!
//! All mutable coordination state lives in one task per peripheral. Public
//! operations ([`DeviceCoordinator`]) and host delegate callbacks
//! ([`DelegateBridge`]) are funneled into that task as ordered messages, so
//! every mutation of the access table, notification registry, flow-control
//! gate and discovery plan is totally ordered. The observable
//! [`PeripheralStateSnapshot`] is the one piece readable from any thread
//! without entering the task.
//!
//! - [`coordinator`]: the public handle, subscription handle, and the task
//! - [`delegate`]: adapter receiving host-stack callbacks
//! - [`central`]: the weak back-reference seam to the owning central
//! - [`snapshot`]: observable peripheral state
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::{Arc, Weak};
//! use bluefin_core::{AdvertisementData, CoordinatorConfig};
//! use bluefin_core::testing::ScriptedPeripheral;
//! use bluefin_device::DeviceCoordinator;
//!
//! # async fn example() {
//! let host = Arc::new(ScriptedPeripheral::new());
//! let (device, bridge) = DeviceCoordinator::spawn(
//!     host,
//!     Weak::<TestCentral>::new(),
//!     AdvertisementData::with_local_name("Thermometer"),
//!     -60,
//!     CoordinatorConfig::default(),
//! );
//!
//! // The central wires `bridge` into the host stack's callbacks, then:
//! device.connect().await;
//! # }
//! # use bluefin_core::{AdvertisementData as A, DeviceDescription, PeripheralId};
//! # struct TestCentral;
//! # impl bluefin_device::CentralLink for TestCentral {
//! #     fn connect(&self, _: PeripheralId) {}
//! #     fn disconnect(&self, _: PeripheralId) {}
//! #     fn device_description(&self, _: &A) -> Option<DeviceDescription> { None }
//! # }
//! ```

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

mod access;
mod command;
mod discovery;
mod gate;
mod registry;
mod rssi;

pub mod central;
pub mod coordinator;
pub mod delegate;
pub mod snapshot;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use central::CentralLink;
pub use coordinator::{DeviceCoordinator, Subscription};
pub use delegate::DelegateBridge;
pub use registry::NotificationHandler;
pub use snapshot::{DiscoveryPlan, PeripheralStateSnapshot};

// Re-export the core vocabulary for convenience
pub use bluefin_core::{
    AdvertisementData, BluefinError, Characteristic, CharacteristicLocator,
    CharacteristicProperties, ConnectionState, CoordinatorConfig, DeviceDescription, GattService,
    HostPeripheral, PeripheralEvent, PeripheralId, Result, SubscriptionId,
};
