//! Seam to the owning central
//!
//! The coordinator never owns its central: it calls back through a weak
//! reference for connection orchestration and discovery-plan lookup. When
//! the central is gone the coordinator's connect/disconnect operations
//! degrade to logged no-ops.

use bluefin_core::{AdvertisementData, DeviceDescription, PeripheralId};

/// Operations the coordinator requests from its central
pub trait CentralLink: Send + Sync {
    /// Ask the central to establish a link to the peripheral
    fn connect(&self, peripheral: PeripheralId);

    /// Ask the central to tear the link down
    fn disconnect(&self, peripheral: PeripheralId);

    /// Resolve the discovery plan for an advertisement, if the central
    /// recognizes the device
    fn device_description(&self, advertisement: &AdvertisementData) -> Option<DeviceDescription>;
}
