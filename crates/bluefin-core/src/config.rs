//! Discovery-plan description types and coordinator configuration

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Device Description
// ----------------------------------------------------------------------------

/// One characteristic the central wants discovered on a matching device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacteristicDescription {
    /// Uuid of the characteristic
    pub characteristic_id: Uuid,
    /// Whether descriptor discovery should be issued for it
    pub discover_descriptors: bool,
}

impl CharacteristicDescription {
    /// Describe a characteristic without descriptor discovery
    pub fn new(characteristic_id: Uuid) -> Self {
        Self {
            characteristic_id,
            discover_descriptors: false,
        }
    }

    /// Enable or disable descriptor discovery
    pub fn with_descriptor_discovery(mut self, enabled: bool) -> Self {
        self.discover_descriptors = enabled;
        self
    }
}

/// One service the central wants discovered on a matching device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescription {
    /// Uuid of the service
    pub service_id: Uuid,
    /// Characteristics to discover; `None` discovers all of them
    pub characteristics: Option<HashSet<CharacteristicDescription>>,
}

impl ServiceDescription {
    /// Describe a service, discovering all of its characteristics
    pub fn new(service_id: Uuid) -> Self {
        Self {
            service_id,
            characteristics: None,
        }
    }

    /// Restrict discovery to an explicit set of characteristics
    pub fn with_characteristics(
        mut self,
        characteristics: impl IntoIterator<Item = CharacteristicDescription>,
    ) -> Self {
        self.characteristics = Some(characteristics.into_iter().collect());
        self
    }
}

/// Discovery plan the central associates with an advertisement.
///
/// `services: None` means "discover everything the device offers".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescription {
    /// Services to discover; `None` discovers everything
    pub services: Option<Vec<ServiceDescription>>,
}

impl DeviceDescription {
    /// Plan that discovers everything
    pub fn discover_all() -> Self {
        Self { services: None }
    }

    /// Plan restricted to the given services
    pub fn with_services(services: impl IntoIterator<Item = ServiceDescription>) -> Self {
        Self {
            services: Some(services.into_iter().collect()),
        }
    }
}

// ----------------------------------------------------------------------------
// Coordinator Configuration
// ----------------------------------------------------------------------------

/// Configuration for a device coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Backdating applied to the last-activity stamp on disconnect.
    ///
    /// Zero unless the owning central implements a staleness grace window.
    pub disconnect_activity_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            disconnect_activity_interval: Duration::ZERO,
        }
    }
}

impl CoordinatorConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the disconnect activity backdating interval
    pub fn with_disconnect_activity_interval(mut self, interval: Duration) -> Self {
        self.disconnect_activity_interval = interval;
        self
    }
}
