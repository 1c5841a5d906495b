//! Advertisement payload as observed by the central

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Advertisement Data
// ----------------------------------------------------------------------------

/// Last advertisement observed for a peripheral.
///
/// The coordinator treats this as opaque state: it stores the latest value
/// and hands it to the central when resolving the discovery plan. Only the
/// `is_connectable` bit is consulted by callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvertisementData {
    /// Local name carried in the advertisement, if any
    pub local_name: Option<String>,
    /// Service uuids advertised by the device
    pub service_uuids: Vec<Uuid>,
    /// Manufacturer-specific data keyed by company identifier
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    /// Advertised transmit power level in dBm, if present
    pub tx_power_level: Option<i8>,
    /// Whether the advertisement marks the device as connectable
    pub is_connectable: bool,
}

impl AdvertisementData {
    /// Advertisement with a local name only, common in tests and scanners
    pub fn with_local_name(name: impl Into<String>) -> Self {
        Self {
            local_name: Some(name.into()),
            is_connectable: true,
            ..Self::default()
        }
    }
}
