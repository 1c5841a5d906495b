//! Error types for the bluefin peripheral layer

use thiserror::Error;
use uuid::Uuid;

use crate::host::HostError;
use crate::types::{Characteristic, CharacteristicLocator};

// ----------------------------------------------------------------------------
// Error Type
// ----------------------------------------------------------------------------

/// Errors surfaced by coordinator operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BluefinError {
    /// The characteristic is unknown, its parent service is missing, or the
    /// peripheral disconnected mid-request.
    #[error("characteristic not present{}", fmt_characteristic(.characteristic))]
    NotPresent { characteristic: Option<Uuid> },

    /// Error reported by the host stack, forwarded verbatim
    #[error(transparent)]
    Transport(#[from] HostError),
}

fn fmt_characteristic(characteristic: &Option<Uuid>) -> String {
    match characteristic {
        Some(uuid) => format!(" ({uuid})"),
        None => String::new(),
    }
}

impl BluefinError {
    /// NotPresent for a characteristic handle
    pub fn not_present(characteristic: &Characteristic) -> Self {
        Self::NotPresent {
            characteristic: Some(characteristic.uuid),
        }
    }

    /// NotPresent for a characteristic identified by locator
    pub fn not_present_at(locator: CharacteristicLocator) -> Self {
        Self::NotPresent {
            characteristic: Some(locator.characteristic),
        }
    }

    /// NotPresent for a whole-device operation such as an RSSI read
    pub fn device_not_present() -> Self {
        Self::NotPresent {
            characteristic: None,
        }
    }
}

/// Common result type for coordinator operations
pub type Result<T> = std::result::Result<T, BluefinError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_pass_through_verbatim() {
        let host = HostError::Att { code: 0x0E };
        let err: BluefinError = host.clone().into();
        assert_eq!(err, BluefinError::Transport(host));
        assert_eq!(err.to_string(), "ATT error 0x0e");
    }

    #[test]
    fn not_present_mentions_the_characteristic() {
        let uuid = Uuid::new_v4();
        let err = BluefinError::NotPresent {
            characteristic: Some(uuid),
        };
        assert!(err.to_string().contains(&uuid.to_string()));
        assert_eq!(
            BluefinError::device_not_present().to_string(),
            "characteristic not present"
        );
    }
}
