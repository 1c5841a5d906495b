//! Test support: a scripted, deterministic host stack
//!
//! [`ScriptedPeripheral`] records every operation the coordinator issues and
//! lets tests deliver scripted delegate events, replacing the real host
//! stack without hardware. No operation has side effects beyond the log, so
//! tests assert on exactly what reached the wire and in what order.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::host::{HostPeripheral, HostResult};
use crate::types::{Characteristic, ConnectionState, PeripheralId, WriteKind};

// ----------------------------------------------------------------------------
// Issued Operations
// ----------------------------------------------------------------------------

/// One operation the coordinator submitted to the host stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuedOp {
    DiscoverServices {
        uuids: Option<Vec<Uuid>>,
    },
    DiscoverCharacteristics {
        service: Uuid,
        uuids: Option<Vec<Uuid>>,
    },
    DiscoverDescriptors {
        characteristic: Uuid,
    },
    ReadValue {
        characteristic: Uuid,
    },
    WriteValue {
        characteristic: Uuid,
        data: Vec<u8>,
        kind: WriteKind,
    },
    SetNotify {
        characteristic: Uuid,
        enabled: bool,
    },
    ReadRssi,
}

// ----------------------------------------------------------------------------
// Scripted Peripheral
// ----------------------------------------------------------------------------

/// Fake host peripheral that records issued operations
pub struct ScriptedPeripheral {
    id: PeripheralId,
    state: Mutex<ConnectionState>,
    ops: Mutex<Vec<IssuedOp>>,
}

impl ScriptedPeripheral {
    /// Create a scripted peripheral in the disconnected state
    pub fn new() -> Self {
        Self {
            id: PeripheralId::random(),
            state: Mutex::new(ConnectionState::Disconnected),
            ops: Mutex::new(Vec::new()),
        }
    }

    /// Script the connection state the host object reports
    pub fn set_state(&self, state: ConnectionState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }

    /// Everything issued so far, in submission order
    pub fn issued(&self) -> Vec<IssuedOp> {
        self.ops.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    /// Number of value reads issued for a characteristic
    pub fn reads_issued(&self, characteristic: Uuid) -> usize {
        self.issued()
            .iter()
            .filter(|op| matches!(op, IssuedOp::ReadValue { characteristic: c } if *c == characteristic))
            .count()
    }

    /// Number of writes of the given kind issued for a characteristic
    pub fn writes_issued(&self, characteristic: Uuid, kind: WriteKind) -> usize {
        self.issued()
            .iter()
            .filter(|op| {
                matches!(op, IssuedOp::WriteValue { characteristic: c, kind: k, .. }
                    if *c == characteristic && *k == kind)
            })
            .count()
    }

    /// Number of set-notify requests issued for a characteristic
    pub fn set_notify_issued(&self, characteristic: Uuid, enabled: bool) -> usize {
        self.issued()
            .iter()
            .filter(|op| {
                matches!(op, IssuedOp::SetNotify { characteristic: c, enabled: e }
                    if *c == characteristic && *e == enabled)
            })
            .count()
    }

    /// Number of RSSI reads issued
    pub fn rssi_reads_issued(&self) -> usize {
        self.issued()
            .iter()
            .filter(|op| matches!(op, IssuedOp::ReadRssi))
            .count()
    }

    fn record(&self, op: IssuedOp) {
        if let Ok(mut ops) = self.ops.lock() {
            ops.push(op);
        }
    }
}

impl Default for ScriptedPeripheral {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostPeripheral for ScriptedPeripheral {
    fn id(&self) -> PeripheralId {
        self.id
    }

    fn state(&self) -> ConnectionState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(ConnectionState::Disconnected)
    }

    async fn discover_services(&self, uuids: Option<&[Uuid]>) -> HostResult<()> {
        self.record(IssuedOp::DiscoverServices {
            uuids: uuids.map(<[Uuid]>::to_vec),
        });
        Ok(())
    }

    async fn discover_characteristics(
        &self,
        service: Uuid,
        uuids: Option<&[Uuid]>,
    ) -> HostResult<()> {
        self.record(IssuedOp::DiscoverCharacteristics {
            service,
            uuids: uuids.map(<[Uuid]>::to_vec),
        });
        Ok(())
    }

    async fn discover_descriptors(&self, characteristic: &Characteristic) -> HostResult<()> {
        self.record(IssuedOp::DiscoverDescriptors {
            characteristic: characteristic.uuid,
        });
        Ok(())
    }

    async fn read_value(&self, characteristic: &Characteristic) -> HostResult<()> {
        self.record(IssuedOp::ReadValue {
            characteristic: characteristic.uuid,
        });
        Ok(())
    }

    async fn write_value(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        kind: WriteKind,
    ) -> HostResult<()> {
        self.record(IssuedOp::WriteValue {
            characteristic: characteristic.uuid,
            data: data.to_vec(),
            kind,
        });
        Ok(())
    }

    async fn set_notify(&self, characteristic: &Characteristic, enabled: bool) -> HostResult<()> {
        self.record(IssuedOp::SetNotify {
            characteristic: characteristic.uuid,
            enabled,
        });
        Ok(())
    }

    async fn read_rssi(&self) -> HostResult<()> {
        self.record(IssuedOp::ReadRssi);
        Ok(())
    }
}
