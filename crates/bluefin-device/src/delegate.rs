//! Delegate bridge
//!
//! The host stack invokes its delegate callbacks on a serial context of its
//! own. [`DelegateBridge`] is the object handed to that side: advertisement
//! observations are written straight into the snapshot (latest-wins fields
//! that tolerate writes from the host context), everything else is forwarded
//! as an ordered message into the coordinator task. Message order from a
//! single callback is preserved, and order across callbacks matches the
//! serial order of the caller.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use bluefin_core::{
    AdvertisementData, Characteristic, ConnectionState, HostError, PeripheralEvent,
    PeripheralEventSender,
};

use crate::snapshot::PeripheralStateSnapshot;

// ----------------------------------------------------------------------------
// Bridge
// ----------------------------------------------------------------------------

/// Adapter between host-stack callbacks and the coordinator task.
///
/// Cheap to clone; holds no owning reference to the coordinator. Events
/// delivered after the coordinator shut down are dropped with a debug log.
#[derive(Clone)]
pub struct DelegateBridge {
    events: PeripheralEventSender,
    snapshot: Arc<PeripheralStateSnapshot>,
}

impl DelegateBridge {
    pub(crate) fn new(events: PeripheralEventSender, snapshot: Arc<PeripheralStateSnapshot>) -> Self {
        Self { events, snapshot }
    }

    /// Record a fresh advertisement observation.
    ///
    /// Writes the snapshot directly instead of routing through the
    /// coordinator: these fields are latest-wins and the host context is
    /// serial, so ordering is preserved without a round trip.
    pub fn advertisement_received(&self, advertisement: AdvertisementData, rssi: Option<i16>) {
        self.snapshot.set_advertisement(advertisement);
        if let Some(rssi) = rssi {
            self.snapshot.set_rssi(rssi);
        }
        self.snapshot.touch_activity();
    }

    /// Forward a raw delegate event
    pub fn deliver(&self, event: PeripheralEvent) {
        if self.events.send(event).is_err() {
            debug!("delegate event dropped; coordinator is gone");
        }
    }

    // ------------------------------------------------------------------
    // Named forwarders mirroring the host delegate callbacks
    // ------------------------------------------------------------------

    /// The link came up
    pub fn connected(&self) {
        self.deliver(PeripheralEvent::Connected);
    }

    /// The link went down, cleanly or by loss
    pub fn disconnected(&self, error: Option<HostError>) {
        self.deliver(PeripheralEvent::Disconnected { error });
    }

    /// The host object's connection state changed
    pub fn state_changed(&self, state: ConnectionState) {
        self.deliver(PeripheralEvent::StateChanged(state));
    }

    /// The peripheral's GAP name changed
    pub fn name_updated(&self, name: Option<String>) {
        self.deliver(PeripheralEvent::NameUpdated(name));
    }

    /// An RSSI read completed
    pub fn rssi_read(&self, result: Result<i16, HostError>) {
        self.deliver(PeripheralEvent::RssiRead(result));
    }

    /// Service discovery completed
    pub fn services_discovered(&self, result: Result<Vec<Uuid>, HostError>) {
        self.deliver(PeripheralEvent::ServicesDiscovered(result));
    }

    /// Characteristic discovery for one service completed
    pub fn characteristics_discovered(
        &self,
        service: Uuid,
        result: Result<Vec<Characteristic>, HostError>,
    ) {
        self.deliver(PeripheralEvent::CharacteristicsDiscovered { service, result });
    }

    /// Descriptor discovery for one characteristic completed
    pub fn descriptors_discovered(
        &self,
        characteristic: Characteristic,
        result: Result<(), HostError>,
    ) {
        self.deliver(PeripheralEvent::DescriptorsDiscovered {
            characteristic,
            result,
        });
    }

    /// A characteristic value arrived, by read response or notification
    pub fn value_updated(&self, characteristic: Characteristic, result: Result<Vec<u8>, HostError>) {
        self.deliver(PeripheralEvent::ValueUpdated {
            characteristic,
            result,
        });
    }

    /// A write-with-response completed
    pub fn write_completed(&self, characteristic: Characteristic, result: Result<(), HostError>) {
        self.deliver(PeripheralEvent::WriteCompleted {
            characteristic,
            result,
        });
    }

    /// A set-notify request completed
    pub fn notification_state_updated(
        &self,
        characteristic: Characteristic,
        result: Result<bool, HostError>,
    ) {
        self.deliver(PeripheralEvent::NotificationStateUpdated {
            characteristic,
            result,
        });
    }

    /// The stack can accept another write-without-response
    pub fn ready_to_send_write_without_response(&self) {
        self.deliver(PeripheralEvent::ReadyToSendWriteWithoutResponse);
    }

    /// The peripheral invalidated previously discovered services
    pub fn services_modified(&self, invalidated: Vec<Uuid>) {
        self.deliver(PeripheralEvent::ServicesModified { invalidated });
    }
}
