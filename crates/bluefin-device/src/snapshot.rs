//! Observable peripheral state
//!
//! [`PeripheralStateSnapshot`] is the read-mostly view of a peripheral that
//! UI and central code observe without entering the coordinator's execution
//! context. Each field is independently consistent: writers are either the
//! coordinator task or the host stack's serial context, readers can be any
//! thread. Cross-field atomicity is not offered.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI16, AtomicU8, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use uuid::Uuid;

use bluefin_core::{
    AdvertisementData, Characteristic, CharacteristicDescription, CharacteristicLocator,
    ConnectionState, GattService,
};

/// Resolved discovery plan: service uuid to the characteristics requested
/// for it, where an inner `None` discovers all characteristics of that
/// service. An absent plan discovers everything the device offers.
pub type DiscoveryPlan = HashMap<Uuid, Option<HashSet<CharacteristicDescription>>>;

// ----------------------------------------------------------------------------
// Snapshot
// ----------------------------------------------------------------------------

/// Thread-safe snapshot of peripheral state
pub struct PeripheralStateSnapshot {
    name: RwLock<Option<String>>,
    rssi: AtomicI16,
    state: AtomicU8,
    advertisement: RwLock<AdvertisementData>,
    services: RwLock<Option<Vec<GattService>>>,
    last_activity: RwLock<Instant>,
    requested_characteristics: RwLock<Option<DiscoveryPlan>>,
    notifying: RwLock<HashSet<CharacteristicLocator>>,
}

impl PeripheralStateSnapshot {
    pub(crate) fn new(advertisement: AdvertisementData, rssi: i16) -> Self {
        Self {
            name: RwLock::new(None),
            rssi: AtomicI16::new(rssi),
            state: AtomicU8::new(ConnectionState::Disconnected.into_raw()),
            advertisement: RwLock::new(advertisement),
            services: RwLock::new(None),
            last_activity: RwLock::new(Instant::now()),
            requested_characteristics: RwLock::new(None),
            notifying: RwLock::new(HashSet::new()),
        }
    }

    // ------------------------------------------------------------------
    // Readers (any thread)
    // ------------------------------------------------------------------

    /// Last observed GAP name
    pub fn name(&self) -> Option<String> {
        self.name.read().map(|n| n.clone()).unwrap_or_default()
    }

    /// Latest RSSI sample in dBm
    pub fn rssi(&self) -> i16 {
        self.rssi.load(Ordering::Relaxed)
    }

    /// Logical connection state
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Last observed advertisement
    pub fn advertisement(&self) -> AdvertisementData {
        self.advertisement
            .read()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    /// Discovered services, or `None` when no discovery has completed since
    /// the last (re)connect. `Some(vec![])` means discovered-and-empty.
    pub fn services(&self) -> Option<Vec<GattService>> {
        self.services.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// The discovery plan resolved for the current connect attempt
    pub fn requested_characteristics(&self) -> Option<DiscoveryPlan> {
        self.requested_characteristics
            .read()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Whether the wire subscription for a characteristic is active
    pub fn is_notifying(&self, locator: CharacteristicLocator) -> bool {
        self.notifying
            .read()
            .map(|n| n.contains(&locator))
            .unwrap_or(false)
    }

    /// When the peripheral was last heard from.
    ///
    /// While the peripheral is not disconnected the effective value is
    /// "now": a connected device is by definition active.
    pub fn last_activity(&self) -> Instant {
        if self.state() != ConnectionState::Disconnected {
            Instant::now()
        } else {
            self.last_activity
                .read()
                .map(|t| *t)
                .unwrap_or_else(|_| Instant::now())
        }
    }

    /// Whether the peripheral has neither advertised nor been connected
    /// within `interval`
    pub fn is_stale(&self, interval: Duration) -> bool {
        self.state() == ConnectionState::Disconnected
            && self.last_activity() + interval < Instant::now()
    }

    /// Look up a discovered characteristic by locator
    pub fn find_characteristic(&self, locator: CharacteristicLocator) -> Option<Characteristic> {
        self.services.read().ok().and_then(|services| {
            services.as_ref().and_then(|list| {
                list.iter()
                    .find(|s| s.uuid == locator.service)
                    .and_then(|s| s.characteristic(locator.characteristic))
                    .cloned()
            })
        })
    }

    // ------------------------------------------------------------------
    // Writers (coordinator task or host serial context)
    // ------------------------------------------------------------------

    pub(crate) fn set_name(&self, name: Option<String>) {
        if let Ok(mut guard) = self.name.write() {
            *guard = name;
        }
    }

    pub(crate) fn set_rssi(&self, rssi: i16) {
        self.rssi.store(rssi, Ordering::Relaxed);
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.state.store(state.into_raw(), Ordering::Release);
    }

    pub(crate) fn set_advertisement(&self, advertisement: AdvertisementData) {
        if let Ok(mut guard) = self.advertisement.write() {
            *guard = advertisement;
        }
    }

    /// Record the outcome of service discovery, keeping previously
    /// discovered characteristics of services that are still present.
    pub(crate) fn set_services(&self, uuids: &[Uuid]) {
        if let Ok(mut guard) = self.services.write() {
            let mut previous = guard.take().unwrap_or_default();
            let next = uuids
                .iter()
                .map(|uuid| {
                    previous
                        .iter()
                        .position(|s| s.uuid == *uuid)
                        .map(|i| previous.swap_remove(i))
                        .unwrap_or_else(|| GattService::new(*uuid))
                })
                .collect();
            *guard = Some(next);
        }
    }

    pub(crate) fn merge_characteristics(
        &self,
        service: Uuid,
        characteristics: Vec<Characteristic>,
    ) {
        if let Ok(mut guard) = self.services.write() {
            let list = guard.get_or_insert_with(Vec::new);
            match list.iter_mut().find(|s| s.uuid == service) {
                Some(entry) => entry.characteristics = characteristics,
                None => list.push(GattService {
                    uuid: service,
                    characteristics,
                }),
            }
        }
    }

    pub(crate) fn remove_services(&self, invalidated: &[Uuid]) {
        if let Ok(mut guard) = self.services.write() {
            if let Some(list) = guard.as_mut() {
                list.retain(|s| !invalidated.contains(&s.uuid));
            }
        }
    }

    pub(crate) fn clear_services(&self) {
        if let Ok(mut guard) = self.services.write() {
            *guard = None;
        }
    }

    pub(crate) fn set_requested_characteristics(&self, plan: Option<DiscoveryPlan>) {
        if let Ok(mut guard) = self.requested_characteristics.write() {
            *guard = plan;
        }
    }

    pub(crate) fn set_notifying(&self, locator: CharacteristicLocator, notifying: bool) {
        if let Ok(mut guard) = self.notifying.write() {
            if notifying {
                guard.insert(locator);
            } else {
                guard.remove(&locator);
            }
        }
    }

    pub(crate) fn notifying_characteristics(&self) -> Vec<CharacteristicLocator> {
        self.notifying
            .read()
            .map(|n| n.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn clear_notifying(&self) {
        if let Ok(mut guard) = self.notifying.write() {
            guard.clear();
        }
    }

    /// Invalidated services take their wire subscriptions with them;
    /// rediscovery must be able to re-subscribe.
    pub(crate) fn clear_notifying_for_services(&self, services: &[Uuid]) {
        if let Ok(mut guard) = self.notifying.write() {
            guard.retain(|locator| !services.contains(&locator.service));
        }
    }

    pub(crate) fn touch_activity(&self) {
        if let Ok(mut guard) = self.last_activity.write() {
            *guard = Instant::now();
        }
    }

    /// Stamp the activity clock on disconnect, backdated by the configured
    /// grace interval.
    pub(crate) fn stamp_disconnect_activity(&self, backdate: Duration) {
        if let Ok(mut guard) = self.last_activity.write() {
            *guard = Instant::now().checked_sub(backdate).unwrap_or_else(Instant::now);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bluefin_core::CharacteristicProperties;

    fn snapshot() -> PeripheralStateSnapshot {
        PeripheralStateSnapshot::new(AdvertisementData::default(), -60)
    }

    #[test]
    fn connected_peripheral_is_never_stale() {
        let snap = snapshot();
        snap.set_state(ConnectionState::Connected);
        snap.stamp_disconnect_activity(Duration::from_secs(3600));
        assert!(!snap.is_stale(Duration::from_secs(1)));
    }

    #[test]
    fn disconnected_peripheral_goes_stale_after_backdating() {
        let snap = snapshot();
        snap.set_state(ConnectionState::Disconnected);
        snap.stamp_disconnect_activity(Duration::from_secs(2));
        assert!(snap.is_stale(Duration::from_secs(1)));
        assert!(!snap.is_stale(Duration::from_secs(30)));
    }

    #[test]
    fn services_start_undiscovered() {
        let snap = snapshot();
        assert!(snap.services().is_none());
        snap.set_services(&[]);
        assert_eq!(snap.services(), Some(Vec::new()));
    }

    #[test]
    fn rediscovery_keeps_characteristics_of_surviving_services() {
        let snap = snapshot();
        let kept = Uuid::new_v4();
        let dropped = Uuid::new_v4();
        snap.set_services(&[kept, dropped]);

        let ch = Characteristic::new(kept, Uuid::new_v4(), CharacteristicProperties::READ);
        snap.merge_characteristics(kept, vec![ch.clone()]);

        snap.set_services(&[kept]);
        let services = snap.services().unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].characteristics, vec![ch]);
    }

    #[test]
    fn find_characteristic_requires_matching_service() {
        let snap = snapshot();
        let service = Uuid::new_v4();
        let ch = Characteristic::new(service, Uuid::new_v4(), CharacteristicProperties::NOTIFY);
        snap.set_services(&[service]);
        snap.merge_characteristics(service, vec![ch.clone()]);

        let locator = CharacteristicLocator::new(service, ch.uuid);
        assert_eq!(snap.find_characteristic(locator), Some(ch));

        let wrong = CharacteristicLocator::new(Uuid::new_v4(), locator.characteristic);
        assert!(snap.find_characteristic(wrong).is_none());
    }

    #[test]
    fn notifying_set_tracks_wire_state() {
        let snap = snapshot();
        let locator = CharacteristicLocator::new(Uuid::new_v4(), Uuid::new_v4());
        assert!(!snap.is_notifying(locator));
        snap.set_notifying(locator, true);
        assert!(snap.is_notifying(locator));
        snap.set_notifying(locator, false);
        assert!(!snap.is_notifying(locator));
    }
}
