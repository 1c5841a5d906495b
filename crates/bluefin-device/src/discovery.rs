//! Discovery-plan resolution
//!
//! Translates the central's [`DeviceDescription`] into the per-connect
//! discovery plan and derives the filters passed to the host stack's
//! discover operations.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use bluefin_core::{CharacteristicLocator, DeviceDescription};

use crate::snapshot::DiscoveryPlan;

/// Build the discovery plan for one connect attempt.
///
/// Returns `None` when the description discovers everything. Multiple
/// service descriptions for the same uuid are unioned; a description without
/// explicit characteristics widens the union to "all characteristics of the
/// service".
pub(crate) fn build_plan(description: &DeviceDescription) -> Option<DiscoveryPlan> {
    let Some(services) = description.services.as_ref() else {
        debug!("no service restrictions; discovering everything");
        return None;
    };
    let mut plan: DiscoveryPlan = HashMap::new();
    for service in services {
        let entry = plan.entry(service.service_id).or_insert_with(|| Some(Default::default()));
        match (&mut *entry, &service.characteristics) {
            (Some(union), Some(requested)) => union.extend(requested.iter().copied()),
            // A service declared without characteristics discovers them all.
            (entry, None) => *entry = None,
            (None, Some(_)) => {}
        }
    }
    debug!(services = plan.len(), "resolved discovery plan");
    Some(plan)
}

/// Service filter for `discover_services`: plan keys, or `None` for all
pub(crate) fn service_filter(plan: &Option<DiscoveryPlan>) -> Option<Vec<Uuid>> {
    plan.as_ref().map(|p| p.keys().copied().collect())
}

/// Characteristic filter for `discover_characteristics` on one service
pub(crate) fn characteristic_filter(plan: &Option<DiscoveryPlan>, service: Uuid) -> Option<Vec<Uuid>> {
    plan.as_ref()
        .and_then(|p| p.get(&service))
        .and_then(|inner| inner.as_ref())
        .map(|set| set.iter().map(|d| d.characteristic_id).collect())
}

/// Whether the plan covers this service at all
pub(crate) fn plan_includes_service(plan: &Option<DiscoveryPlan>, service: Uuid) -> bool {
    match plan {
        Some(p) => p.contains_key(&service),
        None => true,
    }
}

/// Whether the plan requests descriptor discovery for this characteristic
pub(crate) fn wants_descriptors(plan: &Option<DiscoveryPlan>, locator: CharacteristicLocator) -> bool {
    plan.as_ref()
        .and_then(|p| p.get(&locator.service))
        .and_then(|inner| inner.as_ref())
        .map(|set| {
            set.iter()
                .any(|d| d.characteristic_id == locator.characteristic && d.discover_descriptors)
        })
        .unwrap_or(false)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bluefin_core::{CharacteristicDescription, ServiceDescription};

    #[test]
    fn absent_services_discover_everything() {
        assert!(build_plan(&DeviceDescription::discover_all()).is_none());
        assert!(service_filter(&None).is_none());
        assert!(characteristic_filter(&None, Uuid::new_v4()).is_none());
        assert!(plan_includes_service(&None, Uuid::new_v4()));
    }

    #[test]
    fn duplicate_service_descriptions_union_their_characteristics() {
        let service = Uuid::new_v4();
        let a = CharacteristicDescription::new(Uuid::new_v4());
        let b = CharacteristicDescription::new(Uuid::new_v4());
        let description = DeviceDescription::with_services([
            ServiceDescription::new(service).with_characteristics([a]),
            ServiceDescription::new(service).with_characteristics([b]),
        ]);

        let plan = build_plan(&description).unwrap();
        let filter = characteristic_filter(&Some(plan), service).unwrap();
        assert_eq!(filter.len(), 2);
        assert!(filter.contains(&a.characteristic_id));
        assert!(filter.contains(&b.characteristic_id));
    }

    #[test]
    fn bare_service_description_widens_to_all_characteristics() {
        let service = Uuid::new_v4();
        let a = CharacteristicDescription::new(Uuid::new_v4());
        let description = DeviceDescription::with_services([
            ServiceDescription::new(service).with_characteristics([a]),
            ServiceDescription::new(service),
        ]);

        let plan = build_plan(&description).unwrap();
        assert_eq!(plan.get(&service), Some(&None));
        assert!(characteristic_filter(&Some(plan), service).is_none());
    }

    #[test]
    fn descriptor_discovery_follows_the_description_bit() {
        let service = Uuid::new_v4();
        let with_bit = CharacteristicDescription::new(Uuid::new_v4()).with_descriptor_discovery(true);
        let without_bit = CharacteristicDescription::new(Uuid::new_v4());
        let description = DeviceDescription::with_services([
            ServiceDescription::new(service).with_characteristics([with_bit, without_bit]),
        ]);
        let plan = build_plan(&description);

        assert!(wants_descriptors(
            &plan,
            CharacteristicLocator::new(service, with_bit.characteristic_id)
        ));
        assert!(!wants_descriptors(
            &plan,
            CharacteristicLocator::new(service, without_bit.characteristic_id)
        ));
        assert!(!wants_descriptors(
            &plan,
            CharacteristicLocator::new(Uuid::new_v4(), with_bit.characteristic_id)
        ));
    }
}
