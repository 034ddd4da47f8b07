//! Tests for pool health aggregation.

use nxcat_common::config::HealthSettings;
use nxcat_common::documents::{SlotDocument, TopologyDocument};
use nxcat_common::health::*;
use nxcat_common::slots::{SlotAnnotation, SlotMap};
use nxcat_common::topology::{DeviceState, GroupRole, TopologySnapshot, VdevKind};
use serde_json::{json, Value};

fn snapshot(value: Value) -> TopologySnapshot {
    let doc: TopologyDocument = serde_json::from_value(value).unwrap();
    TopologySnapshot::from_document(&doc, None)
}

fn raidz2(states: &[&str]) -> TopologySnapshot {
    let devices: serde_json::Map<String, Value> = states
        .iter()
        .enumerate()
        .map(|(i, s)| (format!("c1t{}d0", i), json!({"state": s})))
        .collect();
    snapshot(json!({
        "tank": {
            "config": {
                "tank": {"state": "ONLINE", "vdev": {"raidz2-0": {"state": "ONLINE", "vdev": devices}}}
            }
        }
    }))
}

#[test]
fn test_healthy_raidz2() {
    let snapshot = raidz2(&["ONLINE"; 6]);
    let health = aggregate_pool(&snapshot, "tank", &SlotMap::unavailable(), &HealthSettings::default());

    assert_eq!(health.groups.len(), 1);
    let vdev = &health.groups[0].vdevs[0];
    assert_eq!(vdev.label, "raidz2-0");
    assert_eq!(vdev.kind, VdevKind::RaidZ { parity: 2 });
    assert_eq!(vdev.effective, 6);
    assert_eq!(vdev.faulted, 0);
    assert_eq!(vdev.tier, Tier::Ok);
    assert_eq!(health.worst_tier(), Some(Tier::Ok));
}

#[test]
fn test_faulted_member_warns() {
    let snapshot = raidz2(&["ONLINE", "ONLINE", "FAULTED", "ONLINE", "ONLINE", "ONLINE"]);
    let health = aggregate_pool(&snapshot, "tank", &SlotMap::unavailable(), &HealthSettings::default());

    let vdev = &health.groups[0].vdevs[0];
    assert_eq!(vdev.online, 5);
    assert_eq!(vdev.faulted, 1);
    assert_eq!(vdev.tier, Tier::Warn);
    assert_eq!(vdev.faults[0].device, "c1t2d0");
    assert_eq!(vdev.faults[0].state, DeviceState::Faulted);
    assert_eq!(health.total_faulted(), 1);
}

#[test]
fn test_other_states_not_counted() {
    let snapshot = raidz2(&["ONLINE", "UNAVAIL", "ONLINE", "ONLINE", "ONLINE", "ONLINE"]);
    let health = aggregate_pool(&snapshot, "tank", &SlotMap::unavailable(), &HealthSettings::default());
    let vdev = &health.groups[0].vdevs[0];
    assert_eq!(vdev.online, 5);
    assert_eq!(vdev.faulted, 0);
    assert!(vdev.faults.is_empty());
}

#[test]
fn test_wide_group_critical() {
    let snapshot = raidz2(&["ONLINE"; 12]);
    let health = aggregate_pool(&snapshot, "tank", &SlotMap::unavailable(), &HealthSettings::default());
    assert_eq!(health.groups[0].vdevs[0].tier, Tier::Critical);

    let narrow = HealthSettings {
        max_group_devices: 5,
        ..HealthSettings::default()
    };
    let snapshot = raidz2(&["ONLINE"; 6]);
    let health = aggregate_pool(&snapshot, "tank", &SlotMap::unavailable(), &narrow);
    assert_eq!(health.groups[0].vdevs[0].tier, Tier::Critical);
}

#[test]
fn test_concatenation_and_auxiliary_groups() {
    let snapshot = snapshot(json!({
        "data": {
            "config": {
                "data": {
                    "state": "ONLINE",
                    "vdev": {
                        "c1t0d0": {"state": "ONLINE"},
                        "c1t1d0": {"state": "ONLINE"},
                        "c1t2d0": {"state": "ONLINE"}
                    }
                },
                "cache": {"vdev": {"c4t0d0": {"state": "ONLINE"}, "c4t1d0": {"state": "FAULTED"}}},
                "spares": {"vdev": {"c5t0d0": {"state": "AVAIL"}}}
            }
        }
    }));
    let health = aggregate_pool(&snapshot, "data", &SlotMap::unavailable(), &HealthSettings::default());

    let roles: Vec<GroupRole> = health.groups.iter().map(|g| g.role).collect();
    assert_eq!(roles, vec![GroupRole::Primary, GroupRole::Cache]);

    let concat = &health.groups[0].vdevs[0];
    assert_eq!(concat.label, CONCATENATION_LABEL);
    assert_eq!(concat.kind, VdevKind::Concatenation);
    assert_eq!(concat.online, 3);
    assert_eq!(concat.effective, 1);
    assert_eq!(concat.faulted, 0);
    assert_eq!(concat.tier, Tier::Ok);
    assert_eq!(concat.devices.len(), 3);

    let cache = &health.groups[1].vdevs[0];
    assert_eq!(cache.label, "cache");
    assert_eq!(cache.faulted, 1);
    assert_eq!(cache.effective, 0);
    assert_eq!(cache.state, DeviceState::Degraded);
}

#[test]
fn test_online_devices_cardinality() {
    let devices: serde_json::Map<String, Value> = (0..12)
        .map(|i| (format!("c1t{}d0", i), json!({"state": "ONLINE"})))
        .collect();
    let snapshot = snapshot(json!({"wide": {"config": {"wide": {"vdev": devices}}}}));

    let ratio = aggregate_pool(&snapshot, "wide", &SlotMap::unavailable(), &HealthSettings::default());
    assert_eq!(ratio.groups[0].vdevs[0].tier, Tier::Ok);

    let counted = HealthSettings {
        cardinality: Cardinality::OnlineDevices,
        ..HealthSettings::default()
    };
    let health = aggregate_pool(&snapshot, "wide", &SlotMap::unavailable(), &counted);
    assert_eq!(health.groups[0].vdevs[0].effective, 12);
    assert_eq!(health.groups[0].vdevs[0].tier, Tier::Critical);
}

#[test]
fn test_unknown_pool_is_empty() {
    let snapshot = raidz2(&["ONLINE"; 6]);
    let health = aggregate_pool(&snapshot, "nope", &SlotMap::unavailable(), &HealthSettings::default());
    assert!(health.is_empty());
    assert_eq!(health.pool, "nope");
    assert_eq!(health.worst_tier(), None);
}

#[test]
fn test_devices_carry_slots() {
    let slots: SlotDocument = serde_json::from_value(json!({
        "c1t0d0": {"jbod": "jbod:1", "slot#": "1"}
    }))
    .unwrap();
    let snapshot = raidz2(&["ONLINE"; 6]);
    let health = aggregate_pool(
        &snapshot,
        "tank",
        &SlotMap::from_document(slots),
        &HealthSettings::default(),
    );

    let devices = &health.groups[0].vdevs[0].devices;
    assert_eq!(
        devices[0].slot,
        SlotAnnotation::Located {
            enclosure: "jbod:1".to_string(),
            slot: "1".to_string()
        }
    );
    assert_eq!(devices[1].slot, SlotAnnotation::Unavailable);
}

#[test]
fn test_aggregation_deterministic() {
    let snapshot = raidz2(&["ONLINE", "DEGRADED", "ONLINE", "ONLINE", "ONLINE", "ONLINE"]);
    let settings = HealthSettings::default();
    let first = aggregate_pool(&snapshot, "tank", &SlotMap::unavailable(), &settings);
    let second = aggregate_pool(&snapshot, "tank", &SlotMap::unavailable(), &settings);
    assert_eq!(first, second);
}
