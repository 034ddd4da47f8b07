//! Vdev health aggregation.
//!
//! Walks each top-level vdev of a group, counts device states and assigns a
//! RAID-aware health tier. Node states found in the document are reported
//! but never trusted for counting: only children are counted.
//!
//! Tiering:
//! - more than `max_group_devices` effective devices: CRITICAL
//! - raidz with parity p: WARN when `(effective - p)` is odd, else OK
//! - anything else: OK

use crate::config::HealthSettings;
use crate::slots::{SlotAnnotation, SlotMap};
use crate::topology::{DeviceState, GroupRole, TopologySnapshot, VdevGroup, VdevKind, VdevNode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Label used for a primary group made of bare devices.
pub const CONCATENATION_LABEL: &str = "Concatenation";

/// Groups reported per pool, in order.
pub const AGGREGATED_ROLES: [GroupRole; 3] = [GroupRole::Primary, GroupRole::Cache, GroupRole::Log];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Ok,
    Warn,
    Critical,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Ok => write!(f, "OK"),
            Tier::Warn => write!(f, "WARN"),
            Tier::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// How the effective device count of a flat (leaf-only) set is derived.
///
/// `EntryRatio` keeps the historical integer ratio of online entries to
/// total entries, so a healthy concatenation of any width counts as 1 and
/// one missing device floors it to 0. `OnlineDevices` counts online
/// devices, which lets wide concatenations reach CRITICAL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    EntryRatio,
    OnlineDevices,
}

impl Cardinality {
    pub fn effective(&self, online: usize, entries: usize) -> usize {
        match self {
            Cardinality::EntryRatio => online.checked_div(entries).unwrap_or(0),
            Cardinality::OnlineDevices => online,
        }
    }
}

/// Tier for a vdev of `kind` with `effective` counted devices.
pub fn classify_tier(kind: VdevKind, effective: usize, settings: &HealthSettings) -> Tier {
    if effective > settings.max_group_devices {
        return Tier::Critical;
    }
    match kind {
        VdevKind::RaidZ { parity } => {
            // data disks are expected in an even count
            if (effective as i64 - parity as i64).rem_euclid(2) != 0 {
                Tier::Warn
            } else {
                Tier::Ok
            }
        }
        _ => Tier::Ok,
    }
}

/// A leaf device with its physical location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReport {
    pub id: String,
    pub state: DeviceState,
    pub slot: SlotAnnotation,
}

/// A failed (FAULTED or DEGRADED) device and the appliance's diagnosis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultDetail {
    pub device: String,
    pub state: DeviceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl FaultDetail {
    fn of(node: &VdevNode) -> Self {
        Self {
            device: node.id.clone(),
            state: node.state.clone(),
            info: node.info.clone(),
        }
    }
}

/// Health of one top-level vdev (or of a group's flat device set)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VdevHealth {
    pub label: String,
    pub kind: VdevKind,
    /// State as reported, or derived for a flat device set
    pub state: DeviceState,
    pub online: usize,
    pub faulted: usize,
    /// Device count the tier was computed from
    pub effective: usize,
    pub tier: Tier,
    pub devices: Vec<DeviceReport>,
    pub faults: Vec<FaultDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupHealth {
    pub name: String,
    pub role: GroupRole,
    pub vdevs: Vec<VdevHealth>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolHealth {
    pub pool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<DeviceState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<String>,
    pub groups: Vec<GroupHealth>,
}

impl PoolHealth {
    fn not_found(pool: &str) -> Self {
        Self {
            pool: pool.to_string(),
            state: None,
            status: None,
            scan: None,
            groups: Vec::new(),
        }
    }

    /// No group was found for the pool. A valid, reportable outcome.
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.vdevs.is_empty())
    }

    pub fn worst_tier(&self) -> Option<Tier> {
        self.groups
            .iter()
            .flat_map(|g| g.vdevs.iter().map(|v| v.tier))
            .max()
    }

    pub fn total_faulted(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.vdevs.iter().map(|v| v.faulted))
            .sum()
    }
}

/// Aggregate the primary, cache and log groups of `pool`. An unknown pool
/// yields an empty result.
pub fn aggregate_pool(
    snapshot: &TopologySnapshot,
    pool: &str,
    slots: &SlotMap,
    settings: &HealthSettings,
) -> PoolHealth {
    let Some(found) = snapshot.pool(pool) else {
        debug!("Pool {} not in topology", pool);
        return PoolHealth::not_found(pool);
    };

    let groups: Vec<GroupHealth> = AGGREGATED_ROLES
        .iter()
        .filter_map(|&role| found.group(role))
        .map(|group| aggregate_group(group, slots, settings))
        .collect();

    PoolHealth {
        pool: pool.to_string(),
        state: found.primary().and_then(|g| g.state.clone()),
        status: found.status.clone(),
        scan: found.scan.clone(),
        groups,
    }
}

/// Aggregate one group: one result per redundancy node, plus one result
/// for all bare devices of the group, placed where the first one appears.
pub fn aggregate_group(group: &VdevGroup, slots: &SlotMap, settings: &HealthSettings) -> GroupHealth {
    let flat: Vec<&VdevNode> = group.nodes.iter().filter(|n| n.is_leaf()).collect();

    let mut vdevs = Vec::new();
    let mut flat_done = false;
    for node in &group.nodes {
        if node.is_leaf() {
            if !flat_done {
                vdevs.push(aggregate_flat(group, &flat, slots, settings));
                flat_done = true;
            }
            continue;
        }
        vdevs.push(aggregate_node(node, slots, settings));
    }

    GroupHealth {
        name: group.name.clone(),
        role: group.role,
        vdevs,
    }
}

fn flat_label(role: GroupRole) -> String {
    match role {
        GroupRole::Primary => CONCATENATION_LABEL.to_string(),
        other => other.to_string(),
    }
}

fn aggregate_flat(
    group: &VdevGroup,
    leaves: &[&VdevNode],
    slots: &SlotMap,
    settings: &HealthSettings,
) -> VdevHealth {
    let online = leaves.iter().filter(|n| n.state.is_online()).count();
    let faulted = leaves.iter().filter(|n| n.state.is_failed()).count();
    let effective = settings.cardinality.effective(online, leaves.len());
    let kind = VdevKind::Concatenation;

    let state = if online == leaves.len() {
        DeviceState::Online
    } else {
        DeviceState::Degraded
    };

    VdevHealth {
        label: flat_label(group.role),
        kind,
        state,
        online,
        faulted,
        effective,
        tier: classify_tier(kind, effective, settings),
        devices: leaves.iter().map(|n| device_report(n, slots)).collect(),
        faults: leaves
            .iter()
            .filter(|n| n.state.is_failed())
            .copied()
            .map(FaultDetail::of)
            .collect(),
    }
}

/// Count one level down. A failed child that is itself a group (e.g. a
/// mirror half replaced through a spare) is descended once more, and only
/// FAULTED devices there count against this node.
fn aggregate_node(node: &VdevNode, slots: &SlotMap, settings: &HealthSettings) -> VdevHealth {
    let mut online = 0;
    let mut faulted = 0;
    let mut faults = Vec::new();

    for child in &node.children {
        if child.state.is_online() {
            online += 1;
        } else if child.is_leaf() {
            if child.state.is_failed() {
                faulted += 1;
                faults.push(FaultDetail::of(child));
            }
        } else {
            for grandchild in &child.children {
                if grandchild.state == DeviceState::Faulted {
                    faulted += 1;
                }
                if grandchild.state.is_failed() {
                    faults.push(FaultDetail::of(grandchild));
                }
            }
        }
    }

    let effective = online;
    VdevHealth {
        label: node.id.clone(),
        kind: node.kind,
        state: node.state.clone(),
        online,
        faulted,
        effective,
        tier: classify_tier(node.kind, effective, settings),
        devices: node.leaves().into_iter().map(|n| device_report(n, slots)).collect(),
        faults,
    }
}

fn device_report(node: &VdevNode, slots: &SlotMap) -> DeviceReport {
    DeviceReport {
        id: node.id.clone(),
        state: node.state.clone(),
        slot: slots.lookup(&node.id),
    }
}
