//! LUN resolution.
//!
//! Answers "which vdev does this LUN belong to": the primary group is
//! searched first, depth first, then the cache, logs and spares groups.
//! A LUN found below a spare resolves through the spare: if every device
//! of the spare is ONLINE the spare is standing in transparently and the
//! LUN gets its top-level vdev's label, otherwise the result is `Fault`.

use crate::luns::LunMap;
use crate::topology::{GroupRole, TopologySnapshot, VdevKind, VdevNode};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "result", content = "label", rename_all = "snake_case")]
pub enum Resolution {
    /// Top-level vdev label (`raidz2`, `mirror`, or the device itself when
    /// it sits directly in the primary group) or auxiliary group name
    /// (`cache`, `logs`, `spares`)
    Group(String),
    /// Found below a spare that is not fully ONLINE
    Fault,
    NotFound,
}

impl Resolution {
    pub fn label(&self) -> Option<&str> {
        match self {
            Resolution::Group(label) => Some(label),
            _ => None,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Group(label) => write!(f, "{}", label),
            Resolution::Fault => write!(f, "Fault"),
            Resolution::NotFound => write!(f, "not found"),
        }
    }
}

/// Resolve `lun` within the pool backing `volume`.
pub fn resolve(snapshot: &TopologySnapshot, volume: &str, lun: &str) -> Resolution {
    let Some(pool) = snapshot.pool(volume) else {
        debug!("Volume {} has no pool in topology", volume);
        return Resolution::NotFound;
    };

    if let Some(primary) = pool.primary() {
        for root in &primary.nodes {
            let mut path = Vec::new();
            if find_leaf(root, lun, &mut path) {
                return through_spares(root, &path);
            }
        }
    }

    for role in GroupRole::AUXILIARY {
        let Some(group) = pool.group(role) else {
            continue;
        };
        if group.nodes.iter().any(|n| n.is_leaf() && n.matches(lun)) {
            return Resolution::Group(role.to_string());
        }
    }

    Resolution::NotFound
}

/// Depth-first search for a leaf named `lun`. On success `path` holds the
/// groups from `node` down to the leaf's parent.
fn find_leaf<'a>(node: &'a VdevNode, lun: &str, path: &mut Vec<&'a VdevNode>) -> bool {
    if node.is_leaf() {
        return node.matches(lun);
    }
    path.push(node);
    for child in &node.children {
        if find_leaf(child, lun, path) {
            return true;
        }
    }
    path.pop();
    false
}

fn through_spares(root: &VdevNode, path: &[&VdevNode]) -> Resolution {
    let nearest_spare = path.iter().rev().find(|n| n.kind == VdevKind::Spare);
    match nearest_spare {
        Some(spare) if !spare.children.iter().all(|c| c.state.is_online()) => Resolution::Fault,
        _ => Resolution::Group(root.label().to_string()),
    }
}

/// Where a LUN sits, found from the LUN alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub lun: String,
    pub volume: Option<String>,
    pub resolution: Resolution,
}

/// Find the LUN's owning volume, then resolve it there.
pub fn locate(snapshot: &TopologySnapshot, luns: &LunMap, lun: &str) -> Placement {
    let lun = lun.trim().to_lowercase();
    let volume = luns.volume_of(&lun).map(str::to_string);
    let resolution = match &volume {
        Some(volume) => resolve(snapshot, volume, &lun),
        None => Resolution::NotFound,
    };
    Placement {
        lun,
        volume,
        resolution,
    }
}
