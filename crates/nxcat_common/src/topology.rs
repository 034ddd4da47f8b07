//! Typed pool topology.
//!
//! The raw `zpool status` document nests vdevs to arbitrary depth and mixes
//! leaf devices with groups under the same key. It is normalized once, at
//! load time, into a tree of [`VdevNode`]s whose [`VdevKind`] is decided by
//! inspecting the identifier. Queries never look at the raw document again.

use crate::documents::{RawGroup, RawPool, RawVdev, TopologyDocument};
use crate::error::NxcatError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Canonical Solaris device name: c<ctrl>t<target>d<disk>, optionally
/// followed by a slice or partition suffix. Targets may be WWNs.
static SIMPLE_DEVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^c[0-9]+t[0-9A-Fa-f]+d[0-9]+").unwrap());

static RAIDZ: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^raidz([0-9]*)-[0-9]+$").unwrap());

static MIRROR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^mirror-[0-9]+$").unwrap());

static SPARE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^spare[-_].+$").unwrap());

/// True for identifiers that name a physical device rather than a group.
pub fn is_simple_device(id: &str) -> bool {
    SIMPLE_DEVICE.is_match(id)
}

/// Device or vdev state as reported by the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceState {
    Online,
    Degraded,
    Faulted,
    /// Any other appliance-defined state (UNAVAIL, OFFLINE, AVAIL, INUSE, ...)
    Other(String),
}

impl DeviceState {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "ONLINE" => DeviceState::Online,
            "DEGRADED" => DeviceState::Degraded,
            "FAULTED" => DeviceState::Faulted,
            other => DeviceState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Online => "ONLINE",
            DeviceState::Degraded => "DEGRADED",
            DeviceState::Faulted => "FAULTED",
            DeviceState::Other(s) => s,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, DeviceState::Online)
    }

    /// FAULTED or DEGRADED: the states counted against a group.
    pub fn is_failed(&self) -> bool {
        matches!(self, DeviceState::Faulted | DeviceState::Degraded)
    }
}

impl From<String> for DeviceState {
    fn from(s: String) -> Self {
        DeviceState::parse(&s)
    }
}

impl From<DeviceState> for String {
    fn from(state: DeviceState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shape of a vdev node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VdevKind {
    Leaf,
    Mirror,
    #[serde(rename = "raidz")]
    RaidZ { parity: u8 },
    Spare,
    Concatenation,
}

impl std::fmt::Display for VdevKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VdevKind::Leaf => write!(f, "leaf"),
            VdevKind::Mirror => write!(f, "mirror"),
            VdevKind::RaidZ { parity } => write!(f, "raidz{}", parity),
            VdevKind::Spare => write!(f, "spare"),
            VdevKind::Concatenation => write!(f, "concatenation"),
        }
    }
}

/// Why an identifier could not be given a recognized shape.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Unrecognized {
    Parity(String),
    Shape,
}

/// Classify a raw entry by identifier. `has_children` tells whether the
/// entry nests a further `vdev` mapping.
fn classify(id: &str, has_children: bool) -> (VdevKind, Option<Unrecognized>) {
    if is_simple_device(id) {
        return (VdevKind::Leaf, None);
    }

    let lower = id.to_ascii_lowercase();
    if let Some(caps) = RAIDZ.captures(&lower) {
        // Bare "raidz-N" is single parity.
        let digits = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let parity = if digits.is_empty() { Ok(1) } else { digits.parse::<u8>() };
        return match parity {
            Ok(p @ 1..=3) => (VdevKind::RaidZ { parity: p }, None),
            _ => (VdevKind::Concatenation, Some(Unrecognized::Parity(digits.to_string()))),
        };
    }
    if MIRROR.is_match(&lower) {
        return (VdevKind::Mirror, None);
    }
    if SPARE.is_match(&lower) {
        return (VdevKind::Spare, None);
    }

    if has_children {
        (VdevKind::Concatenation, Some(Unrecognized::Shape))
    } else {
        // Opaque terminal identifier (e.g. a path or a GUID)
        (VdevKind::Leaf, None)
    }
}

/// One node of the vdev tree. A `Leaf` never has children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VdevNode {
    pub id: String,
    pub state: DeviceState,
    pub kind: VdevKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<VdevNode>,
    /// Diagnostic message attached by the appliance to failed devices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl VdevNode {
    pub fn leaf(id: impl Into<String>, state: DeviceState) -> Self {
        Self {
            id: id.into(),
            state,
            kind: VdevKind::Leaf,
            children: Vec::new(),
            info: None,
        }
    }

    pub fn group(id: impl Into<String>, kind: VdevKind, state: DeviceState, children: Vec<VdevNode>) -> Self {
        Self {
            id: id.into(),
            state,
            kind,
            children,
            info: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == VdevKind::Leaf
    }

    /// Identifier truncated at its first `-` (`raidz2-0` -> `raidz2`).
    pub fn label(&self) -> &str {
        self.id.split('-').next().unwrap_or(&self.id)
    }

    /// Case-insensitive identifier comparison.
    pub fn matches(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }

    /// All leaves below this node (or the node itself), depth first.
    pub fn leaves(&self) -> Vec<&VdevNode> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(node: &'a VdevNode, out: &mut Vec<&'a VdevNode>) {
    if node.is_leaf() {
        out.push(node);
        return;
    }
    for child in &node.children {
        collect_leaves(child, out);
    }
}

/// Role of a vdev group within its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    Primary,
    Cache,
    Log,
    Spare,
}

impl GroupRole {
    /// Auxiliary groups in resolution order.
    pub const AUXILIARY: [GroupRole; 3] = [GroupRole::Cache, GroupRole::Log, GroupRole::Spare];

    /// Key of this group in the raw `config` mapping.
    pub fn config_key<'a>(&self, pool: &'a str) -> &'a str {
        match self {
            GroupRole::Primary => pool,
            GroupRole::Cache => "cache",
            GroupRole::Log => "logs",
            GroupRole::Spare => "spares",
        }
    }

    pub fn from_config_key(pool: &str, key: &str) -> Option<Self> {
        match key {
            "cache" => Some(GroupRole::Cache),
            "logs" => Some(GroupRole::Log),
            "spares" => Some(GroupRole::Spare),
            k if k == pool => Some(GroupRole::Primary),
            _ => None,
        }
    }
}

impl std::fmt::Display for GroupRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupRole::Primary => write!(f, "primary"),
            GroupRole::Cache => write!(f, "cache"),
            GroupRole::Log => write!(f, "logs"),
            GroupRole::Spare => write!(f, "spares"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VdevGroup {
    pub name: String,
    pub role: GroupRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<DeviceState>,
    pub nodes: Vec<VdevNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<String>,
    /// Present groups, ordered primary, cache, logs, spares
    pub groups: Vec<VdevGroup>,
}

impl Pool {
    pub fn group(&self, role: GroupRole) -> Option<&VdevGroup> {
        self.groups.iter().find(|g| g.role == role)
    }

    pub fn primary(&self) -> Option<&VdevGroup> {
        self.group(GroupRole::Primary)
    }
}

/// Immutable view of every pool in one topology document.
#[derive(Debug, Default)]
pub struct TopologySnapshot {
    pools: BTreeMap<String, Pool>,
    issues: Vec<NxcatError>,
}

impl TopologySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a raw document. With `filter`, only that pool is kept.
    pub fn from_document(doc: &TopologyDocument, filter: Option<&str>) -> Self {
        let mut snapshot = Self::empty();
        for (name, raw) in doc {
            if filter.is_some_and(|f| f != name.as_str()) {
                continue;
            }
            let (pool, issues) = build_pool(name, raw);
            debug!("Pool {}: {} vdev groups", name, pool.groups.len());
            snapshot.pools.insert(name.clone(), pool);
            snapshot.issues.extend(issues);
        }
        snapshot
    }

    pub fn pool(&self, name: &str) -> Option<&Pool> {
        self.pools.get(name)
    }

    pub fn pool_names(&self) -> Vec<&str> {
        self.pools.keys().map(String::as_str).collect()
    }

    /// Shapes that were degraded to a concatenation while building.
    pub fn issues(&self) -> &[NxcatError] {
        &self.issues
    }
}

/// Build one pool and collect the topology inconsistencies found on the way.
pub fn build_pool(name: &str, raw: &RawPool) -> (Pool, Vec<NxcatError>) {
    let mut builder = Builder {
        pool: name,
        issues: Vec::new(),
    };

    let mut groups = Vec::new();
    for role in [GroupRole::Primary, GroupRole::Cache, GroupRole::Log, GroupRole::Spare] {
        let key = role.config_key(name);
        if let Some(raw_group) = raw.config.get(key) {
            groups.push(builder.group(key, role, raw_group));
        }
    }

    for key in raw.config.keys() {
        if GroupRole::from_config_key(name, key).is_none() {
            debug!("Pool {}: ignoring unknown config section {}", name, key);
        }
    }

    let pool = Pool {
        name: name.to_string(),
        status: raw.status.as_ref().map(|t| t.joined()).filter(|s| !s.is_empty()),
        scan: raw.scan.as_ref().map(|t| t.joined()).filter(|s| !s.is_empty()),
        groups,
    };
    (pool, builder.issues)
}

struct Builder<'a> {
    pool: &'a str,
    issues: Vec<NxcatError>,
}

impl Builder<'_> {
    fn group(&mut self, key: &str, role: GroupRole, raw: &RawGroup) -> VdevGroup {
        VdevGroup {
            name: key.to_string(),
            role,
            state: raw.state.as_deref().map(DeviceState::parse),
            nodes: raw.vdev.iter().map(|(id, v)| self.node(id, v)).collect(),
        }
    }

    fn node(&mut self, id: &str, raw: &RawVdev) -> VdevNode {
        for field in &raw.malformed {
            self.inconsistent(id, format!("malformed {} field ignored", field));
        }

        let nested = raw.vdev.as_ref().filter(|v| !v.is_empty());
        let (kind, unrecognized) = classify(id, nested.is_some());

        if let Some(reason) = unrecognized {
            let detail = match reason {
                Unrecognized::Parity(p) => format!("unsupported raidz parity '{}', treated as concatenation", p),
                Unrecognized::Shape => "unrecognized vdev type, treated as concatenation".to_string(),
            };
            self.inconsistent(id, detail);
        }

        let children = match (kind, nested) {
            (VdevKind::Leaf, Some(_)) => {
                self.inconsistent(id, "device entry nests further vdevs, ignored".to_string());
                Vec::new()
            }
            (_, Some(nested)) => nested.iter().map(|(cid, c)| self.node(cid, c)).collect(),
            (_, None) => Vec::new(),
        };

        VdevNode {
            id: id.to_string(),
            state: DeviceState::parse(&raw.state),
            kind,
            children,
            info: raw.info.clone(),
        }
    }

    fn inconsistent(&mut self, vdev: &str, detail: String) {
        warn!("Pool {}: {}: {}", self.pool, vdev, detail);
        self.issues.push(NxcatError::TopologyInconsistent {
            pool: self.pool.to_string(),
            vdev: vdev.to_string(),
            detail,
        });
    }
}
