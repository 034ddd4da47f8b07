//! Collector bundle documents.
//!
//! An ingested collector bundle is a directory of JSON documents. Each one
//! is loaded independently: a missing or malformed document narrows the set
//! of answerable queries and is reported, it never aborts the run.

use crate::config::DocumentPaths;
use crate::error::{NxcatError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `zpool status -Dv` as ingested: pool name -> pool object.
pub type TopologyDocument = BTreeMap<String, RawPool>;

/// Volume name -> `{ luns: [...] }`.
pub type LunDocument = BTreeMap<String, RawVolume>;

/// Device id -> `{ jbod, slot# }`. Records are kept loose so that a single
/// odd record cannot take the whole map down.
pub type SlotDocument = BTreeMap<String, serde_json::Value>;

/// `zpool list -o all` as ingested: section -> pool properties.
pub type PoolListDocument = BTreeMap<String, serde_json::Value>;

/// `iostat -En` as ingested: LUN -> device inquiry data.
pub type DiskStatsDocument = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPool {
    #[serde(default)]
    pub config: BTreeMap<String, RawGroup>,

    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<RawText>,

    #[serde(default, deserialize_with = "lenient")]
    pub scan: Option<RawText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGroup {
    #[serde(default, deserialize_with = "lenient")]
    pub state: Option<String>,

    #[serde(default)]
    pub vdev: BTreeMap<String, RawVdev>,
}

/// One vdev entry. Built from any JSON value so that a single odd record
/// cannot fail the whole topology document: fields of the wrong type are
/// dropped and named in `malformed`.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "Value")]
pub struct RawVdev {
    pub state: String,
    pub vdev: Option<BTreeMap<String, RawVdev>>,
    pub info: Option<String>,
    pub malformed: Vec<&'static str>,
}

impl From<Value> for RawVdev {
    fn from(value: Value) -> Self {
        let mut raw = RawVdev {
            state: unknown_state(),
            vdev: None,
            info: None,
            malformed: Vec::new(),
        };
        let Value::Object(mut fields) = value else {
            raw.malformed.push("entry");
            return raw;
        };

        match fields.remove("state") {
            None => {}
            Some(Value::String(state)) => raw.state = state,
            Some(_) => raw.malformed.push("state"),
        }
        match fields.remove("info") {
            None | Some(Value::Null) => {}
            Some(Value::String(info)) => raw.info = Some(info),
            Some(_) => raw.malformed.push("info"),
        }
        match fields.remove("vdev") {
            None | Some(Value::Null) => {}
            Some(Value::Object(children)) => {
                raw.vdev = Some(
                    children
                        .into_iter()
                        .map(|(id, child)| (id, RawVdev::from(child)))
                        .collect(),
                );
            }
            Some(_) => raw.malformed.push("vdev"),
        }
        raw
    }
}

fn unknown_state() -> String {
    "UNKNOWN".to_string()
}

/// Optional field that reads as absent when it has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Free text that the ingestor emits either whole or split into fragments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawText {
    Line(String),
    Fragments(Vec<String>),
}

impl RawText {
    pub fn joined(&self) -> String {
        match self {
            RawText::Line(line) => line.trim().to_string(),
            RawText::Fragments(parts) => parts
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVolume {
    #[serde(default)]
    pub luns: Vec<String>,
}

/// Which bundle document a load result refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Topology,
    LunMap,
    SlotMap,
    PoolList,
    DiskStats,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Topology,
        DocumentKind::LunMap,
        DocumentKind::SlotMap,
        DocumentKind::PoolList,
        DocumentKind::DiskStats,
    ];

    pub fn relative_path<'a>(&self, paths: &'a DocumentPaths) -> &'a str {
        match self {
            DocumentKind::Topology => &paths.topology,
            DocumentKind::LunMap => &paths.lun_map,
            DocumentKind::SlotMap => &paths.slot_map,
            DocumentKind::PoolList => &paths.pool_list,
            DocumentKind::DiskStats => &paths.disk_stats,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Topology => write!(f, "pool topology"),
            DocumentKind::LunMap => write!(f, "LUN map"),
            DocumentKind::SlotMap => write!(f, "slot map"),
            DocumentKind::PoolList => write!(f, "pool list"),
            DocumentKind::DiskStats => write!(f, "disk stats"),
        }
    }
}

/// A document that could not be used in this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnavailableDocument {
    pub document: DocumentKind,
    pub path: PathBuf,
    /// `NxcatError::kind()` of the failure
    pub reason: String,
    pub message: String,
}

/// Read and parse one JSON document. The file handle is scoped to this
/// call. Content that is not valid UTF-8 JSON is malformed.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(NxcatError::DocumentMissing(path.to_path_buf()));
        }
        Err(e) => return Err(NxcatError::Io(e)),
    };

    serde_json::from_slice(&content).map_err(|e| NxcatError::DocumentMalformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// All documents of one collector bundle, each loaded or failed.
#[derive(Debug)]
pub struct Bundle {
    root: PathBuf,
    paths: DocumentPaths,
    pub topology: Result<TopologyDocument>,
    pub lun_map: Result<LunDocument>,
    pub slot_map: Result<SlotDocument>,
    pub pool_list: Result<PoolListDocument>,
    pub disk_stats: Result<DiskStatsDocument>,
}

impl Bundle {
    pub fn load(root: impl AsRef<Path>, paths: &DocumentPaths) -> Self {
        let root = root.as_ref().to_path_buf();
        debug!("Loading collector bundle from {}", root.display());

        let bundle = Self {
            topology: load_kind(&root, paths, DocumentKind::Topology),
            lun_map: load_kind(&root, paths, DocumentKind::LunMap),
            slot_map: load_kind(&root, paths, DocumentKind::SlotMap),
            pool_list: load_kind(&root, paths, DocumentKind::PoolList),
            disk_stats: load_kind(&root, paths, DocumentKind::DiskStats),
            root,
            paths: paths.clone(),
        };

        for missing in bundle.unavailable() {
            match missing.reason.as_str() {
                "document_missing" => debug!("{} not present: {}", missing.document, missing.message),
                _ => warn!("{} unavailable: {}", missing.document, missing.message),
            }
        }

        bundle
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, kind: DocumentKind) -> PathBuf {
        self.root.join(kind.relative_path(&self.paths))
    }

    fn failure(&self, kind: DocumentKind) -> Option<&NxcatError> {
        match kind {
            DocumentKind::Topology => self.topology.as_ref().err(),
            DocumentKind::LunMap => self.lun_map.as_ref().err(),
            DocumentKind::SlotMap => self.slot_map.as_ref().err(),
            DocumentKind::PoolList => self.pool_list.as_ref().err(),
            DocumentKind::DiskStats => self.disk_stats.as_ref().err(),
        }
    }

    /// Documents that failed to load, in `DocumentKind::ALL` order.
    pub fn unavailable(&self) -> Vec<UnavailableDocument> {
        DocumentKind::ALL
            .iter()
            .filter_map(|&kind| {
                self.failure(kind).map(|err| UnavailableDocument {
                    document: kind,
                    path: self.path_of(kind),
                    reason: err.kind().to_string(),
                    message: err.to_string(),
                })
            })
            .collect()
    }
}

fn load_kind<T: DeserializeOwned>(root: &Path, paths: &DocumentPaths, kind: DocumentKind) -> Result<T> {
    let path = root.join(kind.relative_path(paths));
    let doc = load_document(&path);
    if doc.is_ok() {
        debug!("Loaded {} from {}", kind, path.display());
    }
    doc
}
