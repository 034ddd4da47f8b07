//! One analysis run over a loaded collector bundle.
//!
//! The analyzer is built once from the bundle and the configuration and is
//! read-only afterwards; every query is a function of that state.

use crate::config::NxcatConfig;
use crate::documents::{Bundle, DiskStatsDocument, PoolListDocument, UnavailableDocument};
use crate::health::{aggregate_pool, PoolHealth};
use crate::inventory::{audit_disks, DiskAudit};
use crate::luns::LunMap;
use crate::pools::{summarize_pools, PoolSummary};
use crate::resolver::{self, Placement, Resolution};
use crate::slots::{SlotAnnotation, SlotMap};
use crate::topology::TopologySnapshot;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Analyzer {
    config: NxcatConfig,
    snapshot: TopologySnapshot,
    luns: LunMap,
    slots: SlotMap,
    pool_list: Option<PoolListDocument>,
    disk_stats: Option<DiskStatsDocument>,
    unavailable: Vec<UnavailableDocument>,
}

impl Analyzer {
    /// Load the bundle at `root` and build the run state.
    pub fn open(root: impl AsRef<Path>, config: &NxcatConfig) -> Self {
        let bundle = Bundle::load(root, &config.documents);
        Self::from_bundle(bundle, config)
    }

    pub fn from_bundle(bundle: Bundle, config: &NxcatConfig) -> Self {
        let unavailable = bundle.unavailable();

        let snapshot = match &bundle.topology {
            Ok(doc) => TopologySnapshot::from_document(doc, None),
            Err(_) => TopologySnapshot::empty(),
        };
        let luns = match &bundle.lun_map {
            Ok(doc) => LunMap::from_document(doc),
            Err(_) => LunMap::empty(),
        };

        if config.capacity.watermarks_were_clamped() {
            warn!(
                "Capacity watermarks clamped to {}/{}",
                config.capacity.effective_low_watermark(),
                config.capacity.effective_high_watermark()
            );
        }

        info!(
            "Bundle {}: {} pools, {} volumes, {} topology issues, {} documents unavailable",
            bundle.root().display(),
            snapshot.pool_names().len(),
            luns.volumes().count(),
            snapshot.issues().len(),
            unavailable.len()
        );

        let slots = match bundle.slot_map {
            Ok(doc) => SlotMap::from_document(doc),
            Err(_) => SlotMap::unavailable(),
        };

        Self {
            config: config.clone(),
            snapshot,
            luns,
            slots,
            pool_list: bundle.pool_list.ok(),
            disk_stats: bundle.disk_stats.ok(),
            unavailable,
        }
    }

    pub fn snapshot(&self) -> &TopologySnapshot {
        &self.snapshot
    }

    pub fn pool_health(&self, pool: &str) -> PoolHealth {
        aggregate_pool(&self.snapshot, pool, &self.slots, &self.config.health)
    }

    pub fn resolve(&self, volume: &str, lun: &str) -> Resolution {
        resolver::resolve(&self.snapshot, volume, lun)
    }

    pub fn locate(&self, lun: &str) -> Placement {
        resolver::locate(&self.snapshot, &self.luns, lun)
    }

    pub fn slot(&self, device: &str) -> SlotAnnotation {
        self.slots.lookup(device)
    }

    /// `None` when the pool list document is unavailable.
    pub fn pool_summaries(&self) -> Option<Vec<PoolSummary>> {
        self.pool_list
            .as_ref()
            .map(|doc| summarize_pools(doc, &self.config.capacity))
    }

    /// `None` when the disk stats document is unavailable.
    pub fn disk_audit(&self) -> Option<DiskAudit> {
        self.disk_stats
            .as_ref()
            .map(|doc| audit_disks(doc, &self.snapshot, &self.luns))
    }

    pub fn unavailable(&self) -> &[UnavailableDocument] {
        &self.unavailable
    }
}
