//! Disk inventory audit over `iostat -En` inquiry data.
//!
//! Every disk is placed in its pool vdev through the LUN locator, and the
//! set of disks is checked for mixed vendors, products and sizes.

use crate::documents::DiskStatsDocument;
use crate::luns::LunMap;
use crate::resolver::{locate, Resolution};
use crate::topology::TopologySnapshot;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Which attributes changed relative to the previous disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Differs {
    pub vendor: bool,
    pub product: bool,
    pub revision: bool,
    pub size: bool,
}

impl Differs {
    pub fn any(&self) -> bool {
        self.vendor || self.product || self.revision || self.size
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskRecord {
    pub lun: String,
    pub vendor: String,
    pub product: String,
    pub revision: String,
    pub size: String,
    pub volume: Option<String>,
    pub resolution: Resolution,
    pub differs: Differs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiskAudit {
    pub disks: Vec<DiskRecord>,
    pub vendors: usize,
    pub products: usize,
    pub sizes: usize,
    pub revisions: usize,
    /// LUNs lacking one of the inquiry attributes
    pub skipped: Vec<String>,
}

impl DiskAudit {
    /// Firmware revisions alone do not make a system heterogeneous.
    pub fn is_heterogeneous(&self) -> bool {
        self.vendors > 1 || self.products > 1 || self.sizes > 1
    }

    pub fn warning(&self) -> Option<String> {
        self.is_heterogeneous().then(|| {
            format!(
                "Disks in system span {} vendors, {} products, {} sizes and {} f/w revs",
                self.vendors, self.products, self.sizes, self.revisions
            )
        })
    }
}

struct Inquiry {
    vendor: String,
    product: String,
    revision: String,
    size: String,
}

fn inquiry(record: &Value) -> Option<Inquiry> {
    Some(Inquiry {
        vendor: field(record, "vendor")?,
        product: field(record, "product")?,
        revision: field(record, "revision")?,
        size: field(record, "size:").or_else(|| field(record, "size"))?,
    })
}

fn field(record: &Value, name: &str) -> Option<String> {
    match record.get(name)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn audit_disks(doc: &DiskStatsDocument, snapshot: &TopologySnapshot, luns: &LunMap) -> DiskAudit {
    let mut audit = DiskAudit::default();
    let mut vendors = BTreeSet::new();
    let mut products = BTreeSet::new();
    let mut sizes = BTreeSet::new();
    let mut revisions = BTreeSet::new();

    for (lun, record) in doc {
        let Some(found) = inquiry(record) else {
            debug!("Disk {} lacks inquiry data, skipping", lun);
            audit.skipped.push(lun.clone());
            continue;
        };

        let differs = match audit.disks.last() {
            Some(prev) => Differs {
                vendor: prev.vendor != found.vendor,
                product: prev.product != found.product,
                revision: prev.revision != found.revision,
                size: prev.size != found.size,
            },
            None => Differs::default(),
        };

        vendors.insert(found.vendor.clone());
        products.insert(found.product.clone());
        sizes.insert(found.size.clone());
        revisions.insert(found.revision.clone());

        let placement = locate(snapshot, luns, lun);
        audit.disks.push(DiskRecord {
            lun: lun.clone(),
            vendor: found.vendor,
            product: found.product,
            revision: found.revision,
            size: found.size,
            volume: placement.volume,
            resolution: placement.resolution,
            differs,
        });
    }

    audit.vendors = vendors.len();
    audit.products = products.len();
    audit.sizes = sizes.len();
    audit.revisions = revisions.len();
    audit
}
