//! LUN / volume mapping.

use crate::documents::LunDocument;
use std::collections::{BTreeMap, BTreeSet};

/// LUN -> owning volume, inverted from the volume -> LUNs document. LUN
/// identifiers are stored lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LunMap {
    volumes: BTreeSet<String>,
    owners: BTreeMap<String, String>,
}

impl LunMap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_document(doc: &LunDocument) -> Self {
        let mut map = Self::empty();
        for (volume, raw) in doc {
            for lun in &raw.luns {
                // first volume wins if the document lists a LUN twice
                map.owners
                    .entry(lun.trim().to_lowercase())
                    .or_insert_with(|| volume.clone());
            }
            map.volumes.insert(volume.clone());
        }
        map
    }

    pub fn volume_of(&self, lun: &str) -> Option<&str> {
        self.owners.get(&lun.to_lowercase()).map(String::as_str)
    }

    pub fn volumes(&self) -> impl Iterator<Item = &str> {
        self.volumes.iter().map(String::as_str)
    }
}
