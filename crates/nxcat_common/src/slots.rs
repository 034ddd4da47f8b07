//! Physical slot cross-reference.
//!
//! Maps a device identifier to its enclosure (JBOD) and slot number using
//! the optional slot map document. Purely an enrichment: anything missing
//! yields [`SlotAnnotation::Unavailable`].

use crate::documents::SlotDocument;
use serde::Serialize;
use serde_json::Value;

const ENCLOSURE_FIELD: &str = "jbod";
const SLOT_FIELD: &str = "slot#";

/// Where a device physically sits, if known
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotAnnotation {
    Located { enclosure: String, slot: String },
    Unavailable,
}

impl SlotAnnotation {
    pub fn is_located(&self) -> bool {
        matches!(self, SlotAnnotation::Located { .. })
    }
}

impl std::fmt::Display for SlotAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotAnnotation::Located { enclosure, slot } => write!(f, "{}, slot:{}", enclosure, slot),
            SlotAnnotation::Unavailable => write!(f, "unavailable"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SlotMap {
    /// `None` when the slot map document could not be loaded
    records: Option<SlotDocument>,
}

impl SlotMap {
    pub fn from_document(doc: SlotDocument) -> Self {
        Self { records: Some(doc) }
    }

    pub fn unavailable() -> Self {
        Self { records: None }
    }

    /// Enclosure and slot of `device`. Partial records (missing either
    /// field) are treated as unavailable rather than half-rendered.
    pub fn lookup(&self, device: &str) -> SlotAnnotation {
        let Some(records) = &self.records else {
            return SlotAnnotation::Unavailable;
        };

        let record = records.get(device).or_else(|| {
            records
                .iter()
                .find(|(id, _)| id.eq_ignore_ascii_case(device))
                .map(|(_, record)| record)
        });

        let Some(record) = record else {
            return SlotAnnotation::Unavailable;
        };

        match (field_text(record, ENCLOSURE_FIELD), field_text(record, SLOT_FIELD)) {
            (Some(enclosure), Some(slot)) => SlotAnnotation::Located { enclosure, slot },
            _ => SlotAnnotation::Unavailable,
        }
    }
}

/// String or number field rendered as text.
fn field_text(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
