//! Pool capacity summary from `zpool list -o all`.
//!
//! Capacity tiering against per-pool watermarks (falling back to the
//! configured ones):
//! - cap <= low: OK
//! - low < cap <= high: WARN
//! - cap > high: CRITICAL

use crate::config::CapacitySettings;
use crate::documents::PoolListDocument;
use crate::health::Tier;
use crate::topology::DeviceState;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSummary {
    pub name: String,
    pub health: DeviceState,
    pub bootfs: Option<String>,
    pub size: Option<String>,
    pub alloc: Option<String>,
    pub free: Option<String>,
    /// Percent used, from the `cap` column
    pub capacity_percent: Option<u8>,
    pub low_watermark: u8,
    pub high_watermark: u8,
    pub capacity_tier: Option<Tier>,
    /// Health is not ONLINE: vdev detail should be shown
    pub needs_detail: bool,
}

pub fn capacity_tier(percent: u8, low: u8, high: u8) -> Tier {
    if percent <= low {
        Tier::Ok
    } else if percent <= high {
        Tier::Warn
    } else {
        Tier::Critical
    }
}

/// Parse a percentage like "45%" (0-100).
pub fn parse_percent(s: &str) -> Option<u8> {
    let s = s.trim().trim_end_matches('%').trim();
    let val: u8 = s.parse().ok()?;
    (val <= 100).then_some(val)
}

/// One summary per non-empty section with a pool name. Numbered sections
/// come in numeric order (`2` before `10`), any others after them.
pub fn summarize_pools(doc: &PoolListDocument, defaults: &CapacitySettings) -> Vec<PoolSummary> {
    let mut sections: Vec<(&String, &Value)> = doc.iter().collect();
    sections.sort_by(|a, b| section_order(a.0).cmp(&section_order(b.0)));

    sections
        .into_iter()
        .filter_map(|(section, props)| {
            let summary = summarize_pool(props, defaults);
            if summary.is_none() {
                debug!("Skipping pool list section {}", section);
            }
            summary
        })
        .collect()
}

fn section_order(section: &str) -> (bool, u64, &str) {
    match section.trim().parse::<u64>() {
        Ok(n) => (false, n, section),
        Err(_) => (true, 0, section),
    }
}

fn summarize_pool(props: &Value, defaults: &CapacitySettings) -> Option<PoolSummary> {
    let props = props.as_object().filter(|p| !p.is_empty())?;
    let name = text(props.get("name"))?;

    let health = text(props.get("health"))
        .map(|h| DeviceState::parse(&h))
        .unwrap_or_else(|| DeviceState::Other("UNKNOWN".to_string()));

    let low = percent_value(props.get("lowatermark")).unwrap_or(defaults.effective_low_watermark());
    let high = percent_value(props.get("hiwatermark"))
        .unwrap_or(defaults.effective_high_watermark())
        .max(low);

    let capacity_percent = text(props.get("cap")).and_then(|c| parse_percent(&c));

    Some(PoolSummary {
        needs_detail: !health.is_online(),
        name,
        health,
        bootfs: text(props.get("bootfs")),
        size: text(props.get("size")),
        alloc: text(props.get("alloc")),
        free: text(props.get("free")),
        capacity_percent,
        low_watermark: low,
        high_watermark: high,
        capacity_tier: capacity_percent.map(|p| capacity_tier(p, low, high)),
    })
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Watermark given as "50", "50%" or 50.
fn percent_value(value: Option<&Value>) -> Option<u8> {
    match value? {
        Value::Number(n) => n.as_u64().filter(|v| *v <= 100).map(|v| v as u8),
        Value::String(s) => parse_percent(s),
        _ => None,
    }
}
