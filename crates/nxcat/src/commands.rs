//! Command implementations: run one query and print it as text or JSON.

use anyhow::Result;
use nxcat_common::health::{GroupHealth, VdevHealth};
use nxcat_common::pools::PoolSummary;
use nxcat_common::{Analyzer, Placement, PoolHealth, SlotAnnotation};
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

#[derive(Serialize)]
struct PoolsOutput {
    /// `None` when the pool list document is unavailable
    summaries: Option<Vec<PoolSummary>>,
    health: Vec<PoolHealth>,
}

pub fn pools(analyzer: &Analyzer, all: bool, json: bool) -> Result<()> {
    let summaries = analyzer.pool_summaries();

    let detail: Vec<String> = match &summaries {
        Some(list) => list
            .iter()
            .filter(|s| all || s.needs_detail)
            .map(|s| s.name.clone())
            .collect(),
        None if all => analyzer
            .snapshot()
            .pool_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };
    let health: Vec<PoolHealth> = detail.iter().map(|p| analyzer.pool_health(p)).collect();

    if json {
        return print_json(&PoolsOutput { summaries, health });
    }

    match &summaries {
        Some(list) if list.is_empty() => println!("No pools listed"),
        Some(list) => {
            for summary in list {
                print_summary(summary);
            }
        }
        None => println!("Pool list unavailable"),
    }

    for pool in &health {
        println!();
        print_health(pool);
    }
    Ok(())
}

fn print_summary(s: &PoolSummary) {
    let cap = match (s.capacity_percent, s.capacity_tier) {
        (Some(percent), Some(tier)) => format!("{}% {}", percent, tier),
        _ => "-".to_string(),
    };
    println!(
        "{:<16} {:<10} size {:<8} alloc {:<8} free {:<8} cap {:<13} (watermarks {}/{})",
        s.name,
        s.health,
        or_dash(&s.size),
        or_dash(&s.alloc),
        or_dash(&s.free),
        cap,
        s.low_watermark,
        s.high_watermark
    );
    if let Some(bootfs) = s.bootfs.as_deref().filter(|b| *b != "-") {
        println!("{:<16} bootfs {}", "", bootfs);
    }
}

pub fn health(analyzer: &Analyzer, pool: &str, json: bool) -> Result<()> {
    let result = analyzer.pool_health(pool);
    if json {
        return print_json(&result);
    }
    print_health(&result);
    Ok(())
}

fn print_health(pool: &PoolHealth) {
    if pool.is_empty() {
        println!("Pool {}: no vdev groups found", pool.pool);
        return;
    }

    match &pool.state {
        Some(state) => println!("Pool {} ({})", pool.pool, state),
        None => println!("Pool {}", pool.pool),
    }
    if let Some(tier) = pool.worst_tier() {
        println!("  worst {}, {} faulted", tier, pool.total_faulted());
    }
    if let Some(status) = &pool.status {
        println!("  status: {}", status);
    }
    if let Some(scan) = &pool.scan {
        println!("  scan: {}", scan);
    }
    for group in &pool.groups {
        print_group(group);
    }
}

fn print_group(group: &GroupHealth) {
    println!("  [{}] {}", group.role, group.name);
    for vdev in &group.vdevs {
        print_vdev(vdev);
    }
}

fn print_vdev(vdev: &VdevHealth) {
    println!(
        "    {:<14} {:<9} online {:<3} faulted {:<3} effective {:<3} {}",
        vdev.label, vdev.state, vdev.online, vdev.faulted, vdev.effective, vdev.tier
    );
    for device in &vdev.devices {
        let slot = if device.slot.is_located() { device.slot.to_string() } else { "-".to_string() };
        println!("      {:<24} {:<9} {}", device.id, device.state, slot);
    }
    for fault in &vdev.faults {
        match &fault.info {
            Some(info) => println!("      {} {}: {}", fault.state, fault.device, info),
            None => println!("      {} {}", fault.state, fault.device),
        }
    }
}

pub fn resolve(analyzer: &Analyzer, lun: &str, volume: Option<&str>, json: bool) -> Result<()> {
    let placement = match volume {
        Some(volume) => Placement {
            lun: lun.to_string(),
            volume: Some(volume.to_string()),
            resolution: analyzer.resolve(volume, lun),
        },
        None => analyzer.locate(lun),
    };

    if json {
        return print_json(&placement);
    }

    let volume = placement.volume.as_deref().unwrap_or("-");
    match placement.resolution.label() {
        Some(label) => println!("{} (volume {}): in {}", placement.lun, volume, label),
        None => println!("{} (volume {}): {}", placement.lun, volume, placement.resolution),
    }
    Ok(())
}

#[derive(Serialize)]
struct SlotOutput<'a> {
    device: &'a str,
    slot: SlotAnnotation,
}

pub fn slot(analyzer: &Analyzer, device: &str, json: bool) -> Result<()> {
    let slot = analyzer.slot(device);
    if json {
        return print_json(&SlotOutput { device, slot });
    }
    println!("{}: {}", device, slot);
    Ok(())
}

pub fn disks(analyzer: &Analyzer, json: bool) -> Result<()> {
    let audit = analyzer.disk_audit();
    if json {
        return print_json(&audit);
    }

    let Some(audit) = audit else {
        println!("Disk stats unavailable");
        return Ok(());
    };

    for disk in &audit.disks {
        let marker = if disk.differs.any() { "*" } else { " " };
        println!(
            "{}{:<24} {:<10} {:<18} {:<6} {:<12} {:<10} {}",
            marker,
            disk.lun,
            disk.vendor,
            disk.product,
            disk.revision,
            disk.size,
            or_dash(&disk.volume),
            disk.resolution
        );
    }
    for lun in &audit.skipped {
        println!(" {:<24} incomplete inquiry data", lun);
    }
    match audit.warning() {
        Some(warning) => println!("WARNING: {}", warning),
        None => println!("{} disks, consistent", audit.disks.len()),
    }
    Ok(())
}

pub fn documents(analyzer: &Analyzer, json: bool) -> Result<()> {
    let unavailable = analyzer.unavailable();
    if json {
        return print_json(&unavailable);
    }

    if unavailable.is_empty() {
        println!("All documents available");
        return Ok(());
    }
    for doc in unavailable {
        println!("{:<14} {:<20} {}", doc.document.to_string(), doc.reason, doc.path.display());
    }
    Ok(())
}
