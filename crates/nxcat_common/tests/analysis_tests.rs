//! End-to-end tests of an analysis run over a temporary collector bundle.

use nxcat_common::config::{DocumentPaths, NxcatConfig};
use nxcat_common::documents::DocumentKind;
use nxcat_common::health::Tier;
use nxcat_common::resolver::Resolution;
use nxcat_common::slots::SlotAnnotation;
use nxcat_common::Analyzer;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn write_json(root: &Path, relative: &str, value: &Value) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn bundle() -> TempDir {
    let dir = tempdir().unwrap();
    let paths = DocumentPaths::default();

    write_json(
        dir.path(),
        &paths.topology,
        &json!({
            "tank": {
                "status": "One or more devices are faulted.",
                "config": {
                    "tank": {
                        "state": "DEGRADED",
                        "vdev": {
                            "raidz2-0": {
                                "state": "DEGRADED",
                                "vdev": {
                                    "c1t0d0": {"state": "ONLINE"},
                                    "c1t1d0": {"state": "ONLINE"},
                                    "c1t2d0": {"state": "ONLINE"},
                                    "c1t3d0": {"state": "ONLINE"},
                                    "c1t4d0": {"state": "ONLINE"},
                                    "c1t5d0": {"state": "FAULTED", "info": "too many errors"}
                                }
                            }
                        }
                    },
                    "cache": {"vdev": {"c2t0d0": {"state": "ONLINE"}}}
                }
            }
        }),
    );
    write_json(
        dir.path(),
        &paths.lun_map,
        &json!({"tank": {"luns": ["c1t0d0", "c1t5d0", "c2t0d0"]}}),
    );
    write_json(
        dir.path(),
        &paths.slot_map,
        &json!({"c1t5d0": {"jbod": "jbod:1", "slot#": "6"}}),
    );
    write_json(
        dir.path(),
        &paths.pool_list,
        &json!({
            "0": {"name": "tank", "health": "DEGRADED", "size": "10T", "alloc": "9T", "free": "1T", "cap": "90%"}
        }),
    );
    dir
}

#[test]
fn test_pool_health_query() {
    let dir = bundle();
    let analyzer = Analyzer::open(dir.path(), &NxcatConfig::default());

    let health = analyzer.pool_health("tank");
    assert_eq!(health.status.as_deref(), Some("One or more devices are faulted."));
    assert_eq!(health.groups.len(), 2);

    let raidz = &health.groups[0].vdevs[0];
    assert_eq!(raidz.faulted, 1);
    assert_eq!(raidz.tier, Tier::Warn);
    assert_eq!(raidz.faults[0].info.as_deref(), Some("too many errors"));
    let located = raidz.devices.iter().find(|d| d.id == "c1t5d0").unwrap();
    assert!(located.slot.is_located());
}

#[test]
fn test_resolution_queries() {
    let dir = bundle();
    let analyzer = Analyzer::open(dir.path(), &NxcatConfig::default());

    assert_eq!(analyzer.resolve("tank", "c1t0d0"), Resolution::Group("raidz2".to_string()));
    assert_eq!(analyzer.locate("C2T0D0").resolution, Resolution::Group("cache".to_string()));
    assert_eq!(analyzer.locate("unknownlun").resolution, Resolution::NotFound);
    assert_eq!(analyzer.slot("c1t5d0").to_string(), "jbod:1, slot:6");
    assert_eq!(analyzer.slot("c1t0d0"), SlotAnnotation::Unavailable);
}

#[test]
fn test_pool_summaries() {
    let dir = bundle();
    let analyzer = Analyzer::open(dir.path(), &NxcatConfig::default());

    let summaries = analyzer.pool_summaries().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].capacity_tier, Some(Tier::Critical));
    assert!(summaries[0].needs_detail);
}

#[test]
fn test_unavailable_documents() {
    let dir = bundle();
    let analyzer = Analyzer::open(dir.path(), &NxcatConfig::default());

    let missing: Vec<DocumentKind> = analyzer.unavailable().iter().map(|d| d.document).collect();
    assert_eq!(missing, vec![DocumentKind::DiskStats]);
    assert!(analyzer.disk_audit().is_none());
}

#[test]
fn test_without_slot_map() {
    let dir = bundle();
    fs::remove_file(dir.path().join(DocumentPaths::default().slot_map)).unwrap();
    let analyzer = Analyzer::open(dir.path(), &NxcatConfig::default());

    assert_eq!(analyzer.slot("c1t5d0"), SlotAnnotation::Unavailable);
    let health = analyzer.pool_health("tank");
    assert!(health.groups[0].vdevs[0].devices.iter().all(|d| !d.slot.is_located()));
    assert_eq!(health.groups[0].vdevs[0].tier, Tier::Warn);
}

#[test]
fn test_odd_vdev_record_leaves_sibling_pool_answerable() {
    let dir = bundle();
    write_json(
        dir.path(),
        &DocumentPaths::default().topology,
        &json!({
            "tank": {
                "config": {
                    "tank": {
                        "vdev": {
                            "raidz2-0": {
                                "state": "ONLINE",
                                "vdev": {
                                    "c1t0d0": {"state": "ONLINE"},
                                    "c1t1d0": {"state": "ONLINE"},
                                    "c1t2d0": {"state": "ONLINE"},
                                    "c1t3d0": {"state": "ONLINE"},
                                    "c1t4d0": {"state": "ONLINE"},
                                    "c1t5d0": {"state": "ONLINE"}
                                }
                            }
                        }
                    }
                }
            },
            "other": {"config": {"other": {"vdev": {"c2t0d0": {"state": null}}}}}
        }),
    );
    let analyzer = Analyzer::open(dir.path(), &NxcatConfig::default());

    assert!(analyzer.unavailable().iter().all(|d| d.document != DocumentKind::Topology));
    let tank = analyzer.pool_health("tank");
    assert_eq!(tank.groups[0].vdevs[0].effective, 6);
    assert_eq!(tank.groups[0].vdevs[0].tier, Tier::Ok);

    let issues = analyzer.snapshot().issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind(), "topology_inconsistent");
    assert!(issues[0].to_string().contains("other"));

    let other = analyzer.pool_health("other");
    assert_eq!(other.groups[0].vdevs[0].devices[0].state.as_str(), "UNKNOWN");
}

#[test]
fn test_config_file_overrides() {
    let dir = bundle();
    let config_path = dir.path().join("nxcat.toml");
    fs::write(&config_path, "[capacity]\nlow_watermark = 90\nhigh_watermark = 95\n").unwrap();

    let config = NxcatConfig::load_from_path(&config_path).unwrap();
    let analyzer = Analyzer::open(dir.path(), &config);
    let summaries = analyzer.pool_summaries().unwrap();
    assert_eq!(summaries[0].capacity_tier, Some(Tier::Ok));
}

#[test]
fn test_bad_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("nxcat.toml");
    fs::write(&config_path, "[health]\nmax_group_devices = \"many\"\n").unwrap();
    let err = NxcatConfig::load_from_path(&config_path).unwrap_err();
    assert_eq!(err.kind(), "config");
}

#[test]
fn test_disk_audit() {
    let dir = bundle();
    write_json(
        dir.path(),
        &DocumentPaths::default().disk_stats,
        &json!({
            "c1t0d0": {"vendor": "HGST", "product": "HUH721010AL", "revision": "A21D", "size:": "10.00TB"},
            "c1t5d0": {"vendor": "SEAGATE", "product": "ST10000NM", "revision": "E002", "size:": "10.00TB"},
            "c9t9d0": {"vendor": "HGST", "product": "HUH721010AL", "revision": "A21D", "size:": "10.00TB"}
        }),
    );
    let analyzer = Analyzer::open(dir.path(), &NxcatConfig::default());

    let audit = analyzer.disk_audit().unwrap();
    assert_eq!(audit.disks.len(), 3);
    assert_eq!(audit.vendors, 2);
    assert_eq!(audit.sizes, 1);
    assert!(audit.is_heterogeneous());
    assert!(audit.disks[1].differs.vendor);
    assert_eq!(audit.disks[1].resolution, Resolution::Group("raidz2".to_string()));
    assert_eq!(audit.disks[2].volume, None);
    assert_eq!(audit.disks[2].resolution, Resolution::NotFound);
}
