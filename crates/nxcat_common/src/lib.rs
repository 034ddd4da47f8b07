//! Shared analysis engine for nxcat.
//!
//! Reads the JSON documents of an ingested storage collector bundle and
//! answers pool health, LUN placement and slot questions about it.

pub mod analysis;
pub mod config;
pub mod documents;
pub mod error;
pub mod health;
pub mod inventory;
pub mod luns;
pub mod pools;
pub mod resolver;
pub mod slots;
pub mod topology;

pub use analysis::Analyzer;
pub use config::NxcatConfig;
pub use error::{NxcatError, Result};
pub use health::{PoolHealth, Tier};
pub use resolver::{Placement, Resolution};
pub use slots::SlotAnnotation;
pub use topology::TopologySnapshot;
