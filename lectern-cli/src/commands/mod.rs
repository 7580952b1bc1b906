//! CLI command implementations

mod config;
mod probe;
mod record;

pub use config::{config, ConfigArgs};
pub use probe::{probe, ProbeArgs};
pub use record::{record, RecordArgs};
