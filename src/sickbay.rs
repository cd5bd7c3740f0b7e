//! Host reachability monitoring
//!
//! Provides:
//! - Single-shot reachability probes with a bounded timeout
//! - Per-host consecutive-failure tracking
//! - Alert dispatch when a host reaches its failure threshold

pub mod monitor;
pub mod probe;

pub use monitor::{Monitor, MonitorSettings};
pub use probe::{PingProber, ProbeOutcome, Prober};
