//! Background glucose monitor.
//!
//! - [`monitor`]: the per-run orchestrator ([`MonitorService`]).
//! - [`scheduler`]: fixed-interval, no-overlap run scheduling.
//! - [`config`]: environment configuration for the worker binary.

pub mod config;
pub mod monitor;
pub mod scheduler;

pub use config::{ConfigError, LogFormat, WorkerConfig};
pub use monitor::{MonitorService, MonitorSettings, RunSummary};
pub use scheduler::{MonitorJob, RunScheduler, SchedulerHandle, SchedulerStats, ShutdownReport};
