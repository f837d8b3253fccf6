//! Registry statistics

pub mod metrics;

pub(crate) use metrics::RegistryCounters;
pub use metrics::RegistryStats;
