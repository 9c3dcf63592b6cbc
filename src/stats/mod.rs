//! Statistics for deliveries and connections

pub mod metrics;

pub use metrics::{ConnectionCounters, DeliveryCounters, DeliveryStats, ServerStats};
