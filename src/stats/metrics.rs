//! Delivery and connection statistics
//!
//! Dropped messages are never reported to publishers, so these counters are
//! the only place where backpressure becomes visible.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::registry::Delivery;

/// Live delivery counters shared by the registry and the routers
#[derive(Debug, Default)]
pub struct DeliveryCounters {
    delivered: AtomicU64,
    dropped_full: AtomicU64,
    dropped_offline: AtomicU64,
    dropped_closed: AtomicU64,
    dropped_invalid: AtomicU64,
    channel_overflow: AtomicU64,
}

impl DeliveryCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one per-recipient delivery attempt
    pub fn record(&self, outcome: Delivery) {
        let counter = match outcome {
            Delivery::Delivered => &self.delivered,
            Delivery::QueueFull => &self.dropped_full,
            Delivery::Offline => &self.dropped_offline,
            Delivery::Closed => &self.dropped_closed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message dropped because it had no valid destination
    pub fn record_invalid(&self) {
        self.dropped_invalid.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event dropped because a router channel was full
    pub fn record_overflow(&self) {
        self.channel_overflow.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent-enough copy of the counters
    pub fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            dropped_offline: self.dropped_offline.load(Ordering::Relaxed),
            dropped_closed: self.dropped_closed.load(Ordering::Relaxed),
            dropped_invalid: self.dropped_invalid.load(Ordering::Relaxed),
            channel_overflow: self.channel_overflow.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time delivery statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Frames placed on an outbound queue
    pub delivered: u64,
    /// Frames dropped because the recipient's queue was full
    pub dropped_full: u64,
    /// Frames addressed to an actor with no live connection
    pub dropped_offline: u64,
    /// Frames addressed to a connection whose writer already exited
    pub dropped_closed: u64,
    /// Messages with neither recipient nor room
    pub dropped_invalid: u64,
    /// Events dropped before routing because a router channel was full
    pub channel_overflow: u64,
}

impl DeliveryStats {
    /// Total per-recipient drops
    pub fn dropped(&self) -> u64 {
        self.dropped_full + self.dropped_offline + self.dropped_closed
    }
}

/// Server-wide connection counters
#[derive(Debug, Default)]
pub struct ConnectionCounters {
    total: AtomicU64,
    active: AtomicU64,
    rejected: AtomicU64,
}

impl ConnectionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection was admitted
    pub fn opened(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    /// An admitted connection finished
    pub fn closed(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    /// A connection was refused (limit, handshake, handler)
    pub fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            total_connections: self.total.load(Ordering::Relaxed),
            active_connections: self.active.load(Ordering::Relaxed),
            rejected_connections: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time server statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Total connections ever admitted
    pub total_connections: u64,
    /// Currently open connections
    pub active_connections: u64,
    /// Connections refused before admission
    pub rejected_connections: u64,
}
