//! Registry and router configuration

/// Capacities of the outbound queues and router channels
///
/// Every channel is bounded. Enqueueing never waits: once a channel is full,
/// further items are dropped.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Per-connection outbound queue capacity
    pub outbound_queue_capacity: usize,

    /// Hub publish channel capacity
    pub hub_channel_capacity: usize,

    /// Signaling router channel capacity
    pub signal_channel_capacity: usize,

    /// Room event channel capacity
    pub room_channel_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: 256,
            hub_channel_capacity: 256,
            signal_channel_capacity: 256,
            room_channel_capacity: 256,
        }
    }
}

impl RegistryConfig {
    /// Set the per-connection outbound queue capacity
    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    /// Set the hub channel capacity
    pub fn hub_channel_capacity(mut self, capacity: usize) -> Self {
        self.hub_channel_capacity = capacity.max(1);
        self
    }

    /// Set the signaling channel capacity
    pub fn signal_channel_capacity(mut self, capacity: usize) -> Self {
        self.signal_channel_capacity = capacity.max(1);
        self
    }

    /// Set the room event channel capacity
    pub fn room_channel_capacity(mut self, capacity: usize) -> Self {
        self.room_channel_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.outbound_queue_capacity, 256);
        assert_eq!(config.hub_channel_capacity, 256);
        assert_eq!(config.signal_channel_capacity, 256);
        assert_eq!(config.room_channel_capacity, 256);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .outbound_queue_capacity(8)
            .hub_channel_capacity(16)
            .signal_channel_capacity(32)
            .room_channel_capacity(64);

        assert_eq!(config.outbound_queue_capacity, 8);
        assert_eq!(config.hub_channel_capacity, 16);
        assert_eq!(config.signal_channel_capacity, 32);
        assert_eq!(config.room_channel_capacity, 64);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        // tokio mpsc panics on zero capacity
        let config = RegistryConfig::default().outbound_queue_capacity(0);

        assert_eq!(config.outbound_queue_capacity, 1);
    }
}
