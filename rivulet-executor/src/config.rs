//! Network configuration.

use rivulet_core::error::{Result, RivuletError};

/// Default capacity of connections created without an explicit one.
pub const DEFAULT_CAPACITY: usize = 10;

/// Configuration for a network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name used in logs and deadlock reports.
    pub name: String,
    /// Capacity of connections created without an explicit one.
    pub default_capacity: usize,
    /// Fail the run when every runner is blocked.
    ///
    /// With detection off a deadlocked run waits forever.
    pub deadlock_detection: bool,
    /// Default eviction policy for new connections.
    pub drop_oldest: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            default_capacity: DEFAULT_CAPACITY,
            deadlock_detection: true,
            drop_oldest: false,
        }
    }
}

impl NetworkConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `RIVULET_DEFAULT_CAPACITY`: Default connection capacity
    /// - `RIVULET_DEADLOCK_DETECTION`: "false" or "0" to disable detection
    /// - `RIVULET_DROP_OLDEST`: "true" or "1" to evict instead of blocking
    ///
    /// # Example
    ///
    /// ```bash
    /// export RIVULET_DEFAULT_CAPACITY=64
    /// export RIVULET_DROP_OLDEST=true
    /// ```
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_capacity = std::env::var("RIVULET_DEFAULT_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.default_capacity);

        let deadlock_detection = std::env::var("RIVULET_DEADLOCK_DETECTION")
            .map(|s| !(s.eq_ignore_ascii_case("false") || s == "0"))
            .unwrap_or(defaults.deadlock_detection);

        let drop_oldest = std::env::var("RIVULET_DROP_OLDEST")
            .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
            .unwrap_or(defaults.drop_oldest);

        Self {
            default_capacity: default_capacity.max(1),
            deadlock_detection,
            drop_oldest,
            ..defaults
        }
    }

    /// Set the network name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the default connection capacity.
    pub fn with_default_capacity(mut self, capacity: usize) -> Self {
        self.default_capacity = capacity;
        self
    }

    /// Enable or disable deadlock detection.
    pub fn with_deadlock_detection(mut self, enabled: bool) -> Self {
        self.deadlock_detection = enabled;
        self
    }

    /// Set the default eviction policy.
    pub fn with_drop_oldest(mut self, drop_oldest: bool) -> Self {
        self.drop_oldest = drop_oldest;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.default_capacity == 0 {
            return Err(RivuletError::InvalidConfig {
                field: "default_capacity".to_string(),
                cause: "must be at least 1".to_string(),
            });
        }
        if self.name.is_empty() {
            return Err(RivuletError::InvalidConfig {
                field: "name".to_string(),
                cause: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
