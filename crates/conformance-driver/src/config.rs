use std::time::Duration;

use conformance_core::ServiceLimits;

/// Settings shared by every scenario a driver runs.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Upper bound for a single remote call. Exceeding it is an infrastructure failure.
    pub call_timeout: Duration,
    /// Prefix of generated resource names.
    pub name_prefix: String,
    /// Limits the oracle predicts against.
    pub limits: ServiceLimits,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            name_prefix: "conformance".to_string(),
            limits: ServiceLimits::default(),
        }
    }
}

impl DriverConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the prefix of generated names.
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Set the service limits.
    pub fn with_limits(mut self, limits: ServiceLimits) -> Self {
        self.limits = limits;
        self
    }
}
