use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inter-node connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Upper bound on establishing a channel to a node
    pub dial_timeout: Duration,

    /// Per-call timeout for job store RPCs
    pub rpc_timeout: Duration,

    /// Quiet period after which a ready channel reports idle
    pub idle_timeout: Option<Duration>,

    /// Speak HTTP/2 without an upgrade round-trip
    pub http2_prior_knowledge: bool,
}

impl ConnectionConfig {
    /// Create a configuration with the default timeouts
    pub fn new() -> Self {
        Self {
            dial_timeout: Duration::from_secs(10),
            rpc_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(300)), // 5 minutes
            http2_prior_knowledge: true,
        }
    }

    /// Set dial timeout
    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set RPC timeout
    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Never report channels as idle
    pub fn without_idle_timeout(mut self) -> Self {
        self.idle_timeout = None;
        self
    }

    /// Toggle HTTP/2 prior knowledge
    pub fn http2_prior_knowledge(mut self, enabled: bool) -> Self {
        self.http2_prior_knowledge = enabled;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.dial_timeout.is_zero() {
            return Err("dial_timeout must be > 0".to_string());
        }

        if self.rpc_timeout.is_zero() {
            return Err("rpc_timeout must be > 0".to_string());
        }

        if self.idle_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err("idle_timeout must be > 0 when set".to_string());
        }

        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.dial_timeout, Duration::from_secs(10));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(300)));
        assert!(config.http2_prior_knowledge);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ConnectionConfig::new()
            .dial_timeout(Duration::from_millis(250))
            .rpc_timeout(Duration::from_secs(1))
            .without_idle_timeout()
            .http2_prior_knowledge(false);

        assert_eq!(config.dial_timeout, Duration::from_millis(250));
        assert_eq!(config.rpc_timeout, Duration::from_secs(1));
        assert_eq!(config.idle_timeout, None);
        assert!(!config.http2_prior_knowledge);
    }

    #[test]
    fn test_validate() {
        assert!(ConnectionConfig::new().validate().is_ok());

        let zero_dial = ConnectionConfig::new().dial_timeout(Duration::ZERO);
        assert!(zero_dial.validate().is_err());

        let zero_rpc = ConnectionConfig::new().rpc_timeout(Duration::ZERO);
        assert!(zero_rpc.validate().is_err());

        let zero_idle = ConnectionConfig::new().idle_timeout(Duration::ZERO);
        assert!(zero_idle.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_json() {
        let config: ConnectionConfig = serde_json::from_value(serde_json::json!({
            "dial_timeout": {"secs": 2, "nanos": 0},
            "rpc_timeout": {"secs": 1, "nanos": 500000000},
            "idle_timeout": null,
            "http2_prior_knowledge": false
        }))
        .unwrap();

        assert_eq!(config.dial_timeout, Duration::from_secs(2));
        assert_eq!(config.rpc_timeout, Duration::from_millis(1500));
        assert_eq!(config.idle_timeout, None);
    }
}
