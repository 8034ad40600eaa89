//! Runtime configuration.
//!
//! Durations are written human-readable in config files ("5s", "24h") and
//! parsed with humantime.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use credo_core::{AggregatorConfig, PricingConfig};

/// Configuration for the orchestration runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Shared deadline for one analysis run. Enforced independently per
    /// agent, so one slow agent cannot starve the others.
    #[serde(with = "duration_str")]
    pub overall_deadline: Duration,

    /// Optional tighter per-agent deadline. Defaults to the overall
    /// deadline when unset.
    #[serde(with = "opt_duration_str")]
    pub agent_deadline: Option<Duration>,

    pub aggregator: AggregatorConfig,

    pub pricing: PricingConfig,

    pub store: StoreConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            overall_deadline: Duration::from_secs(5),
            agent_deadline: None,
            aggregator: AggregatorConfig::default(),
            pricing: PricingConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Effective deadline for a single agent execution.
    pub fn agent_deadline(&self) -> Duration {
        self.agent_deadline.unwrap_or(self.overall_deadline)
    }
}

/// Session store sizing and retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum retained terminal sessions.
    pub max_sessions: u64,

    /// How long terminal sessions stay readable. This is the attachment
    /// point for the external retention policy.
    #[serde(with = "duration_str")]
    pub retention: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            retention: Duration::from_secs(24 * 3600),
        }
    }
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

mod opt_duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RuntimeConfig::default();
        assert_eq!(config.overall_deadline, Duration::from_secs(5));
        assert_eq!(config.agent_deadline(), config.overall_deadline);
        assert_eq!(config.aggregator.quorum, 2);
    }

    #[test]
    fn durations_parse_human_readable() {
        let json = serde_json::json!({
            "overall_deadline": "2s 500ms",
            "agent_deadline": "1s",
            "store": { "retention": "12h" }
        });
        let config: RuntimeConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.overall_deadline, Duration::from_millis(2500));
        assert_eq!(config.agent_deadline(), Duration::from_secs(1));
        assert_eq!(config.store.retention, Duration::from_secs(12 * 3600));
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = RuntimeConfig {
            agent_deadline: Some(Duration::from_secs(3)),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
