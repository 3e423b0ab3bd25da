use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Slowest selectable click rate, in clicks per minute.
pub const MIN_RATE_PER_MINUTE: u32 = 10;
/// Fastest selectable click rate, in clicks per minute.
pub const MAX_RATE_PER_MINUTE: u32 = 200;
/// Granularity of the rate selector.
pub const RATE_STEP: u32 = 10;
pub const DEFAULT_RATE_PER_MINUTE: u32 = 200;

/// Number of markers kept in the rotation history.
pub const HISTORY_CAPACITY: usize = 100;

/// Chance that a simulated click is recorded as an error.
pub const FAILURE_PROBABILITY: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Target URL used when none is given on the command line.
    pub target: Option<String>,
    pub rate_per_minute: u32,
    /// Cosmetic switch shown on the dashboard.
    pub ip_rotation: bool,
    /// Draw a synthetic user agent with every click.
    pub agent_rotation: bool,
    /// Fixed seed for reproducible sessions. Unseeded runs draw from the OS.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            target: None,
            rate_per_minute: DEFAULT_RATE_PER_MINUTE,
            ip_rotation: true,
            agent_rotation: true,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Click interval for the configured rate, `None` when the rate is not
    /// selectable.
    pub fn tick_period(&self) -> Option<Duration> {
        rate_in_range(self.rate_per_minute).then(|| tick_period(self.rate_per_minute))
    }
}

/// Whether `rate` is a selectable clicks-per-minute value.
pub fn rate_in_range(rate: u32) -> bool {
    (MIN_RATE_PER_MINUTE..=MAX_RATE_PER_MINUTE).contains(&rate)
}

/// Interval between two clicks: `60000 / rate` milliseconds.
///
/// `rate` must be non-zero; callers validate it with [`rate_in_range`] first.
pub fn tick_period(rate: u32) -> Duration {
    Duration::from_secs(60) / rate
}

/// Simulated seconds credited to the session per click.
pub fn tick_period_secs(rate: u32) -> f64 {
    60.0 / f64::from(rate)
}

/// Partial configuration, layered on top of a base [`SimConfig`].
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimConfigOverride {
    pub target: Option<String>,
    pub rate_per_minute: Option<u32>,
    pub ip_rotation: Option<bool>,
    pub agent_rotation: Option<bool>,
    pub seed: Option<u64>,
}

impl SimConfigOverride {
    pub fn apply_to(&self, config: &mut SimConfig) {
        if let Some(v) = &self.target {
            config.target = Some(v.clone());
        }
        if let Some(v) = self.rate_per_minute {
            config.rate_per_minute = v;
        }
        if let Some(v) = self.ip_rotation {
            config.ip_rotation = v;
        }
        if let Some(v) = self.agent_rotation {
            config.agent_rotation = v;
        }
        if let Some(v) = self.seed {
            config.seed = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_period_matches_rate_for_every_selectable_value() {
        for rate in MIN_RATE_PER_MINUTE..=MAX_RATE_PER_MINUTE {
            let expected_ms = 60_000.0 / f64::from(rate);
            let actual_ms = tick_period(rate).as_secs_f64() * 1000.0;
            assert!(
                (actual_ms - expected_ms).abs() < 1e-6,
                "rate {rate}: {actual_ms} != {expected_ms}"
            );
        }
    }

    #[test]
    fn config_tick_period_rejects_unselectable_rates() {
        let config: SimConfig = toml::from_str("rate_per_minute = 0\n").unwrap();
        assert_eq!(config.tick_period(), None);

        let config: SimConfig = toml::from_str("rate_per_minute = 500\n").unwrap();
        assert_eq!(config.tick_period(), None);

        assert_eq!(
            SimConfig::default().tick_period(),
            Some(Duration::from_millis(300))
        );
    }

    #[test]
    fn tick_period_bounds() {
        assert_eq!(tick_period(200), Duration::from_millis(300));
        assert_eq!(tick_period(10), Duration::from_millis(6000));
        assert_eq!(tick_period_secs(200), 0.3);
    }

    #[test]
    fn rate_range() {
        assert!(rate_in_range(10));
        assert!(rate_in_range(200));
        assert!(!rate_in_range(0));
        assert!(!rate_in_range(9));
        assert!(!rate_in_range(201));
    }

    #[test]
    fn override_only_touches_given_fields() {
        let mut config = SimConfig::default();
        let over = SimConfigOverride {
            rate_per_minute: Some(50),
            agent_rotation: Some(false),
            ..Default::default()
        };
        over.apply_to(&mut config);

        assert_eq!(config.rate_per_minute, 50);
        assert!(!config.agent_rotation);
        assert!(config.ip_rotation);
        assert_eq!(config.target, None);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: SimConfig = toml::from_str("rate_per_minute = 30\nseed = 7\n").unwrap();
        assert_eq!(config.rate_per_minute, 30);
        assert_eq!(config.seed, Some(7));
        assert!(config.ip_rotation);
        assert!(config.agent_rotation);
    }
}
