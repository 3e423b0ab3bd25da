use crate::config::SimConfigOverride;
use serde::Deserialize;

/// A scripted, tick-counted session loaded from TOML.
#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub target: String,
    #[serde(default)]
    pub config: SimConfigOverride,
    /// Number of clicks to simulate.
    pub ticks: u64,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    /// Exact number of simulated clicks.
    TotalEvents { count: u64 },
    /// Successful clicks within range
    SuccessCount { min: u64, max: Option<u64> },
    /// Failed clicks within range
    ErrorCount { min: u64, max: Option<u64> },
    /// Exact number of markers retained in the history.
    HistoryLength { len: usize },
    /// Simulated session time within range, in seconds.
    ElapsedSeconds { min: f64, max: Option<f64> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_assertions() {
        let scenario: TestScenario = toml::from_str(
            r#"
            name = "steady"
            target = "https://example.com"
            ticks = 120

            [config]
            rate_per_minute = 60
            seed = 42

            [[assertions]]
            type = "total_events"
            count = 120

            [[assertions]]
            type = "error_count"
            min = 0
            max = 20

            [[assertions]]
            type = "elapsed_seconds"
            min = 119.0
            "#,
        )
        .unwrap();

        assert_eq!(scenario.name, "steady");
        assert_eq!(scenario.description, "");
        assert_eq!(scenario.config.rate_per_minute, Some(60));
        assert_eq!(scenario.config.seed, Some(42));
        assert_eq!(
            scenario.assertions,
            vec![
                TestAssertion::TotalEvents { count: 120 },
                TestAssertion::ErrorCount {
                    min: 0,
                    max: Some(20)
                },
                TestAssertion::ElapsedSeconds {
                    min: 119.0,
                    max: None
                },
            ]
        );
    }
}
