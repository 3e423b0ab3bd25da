use anyhow::{Context, anyhow};
use std::fs;
use std::path::Path;
use traffic_sim_abstract::{SimConfig, TestAssertion, TestScenario};
use tracing::info;

use crate::engine::Simulation;
use crate::random::StdRandom;
use crate::trace::SessionReport;

pub fn load_scenario(path: &Path) -> anyhow::Result<TestScenario> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    toml::from_str(&content).context("Failed to parse scenario file")
}

/// Drive `scenario.ticks` clicks back to back (no timer) and check the
/// scenario's assertions against the final state.
pub fn run_scenario(scenario: &TestScenario, base: SimConfig) -> anyhow::Result<SessionReport> {
    info!("Running Scenario: {}", scenario.name);
    if !scenario.description.is_empty() {
        info!("Description: {}", scenario.description);
    }

    let mut config = base;
    scenario.config.apply_to(&mut config);
    let mut rng = StdRandom::from_seed(config.seed);

    let mut sim = Simulation::new(config.clone());
    sim.start(&scenario.target, config.rate_per_minute)
        .context("Scenario could not be started")?;
    for _ in 0..scenario.ticks {
        sim.tick(&mut rng);
    }
    sim.stop();

    check_assertions(&sim, &scenario.assertions)?;
    info!(
        "Scenario '{}' passed: {} clicks, {} errors",
        scenario.name, sim.total_events, sim.error_count
    );
    Ok(SessionReport::new(config, sim.snapshot()))
}

pub fn check_assertions(sim: &Simulation, assertions: &[TestAssertion]) -> anyhow::Result<()> {
    for assertion in assertions {
        match assertion {
            TestAssertion::TotalEvents { count } => {
                if sim.total_events != *count {
                    return Err(anyhow!(
                        "Assertion Failed: {} clicks simulated, expected {}",
                        sim.total_events,
                        count
                    ));
                }
            }
            TestAssertion::SuccessCount { min, max } => {
                check_range("success count", sim.success_count, *min, *max)?;
            }
            TestAssertion::ErrorCount { min, max } => {
                check_range("error count", sim.error_count, *min, *max)?;
            }
            TestAssertion::HistoryLength { len } => {
                if sim.history().len() != *len {
                    return Err(anyhow!(
                        "Assertion Failed: history holds {} markers, expected {}",
                        sim.history().len(),
                        len
                    ));
                }
            }
            TestAssertion::ElapsedSeconds { min, max } => {
                let elapsed = sim.elapsed_seconds;
                if elapsed < *min || max.is_some_and(|max| elapsed > max) {
                    return Err(anyhow!(
                        "Assertion Failed: elapsed {:.3}s outside {}..{}",
                        elapsed,
                        min,
                        max.map(|m| m.to_string()).unwrap_or_default()
                    ));
                }
            }
        }
    }
    Ok(())
}

fn check_range(what: &str, actual: u64, min: u64, max: Option<u64>) -> anyhow::Result<()> {
    if actual < min {
        return Err(anyhow!(
            "Assertion Failed: {} is {}, expected min {}",
            what,
            actual,
            min
        ));
    }
    if let Some(max) = max
        && actual > max
    {
        return Err(anyhow!(
            "Assertion Failed: {} is {}, expected max {}",
            what,
            actual,
            max
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(toml_src: &str) -> TestScenario {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn seeded_scenario_passes_and_reports() {
        let s = scenario(
            r#"
            name = "two minutes"
            target = "https://example.com/landing"
            ticks = 240

            [config]
            rate_per_minute = 120
            seed = 99

            [[assertions]]
            type = "total_events"
            count = 240

            [[assertions]]
            type = "history_length"
            len = 100

            [[assertions]]
            type = "elapsed_seconds"
            min = 119.999
            max = 120.001

            [[assertions]]
            type = "success_count"
            min = 200
            "#,
        );

        let report = run_scenario(&s, SimConfig::default()).unwrap();
        assert!(!report.snapshot.is_running);
        assert_eq!(report.snapshot.total_events, 240);
        assert_eq!(
            report.snapshot.success_count + report.snapshot.error_count,
            240
        );
        assert_eq!(report.config.rate_per_minute, 120);
    }

    #[test]
    fn same_seed_gives_same_session() {
        let s = scenario(
            r#"
            name = "repeat"
            target = "http://example.com"
            ticks = 50
            [config]
            seed = 5
            "#,
        );
        let a = run_scenario(&s, SimConfig::default()).unwrap();
        let b = run_scenario(&s, SimConfig::default()).unwrap();
        assert_eq!(a.snapshot.history, b.snapshot.history);
        assert_eq!(a.snapshot.error_count, b.snapshot.error_count);
    }

    #[test]
    fn failing_assertion_is_reported() {
        let s = scenario(
            r#"
            name = "wrong count"
            target = "https://example.com"
            ticks = 3
            [[assertions]]
            type = "total_events"
            count = 4
            "#,
        );
        let err = run_scenario(&s, SimConfig::default()).unwrap_err();
        assert!(err.to_string().contains("3 clicks simulated, expected 4"));
    }

    #[test]
    fn invalid_target_aborts_scenario() {
        let s = scenario(
            r#"
            name = "bad target"
            target = "ftp://x.com"
            ticks = 3
            "#,
        );
        let err = run_scenario(&s, SimConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid target url"));
    }

    #[test]
    fn range_checks() {
        assert!(check_range("x", 5, 1, Some(5)).is_ok());
        assert!(check_range("x", 0, 1, None).is_err());
        assert!(check_range("x", 6, 1, Some(5)).is_err());
    }
}
