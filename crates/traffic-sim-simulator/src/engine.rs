use tracing::{debug, info};
use traffic_sim_abstract::{
    ClickRecord, FAILURE_PROBABILITY, HISTORY_CAPACITY, RandomSource, SimConfig,
    SimulationSnapshot, rate_in_range, tick_period_secs,
};

use crate::error::ValidationError;
use crate::history::MarkerHistory;
use crate::marker::{generate_marker, generate_user_agent};
use crate::target::parse_target;

/// Aggregate state of a traffic simulation.
///
/// This is the synchronous core: it knows nothing about timers. The
/// [`SimulationClock`](crate::clock::SimulationClock) calls [`Simulation::tick`]
/// on a schedule; the scenario runner calls it in a plain loop.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    running: bool,
    target: Option<String>,

    pub total_events: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub elapsed_seconds: f64,
    current_marker: String,
    current_user_agent: Option<String>,
    history: MarkerHistory,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self {
            target: config.target.clone(),
            config,
            running: false,
            total_events: 0,
            success_count: 0,
            error_count: 0,
            elapsed_seconds: 0.0,
            current_marker: String::new(),
            current_user_agent: None,
            history: MarkerHistory::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn rate_per_minute(&self) -> u32 {
        self.config.rate_per_minute
    }

    pub fn current_marker(&self) -> &str {
        &self.current_marker
    }

    pub fn current_user_agent(&self) -> Option<&str> {
        self.current_user_agent.as_deref()
    }

    pub fn history(&self) -> &MarkerHistory {
        &self.history
    }

    /// Validate `target` and `rate_per_minute` and enter the running state.
    ///
    /// Nothing changes when validation fails or the simulation already runs.
    pub fn start(&mut self, target: &str, rate_per_minute: u32) -> Result<(), ValidationError> {
        if self.running {
            return Err(ValidationError::AlreadyRunning);
        }
        parse_target(target)?;
        if !rate_in_range(rate_per_minute) {
            return Err(ValidationError::RateOutOfRange(rate_per_minute));
        }

        self.config.rate_per_minute = rate_per_minute;
        self.target = Some(target.to_string());
        self.running = true;
        info!(
            "Simulation running for {} at {} clicks/min",
            target, rate_per_minute
        );
        Ok(())
    }

    /// Leave the running state. Returns false if it was already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        info!("Simulation stopped after {} clicks", self.total_events);
        true
    }

    /// Zero every counter and clear the history. Does not touch the run state.
    pub fn reset(&mut self) {
        self.total_events = 0;
        self.success_count = 0;
        self.error_count = 0;
        self.elapsed_seconds = 0.0;
        self.history.clear();
        debug!("Simulation statistics reset");
    }

    pub fn set_ip_rotation(&mut self, enabled: bool) -> Result<(), ValidationError> {
        if self.running {
            return Err(ValidationError::AlreadyRunning);
        }
        self.config.ip_rotation = enabled;
        Ok(())
    }

    pub fn set_agent_rotation(&mut self, enabled: bool) -> Result<(), ValidationError> {
        if self.running {
            return Err(ValidationError::AlreadyRunning);
        }
        self.config.agent_rotation = enabled;
        Ok(())
    }

    /// Simulate one click. Returns `None` without touching any state when the
    /// simulation is stopped.
    pub fn tick(&mut self, rng: &mut dyn RandomSource) -> Option<ClickRecord> {
        if !self.running {
            return None;
        }

        self.total_events += 1;
        self.elapsed_seconds += tick_period_secs(self.config.rate_per_minute);

        let marker = generate_marker(rng);
        self.current_marker.clone_from(&marker);
        self.history.push_front(marker.clone());

        let success = rng.next_unit() > FAILURE_PROBABILITY;
        if success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }

        if self.config.agent_rotation {
            self.current_user_agent = Some(generate_user_agent(rng));
        }

        Some(ClickRecord {
            sequence: self.total_events,
            elapsed_seconds: self.elapsed_seconds,
            marker,
            user_agent: self.current_user_agent.clone(),
            success,
        })
    }

    /// Produce a serializable copy of the current state.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            is_running: self.running,
            target: self.target.clone(),
            rate_per_minute: self.config.rate_per_minute,
            ip_rotation: self.config.ip_rotation,
            agent_rotation: self.config.agent_rotation,
            total_events: self.total_events,
            success_count: self.success_count,
            error_count: self.error_count,
            elapsed_seconds: self.elapsed_seconds,
            current_marker: self.current_marker.clone(),
            current_user_agent: self.current_user_agent.clone(),
            history: self.history.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::StdRandom;
    use crate::random::scripted::ScriptedRandom;

    fn running(rate: u32) -> Simulation {
        let mut sim = Simulation::new(SimConfig {
            agent_rotation: false,
            ..Default::default()
        });
        sim.start("https://example.com", rate).unwrap();
        sim
    }

    #[test]
    fn starts_idle_and_empty() {
        let sim = Simulation::new(SimConfig::default());
        let snap = sim.snapshot();
        assert!(!snap.is_running);
        assert_eq!(snap.total_events, 0);
        assert_eq!(snap.success_count, 0);
        assert_eq!(snap.error_count, 0);
        assert_eq!(snap.elapsed_seconds, 0.0);
        assert_eq!(snap.current_marker, "");
        assert!(snap.history.is_empty());
    }

    #[test]
    fn rejects_non_http_target() {
        let mut sim = Simulation::new(SimConfig::default());
        let err = sim.start("ftp://x.com", 100).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTarget(_)));
        assert!(!sim.is_running());
        assert_eq!(sim.target(), None);
    }

    #[test]
    fn rejects_rate_outside_range() {
        let mut sim = Simulation::new(SimConfig::default());
        assert_eq!(
            sim.start("https://example.com", 5),
            Err(ValidationError::RateOutOfRange(5))
        );
        assert_eq!(
            sim.start("https://example.com", 201),
            Err(ValidationError::RateOutOfRange(201))
        );
        assert!(!sim.is_running());
        assert_eq!(sim.rate_per_minute(), 200);
    }

    #[test]
    fn refused_start_keeps_running_session() {
        let mut sim = running(60);
        assert_eq!(
            sim.start("ftp://x.com", 60),
            Err(ValidationError::AlreadyRunning)
        );
        assert!(sim.is_running());
        assert_eq!(sim.target(), Some("https://example.com"));
    }

    #[test]
    fn tick_follows_draw_order() {
        let mut sim = running(200);
        let mut rng = ScriptedRandom::new([192, 168, 0, 1, 8, 8, 4, 4], [0.5, 0.01]);

        let first = sim.tick(&mut rng).unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.marker, "192.168.0.1");
        assert!(first.success);

        let second = sim.tick(&mut rng).unwrap();
        assert_eq!(second.marker, "8.8.4.4");
        assert!(!second.success);

        assert_eq!(sim.success_count, 1);
        assert_eq!(sim.error_count, 1);
        assert_eq!(sim.current_marker(), "8.8.4.4");
        assert_eq!(sim.history().to_vec(), vec!["8.8.4.4", "192.168.0.1"]);
    }

    #[test]
    fn draw_at_failure_threshold_is_an_error() {
        let mut sim = running(200);
        let mut rng = ScriptedRandom::units([FAILURE_PROBABILITY]);
        assert!(!sim.tick(&mut rng).unwrap().success);
        assert_eq!(sim.error_count, 1);
    }

    #[test]
    fn counters_stay_consistent() {
        let mut sim = running(120);
        let mut rng = StdRandom::seeded(7);
        for n in 1..=250u64 {
            sim.tick(&mut rng).unwrap();
            assert_eq!(sim.total_events, n);
            assert_eq!(sim.success_count + sim.error_count, n);
            assert_eq!(sim.history().len(), (n as usize).min(HISTORY_CAPACITY));
            assert_eq!(sim.history().latest(), Some(sim.current_marker()));
        }
    }

    #[test]
    fn elapsed_advances_by_fixed_step() {
        let mut sim = running(10);
        let mut rng = ScriptedRandom::default();
        let mut previous = 0.0;
        for _ in 0..5 {
            sim.tick(&mut rng);
            assert!(sim.elapsed_seconds > previous);
            previous = sim.elapsed_seconds;
        }
        assert!((sim.elapsed_seconds - 30.0).abs() < 1e-9);
    }

    #[test]
    fn stopped_simulation_ignores_ticks() {
        let mut sim = running(200);
        let mut rng = ScriptedRandom::default();
        sim.tick(&mut rng);
        assert!(sim.stop());

        let before = sim.snapshot();
        assert!(sim.tick(&mut rng).is_none());
        assert_eq!(sim.snapshot(), before);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut sim = running(200);
        assert!(sim.stop());
        let after_first = sim.snapshot();
        assert!(!sim.stop());
        assert_eq!(sim.snapshot(), after_first);
    }

    #[test]
    fn reset_clears_counters_but_not_run_state() {
        let mut sim = running(200);
        let mut rng = StdRandom::seeded(1);
        for _ in 0..130 {
            sim.tick(&mut rng);
        }
        let last_marker = sim.current_marker().to_string();
        sim.reset();

        let snap = sim.snapshot();
        assert!(snap.is_running);
        assert_eq!(snap.total_events, 0);
        assert_eq!(snap.success_count, 0);
        assert_eq!(snap.error_count, 0);
        assert_eq!(snap.elapsed_seconds, 0.0);
        assert!(snap.history.is_empty());
        assert_eq!(snap.current_marker, last_marker);
        assert!(!last_marker.is_empty());

        sim.tick(&mut rng).unwrap();
        assert_eq!(sim.total_events, 1);
    }

    #[test]
    fn agent_rotation_draws_after_outcome() {
        let mut sim = Simulation::new(SimConfig::default());
        sim.start("http://example.com", 200).unwrap();
        // outcome, then browser/version/platform
        let mut rng = ScriptedRandom::new([1, 2, 3, 4], [0.9, 0.25, 0.0, 0.0]);

        let record = sim.tick(&mut rng).unwrap();
        assert!(record.success);
        assert_eq!(record.marker, "1.2.3.4");
        assert_eq!(
            record.user_agent.as_deref(),
            Some("Mozilla/5.0 (Windows NT 10.0; rv:104.0) Gecko/20100101 Firefox/104.0")
        );
        assert_eq!(sim.current_user_agent(), record.user_agent.as_deref());
    }

    #[test]
    fn rotation_switches_locked_while_running() {
        let mut sim = running(200);
        assert_eq!(
            sim.set_agent_rotation(true),
            Err(ValidationError::AlreadyRunning)
        );
        assert_eq!(sim.set_ip_rotation(false), Err(ValidationError::AlreadyRunning));

        sim.stop();
        sim.set_ip_rotation(false).unwrap();
        sim.set_agent_rotation(true).unwrap();
        assert!(!sim.config().ip_rotation);
        assert!(sim.config().agent_rotation);
    }
}
