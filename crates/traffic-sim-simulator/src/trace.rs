use serde::Serialize;
use traffic_sim_abstract::{SimConfig, SimulationSnapshot};

use crate::stats::StatsView;

/// Serializable summary of a finished (or interrupted) session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub config: SimConfig,
    pub snapshot: SimulationSnapshot,
    pub success_rate: f64,
    pub error_rate: f64,
}

impl SessionReport {
    pub fn new(config: SimConfig, snapshot: SimulationSnapshot) -> Self {
        let stats = StatsView::from_snapshot(&snapshot);
        Self {
            config,
            snapshot,
            success_rate: stats.success_rate,
            error_rate: stats.error_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_snapshot_and_rates() {
        let snapshot = SimulationSnapshot {
            total_events: 4,
            success_count: 3,
            error_count: 1,
            history: vec!["1.2.3.4".into()],
            ..Default::default()
        };
        let report = SessionReport::new(SimConfig::default(), snapshot);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["success_rate"], 75.0);
        assert_eq!(json["snapshot"]["history"][0], "1.2.3.4");
        assert_eq!(json["config"]["rate_per_minute"], 200);
    }
}
