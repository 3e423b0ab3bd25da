use serde::{Deserialize, Serialize};
use std::fmt;

/// Read-only view of the aggregate state, published after every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub is_running: bool,
    /// Target of the current (or last) run.
    pub target: Option<String>,
    pub rate_per_minute: u32,
    pub ip_rotation: bool,
    pub agent_rotation: bool,
    pub total_events: u64,
    pub success_count: u64,
    pub error_count: u64,
    /// Simulated session time. Advances by a fixed step per click.
    pub elapsed_seconds: f64,
    /// Most recent marker; empty until the first click.
    pub current_marker: String,
    pub current_user_agent: Option<String>,
    /// Markers, most recent first.
    pub history: Vec<String>,
}

/// Outcome of a single simulated click.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickRecord {
    /// 1-based position of this click since the last reset.
    pub sequence: u64,
    pub elapsed_seconds: f64,
    pub marker: String,
    pub user_agent: Option<String>,
    pub success: bool,
}

/// Lifecycle notices for the display layer. Losing one is harmless.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClockNotification {
    Started { target: String, rate_per_minute: u32 },
    Stopped { total_events: u64 },
    Reset,
}

impl fmt::Display for ClockNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockNotification::Started {
                target,
                rate_per_minute,
            } => write!(
                f,
                "Simulation started for {} at {}/min",
                target, rate_per_minute
            ),
            ClockNotification::Stopped { total_events } => {
                write!(f, "Simulation stopped after {} clicks", total_events)
            }
            ClockNotification::Reset => write!(f, "All traffic statistics have been reset"),
        }
    }
}
