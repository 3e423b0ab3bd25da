//! Read-only view models derived from a [`SimulationSnapshot`].

use serde::Serialize;
use traffic_sim_abstract::SimulationSnapshot;

/// Number of per-minute buckets shown in the traffic chart.
const MAX_TRAFFIC_BUCKETS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub total_events: u64,
    pub success_count: u64,
    pub error_count: u64,
    /// Percent of clicks that succeeded, 0 when there are none.
    pub success_rate: f64,
    pub error_rate: f64,
    pub rate_per_minute: u32,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficBucket {
    pub label: String,
    pub clicks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSlice {
    pub outcome: Outcome,
    pub count: u64,
    pub percent: f64,
}

impl StatsView {
    pub fn from_snapshot(snapshot: &SimulationSnapshot) -> Self {
        let (success_rate, error_rate) = if snapshot.total_events > 0 {
            let total = snapshot.total_events as f64;
            (
                snapshot.success_count as f64 / total * 100.0,
                snapshot.error_count as f64 / total * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        Self {
            total_events: snapshot.total_events,
            success_count: snapshot.success_count,
            error_count: snapshot.error_count,
            success_rate,
            error_rate,
            rate_per_minute: snapshot.rate_per_minute,
            elapsed_seconds: snapshot.elapsed_seconds,
        }
    }

    /// Estimated clicks per started minute of session time.
    ///
    /// Full minutes contribute the configured rate; the minute in progress
    /// contributes its elapsed share. Only the first ten minutes are shown.
    pub fn traffic_over_time(&self) -> Vec<TrafficBucket> {
        let minutes = (self.elapsed_seconds / 60.0).ceil() as usize;
        if minutes == 0 {
            return vec![TrafficBucket {
                label: "1m".to_string(),
                clicks: 0,
            }];
        }

        let rate = f64::from(self.rate_per_minute);
        let remainder = self.elapsed_seconds % 60.0;
        (0..minutes.min(MAX_TRAFFIC_BUCKETS))
            .map(|i| {
                let fraction = if i + 1 == minutes && remainder > 0.0 {
                    remainder / 60.0
                } else {
                    1.0
                };
                TrafficBucket {
                    label: format!("{}m", i + 1),
                    clicks: (rate * fraction).floor() as u64,
                }
            })
            .collect()
    }

    /// Success/error split with empty slices left out.
    pub fn distribution(&self) -> Vec<DistributionSlice> {
        [
            (Outcome::Success, self.success_count, self.success_rate),
            (Outcome::Error, self.error_count, self.error_rate),
        ]
        .into_iter()
        .filter(|(_, count, _)| *count > 0)
        .map(|(outcome, count, percent)| DistributionSlice {
            outcome,
            count,
            percent,
        })
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub marker: String,
    pub age: String,
}

/// Label each marker with how many clicks ago it was used.
pub fn history_entries(history: &[String]) -> Vec<HistoryEntry> {
    history
        .iter()
        .enumerate()
        .map(|(index, marker)| HistoryEntry {
            marker: marker.clone(),
            age: match index {
                0 => "Active".to_string(),
                1 => "1 click ago".to_string(),
                n => format!("{n} clicks ago"),
            },
        })
        .collect()
}

/// `1234567` -> `1,234,567`
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Session clock: `1h 2m 3s`, or `2m 3s` under an hour.
pub fn format_session_time(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else {
        format!("{minutes}m {secs}s")
    }
}

/// Minutes and seconds without an hour component: `75m 3s`.
pub fn format_elapsed_short(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}m {}s", total / 60, total % 60)
}
