pub mod clock;
pub mod engine;
pub mod error;
pub mod history;
pub mod marker;
pub mod random;
pub mod scenario_runner;
pub mod stats;
pub mod target;
pub mod trace;
pub mod visualizer;

#[cfg(feature = "tui")]
pub mod tui;

pub use clock::SimulationClock;
pub use engine::Simulation;
pub use error::ValidationError;
pub use history::MarkerHistory;
pub use random::StdRandom;
pub use stats::StatsView;
pub use target::{is_valid_target, parse_target};
pub use trace::SessionReport;
pub use visualizer::TrafficField;
