pub mod config;
pub mod interface;
pub mod scenario;
pub mod snapshot;

pub use config::{
    DEFAULT_RATE_PER_MINUTE, FAILURE_PROBABILITY, HISTORY_CAPACITY, MAX_RATE_PER_MINUTE,
    MIN_RATE_PER_MINUTE, RATE_STEP, SimConfig, SimConfigOverride, rate_in_range, tick_period,
    tick_period_secs,
};
pub use interface::RandomSource;
pub use scenario::{TestAssertion, TestScenario};
pub use snapshot::{ClickRecord, ClockNotification, SimulationSnapshot};
