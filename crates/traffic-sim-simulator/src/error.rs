use thiserror::Error;
use traffic_sim_abstract::{MAX_RATE_PER_MINUTE, MIN_RATE_PER_MINUTE};

/// Reasons a control request is refused. A refused request never changes state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid target url {0:?}: expected an absolute http or https url")]
    InvalidTarget(String),

    #[error(
        "click rate {0} is outside {min}..={max} per minute",
        min = MIN_RATE_PER_MINUTE,
        max = MAX_RATE_PER_MINUTE
    )]
    RateOutOfRange(u32),

    #[error("simulation is already running")]
    AlreadyRunning,
}
