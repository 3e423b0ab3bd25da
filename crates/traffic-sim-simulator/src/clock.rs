//! Timer-driven owner of a [`Simulation`].
//!
//! One tokio task per run fires [`Simulation::tick`] every
//! `60000 / rate` milliseconds. All state sits behind a single mutex; each
//! tick re-checks the run generation under that mutex, so once
//! [`SimulationClock::stop`] returns no further tick can mutate anything,
//! even if the aborted task was already awake.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use traffic_sim_abstract::{
    ClockNotification, RandomSource, SimConfig, SimulationSnapshot, tick_period,
};

use crate::engine::Simulation;
use crate::error::ValidationError;
use crate::random::StdRandom;

const NOTIFICATION_BUFFER: usize = 16;

pub struct SimulationClock {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    snapshots: watch::Sender<SimulationSnapshot>,
    notifications: broadcast::Sender<ClockNotification>,
}

struct Inner {
    simulation: Simulation,
    rng: Box<dyn RandomSource>,
    /// Bumped on every start and stop; a ticker only acts for its own run.
    generation: u64,
    ticker: Option<JoinHandle<()>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called with the state lock held so snapshots are published in order.
    fn publish(&self, inner: &Inner) {
        self.snapshots.send_replace(inner.simulation.snapshot());
    }

    fn notify(&self, notification: ClockNotification) {
        // No subscribers is fine: notifications are display-only.
        let _ = self.notifications.send(notification);
    }
}

impl SimulationClock {
    /// Create an idle clock. Draws come from `config.seed` when set.
    pub fn new(config: SimConfig) -> Self {
        let rng = Box::new(StdRandom::from_seed(config.seed));
        Self::with_random(config, rng)
    }

    /// Create an idle clock that draws from `rng`.
    pub fn with_random(config: SimConfig, rng: Box<dyn RandomSource>) -> Self {
        let simulation = Simulation::new(config);
        let (snapshots, _) = watch::channel(simulation.snapshot());
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    simulation,
                    rng,
                    generation: 0,
                    ticker: None,
                }),
                snapshots,
                notifications,
            }),
        }
    }

    /// Validate the request and start ticking every `60000 / rate_per_minute` ms.
    ///
    /// The first click fires one full period after this call. Must be called
    /// from within a tokio runtime.
    pub fn start(&self, target: &str, rate_per_minute: u32) -> Result<(), ValidationError> {
        let mut inner = self.shared.lock();
        if let Err(err) = inner.simulation.start(target, rate_per_minute) {
            warn!("Refusing to start simulation: {}", err);
            return Err(err);
        }

        inner.generation += 1;
        let generation = inner.generation;
        let period = tick_period(rate_per_minute);
        inner.ticker = Some(tokio::spawn(run_ticker(
            Arc::clone(&self.shared),
            generation,
            period,
        )));
        debug!("Ticker {} scheduled every {:?}", generation, period);

        self.shared.publish(&inner);
        drop(inner);
        self.shared.notify(ClockNotification::Started {
            target: target.to_string(),
            rate_per_minute,
        });
        Ok(())
    }

    /// Cancel the ticker. Counters are kept. Returns false (and does
    /// nothing) if the clock was not running.
    pub fn stop(&self) -> bool {
        let mut inner = self.shared.lock();
        if !inner.simulation.stop() {
            return false;
        }
        inner.generation += 1;
        if let Some(ticker) = inner.ticker.take() {
            ticker.abort();
        }
        let total_events = inner.simulation.total_events;
        self.shared.publish(&inner);
        drop(inner);
        self.shared.notify(ClockNotification::Stopped { total_events });
        true
    }

    /// Zero the counters and clear the history. A running ticker keeps going.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        inner.simulation.reset();
        self.shared.publish(&inner);
        drop(inner);
        info!("Traffic statistics reset");
        self.shared.notify(ClockNotification::Reset);
    }

    pub fn set_ip_rotation(&self, enabled: bool) -> Result<(), ValidationError> {
        let mut inner = self.shared.lock();
        inner.simulation.set_ip_rotation(enabled)?;
        self.shared.publish(&inner);
        Ok(())
    }

    pub fn set_agent_rotation(&self, enabled: bool) -> Result<(), ValidationError> {
        let mut inner = self.shared.lock();
        inner.simulation.set_agent_rotation(enabled)?;
        self.shared.publish(&inner);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().simulation.is_running()
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        self.shared.lock().simulation.snapshot()
    }

    pub fn config(&self) -> SimConfig {
        self.shared.lock().simulation.config().clone()
    }

    /// Receiver that observes a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SimulationSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Receiver for lifecycle notifications sent from now on.
    pub fn notifications(&self) -> broadcast::Receiver<ClockNotification> {
        self.shared.notifications.subscribe()
    }
}

impl Drop for SimulationClock {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.generation += 1;
        if let Some(ticker) = inner.ticker.take() {
            ticker.abort();
            debug!("Ticker cancelled on teardown");
        }
        inner.simulation.stop();
    }
}

async fn run_ticker(shared: Arc<Shared>, generation: u64, period: Duration) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if !tick_once(&shared, generation) {
            break;
        }
    }
}

/// Run one click for ticker `generation`. Returns false once that run is over.
fn tick_once(shared: &Shared, generation: u64) -> bool {
    let mut guard = shared.lock();
    if guard.generation != generation {
        debug!("Skipping stale tick from ticker {}", generation);
        return false;
    }
    let inner = &mut *guard;
    let Some(click) = inner.simulation.tick(inner.rng.as_mut()) else {
        return false;
    };
    debug!(
        "Click #{} from {} at {:.1}s ({}), agent {}",
        click.sequence,
        click.marker,
        click.elapsed_seconds,
        if click.success { "ok" } else { "error" },
        click.user_agent.as_deref().unwrap_or("-")
    );
    shared.publish(inner);
    true
}
