use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use traffic_sim_abstract::{MAX_RATE_PER_MINUTE, MIN_RATE_PER_MINUTE, SimConfig, SimConfigOverride};
use traffic_sim_simulator::stats::{StatsView, format_count, format_session_time};
use traffic_sim_simulator::tui::{MemoryLogBuffer, TuiApp};
use traffic_sim_simulator::{SessionReport, SimulationClock, scenario_runner};

const SUMMARY_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulated website traffic generator")]
struct Args {
    /// Target URL (http or https).
    #[arg(long)]
    url: Option<String>,

    /// Clicks per minute, 10 to 200 in steps of 10.
    #[arg(long)]
    rate: Option<u32>,

    /// Seed for reproducible sessions.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = false)]
    no_ip_rotation: bool,

    #[arg(long, default_value_t = false)]
    no_agent_rotation: bool,

    /// Load base settings from a TOML file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a scripted scenario and check its assertions.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Launch the terminal dashboard.
    #[arg(long, default_value_t = false)]
    tui: bool,

    /// Stop a headless session after this many seconds.
    #[arg(long)]
    duration: Option<u64>,

    /// Write a JSON report of the finished session.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> SimConfigOverride {
        SimConfigOverride {
            target: self.url.clone(),
            rate_per_minute: self.rate,
            ip_rotation: self.no_ip_rotation.then_some(false),
            agent_rotation: self.no_agent_rotation.then_some(false),
            seed: self.seed,
        }
    }

    fn sim_config(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SimConfig::default(),
        };
        self.overrides().apply_to(&mut config);
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_buffer = init_logging(args.tui);
    info!("traffic-sim starting…");

    let config = args.sim_config()?;

    let report = if let Some(path) = &args.scenario {
        if args.tui {
            bail!("--scenario and --tui cannot be used together");
        }
        let scenario = scenario_runner::load_scenario(path)?;
        scenario_runner::run_scenario(&scenario, config)?
    } else if args.tui {
        run_tui(config, log_buffer)?
    } else {
        run_headless(config, args.duration.map(Duration::from_secs)).await?
    };

    if let Some(trace_path) = &args.trace_out {
        write_trace(trace_path, &report)?;
    }

    Ok(())
}

fn init_logging(use_tui: bool) -> Option<MemoryLogBuffer> {
    if use_tui {
        let buffer = MemoryLogBuffer::new();
        let writer = buffer.clone();
        tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .init();
        Some(buffer)
    } else {
        tracing_subscriber::fmt::init();
        None
    }
}

fn run_tui(config: SimConfig, logs: Option<MemoryLogBuffer>) -> Result<SessionReport> {
    let clock = SimulationClock::new(config.clone());
    let mut app = TuiApp::new(clock, logs);
    let snapshot = tokio::task::block_in_place(|| app.run())?;
    Ok(SessionReport::new(config, snapshot))
}

async fn run_headless(config: SimConfig, duration: Option<Duration>) -> Result<SessionReport> {
    let target = config
        .target
        .clone()
        .context("Headless mode needs a target: pass --url or set `target` in --config")?;

    let Some(period) = config.tick_period() else {
        bail!(
            "Rate {} is outside {}..={} clicks/min",
            config.rate_per_minute,
            MIN_RATE_PER_MINUTE,
            MAX_RATE_PER_MINUTE
        );
    };
    info!("Clicking {} every {:?}", target, period);

    let clock = SimulationClock::new(config.clone());
    let mut notifications = clock.notifications();
    clock
        .start(&target, config.rate_per_minute)
        .context("Failed to start simulation")?;

    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut summary = tokio::time::interval(SUMMARY_INTERVAL);
    summary.tick().await;

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Duration elapsed");
                break;
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted");
                break;
            }
            _ = summary.tick() => log_summary(&clock),
            notification = notifications.recv() => match notification {
                Ok(notification) => info!("{}", notification),
                Err(RecvError::Lagged(skipped)) => warn!("Missed {} notifications", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    clock.stop();
    log_summary(&clock);
    Ok(SessionReport::new(config, clock.snapshot()))
}

fn log_summary(clock: &SimulationClock) {
    let snapshot = clock.snapshot();
    let stats = StatsView::from_snapshot(&snapshot);
    info!(
        "{} clicks ({:.1}% ok, {} failed) in {} | last IP {}",
        format_count(stats.total_events),
        stats.success_rate,
        format_count(stats.error_count),
        format_session_time(stats.elapsed_seconds),
        if snapshot.current_marker.is_empty() {
            "-"
        } else {
            snapshot.current_marker.as_str()
        }
    );
}

fn load_config(path: &Path) -> Result<SimConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SimConfig = toml::from_str(&content).context("Failed to parse config file")?;
    Ok(config)
}

fn write_trace(path: &Path, report: &SessionReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("Failed to serialize session report")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write trace file {}", path.display()))?;
    Ok(())
}
