use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine, Points};
use ratatui::{
    prelude::*,
    widgets::{BarChart, Block, Borders, Gauge, List, ListItem, Paragraph, Tabs},
};
use tokio::sync::{broadcast, watch};
use traffic_sim_abstract::{
    ClockNotification, MAX_RATE_PER_MINUTE, MIN_RATE_PER_MINUTE, RATE_STEP, SimulationSnapshot,
};

use crate::clock::SimulationClock;
use crate::random::StdRandom;
use crate::stats::{
    Outcome, StatsView, format_count, format_elapsed_short, format_session_time, history_entries,
};
use crate::target::is_valid_target;
use crate::visualizer::{PointKind, TrafficField};

const LOG_CAPACITY: usize = 1000;
const FRAME_PERIOD: Duration = Duration::from_millis(50);
const TOAST_TTL: Duration = Duration::from_secs(3);

/// A tracing writer that keeps the last lines in memory for the dashboard.
#[derive(Clone, Default)]
pub struct MemoryLogBuffer {
    logs: Arc<Mutex<VecDeque<String>>>,
}

impl MemoryLogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, msg: String) {
        let mut logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        logs.push_back(msg);
        while logs.len() > LOG_CAPACITY {
            logs.pop_front();
        }
    }

    /// Up to `n` most recent lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = logs.len().saturating_sub(n);
        logs.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl io::Write for MemoryLogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let line = s.trim();
        if !line.is_empty() {
            self.push(line.to_string());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Statistics,
    IpLog,
}

impl Tab {
    fn index(self) -> usize {
        match self {
            Tab::Statistics => 0,
            Tab::IpLog => 1,
        }
    }

    fn next(self) -> Self {
        match self {
            Tab::Statistics => Tab::IpLog,
            Tab::IpLog => Tab::Statistics,
        }
    }
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    error: bool,
    expires: Instant,
}

pub struct TuiApp {
    clock: SimulationClock,
    snapshots: watch::Receiver<SimulationSnapshot>,
    notifications: broadcast::Receiver<ClockNotification>,
    url_input: String,
    editing: bool,
    selected_rate: u32,
    tab: Tab,
    toast: Option<Toast>,
    field: TrafficField,
    field_rng: StdRandom,
    logs: Option<MemoryLogBuffer>,
}

impl TuiApp {
    pub fn new(clock: SimulationClock, logs: Option<MemoryLogBuffer>) -> Self {
        let config = clock.config();
        let snapshots = clock.subscribe();
        let notifications = clock.notifications();
        Self {
            url_input: config.target.clone().unwrap_or_default(),
            editing: config.target.is_none(),
            selected_rate: config.rate_per_minute,
            snapshots,
            notifications,
            tab: Tab::Statistics,
            toast: None,
            field: TrafficField::new(100.0, 50.0),
            field_rng: StdRandom::from_os(),
            logs,
            clock,
        }
    }

    /// Drive the dashboard until the user quits. Returns the last snapshot.
    pub fn run(&mut self) -> anyhow::Result<SimulationSnapshot> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        self.clock.stop();
        result?;
        Ok(self.clock.snapshot())
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let mut last_frame = Instant::now();
        loop {
            self.drain_notifications();
            let elapsed = last_frame.elapsed();
            last_frame = Instant::now();
            self.animate(elapsed);
            if self.toast.as_ref().is_some_and(|t| t.expires <= last_frame) {
                self.toast = None;
            }

            terminal.draw(|f| self.ui(f))?;

            if event::poll(FRAME_PERIOD)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
                && self.handle_key(key.code)
            {
                return Ok(());
            }
        }
    }

    /// Apply one key press. Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing {
            match code {
                KeyCode::Char(c) => self.url_input.push(c),
                KeyCode::Backspace => {
                    self.url_input.pop();
                }
                KeyCode::Enter | KeyCode::Esc => self.editing = false,
                _ => {}
            }
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('s') | KeyCode::Enter => self.toggle(),
            KeyCode::Char('r') => {
                self.clock.reset();
                self.field.clear();
            }
            KeyCode::Char('+') | KeyCode::Right => self.adjust_rate(true),
            KeyCode::Char('-') | KeyCode::Left => self.adjust_rate(false),
            KeyCode::Char('i') => {
                let enabled = !self.snapshots.borrow().ip_rotation;
                if let Err(err) = self.clock.set_ip_rotation(enabled) {
                    self.show_toast(err.to_string(), true);
                }
            }
            KeyCode::Char('a') => {
                let enabled = !self.snapshots.borrow().agent_rotation;
                if let Err(err) = self.clock.set_agent_rotation(enabled) {
                    self.show_toast(err.to_string(), true);
                }
            }
            KeyCode::Char('e') => {
                if self.clock.is_running() {
                    self.show_toast("Stop the simulation to edit the URL".to_string(), true);
                } else {
                    self.editing = true;
                }
            }
            KeyCode::Tab => self.tab = self.tab.next(),
            _ => {}
        }
        false
    }

    fn toggle(&mut self) {
        if self.clock.is_running() {
            self.clock.stop();
            return;
        }
        if let Err(err) = self.clock.start(self.url_input.trim(), self.selected_rate) {
            self.show_toast(err.to_string(), true);
        }
    }

    fn adjust_rate(&mut self, up: bool) {
        if self.clock.is_running() {
            self.show_toast("Stop the simulation to change the rate".to_string(), true);
            return;
        }
        self.selected_rate = if up {
            (self.selected_rate + RATE_STEP).min(MAX_RATE_PER_MINUTE)
        } else {
            self.selected_rate
                .saturating_sub(RATE_STEP)
                .max(MIN_RATE_PER_MINUTE)
        };
    }

    fn drain_notifications(&mut self) {
        loop {
            match self.notifications.try_recv() {
                Ok(notification) => {
                    if notification == ClockNotification::Reset {
                        self.field.clear();
                    }
                    self.show_toast(notification.to_string(), false);
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    fn animate(&mut self, elapsed: Duration) {
        let (running, rate) = {
            let snapshot = self.snapshots.borrow();
            (snapshot.is_running, snapshot.rate_per_minute)
        };
        if running {
            self.field.advance(elapsed, rate, &mut self.field_rng);
        }
    }

    fn show_toast(&mut self, message: String, error: bool) {
        self.toast = Some(Toast {
            message,
            error,
            expires: Instant::now() + TOAST_TTL,
        });
    }

    fn ui(&mut self, f: &mut Frame) {
        let snapshot = self.snapshots.borrow().clone();
        let log_height = if self.logs.is_some() { 8 } else { 0 };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),          // Control bar
                Constraint::Min(0),             // Dashboard
                Constraint::Length(log_height), // Captured logs
                Constraint::Length(1),          // Toast
            ])
            .split(f.area());

        self.render_control(f, rows[0], &snapshot);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(0)])
            .split(columns[0]);
        self.render_status(f, left[0], &snapshot);
        self.render_visualizer(f, left[1]);
        self.render_tabs(f, columns[1], &snapshot);

        if let Some(logs) = &self.logs {
            self.render_logs(f, rows[2], logs);
        }
        self.render_toast(f, rows[3]);
    }

    fn render_control(&self, f: &mut Frame, area: Rect, snapshot: &SimulationSnapshot) {
        let url_hint = if self.url_input.trim().is_empty() {
            Span::styled(" (enter a url)", Style::default().fg(Color::DarkGray))
        } else if is_valid_target(self.url_input.trim()) {
            Span::styled(" ok", Style::default().fg(Color::Green))
        } else {
            Span::styled(" invalid url", Style::default().fg(Color::Red))
        };
        let url_style = if self.editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let status = if snapshot.is_running {
            Span::styled("RUNNING", Style::default().fg(Color::Green))
        } else {
            Span::styled("STOPPED", Style::default().fg(Color::Red))
        };

        let line = Line::from(vec![
            Span::raw("URL: "),
            Span::styled(self.url_input.clone(), url_style),
            url_hint,
            Span::raw(format!(" | Rate: {}/min | IP: ", self.selected_rate)),
            on_off(snapshot.ip_rotation),
            Span::raw(" | UA: "),
            on_off(snapshot.agent_rotation),
            Span::raw(" | "),
            status,
        ]);
        let help = if self.editing {
            "Editing URL: Enter/Esc to finish"
        } else {
            "(s)tart/stop (r)eset (+/-)rate (i)p (a)gent (e)dit url Tab (q)uit"
        };
        let control = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL).title("Control"))
            .alignment(Alignment::Left);
        f.render_widget(control, area);

        if area.width > help.len() as u16 + 4 {
            let help_area = Rect {
                x: area.x + area.width - help.len() as u16 - 2,
                y: area.y,
                width: help.len() as u16,
                height: 1,
            };
            f.render_widget(
                Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
                help_area,
            );
        }
    }

    fn render_status(&self, f: &mut Frame, area: Rect, snapshot: &SimulationSnapshot) {
        let marker = if snapshot.current_marker.is_empty() {
            "-"
        } else {
            snapshot.current_marker.as_str()
        };
        let text = vec![
            Line::from(format!(
                "Target:     {}",
                snapshot.target.as_deref().unwrap_or("-")
            )),
            Line::from(format!("Current IP: {marker}")),
            Line::from(format!(
                "User agent: {}",
                snapshot.current_user_agent.as_deref().unwrap_or("-")
            )),
            Line::from(format!(
                "Session:    {}",
                format_session_time(snapshot.elapsed_seconds)
            )),
            Line::from(format!(
                "Clicks:     {}  ({} ok / {} failed)",
                format_count(snapshot.total_events),
                format_count(snapshot.success_count),
                format_count(snapshot.error_count)
            )),
        ];
        let status = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Current Status"));
        f.render_widget(status, area);
    }

    fn render_visualizer(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Traffic");
        let inner = block.inner(area);
        if !inner.is_empty() {
            self.field
                .resize(f64::from(inner.width), f64::from(inner.height));
        }

        let width = self.field.width();
        let height = self.field.height();
        let target_x = self.field.target_x();

        let mut highlight = Vec::new();
        let mut success = Vec::new();
        let mut neutral = Vec::new();
        for point in self.field.points() {
            let coord = (point.x, point.y);
            match point.kind {
                PointKind::Highlight => highlight.push(coord),
                PointKind::Success => success.push(coord),
                PointKind::Neutral => neutral.push(coord),
            }
        }

        let canvas = Canvas::default()
            .block(block)
            .x_bounds([0.0, width])
            .y_bounds([0.0, height])
            .paint(move |ctx| {
                ctx.draw(&CanvasLine {
                    x1: target_x,
                    y1: 0.0,
                    x2: target_x,
                    y2: height,
                    color: Color::Green,
                });
                ctx.draw(&Points {
                    coords: &neutral,
                    color: Color::Gray,
                });
                ctx.draw(&Points {
                    coords: &success,
                    color: Color::Cyan,
                });
                ctx.draw(&Points {
                    coords: &highlight,
                    color: Color::Yellow,
                });
                ctx.print(target_x, height, "target");
            });
        f.render_widget(canvas, area);
    }

    fn render_tabs(&self, f: &mut Frame, area: Rect, snapshot: &SimulationSnapshot) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let tabs = Tabs::new(vec!["Statistics", "IP Log"])
            .block(Block::default().borders(Borders::ALL))
            .select(self.tab.index())
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        f.render_widget(tabs, rows[0]);

        match self.tab {
            Tab::Statistics => render_statistics(f, rows[1], snapshot),
            Tab::IpLog => render_ip_log(f, rows[1], snapshot),
        }
    }

    fn render_logs(&self, f: &mut Frame, area: Rect, logs: &MemoryLogBuffer) {
        let visible = area.height.saturating_sub(2) as usize;
        let items: Vec<ListItem> = logs
            .tail(visible)
            .into_iter()
            .map(|line| ListItem::new(Line::from(line)))
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Logs"));
        f.render_widget(list, area);
    }

    fn render_toast(&self, f: &mut Frame, area: Rect) {
        if let Some(toast) = &self.toast {
            let color = if toast.error { Color::Red } else { Color::Green };
            f.render_widget(
                Paragraph::new(toast.message.as_str()).style(Style::default().fg(color)),
                area,
            );
        }
    }
}

fn on_off(enabled: bool) -> Span<'static> {
    if enabled {
        Span::styled("on", Style::default().fg(Color::Green))
    } else {
        Span::styled("off", Style::default().fg(Color::DarkGray))
    }
}

fn render_statistics(f: &mut Frame, area: Rect, snapshot: &SimulationSnapshot) {
    let stats = StatsView::from_snapshot(snapshot);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Cards
            Constraint::Length(3), // Success gauge
            Constraint::Length(3), // Error gauge
            Constraint::Min(0),    // Traffic over time
            Constraint::Length(3), // Distribution
        ])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(rows[0]);
    let card_values = [
        ("Total Clicks", format_count(stats.total_events)),
        ("Success Rate", format!("{:.1}%", stats.success_rate)),
        ("Session Time", format_elapsed_short(stats.elapsed_seconds)),
        ("Clicks/Min", stats.rate_per_minute.to_string()),
    ];
    for ((title, value), card) in card_values.into_iter().zip(cards.iter()) {
        f.render_widget(
            Paragraph::new(value)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(title)),
            *card,
        );
    }

    let success = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Success"))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio((stats.success_rate / 100.0).clamp(0.0, 1.0))
        .label(format!(
            "{} ({:.1}%)",
            format_count(stats.success_count),
            stats.success_rate
        ));
    f.render_widget(success, rows[1]);

    let errors = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Errors"))
        .gauge_style(Style::default().fg(Color::Red))
        .ratio((stats.error_rate / 100.0).clamp(0.0, 1.0))
        .label(format!(
            "{} ({:.1}%)",
            format_count(stats.error_count),
            stats.error_rate
        ));
    f.render_widget(errors, rows[2]);

    let buckets = stats.traffic_over_time();
    let bars: Vec<(&str, u64)> = buckets
        .iter()
        .map(|b| (b.label.as_str(), b.clicks))
        .collect();
    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Traffic Over Time"),
        )
        .bar_width(5)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .data(bars.as_slice());
    f.render_widget(chart, rows[3]);

    let slices = stats.distribution();
    let distribution = if slices.is_empty() {
        Line::from("No clicks yet")
    } else {
        Line::from(
            slices
                .iter()
                .map(|slice| {
                    let (name, color) = match slice.outcome {
                        Outcome::Success => ("Success", Color::Green),
                        Outcome::Error => ("Error", Color::Red),
                    };
                    Span::styled(
                        format!("{name}: {} ({:.1}%)  ", slice.count, slice.percent),
                        Style::default().fg(color),
                    )
                })
                .collect::<Vec<_>>(),
        )
    };
    f.render_widget(
        Paragraph::new(distribution)
            .block(Block::default().borders(Borders::ALL).title("Distribution")),
        rows[4],
    );
}

fn render_ip_log(f: &mut Frame, area: Rect, snapshot: &SimulationSnapshot) {
    if snapshot.history.is_empty() {
        let block = Paragraph::new("No IPs used yet")
            .block(Block::default().borders(Borders::ALL).title("IP Log"));
        f.render_widget(block, area);
        return;
    }

    let items: Vec<ListItem> = history_entries(&snapshot.history)
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let style = if index == 0 {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<16}", entry.marker), style),
                Span::styled(entry.age, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("IP Log ({})", snapshot.history.len())),
    );
    f.render_widget(list, area);
}
