use std::time::Duration;

use traffic_sim_abstract::RandomSource;

/// Upper bound on particles kept on screen.
pub const MAX_POINTS: usize = 150;
/// Particles are spawned this many times faster than clicks.
const SPAWN_MULTIPLIER: u32 = 3;
/// Fraction of the remaining distance covered per spawn step.
const APPROACH: f64 = 0.05;
/// Particles closer than this to the target line are retired.
const ARRIVAL_MARGIN: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Highlight,
    Success,
    Neutral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficPoint {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub opacity: f64,
    pub kind: PointKind,
}

/// Particle field drifting from the left edge toward a target line.
#[derive(Debug, Clone)]
pub struct TrafficField {
    width: f64,
    height: f64,
    points: Vec<TrafficPoint>,
    pending: Duration,
}

impl TrafficField {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            points: Vec::new(),
            pending: Duration::ZERO,
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn points(&self) -> &[TrafficPoint] {
        &self.points
    }

    /// X coordinate particles converge on.
    pub fn target_x(&self) -> f64 {
        self.width * 0.8
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.pending = Duration::ZERO;
    }

    /// Spawn interval for a click rate: `60000 / (rate * 3)` ms.
    pub fn spawn_period(rate_per_minute: u32) -> Duration {
        Duration::from_secs(60) / (rate_per_minute.max(1) * SPAWN_MULTIPLIER)
    }

    /// Account for `elapsed` wall time, running one spawn step per spawn
    /// period that has passed. Returns the number of steps run.
    pub fn advance(
        &mut self,
        elapsed: Duration,
        rate_per_minute: u32,
        rng: &mut dyn RandomSource,
    ) -> usize {
        if self.width <= 0.0 {
            return 0;
        }
        let period = Self::spawn_period(rate_per_minute);
        self.pending += elapsed;

        let mut steps = 0;
        while self.pending >= period {
            self.pending -= period;
            self.step(rng);
            steps += 1;
        }
        steps
    }

    /// Move every particle toward the target, retire arrivals and spawn one.
    pub fn step(&mut self, rng: &mut dyn RandomSource) {
        let target = self.target_x();
        for point in &mut self.points {
            point.x += (target - point.x) * APPROACH;
        }
        self.points.retain(|p| p.x < target - ARRIVAL_MARGIN);

        let y = rng.next_unit() * self.height;
        let size = 2.0 + rng.next_unit() * 3.0;
        let opacity = 0.5 + rng.next_unit() * 0.5;
        let kind = if rng.next_unit() > 0.9 {
            PointKind::Highlight
        } else if rng.next_unit() > 0.5 {
            PointKind::Success
        } else {
            PointKind::Neutral
        };
        self.points.push(TrafficPoint {
            x: 0.0,
            y,
            size,
            opacity,
            kind,
        });

        if self.points.len() > MAX_POINTS {
            let excess = self.points.len() - MAX_POINTS;
            self.points.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::StdRandom;
    use crate::random::scripted::ScriptedRandom;

    #[test]
    fn spawn_period_is_a_third_of_the_click_period() {
        assert_eq!(TrafficField::spawn_period(200), Duration::from_millis(100));
        assert_eq!(TrafficField::spawn_period(10), Duration::from_millis(2000));
    }

    #[test]
    fn step_spawns_at_left_edge() {
        let mut field = TrafficField::new(100.0, 50.0);
        // y, size, opacity, highlight roll, success roll
        let mut rng = ScriptedRandom::units([0.5, 0.0, 1.0, 0.2, 0.7]);
        field.step(&mut rng);

        let point = &field.points()[0];
        assert_eq!(point.x, 0.0);
        assert_eq!(point.y, 25.0);
        assert_eq!(point.size, 2.0);
        assert_eq!(point.opacity, 1.0);
        assert_eq!(point.kind, PointKind::Success);
    }

    #[test]
    fn points_drift_toward_target() {
        let mut field = TrafficField::new(100.0, 50.0);
        let mut rng = ScriptedRandom::default();
        field.step(&mut rng);
        field.step(&mut rng);

        // first point moved 5% of the way to x = 80
        assert_eq!(field.points().len(), 2);
        assert!((field.points()[0].x - 4.0).abs() < 1e-9);
        assert_eq!(field.points()[1].x, 0.0);
    }

    #[test]
    fn advance_accumulates_partial_periods() {
        let mut field = TrafficField::new(100.0, 50.0);
        let mut rng = ScriptedRandom::default();
        assert_eq!(field.advance(Duration::from_millis(60), 200, &mut rng), 0);
        assert_eq!(field.advance(Duration::from_millis(60), 200, &mut rng), 1);
        assert_eq!(field.advance(Duration::from_millis(330), 200, &mut rng), 3);
        assert_eq!(field.points().len(), 4);
    }

    #[test]
    fn field_never_exceeds_capacity() {
        let mut field = TrafficField::new(1.0e12, 50.0);
        let mut rng = StdRandom::seeded(3);
        for _ in 0..400 {
            field.step(&mut rng);
            assert!(field.points().len() <= MAX_POINTS);
        }
        assert_eq!(field.points().len(), MAX_POINTS);
    }

    #[test]
    fn resize_moves_target_line() {
        let mut field = TrafficField::new(100.0, 50.0);
        assert_eq!(field.target_x(), 80.0);
        field.resize(50.0, 20.0);
        assert_eq!(field.target_x(), 40.0);
        assert_eq!(field.height(), 20.0);

        let mut rng = ScriptedRandom::units([1.0]);
        field.step(&mut rng);
        assert_eq!(field.points()[0].y, 20.0);
    }

    #[test]
    fn zero_width_field_is_inert() {
        let mut field = TrafficField::new(0.0, 0.0);
        let mut rng = ScriptedRandom::default();
        assert_eq!(field.advance(Duration::from_secs(5), 200, &mut rng), 0);
        assert!(field.points().is_empty());
    }
}
