//! Human-like pointer movement planning.
//!
//! Trajectories are cubic Bézier curves with randomly perturbed control
//! points, an inexact landing offset, and an occasional overshoot-and-correct
//! pass. The emulator only *plans* movement; the driver layer replays the
//! timed positions as discrete pointer events.

use crate::core::config::MouseSettings;
use rand::Rng;
use std::time::Duration;

const FULL_MOVE_STEPS: usize = 50;
const OVERSHOOT_STEPS: usize = 30;
const CORRECTION_STEPS: usize = 20;

/// A pointer position on the page, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
}

impl PathPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One continuous stretch of pointer movement: evenly spaced positions plus
/// the total time to spread them over, and an optional pause once finished.
#[derive(Debug, Clone)]
pub struct MoveSegment {
    pub points: Vec<PathPoint>,
    pub duration: Duration,
    pub pause_after: Duration,
}

/// A complete planned move ending in a click.
#[derive(Debug, Clone)]
pub struct MovePlan {
    pub segments: Vec<MoveSegment>,
    /// Final pointer position; the click lands here.
    pub end: PathPoint,
    /// Short pause between arrival and the click event.
    pub pause_before_click: Duration,
}

/// Synthesizes curved pointer paths and click sequences.
pub struct MouseEmulator {
    settings: MouseSettings,
}

impl MouseEmulator {
    pub fn new(settings: MouseSettings) -> Self {
        Self { settings }
    }

    /// Plans a move from `from` to `target`, applying the landing offset and
    /// (with configured probability) an overshoot pass.
    pub fn plan_move(&self, from: PathPoint, target: PathPoint) -> MovePlan {
        let mut rng = rand::thread_rng();

        let end = self.apply_random_offset(&mut rng, target);
        let (min_ms, max_ms) = self.settings.move_duration_ms;
        let base_duration = rng.gen_range(min_ms as f64..=max_ms as f64);

        let mut segments = Vec::with_capacity(2);

        if rng.gen_bool(self.settings.overshoot_chance) {
            let overshoot = overshoot_point(&mut rng, from, end);
            segments.push(MoveSegment {
                points: self.path(&mut rng, from, overshoot, OVERSHOOT_STEPS),
                duration: Duration::from_secs_f64(base_duration * 0.6 / 1000.0),
                pause_after: Duration::from_secs_f64(rng.gen_range(0.05..0.15)),
            });
            segments.push(MoveSegment {
                points: self.path(&mut rng, overshoot, end, CORRECTION_STEPS),
                duration: Duration::from_secs_f64(base_duration * 0.4 / 1000.0),
                pause_after: Duration::ZERO,
            });
        } else {
            segments.push(MoveSegment {
                points: self.path(&mut rng, from, end, FULL_MOVE_STEPS),
                duration: Duration::from_secs_f64(base_duration / 1000.0),
                pause_after: Duration::ZERO,
            });
        }

        let (pause_min, pause_max) = self.settings.pause_before_click_ms;
        let pause_before_click =
            Duration::from_secs_f64(rng.gen_range(pause_min as f64..=pause_max as f64) / 1000.0);

        MovePlan {
            segments,
            end,
            pause_before_click,
        }
    }

    fn path(
        &self,
        rng: &mut impl Rng,
        start: PathPoint,
        end: PathPoint,
        steps: usize,
    ) -> Vec<PathPoint> {
        if self.settings.bezier_curves {
            bezier_path(rng, start, end, steps)
        } else {
            vec![start, end]
        }
    }

    /// Humans do not click exact pixels; shift the target by a random integer
    /// offset on both axes.
    fn apply_random_offset(&self, rng: &mut impl Rng, point: PathPoint) -> PathPoint {
        let radius = self.settings.random_offset_px;
        if radius == 0 {
            return point;
        }
        PathPoint::new(
            point.x + rng.gen_range(-radius..=radius) as f64,
            point.y + rng.gen_range(-radius..=radius) as f64,
        )
    }
}

/// Samples `steps + 1` points along a cubic Bézier curve from `start` to
/// `end`. Control points sit at the 1/3 and 2/3 marks of the straight line,
/// each pushed perpendicular to the travel direction by a random ±30%
/// fraction of the perpendicular projection.
pub fn bezier_path(
    rng: &mut impl Rng,
    start: PathPoint,
    end: PathPoint,
    steps: usize,
) -> Vec<PathPoint> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;

    let offset_x = dy * rng.gen_range(-0.3..0.3);
    let offset_y = -dx * rng.gen_range(-0.3..0.3);

    let c1 = PathPoint::new(start.x + dx * 0.33 + offset_x, start.y + dy * 0.33 + offset_y);
    let c2 = PathPoint::new(start.x + dx * 0.66 - offset_x, start.y + dy * 0.66 - offset_y);

    let steps = steps.max(1);
    let mut points = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let u = 1.0 - t;
        let x = u.powi(3) * start.x
            + 3.0 * u.powi(2) * t * c1.x
            + 3.0 * u * t.powi(2) * c2.x
            + t.powi(3) * end.x;
        let y = u.powi(3) * start.y
            + 3.0 * u.powi(2) * t * c1.y
            + 3.0 * u * t.powi(2) * c2.y
            + t.powi(3) * end.y;
        points.push(PathPoint::new(x, y));
    }
    points
}

/// Point 5–15% past the target along the travel vector, simulating the human
/// tendency to slightly overshoot and correct.
fn overshoot_point(rng: &mut impl Rng, start: PathPoint, end: PathPoint) -> PathPoint {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let factor = rng.gen_range(0.05..0.15);
    PathPoint::new(end.x + dx * factor, end.y + dy * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MouseSettings;

    #[test]
    fn bezier_endpoints_are_exact() {
        let mut rng = rand::thread_rng();
        let start = PathPoint::new(10.0, 20.0);
        let end = PathPoint::new(400.0, 300.0);
        let points = bezier_path(&mut rng, start, end, 50);

        assert_eq!(points.len(), 51);
        assert_eq!(points[0], start);
        let last = points.last().unwrap();
        assert!((last.x - end.x).abs() < 1e-9);
        assert!((last.y - end.y).abs() < 1e-9);
    }

    #[test]
    fn bezier_progress_is_monotonic_along_travel() {
        let mut rng = rand::thread_rng();
        let start = PathPoint::new(0.0, 0.0);
        let end = PathPoint::new(1000.0, 0.0);
        // Project each point onto the travel vector; the projection must only
        // increase for interior samples of a well-formed curve. Control point
        // perturbation is perpendicular, so the x component stays ordered.
        for _ in 0..20 {
            let points = bezier_path(&mut rng, start, end, 50);
            for pair in points.windows(2) {
                assert!(
                    pair[1].x >= pair[0].x - 1e-9,
                    "x regressed: {} -> {}",
                    pair[0].x,
                    pair[1].x
                );
            }
        }
    }

    #[test]
    fn plan_ends_within_offset_radius() {
        let emulator = MouseEmulator::new(MouseSettings::default());
        let target = PathPoint::new(500.0, 500.0);
        for _ in 0..50 {
            let plan = emulator.plan_move(PathPoint::new(0.0, 0.0), target);
            assert!((plan.end.x - target.x).abs() <= 10.0);
            assert!((plan.end.y - target.y).abs() <= 10.0);

            // Every segment chain must be continuous and terminate at the
            // plan's end point.
            let last_segment = plan.segments.last().unwrap();
            let final_point = last_segment.points.last().unwrap();
            assert!((final_point.x - plan.end.x).abs() < 1e-9);
            assert!((final_point.y - plan.end.y).abs() < 1e-9);
        }
    }

    #[test]
    fn overshoot_produces_two_segments() {
        let settings = MouseSettings {
            overshoot_chance: 1.0,
            ..Default::default()
        };
        let emulator = MouseEmulator::new(settings);
        let plan = emulator.plan_move(PathPoint::new(0.0, 0.0), PathPoint::new(300.0, 200.0));
        assert_eq!(plan.segments.len(), 2);
        assert!(plan.segments[0].pause_after > Duration::ZERO);
        assert!(plan.segments[0].points.len() > plan.segments[1].points.len());
    }

    #[test]
    fn no_overshoot_produces_single_full_segment() {
        let settings = MouseSettings {
            overshoot_chance: 0.0,
            ..Default::default()
        };
        let emulator = MouseEmulator::new(settings);
        let plan = emulator.plan_move(PathPoint::new(0.0, 0.0), PathPoint::new(300.0, 200.0));
        assert_eq!(plan.segments.len(), 1);
        assert_eq!(plan.segments[0].points.len(), FULL_MOVE_STEPS + 1);
    }

    #[test]
    fn straight_path_when_curves_disabled() {
        let settings = MouseSettings {
            bezier_curves: false,
            overshoot_chance: 0.0,
            random_offset_px: 0,
            ..Default::default()
        };
        let emulator = MouseEmulator::new(settings);
        let plan = emulator.plan_move(PathPoint::new(0.0, 0.0), PathPoint::new(100.0, 100.0));
        assert_eq!(plan.segments[0].points.len(), 2);
        assert_eq!(plan.end, PathPoint::new(100.0, 100.0));
    }
}
