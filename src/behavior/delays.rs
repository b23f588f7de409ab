//! Human-like delay generation.
//!
//! Gaussian sampling clusters around the midpoint of each configured range
//! while still allowing outliers, which reads far more naturally than a
//! uniform draw. A short rolling history is kept so that runs of
//! near-identical delays get perturbed before they become a detectable
//! rhythm.

use crate::core::config::{DelayRanges, MsRange};
use parking_lot::Mutex;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::collections::VecDeque;
use std::time::Duration;

const MAX_HISTORY: usize = 10;
const MIN_DELAY_SECS: f64 = 0.1;

/// Action categories with independently configured delay ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayCategory {
    BetweenActions,
    BetweenRecords,
    AfterTyping,
    AfterClick,
    AfterCardClose,
    CardLoad,
}

/// Produces human-plausible wait durations per action category.
///
/// Shared by `&self`; the rolling history sits behind a mutex so a single
/// manager can pace every interaction in a run.
pub struct DelayManager {
    ranges: DelayRanges,
    history: Mutex<VecDeque<f64>>,
}

impl DelayManager {
    pub fn new(ranges: DelayRanges) -> Self {
        Self {
            ranges,
            history: Mutex::new(VecDeque::with_capacity(MAX_HISTORY)),
        }
    }

    /// Returns the next delay for the given category and records it.
    pub fn delay(&self, category: DelayCategory) -> Duration {
        let (min_ms, max_ms) = self.range_for(category);
        self.delay_in_range(min_ms, max_ms)
    }

    /// Sleeps for a freshly sampled delay of the given category.
    pub async fn pause(&self, category: DelayCategory) {
        let duration = self.delay(category);
        tracing::trace!(target: "behavior", "Pausing {:?} for {:.2?}", category, duration);
        tokio::time::sleep(duration).await;
    }

    fn range_for(&self, category: DelayCategory) -> MsRange {
        match category {
            DelayCategory::BetweenActions => self.ranges.between_actions,
            DelayCategory::BetweenRecords => self.ranges.between_records,
            DelayCategory::AfterTyping => self.ranges.after_typing,
            DelayCategory::AfterClick => self.ranges.after_click,
            DelayCategory::AfterCardClose => self.ranges.after_card_close,
            DelayCategory::CardLoad => self.ranges.card_load,
        }
    }

    /// Samples a delay from `[min_ms, max_ms]` with variation and
    /// pattern-avoidance applied, recording the final value in history.
    pub fn delay_in_range(&self, min_ms: u64, max_ms: u64) -> Duration {
        let mut rng = rand::thread_rng();

        let mut secs = gaussian_in_range(&mut rng, min_ms, max_ms);
        secs = add_micro_variation(&mut rng, secs);
        secs = self.avoid_pattern(&mut rng, secs);
        self.record(secs);

        Duration::from_secs_f64(secs)
    }

    /// Adds extra perturbation when the last three recorded delays are all
    /// within 0.1 s of the proposal.
    fn avoid_pattern(&self, rng: &mut impl Rng, proposed: f64) -> f64 {
        let history = self.history.lock();
        let mut delay = proposed;
        if history.len() >= 3 {
            let recent: Vec<f64> = history.iter().rev().take(3).copied().collect();
            if recent.iter().all(|d| (d - proposed).abs() < 0.1) {
                delay += rng.gen_range(-0.2..0.3);
            }
        }
        delay.max(MIN_DELAY_SECS)
    }

    fn record(&self, secs: f64) {
        let mut history = self.history.lock();
        history.push_back(secs);
        if history.len() > MAX_HISTORY {
            history.pop_front();
        }
    }

    #[cfg(test)]
    fn seed_history(&self, values: &[f64]) {
        let mut history = self.history.lock();
        history.clear();
        history.extend(values.iter().copied());
    }
}

/// Gaussian draw with mean at the range midpoint and stddev of range/6
/// (~99.7% of mass inside the range), clamped to the range.
fn gaussian_in_range(rng: &mut impl Rng, min_ms: u64, max_ms: u64) -> f64 {
    let min = min_ms as f64;
    let max = max_ms as f64;
    if max <= min {
        return min / 1000.0;
    }
    let mean = (min + max) / 2.0;
    let std_dev = (max - min) / 6.0;
    let sampled = match Normal::new(mean, std_dev) {
        Ok(normal) => normal.sample(rng),
        Err(_) => mean,
    };
    sampled.clamp(min, max) / 1000.0
}

/// ±5% multiplicative jitter so repeated draws never land on exact values.
fn add_micro_variation(rng: &mut impl Rng, secs: f64) -> f64 {
    let variation = secs * 0.05;
    secs + rng.gen_range(-variation..=variation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DelayRanges;

    fn manager() -> DelayManager {
        DelayManager::new(DelayRanges::default())
    }

    #[test]
    fn gaussian_sample_stays_in_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let secs = gaussian_in_range(&mut rng, 500, 2000);
            assert!((0.5..=2.0).contains(&secs), "sample {} out of range", secs);
        }
    }

    #[test]
    fn empirical_mean_near_midpoint() {
        let mut rng = rand::thread_rng();
        let samples: Vec<f64> = (0..2000)
            .map(|_| gaussian_in_range(&mut rng, 1000, 3000))
            .collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        // Midpoint is 2.0s; allow 5% drift.
        assert!((1.9..=2.1).contains(&mean), "mean was {}", mean);
    }

    #[test]
    fn pattern_break_fires_on_identical_history() {
        let manager = manager();
        let mut rng = rand::thread_rng();
        manager.seed_history(&[1.0, 1.0, 1.0]);
        // With history pinned at exactly the proposal, the perturbation must
        // move the value (U[-0.2, 0.3] is 0 with probability zero).
        let adjusted = manager.avoid_pattern(&mut rng, 1.0);
        assert!((adjusted - 1.0).abs() > f64::EPSILON);
    }

    #[test]
    fn pattern_break_not_triggered_on_varied_history() {
        let manager = manager();
        let mut rng = rand::thread_rng();
        manager.seed_history(&[0.5, 1.4, 0.9]);
        let adjusted = manager.avoid_pattern(&mut rng, 1.0);
        assert_eq!(adjusted, 1.0);
    }

    #[test]
    fn absolute_floor_enforced() {
        let manager = manager();
        let mut rng = rand::thread_rng();
        manager.seed_history(&[0.1, 0.1, 0.1]);
        for _ in 0..100 {
            let adjusted = manager.avoid_pattern(&mut rng, 0.1);
            assert!(adjusted >= MIN_DELAY_SECS);
        }
    }

    #[test]
    fn history_is_bounded() {
        let manager = manager();
        for _ in 0..50 {
            manager.delay(DelayCategory::BetweenActions);
        }
        assert!(manager.history.lock().len() <= MAX_HISTORY);
    }
}
