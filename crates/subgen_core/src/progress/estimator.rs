//! Progress estimator for remote operations that report nothing.
//!
//! Transcription and final rendering give no incremental signal, so the
//! pipeline fakes one: a timer adds a small random increment on each tick,
//! capped below 100 so the bar never claims completion. The completion
//! signal cancels the timer and snaps to exactly 100; a failure cancels
//! the timer and freezes the value where it stalled.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::task::JoinHandle;

/// Tick cadence and step distribution for one operation kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorProfile {
    /// Time between ticks.
    pub interval: Duration,
    /// Upper bound of the uniform random increment per tick.
    pub step_max: f64,
    /// Value the estimate is not allowed to cross on its own.
    pub ceiling: f64,
}

impl EstimatorProfile {
    /// Profile for automatic transcription: 1s ticks, creeps up to 90.
    pub fn transcribe() -> Self {
        Self {
            interval: Duration::from_secs(1),
            step_max: 5.0,
            ceiling: 90.0,
        }
    }

    /// Profile for final rendering: 2s ticks, creeps up to 95.
    pub fn render() -> Self {
        Self {
            interval: Duration::from_secs(2),
            step_max: 5.0,
            ceiling: 95.0,
        }
    }
}

/// Shared progress value, written by at most one producer at a time.
///
/// All mutation paths except `reset` are non-decreasing, so readers see a
/// monotone value within a single operation.
#[derive(Clone, Default)]
pub struct ProgressCell(Arc<Mutex<f64>>);

impl ProgressCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value in percent.
    pub fn get(&self) -> f64 {
        *self.0.lock()
    }

    /// Set back to zero at the start of a new operation.
    pub fn reset(&self) {
        *self.0.lock() = 0.0;
    }

    /// Snap to an exact value (the completion jump to 100).
    pub fn force(&self, value: f64) {
        *self.0.lock() = value;
    }

    /// Raise to `value` if the current value is lower.
    pub fn set_at_least(&self, value: f64) {
        let mut current = self.0.lock();
        if value > *current {
            *current = value;
        }
    }

    /// Add `step`, clamped to `ceiling`; never decreases.
    pub fn advance(&self, step: f64, ceiling: f64) {
        let mut current = self.0.lock();
        let next = (*current + step).min(ceiling);
        if next > *current {
            *current = next;
        }
    }
}

/// Starts and owns the estimator timer task.
pub struct ProgressEstimator;

impl ProgressEstimator {
    /// Start estimating into `cell` with the given profile.
    ///
    /// The cell is reset to zero first. Exactly one estimator may be
    /// active per pipeline; the controller's single-flight guard makes a
    /// second start unreachable.
    pub fn start(profile: EstimatorProfile, cell: ProgressCell) -> EstimatorHandle {
        cell.reset();

        let tick_cell = cell.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(profile.interval);
            // The first tick of a tokio interval completes immediately;
            // consume it so the first increment lands after one period.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let step = rand::thread_rng().gen_range(0.0..=profile.step_max);
                tick_cell.advance(step, profile.ceiling);
            }
        });

        EstimatorHandle { task, cell }
    }
}

/// Handle to a running estimator; settling it consumes the handle.
pub struct EstimatorHandle {
    task: JoinHandle<()>,
    cell: ProgressCell,
}

impl EstimatorHandle {
    /// Operation succeeded: stop ticking and snap to exactly 100.
    pub fn finish(self) {
        self.task.abort();
        self.cell.force(100.0);
    }

    /// Operation failed: stop ticking, freeze at the last value so the
    /// UI can show where it stalled.
    pub fn fail(self) {
        self.task.abort();
    }
}

impl Drop for EstimatorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
