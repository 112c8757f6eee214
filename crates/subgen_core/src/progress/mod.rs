//! Synthetic progress for operations without server-pushed progress.

mod estimator;

pub use estimator::{EstimatorHandle, EstimatorProfile, ProgressCell, ProgressEstimator};
