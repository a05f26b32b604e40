//! Target-agnostic compilation passes.
//!
//! These passes operate purely on the DAG structure without consulting
//! device properties and are safe to run on any circuit.

pub mod analysis;
pub mod cascade;
pub mod measure;
pub mod optimization;

pub use analysis::{Depth, FixedPoint};
pub use cascade::TransformCxCascade;
pub use measure::{
    BarrierBeforeFinalMeasurements, OptimizeSwapBeforeMeasure, RemoveDiagonalGatesBeforeMeasure,
    RemoveResetInZeroState,
};
pub use optimization::{CancelCX, CommutativeCancellation, Optimize1qGates};

/// Tolerance for angle comparisons.
pub(crate) const EPSILON: f64 = 1e-10;
