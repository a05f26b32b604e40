//! Built-in compilation passes.
//!
//! Passes are organized into two categories:
//! - [`agnostic`]: passes that operate purely on DAG structure
//! - [`target`]: passes that require device properties

pub mod agnostic;
pub mod target;

pub use agnostic::{
    BarrierBeforeFinalMeasurements, CancelCX, CommutativeCancellation, Depth, FixedPoint,
    Optimize1qGates, OptimizeSwapBeforeMeasure, RemoveDiagonalGatesBeforeMeasure,
    RemoveResetInZeroState, TransformCxCascade,
};
pub use target::{
    ApplyLayout, BasicRouting, BasisUnroller, CXDirection, ChainLayout, CheckCXDirection,
    CheckMap, DenseLayout, FullAncillaAllocation, NoiseAdaptiveSwap, RouterConfig, SetLayout,
    SwapTable, TrivialLayout,
};
