//! Target-specific compilation passes.
//!
//! These passes consume device properties (coupling map, calibration,
//! basis gates) and produce hardware-compatible circuits.

pub mod check;
pub mod embed;
pub mod layout;
pub mod noise_adaptive;
pub mod routing;
pub mod swap_table;
pub mod translation;

pub use check::{CXDirection, CheckCXDirection, CheckMap};
pub use embed::{ApplyLayout, FullAncillaAllocation};
pub use layout::{ChainLayout, DenseLayout, SetLayout, TrivialLayout};
pub use noise_adaptive::{NoiseAdaptiveSwap, RouterConfig};
pub use routing::BasicRouting;
pub use swap_table::SwapTable;
pub use translation::BasisUnroller;
