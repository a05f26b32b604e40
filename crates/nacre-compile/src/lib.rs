//! Nacre compilation framework.
//!
//! Nacre lowers abstract circuits onto a noisy device: it rewrites CNOT
//! cascades into nearest-neighbor form, places the circuit on a chain of
//! well-calibrated qubits, and inserts swaps chosen by a look-ahead search
//! that weighs link reliability against routing progress.
//!
//! # Architecture
//!
//! Compilation is organized as a sequence of passes over a circuit DAG,
//! sharing state through a [`PropertySet`]:
//!
//! ```text
//! Input circuit
//!       │
//!       ▼
//! ┌─────────────┐
//! │ PassManager │ ◄── PropertySet (layout, coupling map, calibration)
//! └─────────────┘
//!       │
//!       ├── BasisUnroller → TransformCxCascade
//!       ├── ChainLayout / DenseLayout / TrivialLayout
//!       ├── FullAncillaAllocation → ApplyLayout
//!       ├── CheckMap → NoiseAdaptiveSwap / BasicRouting
//!       ├── BasisUnroller → optimization fixpoint
//!       └── CheckCXDirection → CXDirection
//!       │
//!       ▼
//! Output circuit (device-compatible)
//! ```
//!
//! # Example
//!
//! ```rust
//! use nacre_compile::{noise_pass_manager, TranspileOptions};
//! use nacre_compile::{BackendProperties, CouplingMap};
//! use nacre_ir::{Circuit, QubitId};
//!
//! let coupling = CouplingMap::linear(4);
//! let calibration = BackendProperties::uniform(&coupling, 0.01);
//!
//! let (pm, mut props) = noise_pass_manager(TranspileOptions {
//!     coupling_map: Some(coupling),
//!     backend_properties: Some(calibration),
//!     ..TranspileOptions::default()
//! })
//! .unwrap();
//!
//! let mut circuit = Circuit::with_size("ghz", 4, 0);
//! circuit.h(QubitId(0)).unwrap();
//! for i in 1..4 {
//!     circuit.cx(QubitId(0), QubitId(i)).unwrap();
//! }
//! let mut dag = circuit.into_dag();
//! pm.run(&mut dag, &mut props).unwrap();
//! ```
//!
//! # Custom passes
//!
//! Implement the [`Pass`] trait to add passes:
//!
//! ```rust
//! use nacre_compile::{CompileResult, Pass, PassKind, PropertySet};
//! use nacre_ir::CircuitDag;
//!
//! struct MyPass;
//!
//! impl Pass for MyPass {
//!     fn name(&self) -> &str { "my_pass" }
//!     fn kind(&self) -> PassKind { PassKind::Transformation }
//!
//!     fn run(&self, dag: &mut CircuitDag, props: &mut PropertySet) -> CompileResult<()> {
//!         Ok(())
//!     }
//! }
//! ```

pub mod calibration;
pub mod error;
pub mod manager;
pub mod pass;
pub mod property;
pub mod unitary;

// Built-in passes
pub mod passes;

pub use calibration::{Backend, BackendProperties};
pub use error::{CompileError, CompileResult};
pub use manager::{FixedPointLoop, PassManager, TranspileOptions, noise_pass_manager};
pub use pass::{Pass, PassKind};
pub use passes::{
    ChainLayout, NoiseAdaptiveSwap, RouterConfig, SwapTable, TransformCxCascade,
};
pub use property::{BasisGates, CouplingMap, Layout, PropertySet};
