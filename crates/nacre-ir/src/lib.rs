//! Nacre circuit intermediate representation.
//!
//! This crate provides the data structures the Nacre compiler operates on.
//! Circuits are stored as a DAG of operations over quantum and classical
//! wires; the high-level [`Circuit`] type offers a builder API on top.
//!
//! # Core components
//!
//! - [`QubitId`], [`ClbitId`]: wire identifiers
//! - [`StandardGate`]: the gate set (`u1`/`u2`/`u3` family, named
//!   single-qubit gates, `cx`, `swap`)
//! - [`Instruction`]: a gate, measurement, reset, barrier, or opaque
//!   marker together with its operands
//! - [`CircuitDag`]: the wire-dependency graph with layer views
//! - [`Circuit`]: builder API
//!
//! # Example
//!
//! ```rust
//! use nacre_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.depth(), 3);
//! ```

pub mod circuit;
pub mod dag;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;

pub use circuit::Circuit;
pub use dag::{CircuitDag, DagEdge, DagNode, NodeIndex, QuantumRegister, WireId};
pub use error::{IrError, IrResult};
pub use gate::{ClassicalCondition, Gate, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::ParameterExpression;
pub use qubit::{Clbit, ClbitId, Qubit, QubitId};
