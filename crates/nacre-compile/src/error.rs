//! Error types for the compilation crate.

use thiserror::Error;

/// Errors that can occur during compilation.
///
/// Every variant is fatal to the pass that raises it; the pass manager
/// reports the error verbatim and does not retry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] nacre_ir::IrError),

    /// Circuit requires more qubits than the device provides.
    #[error("Circuit requires {required} qubits but the device only has {available}")]
    CapacityExceeded {
        /// Qubits required by the circuit.
        required: usize,
        /// Qubits available on the device.
        available: u32,
    },

    /// The coupling input does not describe a valid device graph.
    #[error("Invalid coupling map: {0}")]
    InvalidCouplingMap(String),

    /// The routed DAG does not carry the expected physical register.
    #[error("Bad register: {0}")]
    BadRegister(String),

    /// A pass that must run before layout found one already set.
    #[error("Pass must run before any layout has been set")]
    LayoutPrecondition,

    /// Router weighting factor out of range.
    #[error("Swap score weight alpha must lie in [0, 1], got {0}")]
    InvalidAlpha(f64),

    /// Unknown layout/routing/translation method name.
    #[error("Unsupported method '{0}'")]
    UnsupportedMethod(String),

    /// A simulator target was configured without calibration data.
    #[error("Backend is a simulator or unspecified; provide backend properties and a coupling map")]
    MissingCalibration,

    /// Missing coupling map for routing.
    #[error("Missing coupling map for routing")]
    MissingCouplingMap,

    /// Missing layout for routing.
    #[error("Missing layout for routing")]
    MissingLayout,

    /// Routing failed because qubits are not connected.
    #[error("Routing failed: qubits {qubit1} and {qubit2} not connected")]
    RoutingFailed {
        /// First physical qubit.
        qubit1: u32,
        /// Second physical qubit.
        qubit2: u32,
    },

    /// Gate not in target basis and no translation rule applies.
    #[error("Gate '{0}' not in target basis")]
    GateNotInBasis(String),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
