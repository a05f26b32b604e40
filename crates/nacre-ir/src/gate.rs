//! Quantum gate types.

use serde::{Deserialize, Serialize};

use crate::parameter::ParameterExpression;

/// Standard gates with known semantics.
///
/// The compiler works internally in the `{u1, u2, u3, cx}` basis; the named
/// single-qubit gates exist so circuits can be written naturally and are
/// unrolled by the translation pass before the rewriting passes run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Phase gate U1(λ) = diag(1, e^{iλ}).
    U1(ParameterExpression),
    /// U2(φ, λ) = U3(π/2, φ, λ). U2(0, π) is a Hadamard up to phase.
    U2(ParameterExpression, ParameterExpression),
    /// Universal single-qubit gate U3(θ, φ, λ).
    U3(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),

    /// Hadamard gate.
    H,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),

    /// Controlled-X (CNOT) gate.
    CX,
    /// SWAP gate.
    Swap,
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::U1(_) => "u1",
            StandardGate::U2(_, _) => "u2",
            StandardGate::U3(_, _, _) => "u3",
            StandardGate::H => "h",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::CX => "cx",
            StandardGate::Swap => "swap",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::U1(_)
            | StandardGate::U2(_, _)
            | StandardGate::U3(_, _, _)
            | StandardGate::H
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_) => 1,

            StandardGate::CX | StandardGate::Swap => 2,
        }
    }

    /// Check if this gate has unbound symbolic parameters.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Get parameters of this gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::U1(p)
            | StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p) => vec![p],

            StandardGate::U2(a, b) => vec![a, b],
            StandardGate::U3(a, b, c) => vec![a, b, c],

            _ => vec![],
        }
    }
}

/// Classical condition guarding a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// The name of the classical register.
    pub register: String,
    /// The value to compare against.
    pub value: u64,
}

impl ClassicalCondition {
    /// Create a new classical condition.
    pub fn new(register: impl Into<String>, value: u64) -> Self {
        Self {
            register: register.into(),
            value,
        }
    }
}

/// A gate with associated metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The gate itself.
    pub kind: StandardGate,
    /// Optional label for the gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Optional classical guard condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

impl Gate {
    /// Create a new gate from a standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self {
            kind: gate,
            label: None,
            condition: None,
        }
    }

    /// Add a label to the gate.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a classical condition to the gate.
    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Get the name of this gate.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert_eq!(StandardGate::Swap.num_qubits(), 2);

        assert!(!StandardGate::H.is_parameterized());
        assert!(!StandardGate::U1(ParameterExpression::constant(PI)).is_parameterized());
        assert!(StandardGate::Rx(ParameterExpression::symbol("theta")).is_parameterized());
    }

    #[test]
    fn test_gate_names() {
        assert_eq!(StandardGate::U2(0.0.into(), PI.into()).name(), "u2");
        assert_eq!(StandardGate::CX.name(), "cx");
        assert_eq!(StandardGate::Swap.name(), "swap");
    }

    #[test]
    fn test_gate_creation() {
        let h = Gate::standard(StandardGate::H);
        assert_eq!(h.name(), "h");
        assert_eq!(h.num_qubits(), 1);
        assert!(h.label.is_none());
        assert!(h.condition.is_none());

        let guarded =
            Gate::standard(StandardGate::X).with_condition(ClassicalCondition::new("c", 1));
        assert!(guarded.condition.is_some());
    }
}
