//! Circuit instructions combining operations with operands.

use serde::{Deserialize, Serialize};

use crate::gate::{Gate, StandardGate};
use crate::qubit::{ClbitId, QubitId};

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A quantum gate operation.
    Gate(Gate),
    /// Measurement operation.
    Measure,
    /// Reset qubit to |0⟩.
    Reset,
    /// Barrier (synchronization point).
    Barrier,
    /// Opaque multi-wire marker (snapshot, save, load, noise, ...).
    ///
    /// The compiler never reorders gates across the marker's wires and
    /// carries it through unchanged.
    Opaque {
        /// The marker name.
        name: String,
    },
}

/// A complete instruction with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on, in order.
    pub qubits: Vec<QubitId>,
    /// Classical bits this instruction operates on (for measure).
    pub clbits: Vec<ClbitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: impl Into<Gate>, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate.into()),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Create a single-qubit gate instruction.
    pub fn single_qubit_gate(gate: StandardGate, qubit: QubitId) -> Self {
        Self::gate(gate, [qubit])
    }

    /// Create a two-qubit gate instruction.
    pub fn two_qubit_gate(gate: StandardGate, q1: QubitId, q2: QubitId) -> Self {
        Self::gate(gate, [q1, q2])
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: InstructionKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
        }
    }

    /// Create a reset instruction.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Reset,
            qubits: vec![qubit],
            clbits: vec![],
        }
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Barrier,
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Create an opaque marker instruction.
    pub fn opaque(name: impl Into<String>, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Opaque { name: name.into() },
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self.kind, InstructionKind::Measure)
    }

    /// Check if this is a reset.
    pub fn is_reset(&self) -> bool {
        matches!(self.kind, InstructionKind::Reset)
    }

    /// Check if this is a barrier.
    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, InstructionKind::Barrier)
    }

    /// Check if this is a barrier or an opaque multi-wire marker.
    ///
    /// Markers are never rewritten; the routing and cascade passes only
    /// respect their wire footprint when scheduling around them.
    pub fn is_marker(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::Barrier | InstructionKind::Opaque { .. }
        )
    }

    /// Check if this is a CX gate.
    pub fn is_cx(&self) -> bool {
        matches!(
            &self.kind,
            InstructionKind::Gate(g) if matches!(g.kind, StandardGate::CX)
        )
    }

    /// Get the gate if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&Gate> {
        match &self.kind {
            InstructionKind::Gate(g) => Some(g),
            _ => None,
        }
    }

    /// Get mutable reference to the gate.
    pub fn gate_mut(&mut self) -> Option<&mut Gate> {
        match &mut self.kind {
            InstructionKind::Gate(g) => Some(g),
            _ => None,
        }
    }

    /// Get the name of the instruction.
    pub fn name(&self) -> &str {
        match &self.kind {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Measure => "measure",
            InstructionKind::Reset => "reset",
            InstructionKind::Barrier => "barrier",
            InstructionKind::Opaque { name } => name,
        }
    }

    /// Return a copy of this instruction with its qubit operands rewritten
    /// through `mapping`.
    ///
    /// The original instruction is left untouched; gate payload, classical
    /// operands and guard condition are shared by clone.
    pub fn rewrite_operands(&self, mapping: impl Fn(QubitId) -> QubitId) -> Self {
        let mut out = self.clone();
        out.qubits = self.qubits.iter().map(|&q| mapping(q)).collect();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_instruction() {
        let inst = Instruction::single_qubit_gate(StandardGate::H, QubitId(0));
        assert!(inst.is_gate());
        assert_eq!(inst.qubits.len(), 1);
        assert_eq!(inst.name(), "h");
    }

    #[test]
    fn test_measure_instruction() {
        let inst = Instruction::measure(QubitId(0), ClbitId(0));
        assert!(inst.is_measure());
        assert_eq!(inst.qubits.len(), 1);
        assert_eq!(inst.clbits.len(), 1);
    }

    #[test]
    fn test_marker_instructions() {
        let barrier = Instruction::barrier([QubitId(0), QubitId(1)]);
        assert!(barrier.is_marker());

        let snap = Instruction::opaque("snapshot", [QubitId(0), QubitId(1), QubitId(2)]);
        assert!(snap.is_marker());
        assert_eq!(snap.name(), "snapshot");
        assert_eq!(snap.qubits.len(), 3);

        let cx = Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1));
        assert!(!cx.is_marker());
        assert!(cx.is_cx());
    }

    #[test]
    fn test_instruction_json_roundtrip() {
        let inst = Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1));
        let json = serde_json::to_string(&inst).unwrap();
        let restored: Instruction = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, inst);
    }

    #[test]
    fn test_rewrite_operands() {
        let cx = Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1));
        let moved = cx.rewrite_operands(|q| QubitId(q.0 + 2));
        assert_eq!(moved.qubits, vec![QubitId(2), QubitId(3)]);
        // Original is untouched.
        assert_eq!(cx.qubits, vec![QubitId(0), QubitId(1)]);
    }
}
