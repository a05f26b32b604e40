//! High-level circuit builder over the DAG representation.

use crate::dag::CircuitDag;
use crate::error::IrResult;
use crate::gate::StandardGate;
use crate::instruction::Instruction;
use crate::parameter::ParameterExpression;
use crate::qubit::{Clbit, ClbitId, Qubit, QubitId};

/// A quantum circuit with a builder-style API.
///
/// `Circuit` wraps a [`CircuitDag`] and tracks named bits. Most passes work
/// on the DAG directly; the builder exists for tests, examples, and circuit
/// construction by library users.
#[derive(Debug, Clone)]
pub struct Circuit {
    name: String,
    dag: CircuitDag,
    qubits: Vec<Qubit>,
    clbits: Vec<Clbit>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dag: CircuitDag::new(),
            qubits: vec![],
            clbits: vec![],
        }
    }

    /// Create a circuit with a quantum register `q` of `num_qubits` and a
    /// classical register `c` of `num_clbits`.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut circuit = Self::new(name);
        if num_qubits > 0 {
            circuit
                .add_qreg("q", num_qubits)
                .expect("registers of a fresh circuit cannot collide");
        }
        for i in 0..num_clbits {
            let id = ClbitId(i);
            circuit.dag.add_clbit(id);
            circuit.clbits.push(Clbit::with_register(id, "c", i));
        }
        circuit
    }

    /// Add a named quantum register.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<QubitId>> {
        let name = name.into();
        let ids = self.dag.add_qreg(name.clone(), size)?;
        for (i, &id) in ids.iter().enumerate() {
            self.qubits
                .push(Qubit::with_register(id, name.clone(), i as u32));
        }
        Ok(ids)
    }

    // --- single-qubit gates ---

    /// Apply a Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::H, [qubit])
    }

    /// Apply a Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::X, [qubit])
    }

    /// Apply a Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Y, [qubit])
    }

    /// Apply a Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Z, [qubit])
    }

    /// Apply an S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::S, [qubit])
    }

    /// Apply an S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Sdg, [qubit])
    }

    /// Apply a T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::T, [qubit])
    }

    /// Apply a T-dagger gate.
    pub fn tdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Tdg, [qubit])
    }

    /// Apply an X-rotation.
    pub fn rx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Rx(theta.into()), [qubit])
    }

    /// Apply a Y-rotation.
    pub fn ry(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Ry(theta.into()), [qubit])
    }

    /// Apply a Z-rotation.
    pub fn rz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Rz(theta.into()), [qubit])
    }

    /// Apply a U1 phase gate.
    pub fn u1(
        &mut self,
        lambda: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::U1(lambda.into()), [qubit])
    }

    /// Apply a U2 gate.
    pub fn u2(
        &mut self,
        phi: impl Into<ParameterExpression>,
        lambda: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::U2(phi.into(), lambda.into()), [qubit])
    }

    /// Apply a U3 gate.
    pub fn u3(
        &mut self,
        theta: impl Into<ParameterExpression>,
        phi: impl Into<ParameterExpression>,
        lambda: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(
            StandardGate::U3(theta.into(), phi.into(), lambda.into()),
            [qubit],
        )
    }

    // --- two-qubit gates ---

    /// Apply a CNOT gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CX, [control, target])
    }

    /// Apply a SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Swap, [q1, q2])
    }

    // --- non-gate instructions ---

    /// Measure a qubit into a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::measure(qubit, clbit))?;
        Ok(self)
    }

    /// Measure every qubit into the classical bit of the same index.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        let mut qubits: Vec<_> = self.dag.qubits().collect();
        qubits.sort_unstable();
        for q in qubits {
            let c = ClbitId(q.0);
            if !self.clbits.iter().any(|cb| cb.id == c) {
                self.dag.add_clbit(c);
                self.clbits.push(Clbit::with_register(c, "c", c.0));
            }
            self.dag.apply(Instruction::measure(q, c))?;
        }
        Ok(self)
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::reset(qubit))?;
        Ok(self)
    }

    /// Apply a barrier over the given qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::barrier(qubits))?;
        Ok(self)
    }

    /// Apply a barrier over every qubit.
    pub fn barrier_all(&mut self) -> IrResult<&mut Self> {
        let mut qubits: Vec<_> = self.dag.qubits().collect();
        qubits.sort_unstable();
        self.barrier(qubits)
    }

    /// Apply an opaque marker over the given qubits.
    pub fn opaque(
        &mut self,
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::opaque(name, qubits))?;
        Ok(self)
    }

    fn apply_gate(
        &mut self,
        gate: StandardGate,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::gate(gate, qubits))?;
        Ok(self)
    }

    // --- accessors ---

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.dag.num_qubits()
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.dag.num_clbits()
    }

    /// Get the circuit depth.
    pub fn depth(&self) -> usize {
        self.dag.depth()
    }

    /// Borrow the underlying DAG.
    pub fn dag(&self) -> &CircuitDag {
        &self.dag
    }

    /// Borrow the underlying DAG mutably.
    pub fn dag_mut(&mut self) -> &mut CircuitDag {
        &mut self.dag
    }

    /// Convert into the underlying DAG.
    pub fn into_dag(self) -> CircuitDag {
        self.dag
    }

    /// Wrap an existing DAG in a circuit.
    pub fn from_dag(dag: CircuitDag) -> Self {
        let qubits = dag.qubits().map(Qubit::new).collect();
        let clbits = dag.clbits().map(Clbit::new).collect();
        Self {
            name: String::new(),
            dag,
            qubits,
            clbits,
        }
    }

    /// The circuit's qubits.
    pub fn qubits(&self) -> &[Qubit] {
        &self.qubits
    }

    /// The circuit's classical bits.
    pub fn clbits(&self) -> &[Clbit] {
        &self.clbits
    }

    /// Build a Bell-state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        circuit.h(QubitId(0))?;
        circuit.cx(QubitId(0), QubitId(1))?;
        circuit.measure(QubitId(0), ClbitId(0))?;
        circuit.measure(QubitId(1), ClbitId(1))?;
        Ok(circuit)
    }

    /// Build an n-qubit GHZ circuit.
    pub fn ghz(n: u32) -> IrResult<Self> {
        let mut circuit = Self::with_size("ghz", n, 0);
        circuit.h(QubitId(0))?;
        for i in 1..n {
            circuit.cx(QubitId(0), QubitId(i))?;
        }
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bell_circuit() {
        let circuit = Circuit::bell().unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.dag().num_ops(), 4);
    }

    #[test]
    fn test_ghz_is_a_fan_out() {
        let circuit = Circuit::ghz(4).unwrap();
        let cx_count = circuit
            .dag()
            .topological_ops()
            .filter(|(_, inst)| inst.is_cx())
            .count();
        assert_eq!(cx_count, 3);
    }

    #[test]
    fn test_register_naming() {
        let circuit = Circuit::with_size("test", 3, 0);
        assert_eq!(circuit.dag().qregs().len(), 1);
        assert_eq!(circuit.dag().qregs()[0].name, "q");
        assert_eq!(circuit.qubits()[2].register.as_deref(), Some("q"));
    }

    #[test]
    fn test_opaque_marker() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.opaque("snapshot", [QubitId(0), QubitId(1)]).unwrap();
        let (_, inst) = circuit.dag().topological_ops().next().unwrap();
        assert!(inst.is_marker());
        assert_eq!(inst.name(), "snapshot");
    }
}
