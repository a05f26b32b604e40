//! DAG-based circuit representation.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex as PetNodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{ClbitId, QubitId};

/// Node index type for the circuit DAG.
pub type NodeIndex = PetNodeIndex<u32>;

/// A node in the circuit DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DagNode {
    /// Input node for a wire.
    In(WireId),
    /// Output node for a wire.
    Out(WireId),
    /// Operation node containing an instruction.
    Op(Instruction),
}

impl DagNode {
    /// Check if this is an operation node.
    #[inline]
    pub fn is_op(&self) -> bool {
        matches!(self, DagNode::Op(_))
    }

    /// Get the instruction if this is an operation node.
    #[inline]
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }

    /// Get mutable reference to the instruction.
    #[inline]
    pub fn instruction_mut(&mut self) -> Option<&mut Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }
}

/// Identifier for a wire in the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireId {
    /// A quantum wire.
    Qubit(QubitId),
    /// A classical wire.
    Clbit(ClbitId),
}

impl From<QubitId> for WireId {
    fn from(q: QubitId) -> Self {
        WireId::Qubit(q)
    }
}

impl From<ClbitId> for WireId {
    fn from(c: ClbitId) -> Self {
        WireId::Clbit(c)
    }
}

/// An edge in the circuit DAG representing a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DagEdge {
    /// The wire this edge represents.
    pub wire: WireId,
}

/// A named quantum register covering a contiguous range of qubit ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantumRegister {
    /// Register name.
    pub name: String,
    /// First qubit id in the register.
    pub start: u32,
    /// Number of qubits.
    pub size: u32,
}

/// DAG-based circuit representation.
///
/// The circuit is represented as a directed acyclic graph where:
/// - Nodes are either input nodes, output nodes, or operation nodes
/// - Edges represent wires (quantum or classical)
/// - Each wire has exactly one input and one output node
/// - Operations are connected to wires in topological order
///
/// The DAG maintains a `wire_front` index that maps each wire to the last
/// node before the output node, so `apply()` runs in O(1) per operand
/// instead of scanning the output node's incoming edges.
#[derive(Debug)]
pub struct CircuitDag {
    /// The underlying graph.
    graph: DiGraph<DagNode, DagEdge, u32>,
    /// Map from qubit to its input node.
    qubit_inputs: FxHashMap<QubitId, NodeIndex>,
    /// Map from qubit to its output node.
    qubit_outputs: FxHashMap<QubitId, NodeIndex>,
    /// Map from classical bit to its input node.
    clbit_inputs: FxHashMap<ClbitId, NodeIndex>,
    /// Map from classical bit to its output node.
    clbit_outputs: FxHashMap<ClbitId, NodeIndex>,
    /// Wire front: maps each wire to the node just before the output node.
    wire_front: FxHashMap<WireId, NodeIndex>,
    /// Named quantum registers, in declaration order.
    qregs: Vec<QuantumRegister>,
    /// Global phase of the circuit.
    global_phase: f64,
}

impl CircuitDag {
    /// Create a new empty circuit DAG.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::default(),
            qubit_inputs: FxHashMap::default(),
            qubit_outputs: FxHashMap::default(),
            clbit_inputs: FxHashMap::default(),
            clbit_outputs: FxHashMap::default(),
            wire_front: FxHashMap::default(),
            qregs: vec![],
            global_phase: 0.0,
        }
    }

    /// Add a qubit to the circuit.
    pub fn add_qubit(&mut self, qubit: QubitId) {
        if self.qubit_inputs.contains_key(&qubit) {
            return;
        }
        let wire = WireId::Qubit(qubit);
        let in_node = self.graph.add_node(DagNode::In(wire));
        let out_node = self.graph.add_node(DagNode::Out(wire));
        self.graph.add_edge(in_node, out_node, DagEdge { wire });
        self.qubit_inputs.insert(qubit, in_node);
        self.qubit_outputs.insert(qubit, out_node);
        self.wire_front.insert(wire, in_node);
    }

    /// Add a named quantum register of `size` qubits starting at the next
    /// free qubit id. Returns the ids added.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<QubitId>> {
        let name = name.into();
        if self.qregs.iter().any(|r| r.name == name) {
            return Err(IrError::RegisterExists(name));
        }
        let start = self
            .qubit_inputs
            .keys()
            .map(|q| q.0 + 1)
            .max()
            .unwrap_or(0);
        let ids: Vec<QubitId> = (start..start + size).map(QubitId).collect();
        for &q in &ids {
            self.add_qubit(q);
        }
        self.qregs.push(QuantumRegister { name, start, size });
        Ok(ids)
    }

    /// The named quantum registers, in declaration order.
    pub fn qregs(&self) -> &[QuantumRegister] {
        &self.qregs
    }

    /// Add a classical bit to the circuit.
    pub fn add_clbit(&mut self, clbit: ClbitId) {
        if self.clbit_inputs.contains_key(&clbit) {
            return;
        }
        let wire = WireId::Clbit(clbit);
        let in_node = self.graph.add_node(DagNode::In(wire));
        let out_node = self.graph.add_node(DagNode::Out(wire));
        self.graph.add_edge(in_node, out_node, DagEdge { wire });
        self.clbit_inputs.insert(clbit, in_node);
        self.clbit_outputs.insert(clbit, out_node);
        self.wire_front.insert(wire, in_node);
    }

    /// Apply an instruction at the end of the circuit.
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<NodeIndex> {
        let gate_name = match &instruction.kind {
            InstructionKind::Gate(gate) => Some(gate.name().to_string()),
            _ => None,
        };

        // Validate gate arity matches qubit count.
        if let InstructionKind::Gate(gate) = &instruction.kind {
            let expected = gate.num_qubits() as usize;
            let got = instruction.qubits.len();
            if expected != got {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: expected as u32,
                    got: got as u32,
                });
            }
        }

        for &qubit in &instruction.qubits {
            if !self.qubit_inputs.contains_key(&qubit) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        for &clbit in &instruction.clbits {
            if !self.clbit_inputs.contains_key(&clbit) {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        let mut seen = rustc_hash::FxHashSet::default();
        for &qubit in &instruction.qubits {
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        let op_node = self.graph.add_node(DagNode::Op(instruction.clone()));

        let wires = instruction
            .qubits
            .iter()
            .map(|&q| (WireId::Qubit(q), self.qubit_outputs[&q]))
            .chain(
                instruction
                    .clbits
                    .iter()
                    .map(|&c| (WireId::Clbit(c), self.clbit_outputs[&c])),
            )
            .collect::<Vec<_>>();

        // Splice the op into each wire just before its output node.
        for (wire, out_node) in wires {
            let prev_node = self.wire_front[&wire];

            let edge_id = self
                .graph
                .edges_directed(prev_node, Direction::Outgoing)
                .find(|e| e.weight().wire == wire && e.target() == out_node)
                .map(|e| e.id());

            let eid = edge_id.ok_or_else(|| {
                IrError::InvalidDag(format!(
                    "Missing edge from predecessor to output on wire {wire:?}"
                ))
            })?;
            self.graph.remove_edge(eid);
            self.graph.add_edge(prev_node, op_node, DagEdge { wire });
            self.graph.add_edge(op_node, out_node, DagEdge { wire });
            self.wire_front.insert(wire, op_node);
        }

        Ok(op_node)
    }

    /// Topological order over all nodes, lowest node index first among the
    /// ready set. Op nodes are indexed in application order, so independent
    /// operations keep the order they were applied in; passes rely on this
    /// for deterministic output.
    fn topo_order(&self) -> Vec<NodeIndex> {
        use std::cmp::Reverse;
        use std::collections::BinaryHeap;

        let mut indegree: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut ready: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
        for node in self.graph.node_indices() {
            let d = self.graph.edges_directed(node, Direction::Incoming).count();
            indegree.insert(node, d);
            if d == 0 {
                ready.push(Reverse(node.index()));
            }
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(idx)) = ready.pop() {
            let node = NodeIndex::new(idx);
            order.push(node);
            for edge in self.graph.edges_directed(node, Direction::Outgoing) {
                let target = edge.target();
                let d = indegree
                    .get_mut(&target)
                    .expect("edge target is a graph node");
                *d -= 1;
                if *d == 0 {
                    ready.push(Reverse(target.index()));
                }
            }
        }

        assert_eq!(
            order.len(),
            self.graph.node_count(),
            "DAG must be acyclic — cycle detected in circuit graph"
        );
        order
    }

    /// Iterate over operations in topological order.
    ///
    /// Independent operations appear in the order they were applied.
    pub fn topological_ops(&self) -> impl Iterator<Item = (NodeIndex, &Instruction)> {
        self.topo_order()
            .into_iter()
            .filter_map(|idx| {
                if let DagNode::Op(inst) = &self.graph[idx] {
                    Some((idx, inst))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Decompose the circuit into layers (maximal antichains).
    ///
    /// Layer `k` contains every operation whose earliest possible schedule
    /// is depth `k`; within a layer operations appear in topological order.
    pub fn layers(&self) -> Vec<Vec<NodeIndex>> {
        let mut depths: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut layers: Vec<Vec<NodeIndex>> = vec![];

        for node in self.topo_order() {
            let max_pred_depth = self
                .graph
                .edges_directed(node, Direction::Incoming)
                .map(|e| depths.get(&e.source()).copied().unwrap_or(0))
                .max()
                .unwrap_or(0);

            let node_depth = if self.graph[node].is_op() {
                let d = max_pred_depth + 1;
                if layers.len() < d {
                    layers.resize_with(d, Vec::new);
                }
                layers[d - 1].push(node);
                d
            } else {
                max_pred_depth
            };
            depths.insert(node, node_depth);
        }

        layers
    }

    /// A serial layerization: every operation in its own layer, in a valid
    /// topological order.
    pub fn serial_layers(&self) -> Vec<NodeIndex> {
        self.topological_ops().map(|(idx, _)| idx).collect()
    }

    /// Get an instruction by node index.
    #[inline]
    pub fn get_instruction(&self, node: NodeIndex) -> Option<&Instruction> {
        self.graph.node_weight(node).and_then(|n| n.instruction())
    }

    /// Get a mutable instruction by node index.
    #[inline]
    pub fn get_instruction_mut(&mut self, node: NodeIndex) -> Option<&mut Instruction> {
        self.graph
            .node_weight_mut(node)
            .and_then(|n| n.instruction_mut())
    }

    /// Remove an operation node from the DAG, reconnecting its wires.
    ///
    /// petgraph's `remove_node` swaps the removed node with the last node,
    /// so the last node's index changes to `node` after removal. Callers
    /// must not hold stale indices across this call; when removing several
    /// nodes, remove in descending index order.
    pub fn remove_op(&mut self, node: NodeIndex) -> IrResult<Instruction> {
        let dag_node = self
            .graph
            .node_weight(node)
            .ok_or(IrError::InvalidNode)?
            .clone();

        let DagNode::Op(instruction) = dag_node else {
            return Err(IrError::InvalidDag(
                "Cannot remove non-operation node".into(),
            ));
        };

        let incoming: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.source(), e.weight().wire))
            .collect();

        let outgoing: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.target(), e.weight().wire))
            .collect();

        let last_idx = NodeIndex::new(self.graph.node_count() - 1);

        // Wires fronted by the removed node fall back to their predecessor.
        for (pred, wire) in &incoming {
            if self.wire_front.get(wire) == Some(&node) {
                self.wire_front.insert(*wire, *pred);
            }
        }

        self.graph.remove_node(node);

        let fix = |idx: NodeIndex| -> NodeIndex {
            if last_idx != node && idx == last_idx {
                node
            } else {
                idx
            }
        };

        // The last node was swapped into the removed slot: update every
        // index map that referenced it.
        if last_idx != node {
            for map in [
                &mut self.qubit_inputs,
                &mut self.qubit_outputs,
            ] {
                for v in map.values_mut() {
                    if *v == last_idx {
                        *v = node;
                    }
                }
            }
            for map in [&mut self.clbit_inputs, &mut self.clbit_outputs] {
                for v in map.values_mut() {
                    if *v == last_idx {
                        *v = node;
                    }
                }
            }
            for v in self.wire_front.values_mut() {
                if *v == last_idx {
                    *v = node;
                }
            }
        }

        for (pred, wire) in &incoming {
            let pred = fix(*pred);
            for (succ, succ_wire) in &outgoing {
                let succ = fix(*succ);
                if wire == succ_wire {
                    self.graph.add_edge(pred, succ, DagEdge { wire: *wire });
                }
            }
        }

        Ok(instruction)
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.qubit_inputs.len()
    }

    /// Get the number of classical bits.
    #[inline]
    pub fn num_clbits(&self) -> usize {
        self.clbit_inputs.len()
    }

    /// Get the number of operations.
    #[inline]
    pub fn num_ops(&self) -> usize {
        let io_nodes = 2 * (self.qubit_inputs.len() + self.clbit_inputs.len());
        self.graph.node_count().saturating_sub(io_nodes)
    }

    /// Calculate the circuit depth.
    pub fn depth(&self) -> usize {
        self.layers().len()
    }

    /// Iterate over qubits.
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.qubit_inputs.keys().copied()
    }

    /// Iterate over classical bits.
    pub fn clbits(&self) -> impl Iterator<Item = ClbitId> + '_ {
        self.clbit_inputs.keys().copied()
    }

    /// Get the global phase.
    pub fn global_phase(&self) -> f64 {
        self.global_phase
    }

    /// Set the global phase.
    pub fn set_global_phase(&mut self, phase: f64) {
        self.global_phase = phase;
    }

    /// Get a reference to the underlying graph.
    pub fn graph(&self) -> &DiGraph<DagNode, DagEdge, u32> {
        &self.graph
    }

    /// Create an empty DAG with the same wires and registers as `self`.
    pub fn copy_empty(&self) -> Self {
        let mut out = Self::new();
        let mut qubits: Vec<_> = self.qubits().collect();
        qubits.sort_unstable();
        for q in qubits {
            out.add_qubit(q);
        }
        let mut clbits: Vec<_> = self.clbits().collect();
        clbits.sort_unstable();
        for c in clbits {
            out.add_clbit(c);
        }
        out.qregs = self.qregs.clone();
        out.global_phase = self.global_phase;
        out
    }

    /// Verify the structural integrity of the DAG.
    ///
    /// Checks acyclicity, In/Out pairing per wire, wire continuity from In
    /// to Out, and reachability of every operation node.
    pub fn verify_integrity(&self) -> IrResult<()> {
        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(IrError::InvalidDag("Graph contains a cycle".into()));
        }

        for &qubit in self.qubit_inputs.keys() {
            if !self.qubit_outputs.contains_key(&qubit) {
                return Err(IrError::InvalidDag(format!(
                    "Qubit {qubit:?} has an In node but no Out node"
                )));
            }
        }
        for &clbit in self.clbit_inputs.keys() {
            if !self.clbit_outputs.contains_key(&clbit) {
                return Err(IrError::InvalidDag(format!(
                    "Clbit {clbit:?} has an In node but no Out node"
                )));
            }
        }

        let walk = |in_node: NodeIndex, out_node: NodeIndex, wire: WireId| -> IrResult<()> {
            let mut current = in_node;
            let mut steps = 0;
            let max_steps = self.graph.node_count();
            while current != out_node {
                let next = self
                    .graph
                    .edges_directed(current, Direction::Outgoing)
                    .find(|e| e.weight().wire == wire)
                    .map(|e| e.target());
                match next {
                    Some(n) => current = n,
                    None => {
                        return Err(IrError::InvalidDag(format!(
                            "Wire {wire:?} is broken: no outgoing edge from node {current:?}"
                        )));
                    }
                }
                steps += 1;
                if steps > max_steps {
                    return Err(IrError::InvalidDag(format!(
                        "Wire {wire:?} has too many steps (possible loop)"
                    )));
                }
            }
            Ok(())
        };

        for (&qubit, &in_node) in &self.qubit_inputs {
            walk(in_node, self.qubit_outputs[&qubit], WireId::Qubit(qubit))?;
        }
        for (&clbit, &in_node) in &self.clbit_inputs {
            walk(in_node, self.clbit_outputs[&clbit], WireId::Clbit(clbit))?;
        }

        Ok(())
    }
}

impl Default for CircuitDag {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CircuitDag {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            qubit_inputs: self.qubit_inputs.clone(),
            qubit_outputs: self.qubit_outputs.clone(),
            clbit_inputs: self.clbit_inputs.clone(),
            clbit_outputs: self.clbit_outputs.clone(),
            wire_front: self.wire_front.clone(),
            qregs: self.qregs.clone(),
            global_phase: self.global_phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::StandardGate;

    #[test]
    fn test_empty_dag() {
        let dag = CircuitDag::new();
        assert_eq!(dag.num_qubits(), 0);
        assert_eq!(dag.num_clbits(), 0);
        assert_eq!(dag.num_ops(), 0);
        assert_eq!(dag.depth(), 0);
    }

    #[test]
    fn test_add_qreg() {
        let mut dag = CircuitDag::new();
        let ids = dag.add_qreg("q", 3).unwrap();
        assert_eq!(ids, vec![QubitId(0), QubitId(1), QubitId(2)]);
        assert_eq!(dag.num_qubits(), 3);
        assert_eq!(dag.qregs().len(), 1);
        assert_eq!(dag.qregs()[0].name, "q");

        assert!(matches!(
            dag.add_qreg("q", 2),
            Err(IrError::RegisterExists(_))
        ));
    }

    #[test]
    fn test_apply_gate() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));

        let inst = Instruction::single_qubit_gate(StandardGate::H, QubitId(0));
        dag.apply(inst).unwrap();

        assert_eq!(dag.num_ops(), 1);
        assert_eq!(dag.depth(), 1);
    }

    #[test]
    fn test_layers() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        dag.add_qubit(QubitId(1));
        dag.add_qubit(QubitId(2));

        // H(0), H(1) are parallel; CX(0,1) follows; H(2) is parallel with both.
        dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(0)))
            .unwrap();
        dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(1)))
            .unwrap();
        dag.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            QubitId(0),
            QubitId(1),
        ))
        .unwrap();
        dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(2)))
            .unwrap();

        let layers = dag.layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].len(), 3);
        assert_eq!(layers[1].len(), 1);

        let serial = dag.serial_layers();
        assert_eq!(serial.len(), 4);
    }

    #[test]
    fn test_gate_arity_mismatch() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        dag.add_qubit(QubitId(1));

        let inst = Instruction::gate(StandardGate::CX, [QubitId(0)]);
        let result = dag.apply(inst);

        assert!(matches!(
            result,
            Err(IrError::QubitCountMismatch { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn test_remove_op_reconnects() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        dag.add_qubit(QubitId(1));

        dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(0)))
            .unwrap();
        let cx = dag
            .apply(Instruction::two_qubit_gate(
                StandardGate::CX,
                QubitId(0),
                QubitId(1),
            ))
            .unwrap();
        dag.remove_op(cx).unwrap();

        assert_eq!(dag.num_ops(), 1);
        dag.verify_integrity().unwrap();

        // Appending after removal still works (wire front is repaired).
        dag.apply(Instruction::single_qubit_gate(StandardGate::X, QubitId(1)))
            .unwrap();
        assert_eq!(dag.num_ops(), 2);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_copy_empty() {
        let mut dag = CircuitDag::new();
        dag.add_qreg("q", 2).unwrap();
        dag.add_clbit(ClbitId(0));
        dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(0)))
            .unwrap();

        let empty = dag.copy_empty();
        assert_eq!(empty.num_qubits(), 2);
        assert_eq!(empty.num_clbits(), 1);
        assert_eq!(empty.num_ops(), 0);
        assert_eq!(empty.qregs().len(), 1);
    }

    #[test]
    fn test_verify_integrity_with_measurement() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        dag.add_clbit(ClbitId(0));
        dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(0)))
            .unwrap();
        dag.apply(Instruction::measure(QubitId(0), ClbitId(0)))
            .unwrap();

        dag.verify_integrity().unwrap();
    }
}
