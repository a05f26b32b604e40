//! Gate-level optimization passes.

use std::f64::consts::PI;

use nacre_ir::dag::{DagNode, NodeIndex, WireId};
use nacre_ir::gate::StandardGate;
use nacre_ir::instruction::{Instruction, InstructionKind};
use nacre_ir::{CircuitDag, ParameterExpression, QubitId};
use petgraph::Direction;
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;
use crate::unitary::Unitary2x2;

use super::EPSILON;

/// CX cancellation pass.
///
/// Cancels pairs of back-to-back CX gates on the same control and target.
pub struct CancelCX;

impl CancelCX {
    /// Create a new CX cancellation pass.
    pub fn new() -> Self {
        Self
    }

    /// Find pairs of adjacent identical CX gates.
    fn find_cancellable_pairs(dag: &CircuitDag) -> Vec<(NodeIndex, NodeIndex)> {
        let mut pairs = Vec::new();
        let mut taken: FxHashSet<NodeIndex> = FxHashSet::default();
        let graph = dag.graph();

        for (node_idx, inst) in dag.topological_ops() {
            if taken.contains(&node_idx) || !is_plain_cx(inst) {
                continue;
            }
            let control = inst.qubits[0];
            let target = inst.qubits[1];

            for edge in graph.edges_directed(node_idx, Direction::Outgoing) {
                let succ_idx = edge.target();
                if taken.contains(&succ_idx) {
                    continue;
                }
                let DagNode::Op(succ) = &graph[succ_idx] else {
                    continue;
                };
                if is_plain_cx(succ)
                    && succ.qubits[0] == control
                    && succ.qubits[1] == target
                    && is_adjacent_on(dag, node_idx, succ_idx, control)
                    && is_adjacent_on(dag, node_idx, succ_idx, target)
                {
                    pairs.push((node_idx, succ_idx));
                    taken.insert(node_idx);
                    taken.insert(succ_idx);
                    break;
                }
            }
        }

        pairs
    }
}

impl Default for CancelCX {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for CancelCX {
    fn name(&self) -> &'static str {
        "CancelCX"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        // Cancelling one pair can expose another; bounded to avoid
        // pathological inputs.
        const MAX_ITERATIONS: usize = 100;
        for _ in 0..MAX_ITERATIONS {
            let pairs = Self::find_cancellable_pairs(dag);
            if pairs.is_empty() {
                break;
            }
            let dropped: FxHashSet<NodeIndex> =
                pairs.iter().flat_map(|&(a, b)| [a, b]).collect();

            let mut new_dag = dag.copy_empty();
            for (node_idx, inst) in dag.topological_ops() {
                if !dropped.contains(&node_idx) {
                    new_dag.apply(inst.clone())?;
                }
            }
            *dag = new_dag;
        }
        Ok(())
    }
}

/// A CX with no classical guard.
fn is_plain_cx(inst: &Instruction) -> bool {
    inst.is_cx() && inst.as_gate().is_some_and(|g| g.condition.is_none())
}

/// Check that `second` immediately follows `first` on `qubit`'s wire.
fn is_adjacent_on(dag: &CircuitDag, first: NodeIndex, second: NodeIndex, qubit: QubitId) -> bool {
    let wire = WireId::Qubit(qubit);
    dag.graph()
        .edges_directed(first, Direction::Outgoing)
        .any(|e| e.weight().wire == wire && e.target() == second)
}

/// Single-qubit gate optimization pass.
///
/// Merges runs of consecutive single-qubit gates on a wire into their
/// combined unitary and re-emits the shortest `u1`/`u2`/`u3` equivalent.
/// Gates with symbolic parameters or classical guards break a run.
pub struct Optimize1qGates;

impl Optimize1qGates {
    /// Create a new 1q gate optimizer.
    pub fn new() -> Self {
        Self
    }

    /// Get the unitary for a single-qubit gate with concrete parameters.
    fn gate_to_unitary(gate: &StandardGate) -> Option<Unitary2x2> {
        match gate {
            StandardGate::H => Some(Unitary2x2::h()),
            StandardGate::X => Some(Unitary2x2::x()),
            StandardGate::Y => Some(Unitary2x2::y()),
            StandardGate::Z => Some(Unitary2x2::z()),
            StandardGate::S => Some(Unitary2x2::s()),
            StandardGate::Sdg => Some(Unitary2x2::sdg()),
            StandardGate::T => Some(Unitary2x2::t()),
            StandardGate::Tdg => Some(Unitary2x2::tdg()),
            StandardGate::Rx(p) => p.as_f64().map(Unitary2x2::rx),
            StandardGate::Ry(p) => p.as_f64().map(Unitary2x2::ry),
            StandardGate::Rz(p) => p.as_f64().map(Unitary2x2::rz),
            StandardGate::U1(p) => p.as_f64().map(Unitary2x2::u1),
            StandardGate::U2(phi, lambda) => Some(Unitary2x2::u2(phi.as_f64()?, lambda.as_f64()?)),
            StandardGate::U3(theta, phi, lambda) => Some(Unitary2x2::u3(
                theta.as_f64()?,
                phi.as_f64()?,
                lambda.as_f64()?,
            )),
            StandardGate::CX | StandardGate::Swap => None,
        }
    }

    /// Decompose a combined unitary to the shortest u-family sequence.
    fn decompose(unitary: &Unitary2x2) -> Vec<StandardGate> {
        let (alpha, beta, gamma, _phase) = unitary.zyz_decomposition();
        let alpha = Unitary2x2::normalize_angle(alpha);
        let beta = Unitary2x2::normalize_angle(beta);
        let gamma = Unitary2x2::normalize_angle(gamma);

        if beta.abs() < EPSILON {
            let lambda = Unitary2x2::normalize_angle(alpha + gamma);
            if lambda.abs() < EPSILON {
                return vec![];
            }
            return vec![StandardGate::U1(ParameterExpression::constant(lambda))];
        }
        if (beta - PI / 2.0).abs() < EPSILON {
            return vec![StandardGate::U2(
                ParameterExpression::constant(alpha),
                ParameterExpression::constant(gamma),
            )];
        }
        vec![StandardGate::U3(
            ParameterExpression::constant(beta),
            ParameterExpression::constant(alpha),
            ParameterExpression::constant(gamma),
        )]
    }

    /// Check whether an instruction can join a merge run.
    fn is_mergeable(inst: &Instruction) -> bool {
        let InstructionKind::Gate(gate) = &inst.kind else {
            return false;
        };
        gate.condition.is_none()
            && inst.qubits.len() == 1
            && Self::gate_to_unitary(&gate.kind).is_some()
    }

    /// Collect runs of two or more consecutive mergeable gates per wire.
    fn find_runs(dag: &CircuitDag) -> Vec<Vec<NodeIndex>> {
        let mut per_wire: FxHashMap<QubitId, Vec<Vec<NodeIndex>>> = FxHashMap::default();

        for (node_idx, inst) in dag.topological_ops() {
            for &qubit in &inst.qubits {
                let runs = per_wire.entry(qubit).or_insert_with(|| vec![vec![]]);
                if Self::is_mergeable(inst) {
                    runs.last_mut().expect("runs list starts non-empty").push(node_idx);
                } else if !runs.last().expect("runs list starts non-empty").is_empty() {
                    runs.push(vec![]);
                }
            }
        }

        let mut out: Vec<Vec<NodeIndex>> = per_wire
            .into_values()
            .flatten()
            .filter(|run| run.len() >= 2)
            .collect();
        // Deterministic processing order.
        out.sort_unstable_by_key(|run| run[0].index());
        out
    }
}

impl Default for Optimize1qGates {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for Optimize1qGates {
    fn name(&self) -> &'static str {
        "Optimize1qGates"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let runs = Self::find_runs(dag);
        if runs.is_empty() {
            return Ok(());
        }

        // Each run collapses into its combined unitary, emitted where the
        // run's first gate sat; the other members drop out.
        let mut replacement: FxHashMap<NodeIndex, Vec<Instruction>> = FxHashMap::default();
        let mut dropped: FxHashSet<NodeIndex> = FxHashSet::default();

        for run in runs {
            let qubit = dag
                .get_instruction(run[0])
                .expect("run members are op nodes")
                .qubits[0];
            let mut combined = Unitary2x2::identity();
            for &node in &run {
                let inst = dag.get_instruction(node).expect("run members are op nodes");
                let InstructionKind::Gate(gate) = &inst.kind else {
                    unreachable!("runs contain only gate instructions");
                };
                let u = Self::gate_to_unitary(&gate.kind).expect("mergeable gates have unitaries");
                // Later gates multiply from the left.
                combined = u * combined;
            }

            let gates = Self::decompose(&combined);
            replacement.insert(
                run[0],
                gates
                    .into_iter()
                    .map(|g| Instruction::single_qubit_gate(g, qubit))
                    .collect(),
            );
            for &node in &run[1..] {
                dropped.insert(node);
            }
        }

        let mut new_dag = dag.copy_empty();
        for (node_idx, inst) in dag.topological_ops() {
            if dropped.contains(&node_idx) {
                continue;
            }
            if let Some(insts) = replacement.remove(&node_idx) {
                for r in insts {
                    new_dag.apply(r)?;
                }
            } else {
                new_dag.apply(inst.clone())?;
            }
        }
        *dag = new_dag;
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.num_ops() > 1
    }
}

/// Commutative cancellation pass.
///
/// Merges neighboring rotations about the same axis; a pair summing to the
/// identity disappears entirely.
pub struct CommutativeCancellation;

impl CommutativeCancellation {
    /// Create a new commutative cancellation pass.
    pub fn new() -> Self {
        Self
    }

    /// Merge two same-axis rotations, `None` when they cancel.
    fn merge(first: &StandardGate, second: &StandardGate) -> Option<Option<StandardGate>> {
        let build: fn(ParameterExpression) -> StandardGate = match (first, second) {
            (StandardGate::Rz(_), StandardGate::Rz(_)) => StandardGate::Rz,
            (StandardGate::Rx(_), StandardGate::Rx(_)) => StandardGate::Rx,
            (StandardGate::Ry(_), StandardGate::Ry(_)) => StandardGate::Ry,
            (StandardGate::U1(_), StandardGate::U1(_)) => StandardGate::U1,
            _ => return None,
        };
        let a = first.parameters()[0].as_f64()?;
        let b = second.parameters()[0].as_f64()?;
        let sum = Unitary2x2::normalize_angle(a + b);
        if sum.abs() < EPSILON {
            Some(None)
        } else {
            Some(Some(build(ParameterExpression::constant(sum))))
        }
    }

    fn find_merges(dag: &CircuitDag) -> Vec<(NodeIndex, NodeIndex, Option<StandardGate>)> {
        let mut merges = Vec::new();
        let mut taken: FxHashSet<NodeIndex> = FxHashSet::default();
        let graph = dag.graph();

        for (node_idx, inst) in dag.topological_ops() {
            if taken.contains(&node_idx) {
                continue;
            }
            let InstructionKind::Gate(gate) = &inst.kind else {
                continue;
            };
            if gate.condition.is_some() || inst.qubits.len() != 1 {
                continue;
            }

            let qubit = inst.qubits[0];
            for edge in graph.edges_directed(node_idx, Direction::Outgoing) {
                if edge.weight().wire != WireId::Qubit(qubit) {
                    continue;
                }
                let succ_idx = edge.target();
                if taken.contains(&succ_idx) {
                    continue;
                }
                let DagNode::Op(succ) = &graph[succ_idx] else {
                    continue;
                };
                let InstructionKind::Gate(succ_gate) = &succ.kind else {
                    continue;
                };
                if succ_gate.condition.is_some() {
                    continue;
                }
                if let Some(merged) = Self::merge(&gate.kind, &succ_gate.kind) {
                    merges.push((node_idx, succ_idx, merged));
                    taken.insert(node_idx);
                    taken.insert(succ_idx);
                    break;
                }
            }
        }

        merges
    }
}

impl Default for CommutativeCancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for CommutativeCancellation {
    fn name(&self) -> &'static str {
        "CommutativeCancellation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        const MAX_ITERATIONS: usize = 100;
        for _ in 0..MAX_ITERATIONS {
            let merges = Self::find_merges(dag);
            if merges.is_empty() {
                break;
            }

            let mut replacement: FxHashMap<NodeIndex, Option<Instruction>> = FxHashMap::default();
            let mut dropped: FxHashSet<NodeIndex> = FxHashSet::default();
            for (first, second, merged) in merges {
                let qubit = dag
                    .get_instruction(first)
                    .expect("merge members are op nodes")
                    .qubits[0];
                replacement.insert(
                    first,
                    merged.map(|g| Instruction::single_qubit_gate(g, qubit)),
                );
                dropped.insert(second);
            }

            let mut new_dag = dag.copy_empty();
            for (node_idx, inst) in dag.topological_ops() {
                if dropped.contains(&node_idx) {
                    continue;
                }
                match replacement.remove(&node_idx) {
                    Some(Some(r)) => {
                        new_dag.apply(r)?;
                    }
                    Some(None) => {}
                    None => {
                        new_dag.apply(inst.clone())?;
                    }
                }
            }
            *dag = new_dag;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nacre_ir::Circuit;

    #[test]
    fn test_cancel_adjacent_cx_pair() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();

        CancelCX.run(&mut dag, &mut PropertySet::new()).unwrap();
        assert_eq!(dag.num_ops(), 0);
    }

    #[test]
    fn test_cancel_cx_keeps_reversed_pair() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(1), QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        CancelCX.run(&mut dag, &mut PropertySet::new()).unwrap();
        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn test_cancel_cx_cascades_through_exposed_pairs() {
        // CX · CX · CX · CX collapses completely over two rounds.
        let mut circuit = Circuit::with_size("test", 2, 0);
        for _ in 0..4 {
            circuit.cx(QubitId(0), QubitId(1)).unwrap();
        }
        let mut dag = circuit.into_dag();

        CancelCX.run(&mut dag, &mut PropertySet::new()).unwrap();
        assert_eq!(dag.num_ops(), 0);
    }

    #[test]
    fn test_cx_blocked_by_intervening_gate() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.h(QubitId(1)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();

        CancelCX.run(&mut dag, &mut PropertySet::new()).unwrap();
        assert_eq!(dag.num_ops(), 3);
    }

    #[test]
    fn test_optimize_1q_merges_h_pair() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.h(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        Optimize1qGates::new()
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();
        assert_eq!(dag.num_ops(), 0);
    }

    #[test]
    fn test_optimize_1q_collapses_u1_chain() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.u1(0.3, QubitId(0)).unwrap();
        circuit.u1(0.4, QubitId(0)).unwrap();
        circuit.u1(0.5, QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        Optimize1qGates::new()
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();
        assert_eq!(dag.num_ops(), 1);

        let (_, inst) = dag.topological_ops().next().unwrap();
        let InstructionKind::Gate(g) = &inst.kind else {
            panic!("expected gate");
        };
        let StandardGate::U1(lambda) = &g.kind else {
            panic!("expected u1, got {}", g.name());
        };
        assert!((lambda.as_f64().unwrap() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_optimize_1q_leaves_single_gates_alone() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.u2(0.0, std::f64::consts::PI, QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.u2(0.0, std::f64::consts::PI, QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        Optimize1qGates::new()
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();
        assert_eq!(dag.num_ops(), 3);
    }

    #[test]
    fn test_optimize_1q_symbolic_breaks_run() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit
            .rz(ParameterExpression::symbol("theta"), QubitId(0))
            .unwrap();
        circuit.rz(0.5, QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        Optimize1qGates::new()
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();
        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn test_commutative_cancellation_merges_rotations() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.rz(0.5, QubitId(0)).unwrap();
        circuit.rz(-0.5, QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        CommutativeCancellation
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();
        assert_eq!(dag.num_ops(), 0);
    }
}
