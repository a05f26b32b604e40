//! Cleanup passes around resets and measurements.

use rustc_hash::{FxHashMap, FxHashSet};

use nacre_ir::dag::NodeIndex;
use nacre_ir::gate::StandardGate;
use nacre_ir::instruction::{Instruction, InstructionKind};
use nacre_ir::{CircuitDag, QubitId};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Insert a barrier across every qubit in front of the trailing
/// measurement layer, so routing and optimization never migrate gates
/// past the final readout.
pub struct BarrierBeforeFinalMeasurements;

impl Pass for BarrierBeforeFinalMeasurements {
    fn name(&self) -> &'static str {
        "BarrierBeforeFinalMeasurements"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let ops: Vec<(NodeIndex, Instruction)> = dag
            .topological_ops()
            .map(|(idx, inst)| (idx, inst.clone()))
            .collect();

        // A measurement is final when nothing but measures and barriers
        // follow it on its qubit wire.
        let mut final_measures: FxHashSet<NodeIndex> = FxHashSet::default();
        for (i, (idx, inst)) in ops.iter().enumerate() {
            if !inst.is_measure() {
                continue;
            }
            let wire = inst.qubits[0];
            let blocked = ops[i + 1..].iter().any(|(_, later)| {
                later.qubits.contains(&wire) && !later.is_measure() && !later.is_barrier()
            });
            if !blocked {
                final_measures.insert(*idx);
            }
        }
        if final_measures.is_empty() {
            return Ok(());
        }

        let mut new_dag = dag.copy_empty();
        for (idx, inst) in &ops {
            if !final_measures.contains(idx) {
                new_dag.apply(inst.clone())?;
            }
        }
        let mut qubits: Vec<QubitId> = dag.qubits().collect();
        qubits.sort_unstable();
        new_dag.apply(Instruction::barrier(qubits))?;
        for (idx, inst) in &ops {
            if final_measures.contains(idx) {
                new_dag.apply(inst.clone())?;
            }
        }
        *dag = new_dag;
        Ok(())
    }
}

/// Drop resets acting on wires still in the |0⟩ state.
pub struct RemoveResetInZeroState;

impl Pass for RemoveResetInZeroState {
    fn name(&self) -> &'static str {
        "RemoveResetInZeroState"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut zero: FxHashMap<QubitId, bool> = dag.qubits().map(|q| (q, true)).collect();

        let mut new_dag = dag.copy_empty();
        for (_, inst) in dag.topological_ops() {
            if inst.is_reset() {
                let wire = inst.qubits[0];
                if zero.get(&wire).copied().unwrap_or(false) {
                    continue;
                }
                zero.insert(wire, true);
                new_dag.apply(inst.clone())?;
                continue;
            }
            for &q in &inst.qubits {
                zero.insert(q, false);
            }
            new_dag.apply(inst.clone())?;
        }
        *dag = new_dag;
        Ok(())
    }
}

/// Remove swaps whose only successors are final measurements, rerouting
/// the measurements to the swapped wires instead.
pub struct OptimizeSwapBeforeMeasure;

impl Pass for OptimizeSwapBeforeMeasure {
    fn name(&self) -> &'static str {
        "OptimizeSwapBeforeMeasure"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        // Peeling one swap can expose the next one in a swap chain.
        const MAX_ITERATIONS: usize = 100;
        for _ in 0..MAX_ITERATIONS {
            let ops: Vec<(NodeIndex, Instruction)> = dag
                .topological_ops()
                .map(|(idx, inst)| (idx, inst.clone()))
                .collect();

            let successors = |start: usize, wire: QubitId| -> Vec<usize> {
                ops[start + 1..]
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, later))| later.qubits.contains(&wire))
                    .map(|(j, _)| start + 1 + j)
                    .collect()
            };

            let mut removed: Option<(usize, QubitId, QubitId)> = None;
            for (i, (_, inst)) in ops.iter().enumerate() {
                let is_swap = matches!(
                    &inst.kind,
                    InstructionKind::Gate(g)
                        if matches!(g.kind, StandardGate::Swap) && g.condition.is_none()
                );
                if !is_swap {
                    continue;
                }
                let (a, b) = (inst.qubits[0], inst.qubits[1]);
                let succ_a = successors(i, a);
                let succ_b = successors(i, b);
                let only_measure = |succ: &[usize]| {
                    succ.is_empty() || (succ.len() == 1 && ops[succ[0]].1.is_measure())
                };
                // At least one side must actually be measured, otherwise
                // the swap is dead code for another pass to judge.
                if only_measure(&succ_a) && only_measure(&succ_b)
                    && (!succ_a.is_empty() || !succ_b.is_empty())
                {
                    removed = Some((i, a, b));
                    break;
                }
            }

            let Some((swap_pos, a, b)) = removed else {
                break;
            };

            let mut new_dag = dag.copy_empty();
            for (i, (_, inst)) in ops.iter().enumerate() {
                if i == swap_pos {
                    continue;
                }
                if i > swap_pos && inst.is_measure() {
                    let wire = inst.qubits[0];
                    if wire == a || wire == b {
                        let other = if wire == a { b } else { a };
                        let mut rerouted = inst.clone();
                        rerouted.qubits = vec![other];
                        new_dag.apply(rerouted)?;
                        continue;
                    }
                }
                new_dag.apply(inst.clone())?;
            }
            *dag = new_dag;
        }
        Ok(())
    }
}

/// Drop diagonal single-qubit gates that sit directly in front of a
/// measurement; they cannot change the readout distribution.
pub struct RemoveDiagonalGatesBeforeMeasure;

impl RemoveDiagonalGatesBeforeMeasure {
    fn is_diagonal(gate: &StandardGate) -> bool {
        matches!(
            gate,
            StandardGate::Z
                | StandardGate::S
                | StandardGate::Sdg
                | StandardGate::T
                | StandardGate::Tdg
                | StandardGate::Rz(_)
                | StandardGate::U1(_)
        )
    }
}

impl Pass for RemoveDiagonalGatesBeforeMeasure {
    fn name(&self) -> &'static str {
        "RemoveDiagonalGatesBeforeMeasure"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        // Removing one diagonal gate can expose the one before it.
        const MAX_ITERATIONS: usize = 100;
        for _ in 0..MAX_ITERATIONS {
            let ops: Vec<(NodeIndex, Instruction)> = dag
                .topological_ops()
                .map(|(idx, inst)| (idx, inst.clone()))
                .collect();

            let mut dropped: FxHashSet<usize> = FxHashSet::default();
            for (i, (_, inst)) in ops.iter().enumerate() {
                let InstructionKind::Gate(gate) = &inst.kind else {
                    continue;
                };
                if gate.condition.is_some() || !Self::is_diagonal(&gate.kind) {
                    continue;
                }
                let wire = inst.qubits[0];
                let next = ops[i + 1..]
                    .iter()
                    .find(|(_, later)| later.qubits.contains(&wire));
                if next.is_some_and(|(_, later)| later.is_measure()) {
                    dropped.insert(i);
                }
            }
            if dropped.is_empty() {
                break;
            }

            let mut new_dag = dag.copy_empty();
            for (i, (_, inst)) in ops.iter().enumerate() {
                if !dropped.contains(&i) {
                    new_dag.apply(inst.clone())?;
                }
            }
            *dag = new_dag;
        }
        Ok(())
    }
}
