//! CNOT cascade rewriting.
//!
//! A cascade is a run of CNOTs sharing one target (direct) or one control
//! (inverse). Cascades map badly onto limited-connectivity devices: every
//! partner has to be routed next to the shared wire. Rewritten as a
//! nearest-neighbor zig-zag the same unitary touches only consecutive
//! wires, which the later layout and routing stages can place on a chain
//! with no swaps at all:
//!
//! ```text
//! ---x--x--x---        ------x------
//!    |  |  |                 |
//! ---o--|--|---        ----x-o-x----
//!       |  |     --->      |   |
//! ------o--|---        --x-o---o-x--
//!          |             |       |
//! ---------o---        --o-------o--
//! ```
//!
//! The inverse pattern (shared control) is the same rewrite conjugated by
//! `u2(0, π)` on every participating wire, turning the fan-out into a
//! fan-in in the rotated basis.

use std::f64::consts::PI;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use nacre_ir::dag::NodeIndex;
use nacre_ir::gate::StandardGate;
use nacre_ir::instruction::Instruction;
use nacre_ir::{CircuitDag, ParameterExpression, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::passes::agnostic::optimization::{CancelCX, Optimize1qGates};
use crate::property::PropertySet;

/// Which wire anchors the cascade and which operand extends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CascadeKind {
    /// CNOTs share the target; controls fan in.
    Direct,
    /// CNOTs share the control; targets fan out.
    Inverse,
}

/// Result of a successful cascade scan.
struct CascadeMatch {
    /// Every node consumed by the cascade, including moved 1q gates.
    consumed: Vec<NodeIndex>,
    /// The rewritten sequence.
    rewrite: Vec<Instruction>,
    /// Layer index after which the rewrite must be placed.
    last_layer: usize,
}

/// CNOT cascade transformation pass.
///
/// Must run before any layout is chosen, on a DAG already unrolled to the
/// `{u1, u2, u3, cx}` basis. After rewriting, one-qubit merging and CX
/// cancellation run to a depth fixpoint, since back-to-back zig-zags open
/// cancellation opportunities.
pub struct TransformCxCascade;

impl TransformCxCascade {
    /// Create a new cascade transformation pass.
    pub fn new() -> Self {
        Self
    }

    fn rewrite_dag(&self, dag: &CircuitDag) -> CompileResult<CircuitDag> {
        let num_qubits = dag.num_qubits();
        let layers = dag.layers();
        let mut new_dag = dag.copy_empty();

        // Gates consumed so far, either emitted directly or folded into a
        // cascade rewrite.
        let mut skip: FxHashSet<NodeIndex> = FxHashSet::default();
        // Rewrites keyed by the layer index they must follow.
        let mut extra_layers: FxHashMap<usize, Vec<Instruction>> = FxHashMap::default();

        for (i, layer) in layers.iter().enumerate() {
            if i != 0 {
                for inst in extra_layers.remove(&(i - 1)).unwrap_or_default() {
                    new_dag.apply(inst)?;
                }
            }

            for &node in layer {
                if skip.contains(&node) {
                    continue;
                }
                let Some(inst) = dag.get_instruction(node) else {
                    continue;
                };

                let plain_cx = inst.is_cx() && inst.as_gate().is_some_and(|g| g.condition.is_none());
                if plain_cx {
                    let found = self
                        .scan(dag, &layers, num_qubits, node, i, &skip, CascadeKind::Direct)
                        .or_else(|| {
                            self.scan(dag, &layers, num_qubits, node, i, &skip, CascadeKind::Inverse)
                        });
                    if let Some(m) = found {
                        debug!(layer = i, placed_after = m.last_layer, "cascade rewritten");
                        skip.extend(m.consumed);
                        extra_layers.entry(m.last_layer).or_default().extend(m.rewrite);
                        continue;
                    }
                }

                skip.insert(node);
                new_dag.apply(inst.clone())?;
            }
        }

        // Rewrites recorded at the final layer still have to land in the
        // output.
        let mut leftover: Vec<usize> = extra_layers.keys().copied().collect();
        leftover.sort_unstable();
        for key in leftover {
            for inst in extra_layers.remove(&key).unwrap_or_default() {
                new_dag.apply(inst)?;
            }
        }

        Ok(new_dag)
    }

    /// Scan forward from `start` for a cascade of the given kind.
    ///
    /// Returns `None` when fewer than two partners are collected; the
    /// caller then emits the starting CNOT unchanged.
    #[allow(clippy::too_many_lines, clippy::too_many_arguments)]
    fn scan(
        &self,
        dag: &CircuitDag,
        layers: &[Vec<NodeIndex>],
        num_qubits: usize,
        start: NodeIndex,
        layer_id: usize,
        skip: &FxHashSet<NodeIndex>,
        kind: CascadeKind,
    ) -> Option<CascadeMatch> {
        let start_inst = dag.get_instruction(start)?;
        let control = start_inst.qubits[0];
        let target = start_inst.qubits[1];

        // The axis is the shared wire; partners are collected off it.
        let (axis, first_partner) = match kind {
            CascadeKind::Direct => (target, control),
            CascadeKind::Inverse => (control, target),
        };

        let mut partners = vec![first_partner];
        let mut consumed = vec![start];
        let mut used: FxHashSet<QubitId> = FxHashSet::default();
        used.insert(control);
        used.insert(target);
        let mut off_limits: FxHashSet<QubitId> = FxHashSet::default();
        let mut before: Vec<Instruction> = vec![];
        let mut after: Vec<Instruction> = vec![];

        // Whether the cascade grows toward higher wire indices; fixed by
        // the starting pair.
        let descending = first_partner > axis;

        let mut last_layer = layer_id;
        let mut count = 0usize;
        let max_count = (2 * (num_qubits.saturating_sub(1))).min(layers.len() - layer_id);
        let mut stop = false;

        while count < max_count && !stop {
            let current = layer_id + count;
            for &node in &layers[current] {
                let Some(inst) = dag.get_instruction(node) else {
                    continue;
                };

                if skip.contains(&node) {
                    // Consumed by an earlier cascade or already emitted; it
                    // blocks this cascade only if it sits on the axis.
                    if inst.qubits.contains(&axis) {
                        stop = true;
                        break;
                    }
                    continue;
                }
                if consumed.contains(&node) {
                    continue;
                }

                let plain_cx = inst.is_cx() && inst.as_gate().is_some_and(|g| g.condition.is_none());
                if plain_cx {
                    let g_control = inst.qubits[0];
                    let g_target = inst.qubits[1];
                    // The roles the scanned CNOT would need for this kind.
                    let (g_axis, g_partner) = match kind {
                        CascadeKind::Direct => (g_target, g_control),
                        CascadeKind::Inverse => (g_control, g_target),
                    };
                    let g_other = match kind {
                        CascadeKind::Direct => g_control,
                        CascadeKind::Inverse => g_target,
                    };

                    // A CNOT using the axis in the opposite role ends the
                    // pattern.
                    if g_other == axis {
                        stop = true;
                        break;
                    }
                    if off_limits.contains(&g_control) || off_limits.contains(&g_target) {
                        off_limits.insert(g_control);
                        off_limits.insert(g_target);
                        used.insert(g_control);
                        used.insert(g_target);
                        continue;
                    }

                    let extends = g_axis == axis
                        && !partners.contains(&g_partner)
                        && !used.contains(&g_partner);
                    let side_consistent = (descending && g_partner > axis)
                        || (!descending && g_partner < axis);

                    if extends && side_consistent {
                        partners.push(g_partner);
                        used.insert(g_partner);
                        consumed.push(node);
                    } else if g_target != axis && g_control != axis {
                        if !used.contains(&g_target) && !used.contains(&g_control) {
                            // Untangled CNOT: the rewrite must land after it.
                            last_layer = last_layer.max(current);
                        } else {
                            // Interferes with collected wires; fence them
                            // off and place the rewrite before this layer.
                            off_limits.insert(g_control);
                            off_limits.insert(g_target);
                            last_layer = clamp_before(last_layer, current, layer_id);
                            used.insert(g_control);
                            used.insert(g_target);
                        }
                    } else {
                        stop = true;
                        break;
                    }
                } else if inst.qubits.len() > 1 {
                    // Barriers, opaque markers and any other multi-wire
                    // operation: respect the wire footprint.
                    if inst.qubits.iter().any(|q| off_limits.contains(q)) {
                        continue;
                    }
                    if inst.qubits.contains(&axis) {
                        last_layer = clamp_before(last_layer, current, layer_id);
                        stop = true;
                        break;
                    }
                    let mut used_count = 0usize;
                    for &q in &inst.qubits {
                        if used.contains(&q) {
                            off_limits.insert(q);
                            used_count += 1;
                        }
                    }
                    if used_count == inst.qubits.len() {
                        last_layer = clamp_before(last_layer, current, layer_id);
                    } else if used_count == 0 {
                        last_layer = last_layer.max(current);
                    } else {
                        last_layer = clamp_before(last_layer, current, layer_id);
                        for &q in &inst.qubits {
                            used.insert(q);
                            off_limits.insert(q);
                        }
                    }
                } else {
                    // One-wire instruction: keep it movable to one side of
                    // the rewrite, or end the scan when it pins the axis.
                    let Some(&wire) = inst.qubits.first() else {
                        continue;
                    };
                    if off_limits.contains(&wire) {
                        continue;
                    }
                    if wire == axis {
                        after.push(inst.clone());
                        consumed.push(node);
                        stop = true;
                        break;
                    }
                    if used.contains(&wire) {
                        after.push(inst.clone());
                    } else {
                        before.push(inst.clone());
                    }
                    consumed.push(node);
                }
            }
            count += 1;
        }

        if partners.len() < 2 {
            return None;
        }

        if descending {
            partners.sort_unstable();
        } else {
            partners.sort_unstable_by(|a, b| b.cmp(a));
        }

        let mut rewrite = before;
        if kind == CascadeKind::Inverse {
            rewrite.push(hadamard_u2(axis));
            for &t in &partners {
                rewrite.push(hadamard_u2(t));
            }
        }
        for i in (1..partners.len()).rev() {
            rewrite.push(Instruction::two_qubit_gate(
                StandardGate::CX,
                partners[i],
                partners[i - 1],
            ));
        }
        rewrite.push(Instruction::two_qubit_gate(
            StandardGate::CX,
            partners[0],
            axis,
        ));
        for i in 0..partners.len() - 1 {
            rewrite.push(Instruction::two_qubit_gate(
                StandardGate::CX,
                partners[i + 1],
                partners[i],
            ));
        }
        if kind == CascadeKind::Inverse {
            rewrite.push(hadamard_u2(axis));
            for &t in &partners {
                rewrite.push(hadamard_u2(t));
            }
        }
        rewrite.extend(after);

        Some(CascadeMatch {
            consumed,
            rewrite,
            last_layer,
        })
    }
}

impl Default for TransformCxCascade {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for TransformCxCascade {
    fn name(&self) -> &'static str {
        "TransformCxCascade"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        if properties.layout.is_some() {
            return Err(CompileError::LayoutPrecondition);
        }

        *dag = self.rewrite_dag(dag)?;

        // Zig-zags from neighboring cascades share edges; merge and cancel
        // until the depth settles.
        let mut depth = dag.depth();
        loop {
            Optimize1qGates::new().run(dag, properties)?;
            CancelCX::new().run(dag, properties)?;
            let new_depth = dag.depth();
            if new_depth < depth {
                depth = new_depth;
            } else {
                break;
            }
        }

        Ok(())
    }
}

/// Place the rewrite before `current`, never before the starting layer.
fn clamp_before(last_layer: usize, current: usize, layer_id: usize) -> usize {
    last_layer.min(current.saturating_sub(1)).max(layer_id)
}

/// The `u2(0, π)` basis-rotation gate wrapping inverse cascades.
fn hadamard_u2(wire: QubitId) -> Instruction {
    Instruction::single_qubit_gate(
        StandardGate::U2(
            ParameterExpression::constant(0.0),
            ParameterExpression::constant(PI),
        ),
        wire,
    )
}
