//! Noise-adaptive swap insertion.
//!
//! The router makes every two-qubit gate act on physically adjacent
//! qubits by inserting swaps chosen with a bounded look-ahead search.
//! Candidate swaps are scored by a configurable blend of link reliability
//! (from the device calibration) and the distance progress of upcoming
//! remote gates, so the circuit is steered across the device's good links
//! instead of its geometrically shortest ones.

use rustc_hash::FxHashSet;
use tracing::debug;

use nacre_ir::gate::StandardGate;
use nacre_ir::instruction::Instruction;
use nacre_ir::{CircuitDag, QubitId};

use crate::calibration::BackendProperties;
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::passes::target::swap_table::SwapTable;
use crate::property::{CouplingMap, Layout, PropertySet};

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Look-ahead depth of the swap search.
    pub search_depth: usize,
    /// Candidate swaps kept per search node.
    pub n_swaps: usize,
    /// Upcoming two-qubit gates folded into each swap score.
    pub next_gates: usize,
    /// Blend between reliability (1.0) and distance progress (0.0).
    pub alpha: f64,
    /// Fold readout reliability into the link reliabilities.
    pub readout: bool,
    /// Front-layer mode; unset routes one remote gate at a time.
    pub front: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            search_depth: 4,
            n_swaps: 4,
            next_gates: 5,
            alpha: 0.5,
            readout: false,
            front: false,
        }
    }
}

/// A candidate swap with its score. Each candidate is an independent
/// record; search frames never share them.
#[derive(Debug, Clone, Copy)]
struct SwapCandidate {
    swap: (u32, u32),
    score: f64,
}

/// One classification of the pending gates under a layout.
struct Classified {
    /// Gates deferred behind busy wires.
    to_execute: Vec<usize>,
    /// Front-layer remote gates awaiting a swap.
    to_map: Vec<usize>,
    /// Gates committed to the output, operands remapped to physical ids.
    executed: Vec<Instruction>,
}

/// The result of one bounded look-ahead search.
struct SearchStep {
    to_map: Vec<usize>,
    to_execute: Vec<usize>,
    executed: Vec<Instruction>,
    score: f64,
    layout: Layout,
}

/// Noise-adaptive swap pass.
///
/// Requires a DAG whose wires are physical qubits in a single register
/// named `q`, as produced by the layout and ancilla-allocation stages;
/// swaps are only proposed between mapped wires, so the register is
/// expected to span the device.
pub struct NoiseAdaptiveSwap {
    coupling_map: CouplingMap,
    swap_table: SwapTable,
    config: RouterConfig,
}

impl NoiseAdaptiveSwap {
    /// Create the pass for a device and its calibration.
    pub fn new(
        coupling_map: CouplingMap,
        backend_properties: &BackendProperties,
        config: RouterConfig,
    ) -> CompileResult<Self> {
        if !(0.0..=1.0).contains(&config.alpha) {
            return Err(CompileError::InvalidAlpha(config.alpha));
        }
        let swap_table = SwapTable::new(&coupling_map, backend_properties, config.readout);
        Ok(Self {
            coupling_map,
            swap_table,
            config,
        })
    }

    fn physical(layout: &Layout, wire: QubitId) -> u32 {
        layout
            .get_physical(wire)
            .expect("layout is total on circuit wires")
    }

    /// Remap a gate's operands through the layout and commit it.
    fn execute_gate(gate: &Instruction, layout: &Layout) -> Instruction {
        gate.rewrite_operands(|w| QubitId(Self::physical(layout, w)))
    }

    /// Walk pending gates, committing everything executable.
    ///
    /// In front-layer mode every remote two-qubit gate joins `to_map` and
    /// blocks its wires; in single-gate mode the walk is identical except
    /// remote gates stay in `to_execute` too and only the first is
    /// routed.
    fn classify(
        &self,
        gates: &[Instruction],
        to_map_in: &[usize],
        layout: &Layout,
        pending: &[usize],
    ) -> Classified {
        let mut busy: FxHashSet<QubitId> = FxHashSet::default();
        let mut executed = vec![];
        let mut to_execute = vec![];
        let mut to_map = vec![];

        for &gi in to_map_in.iter().chain(pending.iter()) {
            let gate = &gates[gi];
            let qargs = &gate.qubits;

            if gate.is_marker() {
                if qargs.is_empty() {
                    continue;
                }
                if qargs.iter().any(|q| busy.contains(q)) {
                    busy.extend(qargs.iter().copied());
                    to_execute.push(gi);
                } else {
                    executed.push(Self::execute_gate(gate, layout));
                }
                continue;
            }

            if qargs.iter().any(|q| busy.contains(q)) {
                to_execute.push(gi);
                busy.extend(qargs.iter().copied());
                continue;
            }

            if qargs.len() != 2 {
                executed.push(Self::execute_gate(gate, layout));
                continue;
            }

            let p0 = Self::physical(layout, qargs[0]);
            let p1 = Self::physical(layout, qargs[1]);
            if self.coupling_map.distance(p0, p1) == Some(1) {
                executed.push(Self::execute_gate(gate, layout));
            } else {
                debug!(?qargs, "remote gate");
                if !self.config.front {
                    to_execute.push(gi);
                }
                to_map.push(gi);
                busy.extend(qargs.iter().copied());
            }
        }

        Classified {
            to_execute,
            to_map,
            executed,
        }
    }

    /// Bounded look-ahead: classify under the current layout, then try
    /// the best-scored swaps and keep the branch with the highest
    /// composed score.
    fn search_layout(
        &self,
        gates: &[Instruction],
        to_map_in: &[usize],
        layout: &Layout,
        to_execute_in: &[usize],
        depth: usize,
        last_swap: Option<(u32, u32)>,
    ) -> SearchStep {
        let classified = if self.config.front {
            self.classify(gates, to_map_in, layout, to_execute_in)
        } else {
            self.classify(gates, &[], layout, to_execute_in)
        };
        let Classified {
            to_execute,
            to_map,
            executed,
        } = classified;

        if depth == 0 || to_map.is_empty() {
            return SearchStep {
                to_map,
                to_execute,
                executed,
                score: 1.0,
                layout: layout.clone(),
            };
        }

        let candidates = if self.config.front {
            self.front_candidates(gates, &to_map, layout, &to_execute, last_swap)
        } else {
            self.single_gate_candidates(gates, to_map[0], layout, &to_execute)
        };

        let mut best: Option<(SwapCandidate, SearchStep)> = None;
        for candidate in candidates {
            let mut child_layout = layout.clone();
            child_layout.swap(candidate.swap.0, candidate.swap.1);

            let mut child = if self.config.front {
                self.search_layout(
                    gates,
                    &to_map,
                    &child_layout,
                    &to_execute,
                    depth - 1,
                    Some(candidate.swap),
                )
            } else {
                self.search_layout(
                    gates,
                    &[],
                    &child_layout,
                    &to_execute,
                    depth - 1,
                    Some(candidate.swap),
                )
            };
            child.score *= candidate.score;

            let better = match &best {
                None => true,
                Some((_, incumbent)) => {
                    if self.config.front {
                        child.score > incumbent.score
                    } else {
                        // Legacy ranking: circuit progress first,
                        // reliability as the tie-breaker. Inserted swaps
                        // are overhead, not progress.
                        let progress = |step: &SearchStep| {
                            step.executed.iter().filter(|i| i.name() != "swap").count()
                        };
                        (progress(&child), child.score) > (progress(incumbent), incumbent.score)
                    }
                }
            };
            if better {
                best = Some((candidate, child));
            }
        }

        let Some((chosen, child)) = best else {
            // Every candidate was filtered out; report the classification
            // unchanged and let the caller continue from here.
            return SearchStep {
                to_map,
                to_execute,
                executed,
                score: 1.0,
                layout: layout.clone(),
            };
        };

        // The output DAG is physical-labelled, so the swap acts directly
        // on the wires sitting at the swapped positions.
        let swap_gate = Instruction::two_qubit_gate(
            StandardGate::Swap,
            QubitId(chosen.swap.0),
            QubitId(chosen.swap.1),
        );
        let mut executed_out = executed;
        executed_out.push(swap_gate);
        executed_out.extend(child.executed);

        SearchStep {
            to_map: child.to_map,
            to_execute: child.to_execute,
            executed: executed_out,
            score: child.score,
            layout: child.layout,
        }
    }

    /// Front-layer candidates: every neighbor swap of every wire involved
    /// in a front-layer remote gate, except the exact undo of the last
    /// applied swap; the best `n_swaps` by score survive.
    fn front_candidates(
        &self,
        gates: &[Instruction],
        to_map: &[usize],
        layout: &Layout,
        to_execute: &[usize],
        last_swap: Option<(u32, u32)>,
    ) -> Vec<SwapCandidate> {
        let mut seen: FxHashSet<(u32, u32)> = FxHashSet::default();
        if let Some((a, b)) = last_swap {
            seen.insert(normalize(a, b));
        }

        let mut candidates = vec![];
        for &gi in to_map {
            for &wire in &gates[gi].qubits {
                let q = Self::physical(layout, wire);
                for v in self.coupling_map.neighbors(q) {
                    if !seen.insert(normalize(q, v)) {
                        continue;
                    }
                    if layout.get_virtual(v).is_none() {
                        continue;
                    }
                    let score = self.score_swap(gates, (q, v), layout, to_map, to_execute);
                    candidates.push(SwapCandidate {
                        swap: (q, v),
                        score,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(self.config.n_swaps);
        candidates
    }

    /// Single-gate candidates for the first remote gate: step either
    /// endpoint along the most-reliable path toward the other, step along
    /// the shortest unweighted path, then fill with plain neighbor swaps.
    fn single_gate_candidates(
        &self,
        gates: &[Instruction],
        remote: usize,
        layout: &Layout,
        to_execute: &[usize],
    ) -> Vec<SwapCandidate> {
        let qargs = &gates[remote].qubits;
        let a = Self::physical(layout, qargs[0]);
        let b = Self::physical(layout, qargs[1]);

        let mut seen: FxHashSet<(u32, u32)> = FxHashSet::default();
        let mut candidates: Vec<SwapCandidate> = vec![];

        // Most-reliable step from either endpoint toward the other.
        if let Some(p) = self.swap_table.predecessor(b, a) {
            self.add_candidate(gates, layout, to_execute, &mut seen, &mut candidates, (a, p));
        }
        if let Some(p) = self.swap_table.predecessor(a, b) {
            self.add_candidate(gates, layout, to_execute, &mut seen, &mut candidates, (b, p));
        }
        // Shortest unweighted path steps.
        if let Some(path) = self.coupling_map.shortest_path(a, b) {
            if path.len() >= 2 {
                self.add_candidate(gates, layout, to_execute, &mut seen, &mut candidates, (a, path[1]));
                self.add_candidate(
                    gates,
                    layout,
                    to_execute,
                    &mut seen,
                    &mut candidates,
                    (b, path[path.len() - 2]),
                );
            }
        }
        // Fill the remaining slots from plain neighbor swaps.
        for v in self.coupling_map.neighbors(a) {
            if candidates.len() >= self.config.n_swaps {
                break;
            }
            self.add_candidate(gates, layout, to_execute, &mut seen, &mut candidates, (a, v));
        }
        for v in self.coupling_map.neighbors(b) {
            if candidates.len() >= self.config.n_swaps {
                break;
            }
            self.add_candidate(gates, layout, to_execute, &mut seen, &mut candidates, (b, v));
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(self.config.n_swaps);
        candidates
    }

    /// Record a scored candidate once per unordered pair, skipping swaps
    /// onto unmapped physical qubits.
    fn add_candidate(
        &self,
        gates: &[Instruction],
        layout: &Layout,
        to_execute: &[usize],
        seen: &mut FxHashSet<(u32, u32)>,
        candidates: &mut Vec<SwapCandidate>,
        swap: (u32, u32),
    ) {
        if seen.insert(normalize(swap.0, swap.1)) && layout.get_virtual(swap.1).is_some() {
            let score = self.score_swap(gates, swap, layout, &[], to_execute);
            candidates.push(SwapCandidate { swap, score });
        }
    }

    /// Score a candidate swap over the front layer plus the next
    /// `next_gates` two-qubit gates: `alpha` weighs mean link reliability
    /// against normalized distance progress.
    fn score_swap(
        &self,
        gates: &[Instruction],
        swap: (u32, u32),
        layout: &Layout,
        to_map: &[usize],
        to_execute: &[usize],
    ) -> f64 {
        let mut temp = layout.clone();
        temp.swap(swap.0, swap.1);

        let upcoming = to_execute
            .iter()
            .filter(|&&gi| {
                let g = &gates[gi];
                !g.is_marker() && g.qubits.len() == 2
            })
            .take(self.config.next_gates);

        let mut reliability_sum = 0.0;
        let mut distance_sum = 0.0;
        let mut count = 0usize;
        let max_distance = self.coupling_map.max_distance();

        for &gi in to_map.iter().chain(upcoming) {
            let g = &gates[gi];
            let p0 = Self::physical(&temp, g.qubits[0]);
            let p1 = Self::physical(&temp, g.qubits[1]);
            reliability_sum += self.swap_table.score(p0, p1);
            match self.coupling_map.distance(p0, p1) {
                Some(d) if d > 1 => {
                    distance_sum += f64::from(d - 1) / f64::from(max_distance - 1);
                }
                Some(_) => {}
                // Unreachable pairs take the full distance penalty.
                None => distance_sum += 1.0,
            }
            count += 1;
        }

        if count == 0 {
            return 0.0;
        }
        let reliability = reliability_sum / count as f64;
        let distance = distance_sum / count as f64;
        self.config.alpha * reliability + (1.0 - self.config.alpha) * (1.0 - distance)
    }
}

impl Pass for NoiseAdaptiveSwap {
    fn name(&self) -> &'static str {
        "NoiseAdaptiveSwap"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    #[allow(clippy::cast_possible_truncation)]
    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        if dag.qregs().len() != 1 || dag.qregs()[0].name != "q" {
            return Err(CompileError::BadRegister(
                "router requires a single physical register named 'q'".into(),
            ));
        }
        if dag.num_qubits() > self.coupling_map.num_qubits() as usize {
            return Err(CompileError::CapacityExceeded {
                required: dag.num_qubits(),
                available: self.coupling_map.num_qubits(),
            });
        }

        // Wires are already physical ids; routing starts from the
        // identity assignment.
        let mut layout = Layout::new();
        let mut wires: Vec<QubitId> = dag.qubits().collect();
        wires.sort_unstable();
        for &w in &wires {
            layout.add(w, w.0);
        }

        let gates: Vec<Instruction> = dag
            .topological_ops()
            .map(|(_, inst)| inst.clone())
            .collect();
        let all: Vec<usize> = (0..gates.len()).collect();

        let mut executed: Vec<Instruction> = vec![];

        if self.config.front {
            let Classified {
                mut to_execute,
                mut to_map,
                executed: first,
            } = self.classify(&gates, &[], &layout, &all);
            executed.extend(first);
            while !to_map.is_empty() {
                let step =
                    self.search_layout(&gates, &to_map, &layout, &to_execute, self.config.search_depth, None);
                debug!(executed = step.executed.len(), pending = step.to_execute.len(), "router step");
                layout = step.layout;
                to_map = step.to_map;
                to_execute = step.to_execute;
                executed.extend(step.executed);
            }
        } else {
            let mut to_execute = all;
            while !to_execute.is_empty() {
                let step = self.search_layout(
                    &gates,
                    &[],
                    &layout,
                    &to_execute,
                    self.config.search_depth,
                    None,
                );
                debug!(executed = step.executed.len(), pending = step.to_execute.len(), "router step");
                layout = step.layout;
                to_execute = step.to_execute;
                executed.extend(step.executed);
            }
        }

        let mut new_dag = dag.copy_empty();
        for inst in executed {
            new_dag.apply(inst)?;
        }
        *dag = new_dag;
        Ok(())
    }
}

/// Unordered pair normalization for swap dedup.
fn normalize(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nacre_ir::instruction::InstructionKind;
    use nacre_ir::{Circuit, ClbitId};

    fn router(coupling: CouplingMap, front: bool) -> NoiseAdaptiveSwap {
        let props = BackendProperties::uniform(&coupling, 0.01);
        NoiseAdaptiveSwap::new(
            coupling,
            &props,
            RouterConfig {
                front,
                ..RouterConfig::default()
            },
        )
        .unwrap()
    }

    fn names(dag: &CircuitDag) -> Vec<String> {
        dag.topological_ops()
            .map(|(_, inst)| inst.name().to_string())
            .collect()
    }

    fn assert_all_two_qubit_adjacent(dag: &CircuitDag, coupling: &CouplingMap) {
        for (_, inst) in dag.topological_ops() {
            if inst.is_gate() && inst.qubits.len() == 2 {
                assert!(
                    coupling.is_connected(inst.qubits[0].0, inst.qubits[1].0),
                    "gate {} on non-adjacent qubits ({}, {})",
                    inst.name(),
                    inst.qubits[0].0,
                    inst.qubits[1].0
                );
            }
        }
    }

    #[test]
    fn test_invalid_alpha() {
        let coupling = CouplingMap::linear(3);
        let props = BackendProperties::uniform(&coupling, 0.01);
        let result = NoiseAdaptiveSwap::new(
            coupling,
            &props,
            RouterConfig {
                alpha: 1.5,
                ..RouterConfig::default()
            },
        );
        assert!(matches!(result, Err(CompileError::InvalidAlpha(_))));
    }

    #[test]
    fn test_bad_register() {
        let coupling = CouplingMap::linear(3);
        let pass = router(coupling, true);

        let mut circuit = Circuit::new("test");
        circuit.add_qreg("qr", 2).unwrap();
        let mut dag = circuit.into_dag();
        let result = pass.run(&mut dag, &mut PropertySet::new());
        assert!(matches!(result, Err(CompileError::BadRegister(_))));
    }

    #[test]
    fn test_no_op_when_adjacent() {
        // Every gate already adjacent: no swaps added, gate list intact.
        let coupling = CouplingMap::linear(4);
        for front in [true, false] {
            let pass = router(coupling.clone(), front);

            let mut circuit = Circuit::with_size("test", 4, 0);
            circuit.h(QubitId(0)).unwrap();
            circuit.cx(QubitId(0), QubitId(1)).unwrap();
            circuit.cx(QubitId(2), QubitId(3)).unwrap();
            let mut dag = circuit.into_dag();

            pass.run(&mut dag, &mut PropertySet::new()).unwrap();
            assert_eq!(names(&dag), vec!["h", "cx", "cx"], "front={front}");
        }
    }

    #[test]
    fn test_remote_gate_gets_swapped() {
        // CX(0,3) on a 4-qubit line needs exactly two swaps.
        let coupling = CouplingMap::linear(4);
        for front in [true, false] {
            let pass = router(coupling.clone(), front);

            let mut circuit = Circuit::with_size("test", 4, 0);
            circuit.cx(QubitId(0), QubitId(3)).unwrap();
            let mut dag = circuit.into_dag();

            pass.run(&mut dag, &mut PropertySet::new()).unwrap();

            assert_all_two_qubit_adjacent(&dag, &coupling);
            let cx_count = dag.topological_ops().filter(|(_, i)| i.is_cx()).count();
            assert_eq!(cx_count, 1, "front={front}");
            let swap_count = dag
                .topological_ops()
                .filter(|(_, i)| i.name() == "swap")
                .count();
            assert_eq!(swap_count, 2, "front={front}");
        }
    }

    #[test]
    fn test_non_swap_multiset_preserved() {
        let coupling = CouplingMap::linear(5);
        let pass = router(coupling.clone(), true);

        let mut circuit = Circuit::with_size("test", 5, 2);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(4)).unwrap();
        circuit.cx(QubitId(1), QubitId(3)).unwrap();
        circuit.barrier_all().unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        circuit.measure(QubitId(4), ClbitId(1)).unwrap();
        let mut dag = circuit.into_dag();
        let before: usize = dag.num_ops();

        pass.run(&mut dag, &mut PropertySet::new()).unwrap();

        assert_all_two_qubit_adjacent(&dag, &coupling);
        let non_swap = dag
            .topological_ops()
            .filter(|(_, i)| i.name() != "swap")
            .count();
        assert_eq!(non_swap, before);
        // Measurements survive with their classical bits.
        let measures = dag
            .topological_ops()
            .filter(|(_, i)| matches!(i.kind, InstructionKind::Measure))
            .count();
        assert_eq!(measures, 2);
    }

    #[test]
    fn test_router_is_deterministic() {
        let coupling = CouplingMap::linear(5);
        let build = || {
            let pass = router(coupling.clone(), true);
            let mut circuit = Circuit::with_size("test", 5, 0);
            circuit.cx(QubitId(0), QubitId(4)).unwrap();
            circuit.cx(QubitId(1), QubitId(3)).unwrap();
            circuit.cx(QubitId(0), QubitId(2)).unwrap();
            let mut dag = circuit.into_dag();
            pass.run(&mut dag, &mut PropertySet::new()).unwrap();
            dag.topological_ops()
                .map(|(_, i)| (i.name().to_string(), i.qubits.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_router_avoids_bad_link() {
        // Square ring: routing CX(0,2) can go through 1 or 3; the 1 side
        // is nearly dead, so the swap should use 3.
        let coupling = CouplingMap::from_edges(&[
            (0, 1),
            (1, 0),
            (1, 2),
            (2, 1),
            (2, 3),
            (3, 2),
            (3, 0),
            (0, 3),
        ])
        .unwrap();
        let mut props = BackendProperties::new();
        props.add_cx_error(0, 1, 0.4);
        props.add_cx_error(1, 2, 0.4);
        props.add_cx_error(2, 3, 0.01);
        props.add_cx_error(3, 0, 0.01);

        let pass = NoiseAdaptiveSwap::new(
            coupling.clone(),
            &props,
            RouterConfig {
                front: true,
                alpha: 1.0,
                ..RouterConfig::default()
            },
        )
        .unwrap();

        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();
        pass.run(&mut dag, &mut PropertySet::new()).unwrap();

        assert_all_two_qubit_adjacent(&dag, &coupling);
        // The inserted swap must touch qubit 3, not cross the dead links.
        let swaps: Vec<Vec<u32>> = dag
            .topological_ops()
            .filter(|(_, i)| i.name() == "swap")
            .map(|(_, i)| i.qubits.iter().map(|q| q.0).collect())
            .collect();
        assert_eq!(swaps.len(), 1);
        assert!(swaps[0].contains(&3), "swap {swaps:?} should use qubit 3");
    }

    #[test]
    fn test_score_blend_follows_alpha() {
        // With alpha = 0 the score tracks distance progress only; with
        // alpha = 1 it tracks reliability only. A swap that pulls the
        // remote pair together must win in both regimes over one that
        // leaves it in place.
        let coupling = CouplingMap::linear(4);
        let props = BackendProperties::uniform(&coupling, 0.01);

        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        let gates: Vec<Instruction> = circuit
            .dag()
            .topological_ops()
            .map(|(_, i)| i.clone())
            .collect();
        let layout = Layout::trivial(4);

        for alpha in [0.0, 1.0] {
            let pass = NoiseAdaptiveSwap::new(
                coupling.clone(),
                &props,
                RouterConfig {
                    alpha,
                    front: true,
                    ..RouterConfig::default()
                },
            )
            .unwrap();

            // (0,1) moves the pair to distance 2; (1,2) leaves it at 3.
            let helpful = pass.score_swap(&gates, (0, 1), &layout, &[0], &[]);
            let useless = pass.score_swap(&gates, (1, 2), &layout, &[0], &[]);
            assert!(
                helpful > useless,
                "alpha={alpha}: {helpful} should beat {useless}"
            );
        }
    }

    #[test]
    fn test_opaque_marker_blocks_reordering() {
        // A snapshot over both wires of a pending remote gate defers
        // until the gate executes.
        let coupling = CouplingMap::linear(4);
        let pass = router(coupling.clone(), true);

        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        circuit.opaque("snapshot", [QubitId(0), QubitId(3)]).unwrap();
        let mut dag = circuit.into_dag();

        pass.run(&mut dag, &mut PropertySet::new()).unwrap();

        let seq = names(&dag);
        let cx_pos = seq.iter().position(|n| n == "cx").unwrap();
        let snap_pos = seq.iter().position(|n| n == "snapshot").unwrap();
        assert!(cx_pos < snap_pos);
    }

    #[test]
    fn test_capacity_exceeded() {
        let coupling = CouplingMap::linear(2);
        let pass = router(coupling, true);
        let mut dag = Circuit::with_size("test", 3, 0).into_dag();
        let result = pass.run(&mut dag, &mut PropertySet::new());
        assert!(matches!(result, Err(CompileError::CapacityExceeded { .. })));
    }
}
