//! Basic shortest-path routing.

use tracing::debug;

use nacre_ir::{CircuitDag, Instruction, QubitId, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Basic routing pass.
///
/// Walks the circuit in topological order and, for every two-qubit gate
/// whose endpoints are not coupled, inserts a swap chain along the
/// shortest undirected path before remapping the gate. No look-ahead and
/// no calibration awareness; this is the cheap fallback the driver uses
/// when the noise-adaptive router is not selected.
///
/// Expects a physical-labelled DAG and a layout in the property set (the
/// identity right after `ApplyLayout`); the layout tracks state movement
/// as swaps are inserted and is left at its final value.
pub struct BasicRouting;

impl Pass for BasicRouting {
    fn name(&self) -> &'static str {
        "BasicRouting"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    #[allow(clippy::similar_names)]
    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        let layout = properties.layout.as_mut().ok_or(CompileError::MissingLayout)?;

        let ops: Vec<Instruction> = dag
            .topological_ops()
            .map(|(_, inst)| inst.clone())
            .collect();

        let mut new_dag = dag.copy_empty();

        for inst in ops {
            if inst.is_gate() && inst.qubits.len() == 2 {
                let p0 = layout
                    .get_physical(inst.qubits[0])
                    .ok_or(CompileError::MissingLayout)?;
                let p1 = layout
                    .get_physical(inst.qubits[1])
                    .ok_or(CompileError::MissingLayout)?;

                if !coupling_map.is_connected(p0, p1) {
                    let path =
                        coupling_map
                            .shortest_path(p0, p1)
                            .ok_or(CompileError::RoutingFailed {
                                qubit1: p0,
                                qubit2: p1,
                            })?;
                    debug!(?path, "inserting swap chain");

                    // Swap along the path; the last edge carries the gate.
                    for hop in path.windows(2).take(path.len() - 2) {
                        new_dag.apply(Instruction::two_qubit_gate(
                            StandardGate::Swap,
                            QubitId(hop[0]),
                            QubitId(hop[1]),
                        ))?;
                        layout.swap(hop[0], hop[1]);
                    }
                }
            }

            let remapped = inst.rewrite_operands(|w| {
                QubitId(
                    layout
                        .get_physical(w)
                        .expect("layout is total on physical wires"),
                )
            });
            new_dag.apply(remapped)?;
        }

        *dag = new_dag;
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.coupling_map.is_some() && properties.layout.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{CouplingMap, Layout};
    use nacre_ir::Circuit;

    fn run_basic(dag: &mut CircuitDag, coupling: CouplingMap) -> PropertySet {
        let n = coupling.num_qubits();
        let mut props = PropertySet::new();
        props.coupling_map = Some(coupling);
        props.layout = Some(Layout::trivial(n));
        BasicRouting.run(dag, &mut props).unwrap();
        props
    }

    #[test]
    fn test_connected_gates_untouched() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();

        run_basic(&mut dag, CouplingMap::linear(2));
        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn test_remote_gate_needs_swaps() {
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        let mut dag = circuit.into_dag();

        let props = run_basic(&mut dag, CouplingMap::linear(4));
        let coupling = props.coupling_map.as_ref().unwrap();

        let ops: Vec<_> = dag
            .topological_ops()
            .map(|(_, inst)| (inst.name().to_string(), inst.qubits.clone()))
            .collect();
        let swap_count = ops.iter().filter(|(n, _)| n == "swap").count();
        assert_eq!(swap_count, 2);
        // Swaps come first, then the CX, all on coupled pairs.
        assert_eq!(ops.last().unwrap().0, "cx");
        for (_, qubits) in &ops {
            assert!(coupling.is_connected(qubits[0].0, qubits[1].0));
        }
    }

    #[test]
    fn test_later_gates_follow_moved_state() {
        // After routing CX(0,3), wire contents moved; a following gate on
        // the original wires must land on the moved positions.
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        circuit.h(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        let props = run_basic(&mut dag, CouplingMap::linear(4));
        let layout = props.layout.as_ref().unwrap();

        let (_, h) = dag
            .topological_ops()
            .find(|(_, inst)| inst.name() == "h")
            .unwrap();
        assert_eq!(h.qubits[0].0, layout.get_physical(QubitId(0)).unwrap());
    }
}
