//! Randomized structural checks on the circuit DAG.

use nacre_ir::{Circuit, QubitId};
use proptest::prelude::*;

const WIRES: u32 = 5;

proptest! {
    /// Random gate sequences always leave the DAG structurally sound.
    #[test]
    fn random_circuits_stay_well_formed(
        gates in proptest::collection::vec((0u32..WIRES, 0u32..WIRES), 0..24),
    ) {
        let mut circuit = Circuit::with_size("random", WIRES, 0);
        for &(a, b) in &gates {
            if a == b {
                circuit.h(QubitId(a)).unwrap();
            } else {
                circuit.cx(QubitId(a), QubitId(b)).unwrap();
            }
        }

        let dag = circuit.into_dag();
        dag.verify_integrity().unwrap();

        prop_assert_eq!(dag.num_ops(), gates.len());
        prop_assert!(dag.depth() <= gates.len());

        // Layer views partition the operations.
        let layered: usize = dag.layers().iter().map(Vec::len).sum();
        prop_assert_eq!(layered, gates.len());
        prop_assert_eq!(dag.serial_layers().len(), gates.len());
    }

    /// Topological order respects per-wire gate order.
    #[test]
    fn topological_order_respects_wires(
        gates in proptest::collection::vec((0u32..WIRES, 0u32..WIRES), 1..16),
    ) {
        let mut circuit = Circuit::with_size("random", WIRES, 0);
        for &(a, b) in &gates {
            if a == b {
                circuit.h(QubitId(a)).unwrap();
            } else {
                circuit.cx(QubitId(a), QubitId(b)).unwrap();
            }
        }
        let dag = circuit.into_dag();

        let mut last_seen: Vec<Option<usize>> = vec![None; WIRES as usize];
        for (pos, (_, inst)) in dag.topological_ops().enumerate() {
            for q in &inst.qubits {
                if let Some(prev) = last_seen[q.0 as usize] {
                    prop_assert!(prev < pos);
                }
                last_seen[q.0 as usize] = Some(pos);
            }
        }
    }
}
