//! Verification passes for connectivity and gate direction.

use std::f64::consts::PI;

use nacre_ir::gate::StandardGate;
use nacre_ir::instruction::Instruction;
use nacre_ir::{CircuitDag, ParameterExpression, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{CouplingMap, PropertySet};

/// Resolve a wire to its physical qubit: through the layout when one is
/// set, otherwise the wire id itself (physical-labelled DAGs).
fn physical(properties: &PropertySet, wire: QubitId) -> u32 {
    properties
        .layout
        .as_ref()
        .and_then(|l| l.get_physical(wire))
        .unwrap_or(wire.0)
}

/// Check whether every two-qubit gate acts on coupled qubits.
///
/// Writes `is_swap_mapped`; the driver only runs a swap pass when the
/// check fails.
pub struct CheckMap {
    coupling_map: CouplingMap,
}

impl CheckMap {
    /// Create the pass for a coupling map.
    pub fn new(coupling_map: CouplingMap) -> Self {
        Self { coupling_map }
    }
}

impl Pass for CheckMap {
    fn name(&self) -> &'static str {
        "CheckMap"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let mapped = dag.topological_ops().all(|(_, inst)| {
            if !inst.is_gate() || inst.qubits.len() != 2 {
                return true;
            }
            let p0 = physical(properties, inst.qubits[0]);
            let p1 = physical(properties, inst.qubits[1]);
            self.coupling_map.is_connected(p0, p1)
        });
        properties.is_swap_mapped = Some(mapped);
        Ok(())
    }
}

/// Check whether every CX follows a declared edge direction.
pub struct CheckCXDirection {
    coupling_map: CouplingMap,
}

impl CheckCXDirection {
    /// Create the pass for a coupling map.
    pub fn new(coupling_map: CouplingMap) -> Self {
        Self { coupling_map }
    }
}

impl Pass for CheckCXDirection {
    fn name(&self) -> &'static str {
        "CheckCXDirection"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let mapped = dag.topological_ops().all(|(_, inst)| {
            if !inst.is_cx() {
                return true;
            }
            let p0 = physical(properties, inst.qubits[0]);
            let p1 = physical(properties, inst.qubits[1]);
            self.coupling_map.has_directed_edge(p0, p1)
        });
        properties.is_direction_mapped = Some(mapped);
        Ok(())
    }
}

/// Flip CX gates that run against the device's native direction.
///
/// A reversed CX is the native one conjugated by `u2(0, π)` on both
/// qubits.
pub struct CXDirection {
    coupling_map: CouplingMap,
}

impl CXDirection {
    /// Create the pass for a coupling map.
    pub fn new(coupling_map: CouplingMap) -> Self {
        Self { coupling_map }
    }
}

fn u2_pair(q0: QubitId, q1: QubitId) -> [Instruction; 2] {
    let u2 = || {
        StandardGate::U2(
            ParameterExpression::constant(0.0),
            ParameterExpression::constant(PI),
        )
    };
    [
        Instruction::single_qubit_gate(u2(), q0),
        Instruction::single_qubit_gate(u2(), q1),
    ]
}

impl Pass for CXDirection {
    fn name(&self) -> &'static str {
        "CXDirection"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let mut new_dag = dag.copy_empty();

        for (_, inst) in dag.topological_ops() {
            if !inst.is_cx() {
                new_dag.apply(inst.clone())?;
                continue;
            }
            let (w0, w1) = (inst.qubits[0], inst.qubits[1]);
            let p0 = physical(properties, w0);
            let p1 = physical(properties, w1);

            if self.coupling_map.has_directed_edge(p0, p1) {
                new_dag.apply(inst.clone())?;
            } else if self.coupling_map.has_directed_edge(p1, p0) {
                for pre in u2_pair(w0, w1) {
                    new_dag.apply(pre)?;
                }
                new_dag.apply(Instruction::two_qubit_gate(StandardGate::CX, w1, w0))?;
                for post in u2_pair(w0, w1) {
                    new_dag.apply(post)?;
                }
            } else {
                return Err(CompileError::RoutingFailed {
                    qubit1: p0,
                    qubit2: p1,
                });
            }
        }

        *dag = new_dag;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nacre_ir::Circuit;

    #[test]
    fn test_check_map() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();

        let mut props = PropertySet::new();
        CheckMap::new(CouplingMap::linear(3))
            .run(&mut dag, &mut props)
            .unwrap();
        assert_eq!(props.is_swap_mapped, Some(false));

        let mut adjacent = Circuit::with_size("test", 3, 0);
        adjacent.cx(QubitId(0), QubitId(1)).unwrap();
        let mut dag = adjacent.into_dag();
        CheckMap::new(CouplingMap::linear(3))
            .run(&mut dag, &mut props)
            .unwrap();
        assert_eq!(props.is_swap_mapped, Some(true));
    }

    #[test]
    fn test_cx_direction_flips_reversed_gate() {
        // Device only supports 0→1; the circuit uses 1→0.
        let coupling = CouplingMap::from_edges(&[(0, 1)]).unwrap();
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cx(QubitId(1), QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        let mut props = PropertySet::new();
        CheckCXDirection::new(coupling.clone())
            .run(&mut dag, &mut props)
            .unwrap();
        assert_eq!(props.is_direction_mapped, Some(false));

        CXDirection::new(coupling.clone())
            .run(&mut dag, &mut props)
            .unwrap();

        let seq: Vec<String> = dag
            .topological_ops()
            .map(|(_, i)| i.name().to_string())
            .collect();
        assert_eq!(seq, vec!["u2", "u2", "cx", "u2", "u2"]);
        let (_, cx) = dag
            .topological_ops()
            .find(|(_, i)| i.is_cx())
            .unwrap();
        assert_eq!(cx.qubits, vec![QubitId(0), QubitId(1)]);

        CheckCXDirection::new(coupling)
            .run(&mut dag, &mut props)
            .unwrap();
        assert_eq!(props.is_direction_mapped, Some(true));
    }
}
