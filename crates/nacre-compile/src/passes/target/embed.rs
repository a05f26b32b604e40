//! Embedding passes: extend the layout across the device and rewrite the
//! circuit onto physical wires.

use nacre_ir::{CircuitDag, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{CouplingMap, Layout, PropertySet};

/// Extend the layout so every physical qubit carries a wire.
///
/// Unassigned physical qubits get fresh ancilla wires; routing can then
/// move circuit state through any part of the device.
pub struct FullAncillaAllocation {
    coupling_map: CouplingMap,
}

impl FullAncillaAllocation {
    /// Create the pass for a coupling map.
    pub fn new(coupling_map: CouplingMap) -> Self {
        Self { coupling_map }
    }
}

impl Pass for FullAncillaAllocation {
    fn name(&self) -> &'static str {
        "FullAncillaAllocation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let layout = properties.layout.as_mut().ok_or(CompileError::MissingLayout)?;

        if layout.len() > self.coupling_map.num_qubits() as usize {
            return Err(CompileError::CapacityExceeded {
                required: layout.len(),
                available: self.coupling_map.num_qubits(),
            });
        }

        let mut next_wire = dag.qubits().map(|q| q.0 + 1).max().unwrap_or(0);
        for physical in 0..self.coupling_map.num_qubits() {
            if layout.get_virtual(physical).is_none() {
                layout.add(QubitId(next_wire), physical);
                next_wire += 1;
            }
        }
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.layout.is_some()
    }
}

/// Rewrite the circuit onto the physical register.
///
/// The output DAG has a single quantum register `q` spanning the device;
/// every operand is remapped through the layout, after which wire ids are
/// physical qubit ids. The layout property is reset to the identity, which
/// is the routing passes' starting point.
pub struct ApplyLayout;

impl Pass for ApplyLayout {
    fn name(&self) -> &'static str {
        "ApplyLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        let layout = properties.layout.as_ref().ok_or(CompileError::MissingLayout)?;

        let mut new_dag = CircuitDag::new();
        new_dag.add_qreg("q", coupling_map.num_qubits())?;
        let mut clbits: Vec<_> = dag.clbits().collect();
        clbits.sort_unstable();
        for c in clbits {
            new_dag.add_clbit(c);
        }
        new_dag.set_global_phase(dag.global_phase());

        for (_, inst) in dag.topological_ops() {
            let remapped = inst.rewrite_operands(|w| {
                QubitId(
                    layout
                        .get_physical(w)
                        .expect("full ancilla allocation makes the layout total"),
                )
            });
            new_dag.apply(remapped)?;
        }

        *dag = new_dag;
        properties.layout = Some(Layout::trivial(coupling_map.num_qubits()));
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.layout.is_some() && properties.coupling_map.is_some()
    }
}
