//! Basis unrolling.

use std::f64::consts::PI;

use nacre_ir::gate::StandardGate;
use nacre_ir::instruction::{Instruction, InstructionKind};
use nacre_ir::{CircuitDag, ParameterExpression};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{BasisGates, PropertySet};

/// Unroll named gates into a target basis.
///
/// The rewriting passes require the `{u1, u2, u3, cx}` working basis;
/// final translation targets the configured basis (default `{u3, cx}`).
/// Each rule rewrites one gate into strictly lower-level gates, so the
/// worklist below terminates.
pub struct BasisUnroller {
    basis: BasisGates,
}

impl BasisUnroller {
    /// Create an unroller targeting the given basis.
    pub fn new(basis: BasisGates) -> Self {
        Self { basis }
    }

    /// Unroller for the rewriting passes' working basis.
    pub fn rewriting() -> Self {
        Self::new(BasisGates::rewriting())
    }

    /// One expansion step for a gate outside the basis.
    fn expand(inst: &Instruction) -> CompileResult<Vec<Instruction>> {
        let InstructionKind::Gate(gate) = &inst.kind else {
            return Ok(vec![inst.clone()]);
        };
        let q0 = inst.qubits[0];

        let constant = ParameterExpression::constant;
        let with_condition = |mut out: Vec<Instruction>| -> Vec<Instruction> {
            if let Some(cond) = &gate.condition {
                for o in &mut out {
                    if let InstructionKind::Gate(g) = &mut o.kind {
                        g.condition = Some(cond.clone());
                    }
                }
            }
            out
        };

        let expansion = match &gate.kind {
            StandardGate::H => vec![Instruction::single_qubit_gate(
                StandardGate::U2(constant(0.0), constant(PI)),
                q0,
            )],
            StandardGate::X => vec![Instruction::single_qubit_gate(
                StandardGate::U3(constant(PI), constant(0.0), constant(PI)),
                q0,
            )],
            StandardGate::Y => vec![Instruction::single_qubit_gate(
                StandardGate::U3(constant(PI), constant(PI / 2.0), constant(PI / 2.0)),
                q0,
            )],
            StandardGate::Z => vec![Instruction::single_qubit_gate(
                StandardGate::U1(constant(PI)),
                q0,
            )],
            StandardGate::S => vec![Instruction::single_qubit_gate(
                StandardGate::U1(constant(PI / 2.0)),
                q0,
            )],
            StandardGate::Sdg => vec![Instruction::single_qubit_gate(
                StandardGate::U1(constant(-PI / 2.0)),
                q0,
            )],
            StandardGate::T => vec![Instruction::single_qubit_gate(
                StandardGate::U1(constant(PI / 4.0)),
                q0,
            )],
            StandardGate::Tdg => vec![Instruction::single_qubit_gate(
                StandardGate::U1(constant(-PI / 4.0)),
                q0,
            )],
            StandardGate::Rx(theta) => vec![Instruction::single_qubit_gate(
                StandardGate::U3(theta.clone(), constant(-PI / 2.0), constant(PI / 2.0)),
                q0,
            )],
            StandardGate::Ry(theta) => vec![Instruction::single_qubit_gate(
                StandardGate::U3(theta.clone(), constant(0.0), constant(0.0)),
                q0,
            )],
            StandardGate::Rz(theta) => vec![Instruction::single_qubit_gate(
                StandardGate::U1(theta.clone()),
                q0,
            )],
            StandardGate::U1(lambda) => vec![Instruction::single_qubit_gate(
                StandardGate::U3(constant(0.0), constant(0.0), lambda.clone()),
                q0,
            )],
            StandardGate::U2(phi, lambda) => vec![Instruction::single_qubit_gate(
                StandardGate::U3(constant(PI / 2.0), phi.clone(), lambda.clone()),
                q0,
            )],
            StandardGate::Swap => {
                let q1 = inst.qubits[1];
                vec![
                    Instruction::two_qubit_gate(StandardGate::CX, q0, q1),
                    Instruction::two_qubit_gate(StandardGate::CX, q1, q0),
                    Instruction::two_qubit_gate(StandardGate::CX, q0, q1),
                ]
            }
            // u3 and cx are the lowest level.
            StandardGate::U3(_, _, _) | StandardGate::CX => {
                return Err(CompileError::GateNotInBasis(gate.name().to_string()));
            }
        };

        Ok(with_condition(expansion))
    }

    fn translate(&self, inst: &Instruction) -> CompileResult<Vec<Instruction>> {
        let mut out = vec![];
        let mut worklist = vec![inst.clone()];
        while let Some(current) = worklist.pop() {
            let in_basis = match &current.kind {
                InstructionKind::Gate(g) => self.basis.contains(g.name()),
                _ => true,
            };
            if in_basis {
                out.push(current);
            } else {
                // Expansions land back on the worklist in reverse so the
                // replacement keeps its order.
                for e in Self::expand(&current)?.into_iter().rev() {
                    worklist.push(e);
                }
            }
        }
        out.reverse();
        Ok(out)
    }
}

impl Pass for BasisUnroller {
    fn name(&self) -> &'static str {
        "BasisUnroller"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut new_dag = dag.copy_empty();
        for (_, inst) in dag.topological_ops() {
            for translated in self.translate(inst)? {
                new_dag.apply(translated)?;
            }
        }
        *dag = new_dag;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nacre_ir::gate::{ClassicalCondition, Gate};
    use nacre_ir::{Circuit, QubitId};

    fn gate_of(inst: &Instruction) -> &Gate {
        inst.as_gate().expect("gate instruction")
    }

    #[test]
    fn test_unroll_to_rewriting_basis() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.t(QubitId(1)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();

        BasisUnroller::rewriting()
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();

        let names: Vec<String> = dag
            .topological_ops()
            .map(|(_, i)| i.name().to_string())
            .collect();
        assert_eq!(names, vec!["u2", "u1", "cx"]);
    }

    #[test]
    fn test_unroll_to_default_target() {
        // u1/u2 collapse into u3 when only {u3, cx} is allowed.
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.s(QubitId(0)).unwrap();
        circuit.swap(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();

        BasisUnroller::new(BasisGates::default_target())
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();

        let names: Vec<String> = dag
            .topological_ops()
            .map(|(_, i)| i.name().to_string())
            .collect();
        assert_eq!(names, vec!["u3", "u3", "cx", "cx", "cx"]);
    }

    #[test]
    fn test_unroll_preserves_condition() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        let guarded = Instruction::gate(
            Gate::standard(StandardGate::H).with_condition(ClassicalCondition::new("c", 1)),
            [QubitId(0)],
        );
        circuit.dag_mut().apply(guarded).unwrap();
        let mut dag = circuit.into_dag();

        BasisUnroller::rewriting()
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();

        let (_, inst) = dag.topological_ops().next().unwrap();
        assert_eq!(inst.name(), "u2");
        assert!(gate_of(inst).condition.is_some());
    }

    #[test]
    fn test_unroll_keeps_measures_and_barriers() {
        let mut circuit = Circuit::with_size("test", 1, 1);
        circuit.h(QubitId(0)).unwrap();
        circuit.barrier_all().unwrap();
        circuit.measure(QubitId(0), nacre_ir::ClbitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        BasisUnroller::rewriting()
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();

        let names: Vec<String> = dag
            .topological_ops()
            .map(|(_, i)| i.name().to_string())
            .collect();
        assert_eq!(names, vec!["u2", "barrier", "measure"]);
    }
}
