//! Analysis passes driving the optimization fixpoint loop.

use std::sync::Mutex;

use nacre_ir::CircuitDag;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Measure the circuit depth into the property set.
pub struct Depth;

impl Pass for Depth {
    fn name(&self) -> &'static str {
        "Depth"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        properties.depth = Some(dag.depth());
        Ok(())
    }
}

/// Detect when the measured depth stops changing between iterations.
///
/// The pass remembers the previously observed depth and raises
/// `depth_fixed_point` once two consecutive measurements agree; the
/// driver's optimization loop runs until that flag is set.
pub struct FixedPoint {
    previous: Mutex<Option<usize>>,
}

impl FixedPoint {
    /// Create a fresh fixed-point detector.
    pub fn new() -> Self {
        Self {
            previous: Mutex::new(None),
        }
    }
}

impl Default for FixedPoint {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for FixedPoint {
    fn name(&self) -> &'static str {
        "FixedPoint"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, _dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let current = properties.depth;
        let mut previous = self
            .previous
            .lock()
            .expect("fixed-point state is never poisoned");
        properties.depth_fixed_point = Some(current.is_some() && *previous == current);
        *previous = current;
        Ok(())
    }
}
