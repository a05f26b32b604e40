//! Pass manager and the noise-adaptive compilation pipeline.

use tracing::{debug, info, instrument, warn};

use nacre_ir::CircuitDag;

use crate::calibration::{Backend, BackendProperties};
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::passes::agnostic::{Depth, FixedPoint};
use crate::passes::{
    ApplyLayout, BarrierBeforeFinalMeasurements, BasicRouting, BasisUnroller, CXDirection,
    CancelCX, ChainLayout, CheckCXDirection, CheckMap, CommutativeCancellation, DenseLayout,
    FullAncillaAllocation, NoiseAdaptiveSwap, Optimize1qGates, OptimizeSwapBeforeMeasure,
    RemoveDiagonalGatesBeforeMeasure, RemoveResetInZeroState, RouterConfig, SetLayout,
    TransformCxCascade, TrivialLayout,
};
use crate::property::{BasisGates, CouplingMap, Layout, PropertySet};

/// Manages and executes a sequence of compilation passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given DAG.
    #[instrument(skip(self, dag, properties))]
    pub fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            passes = self.passes.len(),
            qubits = dag.num_qubits(),
            "running pass manager"
        );

        for pass in &self.passes {
            if pass.should_run(dag, properties) {
                debug!("running pass: {}", pass.name());
                pass.run(dag, properties)?;
                debug!(ops = dag.num_ops(), "pass {} completed", pass.name());
            } else {
                debug!("skipping pass: {}", pass.name());
            }
        }

        info!(depth = dag.depth(), ops = dag.num_ops(), "pass manager completed");
        Ok(())
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a pass only while a property-set condition holds.
struct ConditionalPass<P> {
    inner: P,
    condition: fn(&PropertySet) -> bool,
}

impl<P> ConditionalPass<P> {
    fn new(inner: P, condition: fn(&PropertySet) -> bool) -> Self {
        Self { inner, condition }
    }
}

impl<P: Pass> Pass for ConditionalPass<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> PassKind {
        self.inner.kind()
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        self.inner.run(dag, properties)
    }

    fn should_run(&self, dag: &CircuitDag, properties: &PropertySet) -> bool {
        (self.condition)(properties) && self.inner.should_run(dag, properties)
    }
}

/// Repeat a pass sequence until the circuit depth stops changing.
///
/// Each round measures the depth, updates the fixed-point flag, then runs
/// the wrapped passes; the loop ends once two consecutive measurements
/// agree.
pub struct FixedPointLoop {
    passes: Vec<Box<dyn Pass>>,
    max_iterations: usize,
}

impl FixedPointLoop {
    /// Wrap a pass sequence into a depth-fixpoint loop.
    pub fn new(passes: Vec<Box<dyn Pass>>) -> Self {
        Self {
            passes,
            max_iterations: 100,
        }
    }
}

impl Pass for FixedPointLoop {
    fn name(&self) -> &'static str {
        "FixedPointLoop"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let depth = Depth;
        let fixed_point = FixedPoint::new();

        for _ in 0..self.max_iterations {
            depth.run(dag, properties)?;
            fixed_point.run(dag, properties)?;
            for pass in &self.passes {
                if pass.should_run(dag, properties) {
                    pass.run(dag, properties)?;
                }
            }
            if properties.depth_fixed_point == Some(true) {
                break;
            }
        }
        Ok(())
    }
}

/// Options for the noise-adaptive pipeline.
#[derive(Debug, Clone, Default)]
pub struct TranspileOptions {
    /// Target basis gates; defaults to `{u3, cx}`.
    pub basis_gates: Option<BasisGates>,
    /// User-chosen initial layout; searched for otherwise.
    pub initial_layout: Option<Layout>,
    /// Device connectivity; required unless a hardware backend is given.
    pub coupling_map: Option<CouplingMap>,
    /// Device calibration; required unless a hardware backend is given.
    pub backend_properties: Option<BackendProperties>,
    /// Target backend descriptor.
    pub backend: Option<Backend>,
    /// Layout fallback method; defaults to `dense`.
    pub layout_method: Option<String>,
    /// Routing method; defaults to `noise_adaptive`.
    pub routing_method: Option<String>,
    /// Translation method; defaults to `translator`.
    pub translation_method: Option<String>,
    /// Noise-adaptive router tuning.
    pub router: RouterConfig,
    /// Transpiler seed, accepted for interface compatibility; every
    /// built-in pass is deterministic and ignores it.
    pub seed_transpiler: Option<u64>,
}

fn not_swap_mapped(properties: &PropertySet) -> bool {
    properties.is_swap_mapped == Some(false)
}

fn not_direction_mapped(properties: &PropertySet) -> bool {
    properties.is_direction_mapped == Some(false)
}

/// Build the noise-adaptive compilation pipeline.
///
/// The pipeline unrolls to the rewriting basis, rewrites CNOT cascades,
/// cleans resets and pre-measurement gates, chooses a layout, embeds the
/// circuit across the device, routes where the connectivity check fails,
/// translates to the target basis, optimizes to a depth fixpoint, and
/// fixes CX directions on asymmetric devices.
///
/// Returns the pass manager together with the seeded property set.
#[allow(clippy::too_many_lines)]
pub fn noise_pass_manager(
    options: TranspileOptions,
) -> CompileResult<(PassManager, PropertySet)> {
    // Resolve the device description: a hardware backend brings its own,
    // a simulator (or no backend) needs both supplied explicitly.
    let (coupling_map, backend_properties) = match &options.backend {
        Some(backend) if !backend.simulator => {
            if options.backend_properties.is_some() || options.coupling_map.is_some() {
                warn!("a backend was provided; ignoring explicit properties and coupling map");
            }
            match (&backend.coupling_map, &backend.properties) {
                (Some(c), Some(p)) => (c.clone(), p.clone()),
                _ => return Err(CompileError::MissingCalibration),
            }
        }
        _ => match (&options.coupling_map, &options.backend_properties) {
            (Some(c), Some(p)) => (c.clone(), p.clone()),
            _ => return Err(CompileError::MissingCalibration),
        },
    };

    let basis_gates = options.basis_gates.clone().unwrap_or_default();
    let mut properties = PropertySet::new();
    properties.coupling_map = Some(coupling_map.clone());
    properties.basis_gates = Some(basis_gates.clone());
    properties.backend_properties = Some(backend_properties.clone());

    let mut pm = PassManager::new();

    // Rewriting basis and cascade transformation, before any layout.
    pm.add_pass(BasisUnroller::rewriting());
    pm.add_pass(TransformCxCascade::new());

    // Cheap structural cleanup.
    pm.add_pass(RemoveResetInZeroState);
    pm.add_pass(OptimizeSwapBeforeMeasure);
    pm.add_pass(RemoveDiagonalGatesBeforeMeasure);

    // Layout: a user layout wins, the configured method is the fallback.
    if let Some(initial) = options.initial_layout.clone() {
        pm.add_pass(SetLayout::new(initial));
    }
    match options.layout_method.as_deref().unwrap_or("dense") {
        "trivial" => pm.add_pass(TrivialLayout),
        "dense" => pm.add_pass(DenseLayout::new(
            coupling_map.clone(),
            Some(backend_properties.clone()),
        )),
        "chain" => pm.add_pass(ChainLayout::new(
            coupling_map.clone(),
            Some(&backend_properties),
        )),
        other => return Err(CompileError::UnsupportedMethod(other.to_string())),
    }

    // Embed across the device.
    pm.add_pass(FullAncillaAllocation::new(coupling_map.clone()));
    pm.add_pass(ApplyLayout);

    // Swap insertion, only when the connectivity check fails.
    pm.add_pass(CheckMap::new(coupling_map.clone()));
    pm.add_pass(ConditionalPass::new(
        BarrierBeforeFinalMeasurements,
        not_swap_mapped,
    ));
    match options.routing_method.as_deref().unwrap_or("noise_adaptive") {
        "basic" => pm.add_pass(ConditionalPass::new(BasicRouting, not_swap_mapped)),
        "noise_adaptive" => pm.add_pass(ConditionalPass::new(
            NoiseAdaptiveSwap::new(
                coupling_map.clone(),
                &backend_properties,
                options.router.clone(),
            )?,
            not_swap_mapped,
        )),
        other => return Err(CompileError::UnsupportedMethod(other.to_string())),
    }

    // Translate to the target basis.
    match options.translation_method.as_deref().unwrap_or("translator") {
        "translator" | "unroller" => pm.add_pass(BasisUnroller::new(basis_gates.clone())),
        other => return Err(CompileError::UnsupportedMethod(other.to_string())),
    }

    // Optimize until the depth settles, re-unrolling after each round.
    pm.add_pass(FixedPointLoop::new(vec![
        Box::new(Optimize1qGates::new()),
        Box::new(CommutativeCancellation),
        Box::new(CancelCX::new()),
        Box::new(BasisUnroller::new(basis_gates)),
    ]));

    // Asymmetric devices get their CX orientations fixed.
    if !coupling_map.is_symmetric() {
        pm.add_pass(CheckCXDirection::new(coupling_map.clone()));
        pm.add_pass(ConditionalPass::new(
            CXDirection::new(coupling_map),
            not_direction_mapped,
        ));
    }

    pm.add_pass(RemoveResetInZeroState);

    Ok((pm, properties))
}
