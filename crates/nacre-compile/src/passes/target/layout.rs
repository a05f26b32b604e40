//! Layout passes for mapping virtual wires to physical qubits.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use nacre_ir::{CircuitDag, QubitId};

use crate::calibration::BackendProperties;
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{CouplingMap, Layout, PropertySet};

/// Seed the layout property from a user-provided layout.
pub struct SetLayout {
    layout: Layout,
}

impl SetLayout {
    /// Create the pass from the layout to apply.
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }
}

impl Pass for SetLayout {
    fn name(&self) -> &'static str {
        "SetLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, _dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        properties.layout = Some(self.layout.clone());
        Ok(())
    }
}

/// Trivial layout pass.
///
/// Maps virtual wire i to physical qubit i.
pub struct TrivialLayout;

impl Pass for TrivialLayout {
    fn name(&self) -> &'static str {
        "TrivialLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    #[allow(clippy::cast_possible_truncation)]
    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;

        let required = dag.num_qubits();
        if required > coupling_map.num_qubits() as usize {
            return Err(CompileError::CapacityExceeded {
                required,
                available: coupling_map.num_qubits(),
            });
        }

        properties.layout = Some(Layout::trivial(required as u32));
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.layout.is_none() && properties.coupling_map.is_some()
    }
}

/// Dense layout pass.
///
/// Packs the circuit onto the most densely connected region of the device:
/// from every start vertex a BFS collects the nearest `k` qubits, and the
/// candidate set with the most internal links (reliability-weighted when
/// calibration is available) wins. Ties go to the lowest start vertex.
pub struct DenseLayout {
    coupling_map: CouplingMap,
    backend_properties: Option<BackendProperties>,
}

impl DenseLayout {
    /// Create the pass for a coupling map and optional calibration data.
    pub fn new(coupling_map: CouplingMap, backend_properties: Option<BackendProperties>) -> Self {
        Self {
            coupling_map,
            backend_properties,
        }
    }

    fn candidate_from(&self, start: u32, k: usize) -> Vec<u32> {
        let mut selected = Vec::with_capacity(k);
        let mut seen = FxHashSet::default();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(start);
        seen.insert(start);
        while let Some(q) = queue.pop_front() {
            selected.push(q);
            if selected.len() == k {
                break;
            }
            for n in self.coupling_map.neighbors(q) {
                if seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        selected
    }

    fn score(&self, candidate: &[u32]) -> f64 {
        let set: FxHashSet<u32> = candidate.iter().copied().collect();
        let mut score = 0.0;
        for &q in candidate {
            for n in self.coupling_map.neighbors(q) {
                if n > q && set.contains(&n) {
                    score += self
                        .backend_properties
                        .as_ref()
                        .and_then(|p| p.cx_reliability(q, n))
                        .unwrap_or(1.0);
                }
            }
        }
        score
    }
}

impl Pass for DenseLayout {
    fn name(&self) -> &'static str {
        "DenseLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    #[allow(clippy::cast_possible_truncation)]
    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let required = dag.num_qubits();
        if required > self.coupling_map.num_qubits() as usize {
            return Err(CompileError::CapacityExceeded {
                required,
                available: self.coupling_map.num_qubits(),
            });
        }

        let mut best: Option<(f64, Vec<u32>)> = None;
        for start in 0..self.coupling_map.num_qubits() {
            let candidate = self.candidate_from(start, required);
            if candidate.len() < required {
                continue;
            }
            let score = self.score(&candidate);
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, candidate));
            }
        }

        let (_, mut chosen) = best.ok_or_else(|| {
            CompileError::InvalidCouplingMap("no connected region large enough for circuit".into())
        })?;
        chosen.sort_unstable();

        let mut layout = Layout::new();
        let mut wires: Vec<_> = dag.qubits().collect();
        wires.sort_unstable();
        for (wire, phys) in wires.into_iter().zip(chosen) {
            layout.add(wire, phys);
        }
        properties.layout = Some(layout);
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.layout.is_none()
    }
}

/// Entry in the chain search's isolated-qubit repair list: a vertex that
/// could not join the chain, the chain vertex it hangs off, and the link
/// reliability when calibration is known.
#[derive(Debug, Clone, Copy)]
struct IsolatedQubit {
    anchor: u32,
    vertex: u32,
    reliability: Option<f64>,
}

/// Chain layout pass.
///
/// Arranges the device's qubits into a chain (a sequence where consecutive
/// entries are coupled) and places the circuit on the chain window with
/// the best total link reliability. A linear arrangement keeps
/// swap distance low for the common linear-entanglement circuit shapes;
/// biasing the window by calibration data steers the circuit onto the
/// device's good links.
///
/// Qubits that cannot join the chain (pendants and dead ends) are tracked
/// with the chain vertex they hang off and spliced back in only when the
/// chain alone is too short for the circuit.
pub struct ChainLayout {
    coupling_map: CouplingMap,
    cx_reliability: Option<FxHashMap<(u32, u32), f64>>,
}

impl ChainLayout {
    /// Create the pass for a coupling map and optional calibration data.
    pub fn new(coupling_map: CouplingMap, backend_properties: Option<&BackendProperties>) -> Self {
        let cx_reliability = backend_properties.map(|props| {
            let mut map = FxHashMap::default();
            for &(a, b) in coupling_map.edges() {
                let r = props.cx_reliability(a, b).unwrap_or(1.0);
                map.insert((a, b), r);
                map.insert((b, a), r);
            }
            map
        });
        Self {
            coupling_map,
            cx_reliability,
        }
    }

    /// Create the pass from a raw edge list.
    pub fn from_edges(
        edges: &[(u32, u32)],
        backend_properties: Option<&BackendProperties>,
    ) -> CompileResult<Self> {
        Ok(Self::new(
            CouplingMap::from_edges(edges)?,
            backend_properties,
        ))
    }

    fn reliability(&self, a: u32, b: u32) -> Option<f64> {
        self.cx_reliability
            .as_ref()
            .map(|m| m.get(&(a, b)).copied().unwrap_or(1.0))
    }

    /// Find a chain of `num_qubits` physical qubits.
    pub fn chain(&self, num_qubits: usize) -> CompileResult<Vec<u32>> {
        let max_qubits = self.coupling_map.num_qubits() as usize;
        if num_qubits > max_qubits {
            return Err(CompileError::CapacityExceeded {
                required: num_qubits,
                available: max_qubits as u32,
            });
        }

        let mut current = 0u32;
        let mut full_map = vec![current];
        let mut isolated: FxHashSet<u32> = FxHashSet::default();
        let mut isolated_with_data: Vec<IsolatedQubit> = vec![];
        let mut explored: FxHashSet<u32> = FxHashSet::default();
        explored.insert(current);
        let mut last_back_step: Option<u32> = None;

        // Extend the chain greedily until every qubit is either on the
        // chain or known isolated.
        while explored.len() < max_qubits {
            let neighbors: Vec<u32> = self
                .coupling_map
                .neighbors(current)
                .filter(|n| !explored.contains(n))
                .collect();

            if neighbors.is_empty() {
                // Dead end: drop the endpoint to the isolated list and back
                // up one chain position. A repeated back step means the
                // search cannot make progress.
                if full_map.len() < 2 {
                    break;
                }
                let prev = full_map[full_map.len() - 2];
                if last_back_step == Some(prev) {
                    break;
                }
                isolated_with_data.push(IsolatedQubit {
                    anchor: prev,
                    vertex: current,
                    reliability: self.reliability(prev, current),
                });
                isolated.insert(current);
                full_map.pop();
                current = prev;
                last_back_step = Some(prev);
                continue;
            }

            // Prefer the numeric successor so devices with row-major
            // numbering produce natural chains.
            let next = if neighbors.contains(&(current + 1)) {
                current + 1
            } else {
                neighbors[0]
            };
            explored.insert(next);
            current = next;
            full_map.push(next);

            if explored.len() < max_qubits - 1 {
                let unexplored: Vec<u32> = self
                    .coupling_map
                    .neighbors(next)
                    .filter(|n| !explored.contains(n))
                    .collect();
                for n1 in unexplored {
                    let pendant = self.coupling_map.degree(n1) == 1;
                    let dead_end = self
                        .coupling_map
                        .neighbors(n1)
                        .all(|n2| explored.contains(&n2));
                    if pendant || dead_end {
                        explored.insert(n1);
                        isolated.insert(n1);
                        isolated_with_data.push(IsolatedQubit {
                            anchor: next,
                            vertex: n1,
                            reliability: self.reliability(next, n1),
                        });
                    }
                }
            }

            debug!(chain = ?full_map, isolated = ?isolated_with_data, "chain step");
        }

        // Any still-unvisited qubit gets linked to an isolated qubit or a
        // chain member through any available edge.
        for q in 0..max_qubits as u32 {
            if explored.contains(&q) || isolated.contains(&q) {
                continue;
            }
            let isolated_anchor = self
                .coupling_map
                .neighbors(q)
                .find(|n| isolated.contains(n));
            let anchor = isolated_anchor.or_else(|| {
                self.coupling_map
                    .neighbors(q)
                    .find(|n| full_map.contains(n))
            });
            if let Some(anchor) = anchor {
                isolated_with_data.push(IsolatedQubit {
                    anchor,
                    vertex: q,
                    reliability: self.reliability(anchor, q),
                });
                isolated.insert(q);
                explored.insert(q);
            }
        }

        // Splice isolated qubits back in while the chain is too short,
        // best links first.
        let mut remaining = num_qubits.saturating_sub(full_map.len());
        if remaining > 0 {
            if self.cx_reliability.is_some() {
                isolated_with_data.sort_by(|a, b| {
                    b.reliability
                        .unwrap_or(1.0)
                        .total_cmp(&a.reliability.unwrap_or(1.0))
                });
            }
            while remaining > 0 {
                let Some(pos) = isolated_with_data
                    .iter()
                    .position(|entry| full_map.contains(&entry.anchor))
                else {
                    return Err(CompileError::InvalidCouplingMap(
                        "coupling graph is disconnected".into(),
                    ));
                };
                let entry = isolated_with_data.remove(pos);
                let at = full_map
                    .iter()
                    .position(|&q| q == entry.anchor)
                    .expect("anchor containment checked above");
                full_map.insert(at + 1, entry.vertex);
                remaining -= 1;
            }
        }

        Ok(self.best_subset(&full_map, num_qubits))
    }

    /// Select the `num_qubits`-wide window of the chain with the best
    /// total link reliability (or the lowest hop cost when no calibration
    /// is known). Ties go to the first window.
    fn best_subset(&self, chain: &[u32], num_qubits: usize) -> Vec<u32> {
        let mut best = chain[..num_qubits].to_vec();
        let mut best_reliability = 0.0f64;
        let mut best_cost = f64::INFINITY;

        for offset in 0..=chain.len() - num_qubits {
            let window = &chain[offset..offset + num_qubits];
            let mut reliability = 1.0f64;
            let mut cost = 0.0f64;
            for pair in window.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if self.coupling_map.is_connected(a, b) {
                    match self.reliability(a, b) {
                        Some(r) => reliability *= r,
                        None => cost += 1.0,
                    }
                } else {
                    // Chain splicing can leave non-adjacent consecutive
                    // entries; charge the full swap path between them.
                    let path = self
                        .coupling_map
                        .shortest_path(a, b)
                        .unwrap_or_else(|| vec![a, b]);
                    for hop in path.windows(2) {
                        match self.reliability(hop[0], hop[1]) {
                            Some(r) => reliability *= r.powi(3),
                            None => cost += 1.0,
                        }
                    }
                }
            }
            let better = if self.cx_reliability.is_some() {
                reliability > best_reliability
            } else {
                cost < best_cost
            };
            if better {
                best_reliability = reliability;
                best_cost = cost;
                best = window.to_vec();
            }
        }

        best
    }
}

impl Pass for ChainLayout {
    fn name(&self) -> &'static str {
        "ChainLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    #[allow(clippy::cast_possible_truncation)]
    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let required = dag.num_qubits();
        if required > self.coupling_map.num_qubits() as usize {
            return Err(CompileError::CapacityExceeded {
                required,
                available: self.coupling_map.num_qubits(),
            });
        }

        let chain = self.chain(required)?;
        let mut wires: Vec<QubitId> = dag.qubits().collect();
        wires.sort_unstable();

        let mut layout = Layout::new();
        for (wire, phys) in wires.into_iter().zip(chain) {
            layout.add(wire, phys);
        }
        debug!(?layout, "chain layout selected");
        properties.layout = Some(layout);
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.layout.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nacre_ir::Circuit;

    #[test]
    fn test_trivial_layout() {
        let circuit = Circuit::with_size("test", 3, 0);
        let mut dag = circuit.into_dag();

        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::linear(5));

        TrivialLayout.run(&mut dag, &mut props).unwrap();

        let layout = props.layout.as_ref().unwrap();
        assert_eq!(layout.get_physical(QubitId(0)), Some(0));
        assert_eq!(layout.get_physical(QubitId(2)), Some(2));
    }

    #[test]
    fn test_trivial_layout_too_large() {
        let circuit = Circuit::with_size("test", 10, 0);
        let mut dag = circuit.into_dag();

        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::linear(5));

        let result = TrivialLayout.run(&mut dag, &mut props);
        assert!(matches!(result, Err(CompileError::CapacityExceeded { .. })));
    }

    #[test]
    fn test_chain_on_path_graph() {
        // Path 0-1-2-3-4, no calibration, three wires: the first window
        // wins on hop cost with ties broken by first occurrence.
        let pass = ChainLayout::new(CouplingMap::linear(5), None);
        assert_eq!(pass.chain(3).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_chain_with_pendant() {
        // 0-1-2-3 with 4 hanging off 2: the pendant is isolated during
        // exploration and spliced back only if the chain is too short.
        let map =
            CouplingMap::from_edges(&[(0, 1), (1, 0), (1, 2), (2, 1), (2, 3), (3, 2), (2, 4), (4, 2)])
                .unwrap();
        let props = BackendProperties::uniform(&map, 0.01);
        let pass = ChainLayout::new(map, Some(&props));

        assert_eq!(pass.chain(4).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_chain_splices_pendant_when_needed() {
        // Same T shape but the circuit needs all five qubits; the pendant
        // has to be spliced in right after its anchor.
        let map =
            CouplingMap::from_edges(&[(0, 1), (1, 0), (1, 2), (2, 1), (2, 3), (3, 2), (2, 4), (4, 2)])
                .unwrap();
        let pass = ChainLayout::new(map, None);

        let chain = pass.chain(5).unwrap();
        assert_eq!(chain.len(), 5);
        let unique: FxHashSet<u32> = chain.iter().copied().collect();
        assert_eq!(unique.len(), 5);
        // The pendant lands next to its anchor.
        let pos2 = chain.iter().position(|&q| q == 2).unwrap();
        let pos4 = chain.iter().position(|&q| q == 4).unwrap();
        assert_eq!(pos4, pos2 + 1);
    }

    #[test]
    fn test_chain_prefers_reliable_window() {
        // Path 0-1-2-3-4 where the 0-1 link is terrible: the window
        // selection shifts the circuit off that link.
        let map = CouplingMap::linear(5);
        let mut cal = BackendProperties::new();
        cal.add_cx_error(0, 1, 0.25);
        cal.add_cx_error(1, 2, 0.01);
        cal.add_cx_error(2, 3, 0.01);
        cal.add_cx_error(3, 4, 0.01);
        let pass = ChainLayout::new(map, Some(&cal));

        assert_eq!(pass.chain(3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_chain_capacity_exceeded() {
        let pass = ChainLayout::new(CouplingMap::linear(3), None);
        assert!(matches!(
            pass.chain(4),
            Err(CompileError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_chain_layout_sets_property() {
        let circuit = Circuit::with_size("test", 3, 0);
        let mut dag = circuit.into_dag();

        let pass = ChainLayout::new(CouplingMap::linear(5), None);
        let mut props = PropertySet::new();
        pass.run(&mut dag, &mut props).unwrap();

        let layout = props.layout.as_ref().unwrap();
        assert_eq!(layout.len(), 3);
        // Injective image inside the device.
        let mut images: Vec<u32> = (0..3).map(|i| layout.get_physical(QubitId(i)).unwrap()).collect();
        images.sort_unstable();
        images.dedup();
        assert_eq!(images.len(), 3);
        assert!(images.iter().all(|&p| p < 5));
    }

    #[test]
    fn test_dense_layout_picks_connected_region() {
        // Star of 5: the dense region around the hub includes qubit 0.
        let circuit = Circuit::with_size("test", 3, 0);
        let mut dag = circuit.into_dag();

        let pass = DenseLayout::new(CouplingMap::star(5), None);
        let mut props = PropertySet::new();
        pass.run(&mut dag, &mut props).unwrap();

        let layout = props.layout.as_ref().unwrap();
        let images: FxHashSet<u32> = (0..3)
            .map(|i| layout.get_physical(QubitId(i)).unwrap())
            .collect();
        assert!(images.contains(&0), "dense region must include the hub");
    }

    #[test]
    fn test_set_layout() {
        let mut layout = Layout::new();
        layout.add(QubitId(0), 3);
        let pass = SetLayout::new(layout);

        let circuit = Circuit::with_size("test", 1, 0);
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();
        pass.run(&mut dag, &mut props).unwrap();
        assert_eq!(props.layout.as_ref().unwrap().get_physical(QubitId(0)), Some(3));
    }
}
