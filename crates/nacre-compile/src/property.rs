//! `PropertySet` and the device-facing types passes communicate through.
//!
//! Compilation passes share state through a [`PropertySet`]: the layout
//! chosen by a layout pass, the device coupling map, the target basis, and
//! the typed flags the driver's guard conditions read (`is_swap_mapped`,
//! `depth_fixed_point`, ...).

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use nacre_ir::QubitId;

use crate::calibration::BackendProperties;
use crate::error::{CompileError, CompileResult};

/// A bijection from virtual wires to physical qubits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    /// Map from virtual wire to physical qubit index.
    virtual_to_physical: FxHashMap<QubitId, u32>,
    /// Map from physical qubit index to virtual wire.
    physical_to_virtual: FxHashMap<u32, QubitId>,
}

impl Layout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trivial layout (virtual wire i → physical qubit i).
    pub fn trivial(num_qubits: u32) -> Self {
        let mut layout = Self::new();
        for i in 0..num_qubits {
            layout.add(QubitId(i), i);
        }
        layout
    }

    /// Add a mapping from virtual wire to physical qubit.
    ///
    /// Conflicting entries in either direction are removed first so both
    /// maps stay consistent.
    pub fn add(&mut self, virt: QubitId, physical: u32) {
        if let Some(&old_virt) = self.physical_to_virtual.get(&physical) {
            if old_virt != virt {
                self.virtual_to_physical.remove(&old_virt);
            }
        }
        if let Some(&old_physical) = self.virtual_to_physical.get(&virt) {
            if old_physical != physical {
                self.physical_to_virtual.remove(&old_physical);
            }
        }
        self.virtual_to_physical.insert(virt, physical);
        self.physical_to_virtual.insert(physical, virt);
    }

    /// Get the physical qubit for a virtual wire.
    pub fn get_physical(&self, virt: QubitId) -> Option<u32> {
        self.virtual_to_physical.get(&virt).copied()
    }

    /// Get the virtual wire mapped to a physical qubit.
    pub fn get_virtual(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_virtual.get(&physical).copied()
    }

    /// Exchange the virtual wires sitting on two physical qubits.
    pub fn swap(&mut self, p1: u32, p2: u32) {
        let v1 = self.physical_to_virtual.get(&p1).copied();
        let v2 = self.physical_to_virtual.get(&p2).copied();

        if let Some(v1) = v1 {
            self.virtual_to_physical.insert(v1, p2);
            self.physical_to_virtual.insert(p2, v1);
        } else {
            self.physical_to_virtual.remove(&p2);
        }

        if let Some(v2) = v2 {
            self.virtual_to_physical.insert(v2, p1);
            self.physical_to_virtual.insert(p1, v2);
        } else {
            self.physical_to_virtual.remove(&p1);
        }
    }

    /// Get the number of mapped wires.
    pub fn len(&self) -> usize {
        self.virtual_to_physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.virtual_to_physical.is_empty()
    }

    /// Iterate over (virtual, physical) pairs in ascending virtual order.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        let mut pairs: Vec<_> = self
            .virtual_to_physical
            .iter()
            .map(|(&v, &p)| (v, p))
            .collect();
        pairs.sort_unstable_by_key(|&(v, _)| v);
        pairs.into_iter()
    }
}

/// Target device coupling map.
///
/// The coupling map records which ordered pairs of physical qubits support
/// a native two-qubit gate. Connectivity queries treat the graph as
/// undirected; [`has_directed_edge`](Self::has_directed_edge) exposes the
/// raw orientation for direction-fixing passes.
///
/// All-pairs distance and predecessor matrices are computed once at
/// construction with a BFS from each vertex, giving O(1) `distance()` and
/// O(path) `shortest_path()` during routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingMap {
    /// List of directed qubit pairs as declared.
    edges: Vec<(u32, u32)>,
    /// Number of physical qubits.
    num_qubits: u32,
    /// Undirected adjacency list, neighbor lists sorted ascending.
    #[serde(skip)]
    adjacency: Vec<Vec<u32>>,
    /// `dist_matrix[from][to]`: shortest undirected distance, `u32::MAX`
    /// if unreachable.
    #[serde(skip)]
    dist_matrix: Vec<Vec<u32>>,
    /// `pred_matrix[from][to]`: predecessor of `to` on a shortest path
    /// from `from`.
    #[serde(skip)]
    pred_matrix: Vec<Vec<u32>>,
    /// Largest finite pairwise distance.
    #[serde(skip)]
    max_distance: u32,
}

impl CouplingMap {
    /// Create an empty coupling map with the given number of qubits.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            edges: vec![],
            num_qubits,
            adjacency: vec![vec![]; num_qubits as usize],
            dist_matrix: vec![],
            pred_matrix: vec![],
            max_distance: 0,
        }
    }

    /// Build a coupling map from a directed edge list.
    ///
    /// The qubit count is inferred from the largest endpoint. Self-loops
    /// and an empty list are rejected.
    pub fn from_edges(edges: &[(u32, u32)]) -> CompileResult<Self> {
        if edges.is_empty() {
            return Err(CompileError::InvalidCouplingMap(
                "edge list is empty".into(),
            ));
        }
        let num_qubits = edges
            .iter()
            .map(|&(a, b)| a.max(b) + 1)
            .max()
            .unwrap_or(0);
        let mut map = Self::new(num_qubits);
        for &(a, b) in edges {
            if a == b {
                return Err(CompileError::InvalidCouplingMap(format!(
                    "self-loop on qubit {a}"
                )));
            }
            map.add_edge(a, b);
        }
        map.rebuild_caches();
        Ok(map)
    }

    /// Add a directed edge. The undirected adjacency gains both directions;
    /// duplicates are ignored.
    pub fn add_edge(&mut self, q1: u32, q2: u32) {
        if self.edges.iter().any(|&(a, b)| a == q1 && b == q2) {
            return;
        }
        self.edges.push((q1, q2));
        let (q1u, q2u) = (q1 as usize, q2 as usize);
        if !self.adjacency[q1u].contains(&q2) {
            self.adjacency[q1u].push(q2);
        }
        if !self.adjacency[q2u].contains(&q1) {
            self.adjacency[q2u].push(q1);
        }
    }

    /// Rebuild the adjacency list from the edge list and recompute the
    /// distance/predecessor matrices. Factory methods call this; call it
    /// manually after `add_edge` or after deserialization.
    pub fn rebuild_caches(&mut self) {
        let n = self.num_qubits as usize;
        self.adjacency = vec![vec![]; n];
        for &(a, b) in &self.edges {
            let (au, bu) = (a as usize, b as usize);
            if !self.adjacency[au].contains(&b) {
                self.adjacency[au].push(b);
            }
            if !self.adjacency[bu].contains(&a) {
                self.adjacency[bu].push(a);
            }
        }
        for list in &mut self.adjacency {
            list.sort_unstable();
        }

        self.dist_matrix = vec![vec![u32::MAX; n]; n];
        self.pred_matrix = vec![vec![u32::MAX; n]; n];
        self.max_distance = 0;

        for src in 0..n {
            self.dist_matrix[src][src] = 0;
            let mut queue = VecDeque::new();
            queue.push_back(src as u32);

            while let Some(current) = queue.pop_front() {
                let cur = current as usize;
                for &neighbor in &self.adjacency[cur] {
                    let nb = neighbor as usize;
                    if self.dist_matrix[src][nb] == u32::MAX {
                        self.dist_matrix[src][nb] = self.dist_matrix[src][cur] + 1;
                        self.pred_matrix[src][nb] = current;
                        if self.dist_matrix[src][nb] > self.max_distance {
                            self.max_distance = self.dist_matrix[src][nb];
                        }
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    /// Check if two qubits are adjacent (either direction).
    #[inline]
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        self.adjacency
            .get(q1 as usize)
            .is_some_and(|neighbors| neighbors.binary_search(&q2).is_ok())
    }

    /// Check if the directed edge `(q1, q2)` was declared.
    #[inline]
    pub fn has_directed_edge(&self, q1: u32, q2: u32) -> bool {
        self.edges.iter().any(|&(a, b)| a == q1 && b == q2)
    }

    /// Check if every declared edge has its reverse declared too.
    pub fn is_symmetric(&self) -> bool {
        self.edges.iter().all(|&(a, b)| self.has_directed_edge(b, a))
    }

    /// Get the number of physical qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Get the declared edges.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Neighbors of a qubit in ascending order.
    pub fn neighbors(&self, qubit: u32) -> impl Iterator<Item = u32> + '_ {
        self.adjacency
            .get(qubit as usize)
            .map(|v| v.iter().copied())
            .into_iter()
            .flatten()
    }

    /// Degree of a qubit in the undirected graph.
    pub fn degree(&self, qubit: u32) -> usize {
        self.adjacency
            .get(qubit as usize)
            .map_or(0, std::vec::Vec::len)
    }

    /// Shortest-path distance between two qubits.
    pub fn distance(&self, from: u32, to: u32) -> Option<u32> {
        let (f, t) = (from as usize, to as usize);
        if f < self.dist_matrix.len() && t < self.dist_matrix[f].len() {
            let d = self.dist_matrix[f][t];
            return if d == u32::MAX { None } else { Some(d) };
        }
        None
    }

    /// The largest finite pairwise distance on the device.
    pub fn max_distance(&self) -> u32 {
        self.max_distance
    }

    /// Reconstruct a shortest undirected path from `from` to `to`.
    pub fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        if from == to {
            return Some(vec![from]);
        }
        let (f, t) = (from as usize, to as usize);
        if f >= self.pred_matrix.len() || t >= self.pred_matrix[f].len() {
            return None;
        }
        if self.dist_matrix[f][t] == u32::MAX {
            return None;
        }

        let mut path = vec![to];
        let mut current = to;
        while current != from {
            let pred = self.pred_matrix[f][current as usize];
            if pred == u32::MAX {
                return None;
            }
            path.push(pred);
            current = pred;
        }
        path.reverse();
        Some(path)
    }

    /// Create a symmetric linear coupling map (0-1-2-...).
    pub fn linear(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n.saturating_sub(1) {
            map.add_edge(i, i + 1);
            map.add_edge(i + 1, i);
        }
        map.rebuild_caches();
        map
    }

    /// Create a fully connected coupling map.
    pub fn full(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    map.add_edge(i, j);
                }
            }
        }
        map.rebuild_caches();
        map
    }

    /// Create a star topology (qubit 0 connected to all others).
    pub fn star(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 1..n {
            map.add_edge(0, i);
            map.add_edge(i, 0);
        }
        map.rebuild_caches();
        map
    }
}

/// Basis gates for the target device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasisGates {
    /// List of gate names in the basis.
    gates: Vec<String>,
}

impl BasisGates {
    /// Create a new basis gate set.
    pub fn new(gates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            gates: gates.into_iter().map(std::convert::Into::into).collect(),
        }
    }

    /// Check if a gate name is in the basis.
    pub fn contains(&self, gate: &str) -> bool {
        self.gates.iter().any(|g| g == gate)
    }

    /// Get the basis gate names.
    pub fn gates(&self) -> &[String] {
        &self.gates
    }

    /// The default compilation target: `{u3, cx}`.
    pub fn default_target() -> Self {
        Self::new(["u3", "cx"])
    }

    /// The working basis the rewriting passes require: `{u1, u2, u3, cx}`.
    pub fn rewriting() -> Self {
        Self::new(["u1", "u2", "u3", "cx"])
    }
}

impl Default for BasisGates {
    fn default() -> Self {
        Self::default_target()
    }
}

/// Properties shared between compilation passes.
///
/// Standard properties have dedicated typed fields; the driver's guard
/// conditions read the flag fields that analysis passes write.
#[derive(Debug, Default)]
pub struct PropertySet {
    /// Wire layout (virtual → physical). Set by layout passes.
    pub layout: Option<Layout>,

    /// Target coupling map.
    pub coupling_map: Option<CouplingMap>,

    /// Target basis gates.
    pub basis_gates: Option<BasisGates>,

    /// Device calibration data.
    pub backend_properties: Option<BackendProperties>,

    /// Set by `CheckMap`: every 2-qubit gate acts on coupled qubits.
    pub is_swap_mapped: Option<bool>,

    /// Set by `CheckCXDirection`: every CX follows a declared edge
    /// direction.
    pub is_direction_mapped: Option<bool>,

    /// Last measured circuit depth (`Depth` pass).
    pub depth: Option<usize>,

    /// Set by `FixedPoint`: the depth did not change since the previous
    /// measurement.
    pub depth_fixed_point: Option<bool>,
}

impl PropertySet {
    /// Create a new empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target coupling map and basis gates.
    #[must_use]
    pub fn with_target(mut self, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        self.coupling_map = Some(coupling_map);
        self.basis_gates = Some(basis_gates);
        self
    }

    /// Set the layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_trivial() {
        let layout = Layout::trivial(5);
        assert_eq!(layout.get_physical(QubitId(0)), Some(0));
        assert_eq!(layout.get_physical(QubitId(4)), Some(4));
        assert_eq!(layout.get_virtual(2), Some(QubitId(2)));
    }

    #[test]
    fn test_layout_swap() {
        let mut layout = Layout::trivial(3);
        layout.swap(0, 2);

        assert_eq!(layout.get_physical(QubitId(0)), Some(2));
        assert_eq!(layout.get_physical(QubitId(2)), Some(0));
        assert_eq!(layout.get_virtual(0), Some(QubitId(2)));
        assert_eq!(layout.get_virtual(2), Some(QubitId(0)));
    }

    #[test]
    fn test_layout_iter_is_sorted() {
        let mut layout = Layout::new();
        layout.add(QubitId(2), 7);
        layout.add(QubitId(0), 5);
        layout.add(QubitId(1), 6);
        let pairs: Vec<_> = layout.iter().collect();
        assert_eq!(
            pairs,
            vec![(QubitId(0), 5), (QubitId(1), 6), (QubitId(2), 7)]
        );
    }

    #[test]
    fn test_coupling_map_linear() {
        let map = CouplingMap::linear(5);
        assert!(map.is_connected(0, 1));
        assert!(map.is_connected(1, 0));
        assert!(!map.is_connected(0, 2));
        assert_eq!(map.distance(0, 4), Some(4));
        assert_eq!(map.max_distance(), 4);
        assert!(map.is_symmetric());
    }

    #[test]
    fn test_coupling_map_from_edges() {
        // T-shape: 0-1-2-3 with 4 hanging off 2.
        let map = CouplingMap::from_edges(&[(0, 1), (1, 2), (2, 3), (2, 4)]).unwrap();
        assert_eq!(map.num_qubits(), 5);
        assert!(map.is_connected(2, 4));
        assert_eq!(map.distance(0, 4), Some(3));
        // Directed list without reverses is asymmetric.
        assert!(!map.is_symmetric());
        assert!(map.has_directed_edge(0, 1));
        assert!(!map.has_directed_edge(1, 0));
    }

    #[test]
    fn test_coupling_map_rejects_bad_input() {
        assert!(matches!(
            CouplingMap::from_edges(&[]),
            Err(CompileError::InvalidCouplingMap(_))
        ));
        assert!(matches!(
            CouplingMap::from_edges(&[(1, 1)]),
            Err(CompileError::InvalidCouplingMap(_))
        ));
    }

    #[test]
    fn test_shortest_path() {
        let map = CouplingMap::linear(5);
        assert_eq!(map.shortest_path(0, 4).unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(map.shortest_path(2, 2).unwrap(), vec![2]);
    }

    #[test]
    fn test_coupling_map_json_roundtrip() {
        let map = CouplingMap::linear(4);
        let json = serde_json::to_string(&map).unwrap();
        let mut restored: CouplingMap = serde_json::from_str(&json).unwrap();
        restored.rebuild_caches();

        assert_eq!(restored.num_qubits(), 4);
        assert_eq!(restored.distance(0, 3), Some(3));
        assert_eq!(restored.edges(), map.edges());
    }

    #[test]
    fn test_basis_gates() {
        let target = BasisGates::default_target();
        assert!(target.contains("u3"));
        assert!(target.contains("cx"));
        assert!(!target.contains("u2"));

        let rewriting = BasisGates::rewriting();
        assert!(rewriting.contains("u1"));
        assert!(rewriting.contains("u2"));
    }
}
