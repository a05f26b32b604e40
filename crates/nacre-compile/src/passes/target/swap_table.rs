//! All-pairs swap reliability table.
//!
//! The noise-adaptive router ranks swap candidates by how reliably two
//! physical qubits can be brought together. This table is built once per
//! pass construction and then only read: for every ordered qubit pair it
//! stores the predecessor on a maximum-reliability swap path and a
//! normalized reliability score.

use rustc_hash::FxHashMap;

use crate::calibration::BackendProperties;
use crate::property::CouplingMap;

/// Edge weight standing in for an unusable (zero-reliability) link.
const DEAD_LINK_WEIGHT: f64 = 1e12;

/// Immutable all-pairs swap reliability data.
///
/// Shared by read-only access between all frames of the router's look-ahead
/// search.
#[derive(Debug, Clone)]
pub struct SwapTable {
    /// `pred[from][to]`: predecessor of `to` on the maximum-reliability
    /// path from `from`, `u32::MAX` when unreachable or `from == to`.
    pred: Vec<Vec<u32>>,
    /// `score[i][j]`: normalized reliability of mapping a gate onto
    /// `(i, j)`, rescaled to [0, 1] across all pairs.
    score: Vec<Vec<f64>>,
}

impl SwapTable {
    /// Build the table from a coupling map and calibration data.
    ///
    /// A swap decomposes into three CX gates, so a link with CX reliability
    /// `r` carries swap reliability `r³`; paths are weighted by `−ln r³`
    /// so a weighted shortest path is a maximum-reliability path. With
    /// `readout` set, each edge reliability is folded with the readout
    /// reliability of both endpoints.
    pub fn new(coupling_map: &CouplingMap, properties: &BackendProperties, readout: bool) -> Self {
        let n = coupling_map.num_qubits() as usize;

        // Undirected CX reliability per edge. Uncalibrated links count as
        // perfect so partially calibrated devices stay routable.
        let mut cx_reliability: FxHashMap<(u32, u32), f64> = FxHashMap::default();
        for &(a, b) in coupling_map.edges() {
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            if cx_reliability.contains_key(&(lo, hi)) {
                continue;
            }
            let mut r = properties.cx_reliability(lo, hi).unwrap_or(1.0);
            if readout {
                r *= properties.readout_reliability(lo).unwrap_or(1.0)
                    * properties.readout_reliability(hi).unwrap_or(1.0);
            }
            cx_reliability.insert((lo, hi), r);
        }
        let edge_reliability = |i: u32, j: u32| -> Option<f64> {
            let key = if i < j { (i, j) } else { (j, i) };
            cx_reliability.get(&key).copied()
        };

        // Floyd-Warshall over swap costs −ln r³.
        let mut dist = vec![vec![f64::INFINITY; n]; n];
        let mut pred = vec![vec![u32::MAX; n]; n];
        for (i, row) in dist.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        for (&(a, b), &r) in &cx_reliability {
            let swap_reliability = r.powi(3);
            let cost = if swap_reliability > 0.0 {
                -swap_reliability.ln()
            } else {
                DEAD_LINK_WEIGHT
            };
            let (a, b) = (a as usize, b as usize);
            dist[a][b] = cost;
            dist[b][a] = cost;
            pred[a][b] = a as u32;
            pred[b][a] = b as u32;
        }
        for k in 0..n {
            for i in 0..n {
                if dist[i][k].is_infinite() {
                    continue;
                }
                for j in 0..n {
                    let through = dist[i][k] + dist[k][j];
                    if through < dist[i][j] {
                        dist[i][j] = through;
                        pred[i][j] = pred[k][j];
                    }
                }
            }
        }

        // Raw per-pair reliability: the edge reliability when adjacent,
        // otherwise the best product of the path reliability to a neighbor
        // of the destination times that neighbor's incoming edge.
        let mut score = vec![vec![0.0f64; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    score[i][j] = 1.0;
                    continue;
                }
                if let Some(r) = edge_reliability(i as u32, j as u32) {
                    score[i][j] = r;
                    continue;
                }
                let mut best = 0.0f64;
                for neighbor in coupling_map.neighbors(j as u32) {
                    let Some(r) = edge_reliability(neighbor, j as u32) else {
                        continue;
                    };
                    let path_cost = dist[i][neighbor as usize];
                    if path_cost.is_finite() {
                        let reliability = (-path_cost).exp() * r;
                        if reliability > best {
                            best = reliability;
                        }
                    }
                }
                score[i][j] = best;
            }
        }

        // Min-max rescale across all pairs.
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for row in &score {
            for &s in row {
                min = min.min(s);
                max = max.max(s);
            }
        }
        let range = max - min;
        for row in &mut score {
            for s in row.iter_mut() {
                *s = if range > f64::EPSILON {
                    (*s - min) / range
                } else {
                    1.0
                };
            }
        }

        Self { pred, score }
    }

    /// The normalized reliability score for the ordered pair `(i, j)`.
    #[inline]
    pub fn score(&self, i: u32, j: u32) -> f64 {
        self.score[i as usize][j as usize]
    }

    /// Predecessor of `to` on the maximum-reliability path from `from`.
    ///
    /// For adjacent qubits this is the first step from `to` back toward
    /// `from`, which the router uses to walk a remote gate's endpoints
    /// together along high-fidelity links.
    #[inline]
    pub fn predecessor(&self, from: u32, to: u32) -> Option<u32> {
        let p = self.pred[from as usize][to as usize];
        if p == u32::MAX { None } else { Some(p) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_are_normalized() {
        let map = CouplingMap::linear(4);
        let mut props = BackendProperties::new();
        props.add_cx_error(0, 1, 0.01);
        props.add_cx_error(1, 2, 0.05);
        props.add_cx_error(2, 3, 0.02);

        let table = SwapTable::new(&map, &props, false);
        for i in 0..4 {
            for j in 0..4 {
                let s = table.score(i, j);
                assert!((0.0..=1.0).contains(&s), "score({i},{j}) = {s}");
            }
        }
        // Self-mapping normalizes to the top of the scale.
        assert!((table.score(2, 2) - 1.0).abs() < 1e-12);
        // The best edge scores above the worst edge.
        assert!(table.score(0, 1) > table.score(1, 2));
    }

    #[test]
    fn test_predecessor_walks_toward_source() {
        let map = CouplingMap::linear(4);
        let props = BackendProperties::uniform(&map, 0.01);
        let table = SwapTable::new(&map, &props, false);

        // On a line the only path from 0 to 3 is through 2.
        assert_eq!(table.predecessor(0, 3), Some(2));
        assert_eq!(table.predecessor(3, 0), Some(1));
        assert_eq!(table.predecessor(0, 1), Some(0));
    }

    #[test]
    fn test_predecessor_prefers_reliable_ring_path() {
        // Square ring 0-1-2-3-0; the 0-1 link is nearly dead, so the best
        // path from 0 to 2 goes through 3.
        let map = CouplingMap::from_edges(&[(0, 1), (1, 2), (2, 3), (3, 0)]).unwrap();
        let mut props = BackendProperties::new();
        props.add_cx_error(0, 1, 0.5);
        props.add_cx_error(1, 2, 0.01);
        props.add_cx_error(2, 3, 0.01);
        props.add_cx_error(3, 0, 0.01);

        let table = SwapTable::new(&map, &props, false);
        assert_eq!(table.predecessor(0, 2), Some(3));
    }

    #[test]
    fn test_uniform_reliabilities_do_not_divide_by_zero() {
        // A fully connected pair: every raw score equals 1.0, so min-max
        // rescaling has zero range.
        let map = CouplingMap::full(2);
        let props = BackendProperties::uniform(&map, 0.0);
        let table = SwapTable::new(&map, &props, false);
        assert!((table.score(0, 1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_readout_folding_changes_ranking() {
        let map = CouplingMap::linear(3);
        let mut props = BackendProperties::new();
        props.add_cx_error(0, 1, 0.02);
        props.add_cx_error(1, 2, 0.02);
        props.add_readout_error(0, 0.4);
        props.add_readout_error(1, 0.01);
        props.add_readout_error(2, 0.01);

        let plain = SwapTable::new(&map, &props, false);
        let folded = SwapTable::new(&map, &props, true);

        // Without readout the two edges tie; with readout the 0-1 edge
        // drops below the 1-2 edge.
        assert!((plain.score(0, 1) - plain.score(1, 2)).abs() < 1e-12);
        assert!(folded.score(0, 1) < folded.score(1, 2));
    }
}
