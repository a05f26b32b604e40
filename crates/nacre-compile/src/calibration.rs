//! Device calibration data.
//!
//! The noise-adaptive passes rank placements and swaps by two-qubit gate
//! reliability. `BackendProperties` carries the calibration numbers a
//! device reports: a `gate_error` per CX edge and optionally a
//! `readout_error` per qubit.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::property::CouplingMap;

/// Per-device calibration data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendProperties {
    /// CX gate error per edge, stored symmetrically.
    cx_errors: FxHashMap<(u32, u32), f64>,
    /// Readout error per qubit.
    readout_errors: FxHashMap<u32, f64>,
}

impl BackendProperties {
    /// Create an empty calibration record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the CX gate error on an edge (both directions).
    pub fn add_cx_error(&mut self, q1: u32, q2: u32, error: f64) {
        self.cx_errors.insert((q1, q2), error);
        self.cx_errors.insert((q2, q1), error);
    }

    /// Record the readout error of a qubit.
    pub fn add_readout_error(&mut self, qubit: u32, error: f64) {
        self.readout_errors.insert(qubit, error);
    }

    /// CX reliability `1 − gate_error` for an edge, if calibrated.
    pub fn cx_reliability(&self, q1: u32, q2: u32) -> Option<f64> {
        self.cx_errors.get(&(q1, q2)).map(|e| 1.0 - e)
    }

    /// Readout reliability `1 − readout_error` for a qubit, if calibrated.
    pub fn readout_reliability(&self, qubit: u32) -> Option<f64> {
        self.readout_errors.get(&qubit).map(|e| 1.0 - e)
    }

    /// Check whether any CX edge is calibrated.
    pub fn has_cx_data(&self) -> bool {
        !self.cx_errors.is_empty()
    }

    /// Calibrated CX edges in ascending order (each undirected edge once).
    pub fn cx_edges(&self) -> Vec<(u32, u32)> {
        let mut edges: Vec<_> = self
            .cx_errors
            .keys()
            .filter(|&&(a, b)| a < b)
            .copied()
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Uniform calibration over every edge of a coupling map; handy for
    /// tests and devices without per-edge data.
    pub fn uniform(coupling_map: &CouplingMap, cx_error: f64) -> Self {
        let mut props = Self::new();
        for &(a, b) in coupling_map.edges() {
            props.add_cx_error(a, b, cx_error);
        }
        props
    }
}

/// A target device descriptor.
///
/// Real hardware reports its own coupling map and calibration; a simulator
/// carries neither and the caller must supply both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backend {
    /// Backend name.
    pub name: String,
    /// Whether this backend is a simulator.
    pub simulator: bool,
    /// Device connectivity, if the backend reports one.
    pub coupling_map: Option<CouplingMap>,
    /// Device calibration, if the backend reports one.
    pub properties: Option<BackendProperties>,
}

impl Backend {
    /// Describe a hardware backend.
    pub fn hardware(
        name: impl Into<String>,
        coupling_map: CouplingMap,
        properties: BackendProperties,
    ) -> Self {
        Self {
            name: name.into(),
            simulator: false,
            coupling_map: Some(coupling_map),
            properties: Some(properties),
        }
    }

    /// Describe a simulator backend.
    pub fn simulator(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            simulator: true,
            coupling_map: None,
            properties: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cx_reliability_is_symmetric() {
        let mut props = BackendProperties::new();
        props.add_cx_error(0, 1, 0.02);

        assert!((props.cx_reliability(0, 1).unwrap() - 0.98).abs() < 1e-12);
        assert!((props.cx_reliability(1, 0).unwrap() - 0.98).abs() < 1e-12);
        assert_eq!(props.cx_reliability(1, 2), None);
    }

    #[test]
    fn test_readout_reliability() {
        let mut props = BackendProperties::new();
        props.add_readout_error(3, 0.1);
        assert!((props.readout_reliability(3).unwrap() - 0.9).abs() < 1e-12);
        assert_eq!(props.readout_reliability(0), None);
    }

    #[test]
    fn test_uniform_covers_every_edge() {
        let map = CouplingMap::linear(4);
        let props = BackendProperties::uniform(&map, 0.01);
        assert_eq!(props.cx_edges(), vec![(0, 1), (1, 2), (2, 3)]);
    }
}
