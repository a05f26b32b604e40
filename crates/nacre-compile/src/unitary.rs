//! Unitary matrix utilities for gate optimization.
//!
//! Provides 2x2 unitary matrix operations for single-qubit gate merging,
//! including matrix multiplication and ZYZ decomposition.

use num_complex::Complex64;
use std::f64::consts::PI;

/// Tolerance for floating point comparisons.
const EPSILON: f64 = 1e-10;

/// A 2x2 unitary matrix in row-major order.
#[derive(Debug, Clone, Copy)]
pub struct Unitary2x2 {
    /// The matrix elements in row-major order: [[a, b], [c, d]].
    pub data: [Complex64; 4],
}

impl Unitary2x2 {
    /// Create a new 2x2 unitary matrix.
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { data: [a, b, c, d] }
    }

    /// Create the identity matrix.
    pub fn identity() -> Self {
        Self::new(
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
        )
    }

    /// Create a Hadamard matrix.
    pub fn h() -> Self {
        let s = 1.0 / 2.0_f64.sqrt();
        Self::new(
            Complex64::new(s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(-s, 0.0),
        )
    }

    /// Create a Pauli-X matrix.
    pub fn x() -> Self {
        Self::new(
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
        )
    }

    /// Create a Pauli-Y matrix.
    pub fn y() -> Self {
        Self::new(
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, -1.0),
            Complex64::new(0.0, 1.0),
            Complex64::new(0.0, 0.0),
        )
    }

    /// Create a Pauli-Z matrix.
    pub fn z() -> Self {
        Self::new(
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(-1.0, 0.0),
        )
    }

    /// Create an S gate (sqrt(Z)).
    pub fn s() -> Self {
        Self::u1(PI / 2.0)
    }

    /// Create an S-dagger gate.
    pub fn sdg() -> Self {
        Self::u1(-PI / 2.0)
    }

    /// Create a T gate (fourth root of Z).
    pub fn t() -> Self {
        Self::u1(PI / 4.0)
    }

    /// Create a T-dagger gate.
    pub fn tdg() -> Self {
        Self::u1(-PI / 4.0)
    }

    /// Create an RX rotation matrix.
    pub fn rx(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(0.0, -s),
            Complex64::new(0.0, -s),
            Complex64::new(c, 0.0),
        )
    }

    /// Create an RY rotation matrix.
    pub fn ry(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(-s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(c, 0.0),
        )
    }

    /// Create an RZ rotation matrix.
    pub fn rz(theta: f64) -> Self {
        let exp_neg = Complex64::from_polar(1.0, -theta / 2.0);
        let exp_pos = Complex64::from_polar(1.0, theta / 2.0);
        Self::new(
            exp_neg,
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            exp_pos,
        )
    }

    /// Create a U1 phase gate: diag(1, e^{iλ}).
    pub fn u1(lambda: f64) -> Self {
        let phase = Complex64::from_polar(1.0, lambda);
        Self::new(
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            phase,
        )
    }

    /// Create a U2 gate: U3(π/2, φ, λ).
    pub fn u2(phi: f64, lambda: f64) -> Self {
        Self::u3(PI / 2.0, phi, lambda)
    }

    /// Create a U3 gate U3(θ, φ, λ).
    pub fn u3(theta: f64, phi: f64, lambda: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        )
    }

    /// Multiply this matrix by another: self * other.
    #[allow(clippy::many_single_char_names)]
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h)
    }

    /// Get the conjugate transpose (dagger).
    pub fn dagger(&self) -> Self {
        Self::new(
            self.data[0].conj(),
            self.data[2].conj(),
            self.data[1].conj(),
            self.data[3].conj(),
        )
    }

    /// Check if this is approximately identity (up to global phase).
    pub fn is_identity(&self) -> bool {
        let [a, b, c, d] = self.data;
        if b.norm() > EPSILON || c.norm() > EPSILON {
            return false;
        }
        (a - d).norm() < EPSILON
    }

    /// Decompose into RZ(alpha) * RY(beta) * RZ(gamma) * `global_phase`.
    ///
    /// Returns (alpha, beta, gamma, `global_phase`). The U3 form of the
    /// same rotation is `U3(beta, alpha, gamma)` up to global phase.
    pub fn zyz_decomposition(&self) -> (f64, f64, f64, f64) {
        let [a, b, c, d] = self.data;

        let det = a * d - b * c;
        let global_phase = det.arg() / 2.0;

        // Remove global phase to get an SU(2) matrix.
        let phase_factor = Complex64::from_polar(1.0, -global_phase);
        let a = a * phase_factor;
        let b = b * phase_factor;
        let c = c * phase_factor;

        // For SU(2): U = [[cos(b/2)e^{-i(a+g)/2}, -sin(b/2)e^{-i(a-g)/2}],
        //                 [sin(b/2)e^{i(a-g)/2},   cos(b/2)e^{i(a+g)/2}]]
        let beta = 2.0 * a.norm().clamp(0.0, 1.0).acos();

        if beta.abs() < EPSILON {
            // Pure Z rotation.
            let alpha_plus_gamma = -2.0 * a.arg();
            return (
                alpha_plus_gamma / 2.0,
                0.0,
                alpha_plus_gamma / 2.0,
                global_phase,
            );
        }

        if (beta - PI).abs() < EPSILON {
            let alpha_minus_gamma = -2.0 * (-b).arg();
            return (
                alpha_minus_gamma / 2.0,
                PI,
                -alpha_minus_gamma / 2.0,
                global_phase,
            );
        }

        let alpha_plus_gamma = -2.0 * a.arg();
        let alpha_minus_gamma = 2.0 * c.arg();

        let alpha = (alpha_plus_gamma + alpha_minus_gamma) / 2.0;
        let gamma = (alpha_plus_gamma - alpha_minus_gamma) / 2.0;

        (alpha, beta, gamma, global_phase)
    }

    /// Normalize angles to [-pi, pi].
    pub fn normalize_angle(angle: f64) -> f64 {
        if angle.is_nan() || angle.is_infinite() {
            return 0.0;
        }
        let mut a = angle.rem_euclid(2.0 * PI);
        if a > PI {
            a -= 2.0 * PI;
        }
        a
    }
}

impl Default for Unitary2x2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Unitary2x2 {
    type Output = Self;

    #[allow(clippy::needless_pass_by_value)]
    fn mul(self, rhs: Self) -> Self::Output {
        Unitary2x2::mul(&self, &rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let i = Unitary2x2::identity();
        assert!(i.is_identity());
    }

    #[test]
    fn test_hadamard_squared() {
        let h = Unitary2x2::h();
        let h2 = h * h;
        assert!(h2.is_identity());
    }

    #[test]
    fn test_u2_0_pi_is_hadamard() {
        // U2(0, π) is the Hadamard up to global phase.
        let u = Unitary2x2::u2(0.0, PI);
        let h = Unitary2x2::h();
        let product = u.dagger() * h;
        let [a, b, c, d] = product.data;
        assert!(b.norm() < EPSILON && c.norm() < EPSILON);
        assert!((a - d).norm() < EPSILON);
        assert!((a.norm() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_u1_chain_is_additive() {
        let u = Unitary2x2::u1(0.3) * Unitary2x2::u1(0.4);
        let expected = Unitary2x2::u1(0.7);
        let product = u.dagger() * expected;
        assert!(product.is_identity());
    }

    #[test]
    fn test_zyz_roundtrip_hadamard() {
        let h = Unitary2x2::h();
        let (alpha, beta, gamma, phase) = h.zyz_decomposition();

        let reconstructed = Unitary2x2::rz(alpha) * Unitary2x2::ry(beta) * Unitary2x2::rz(gamma);
        let global = Complex64::from_polar(1.0, phase);

        for i in 0..4 {
            let expected = h.data[i];
            let got = reconstructed.data[i] * global;
            assert!(
                (expected - got).norm() < 1e-6,
                "Mismatch at {i}: expected {expected:?}, got {got:?}"
            );
        }
    }

    #[test]
    fn test_zyz_matches_u3() {
        // U3(beta, alpha, gamma) reproduces RZ(alpha)·RY(beta)·RZ(gamma)
        // up to global phase.
        let u = Unitary2x2::u3(0.7, 0.3, -0.2) * Unitary2x2::u1(1.1);
        let (alpha, beta, gamma, _) = u.zyz_decomposition();
        let rebuilt = Unitary2x2::u3(beta, alpha, gamma);
        let product = u.dagger() * rebuilt;
        assert!(product.is_identity());
    }
}
