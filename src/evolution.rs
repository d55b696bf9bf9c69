//! Flavor states and their evolution.
//!
//! Two propagation primitives are provided:
//!
//! - [`FlavorState::evolve`]: exact coherent evolution across a layer of
//!   constant density, `|ψ(L)⟩ = exp(-i H L) |ψ(0)⟩`, using the Sylvester
//!   expansion of the exponential over the three distinct eigenvalues.
//! - [`adiabatic_probabilities`]: adiabatic transport of the matter
//!   eigenstates from a production Hamiltonian to an exit Hamiltonian, with the
//!   fast oscillating phases averaged out. This is the regime of solar
//!   neutrinos: the density varies slowly compared to the oscillation length,
//!   and the Sun-Earth distance washes out all interference.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::hamiltonian::{matmul, Hamiltonian};
use crate::vacuum::Matrix3;

/// Neutrino flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    Electron,
    Muon,
    Tau,
}

impl Flavor {
    pub const ALL: [Flavor; 3] = [Flavor::Electron, Flavor::Muon, Flavor::Tau];

    /// Row/column index in flavor-basis matrices.
    pub fn index(self) -> usize {
        match self {
            Flavor::Electron => 0,
            Flavor::Muon => 1,
            Flavor::Tau => 2,
        }
    }
}

/// Amplitudes of a neutrino state in the flavor basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlavorState {
    amplitudes: [Complex64; 3],
}

impl FlavorState {
    /// Pure flavor eigenstate.
    pub fn flavor(flavor: Flavor) -> Self {
        let mut amplitudes = [Complex64::new(0.0, 0.0); 3];
        amplitudes[flavor.index()] = Complex64::new(1.0, 0.0);
        Self { amplitudes }
    }

    pub fn amplitudes(&self) -> &[Complex64; 3] {
        &self.amplitudes
    }

    /// Probability of detecting the state as `flavor`.
    pub fn probability(&self, flavor: Flavor) -> f64 {
        self.amplitudes[flavor.index()].norm_sqr()
    }

    /// Total probability; 1 for any state evolved from a flavor eigenstate.
    pub fn norm(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    /// Evolve across `length` km of constant-density matter described by `h`.
    pub fn evolve(&self, h: &Hamiltonian, length: f64, newton_iterations: u8) -> Self {
        let s = propagator(h, length, newton_iterations);
        let mut amplitudes = [Complex64::new(0.0, 0.0); 3];
        for (a, out) in amplitudes.iter_mut().enumerate() {
            *out = (0..3).map(|b| s[a][b] * self.amplitudes[b]).sum();
        }
        Self { amplitudes }
    }
}

/// `exp(-i H L)` for a constant-density layer of `length` km.
///
/// Sylvester: `exp(-i H L) = Σ_k exp(-i φ_k) P_k`, with the spectral projectors
/// `P_k = Π_{j≠k} (M² - λ_j) / (λ_k - λ_j)`.
pub fn propagator(h: &Hamiltonian, length: f64, newton_iterations: u8) -> Matrix3 {
    let lambda = h.eigenvalues(newton_iterations);
    let phase_scale = h.phase_per_km() * length;
    let m = h.mass_squared();

    let shifted = |l: f64| {
        let mut out = *m;
        for (i, row) in out.iter_mut().enumerate() {
            row[i] -= l;
        }
        out
    };

    let mut s = [[Complex64::new(0.0, 0.0); 3]; 3];
    for k in 0..3 {
        let (i, j) = match k {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let denom = (lambda[k] - lambda[i]) * (lambda[k] - lambda[j]);
        let weight = Complex64::from_polar(1.0, -lambda[k] * phase_scale) / denom;
        let projector = matmul(&shifted(lambda[i]), &shifted(lambda[j]));
        for (row_s, row_p) in s.iter_mut().zip(projector.iter()) {
            for (entry, p) in row_s.iter_mut().zip(row_p.iter()) {
                *entry += weight * p;
            }
        }
    }
    s
}

/// Adiabatic, phase-averaged transition probabilities from `from` into every
/// flavor, indexed by [`Flavor::index`].
///
/// `P(α→β) = Σ_k |V_αk(production)|² |V_βk(exit)|²`, with matter eigenstates
/// labelled by ascending eigenvalue at both ends. Level ordering is preserved
/// along an adiabatic path, so the labels match.
///
/// Requires every level to couple to ν_e (see
/// [`MixingParameters::check_adiabatic`](crate::MixingParameters::check_adiabatic)).
/// With a decoupled state its level crosses the others exactly and the
/// ascending labels no longer follow the same state.
pub fn adiabatic_probabilities(
    production: &Hamiltonian,
    exit: &Hamiltonian,
    from: Flavor,
    newton_iterations: u8,
) -> [f64; 3] {
    let start = production.mixing_moduli(newton_iterations);
    let end = exit.mixing_moduli(newton_iterations);
    let a = from.index();

    Flavor::ALL.map(|to| {
        let b = to.index();
        (0..3).map(|k| start[a][k] * end[b][k]).sum()
    })
}

/// Single entry of [`adiabatic_probabilities`].
pub fn adiabatic_probability(
    production: &Hamiltonian,
    exit: &Hamiltonian,
    from: Flavor,
    to: Flavor,
    newton_iterations: u8,
) -> f64 {
    adiabatic_probabilities(production, exit, from, newton_iterations)[to.index()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vacuum::{probability_vacuum, probability_vacuum_averaged, MixingParameters};
    use approx::assert_abs_diff_eq;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_zero_length_is_identity() {
        let h = Hamiltonian::in_matter(&MixingParameters::nufit52_no(), 0.01, 80.0).unwrap();
        for flavor in Flavor::ALL {
            let psi = FlavorState::flavor(flavor).evolve(&h, 0.0, 1);
            assert_abs_diff_eq!(psi.probability(flavor), 1.0, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_coherent_vacuum_matches_closed_form() {
        let mixing = MixingParameters::nufit52_no();
        let (L, E) = (1300.0, 2.5);
        let h = Hamiltonian::vacuum(&mixing, E).unwrap();
        let probs = probability_vacuum(&mixing, L, E);

        for flavor in Flavor::ALL {
            let psi = FlavorState::flavor(flavor).evolve(&h, L, 2);
            let i = flavor.index();
            assert_abs_diff_eq!(psi.probability(flavor), probs[i][i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_evolution_is_unitary_in_matter() {
        let h = Hamiltonian::in_matter(&MixingParameters::nufit52_no(), 0.008, 120.0).unwrap();
        let psi = FlavorState::flavor(Flavor::Electron).evolve(&h, 5_000.0, 1);
        assert_abs_diff_eq!(psi.norm(), 1.0, epsilon = 1e-8);
        let total: f64 = Flavor::ALL.iter().map(|&f| psi.probability(f)).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_two_layers_compose() {
        let h = Hamiltonian::in_matter(&MixingParameters::nufit52_no(), 0.01, 60.0).unwrap();
        let once = FlavorState::flavor(Flavor::Electron).evolve(&h, 700.0, 1);
        let twice = FlavorState::flavor(Flavor::Electron)
            .evolve(&h, 300.0, 1)
            .evolve(&h, 400.0, 1);
        for flavor in Flavor::ALL {
            let (a, b) = (once.probability(flavor), twice.probability(flavor));
            assert_abs_diff_eq!(a, b, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_adiabatic_vacuum_limit_is_averaged_vacuum() {
        let mixing = MixingParameters::nufit52_no();
        let h = Hamiltonian::vacuum(&mixing, 0.01).unwrap();
        let avg = probability_vacuum_averaged(&mixing);
        for from in Flavor::ALL {
            let probs = adiabatic_probabilities(&h, &h, from, 2);
            for to in Flavor::ALL {
                assert_abs_diff_eq!(
                    probs[to.index()],
                    avg[from.index()][to.index()],
                    epsilon = 1e-8
                );
            }
        }
    }

    #[test]
    fn test_exact_crossing_breaks_level_labels() {
        // θ₁₂ = θ₁₃ = 0: ν_e is an exact eigenstate whose level A climbs past
        // Δm²₂₁, so ascending labels pair it with ν₂ at the exit
        let mixing = MixingParameters {
            s12sq: 0.0,
            s13sq: 0.0,
            ..MixingParameters::nufit52_no()
        };
        assert!(mixing.check_adiabatic().is_err());

        let production = Hamiltonian::in_matter(&mixing, 0.01, 85.0).unwrap();
        let exit = Hamiltonian::vacuum(&mixing, 0.01).unwrap();
        assert!(production.matter_potential() > mixing.Dmsq21);
        let p = adiabatic_probability(&production, &exit, Flavor::Electron, Flavor::Electron, 1);
        assert_abs_diff_eq!(p, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_adiabatic_probabilities_sum_to_one() {
        let mixing = MixingParameters::nufit52_io();
        let production = Hamiltonian::in_matter(&mixing, 0.012, 150.0).unwrap();
        let exit = Hamiltonian::in_matter(&mixing, 0.012, 0.01).unwrap();
        let probs = adiabatic_probabilities(&production, &exit, Flavor::Electron, 1);
        assert_abs_diff_eq!(probs.iter().sum::<f64>(), 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(
            adiabatic_probability(&production, &exit, Flavor::Electron, Flavor::Muon, 1),
            probs[1],
            epsilon = 0.0
        );
    }
}
