//! Effective three-flavor Hamiltonian in matter.
//!
//! The Hamiltonian is stored as the effective mass-squared matrix `M²` in the
//! flavor basis (eV²), with `H = M² / 2E`:
//!
//! ```text
//! M² = U · diag(0, Δm²₂₁, Δm²₃₁) · U† + diag(A, 0, 0),    A = 2√2 G_F N_e E
//! ```
//!
//! Eigenvalues come from the trigonometric solution of the characteristic
//! cubic, optionally polished with Newton steps. The matter-modified mixing
//! moduli `|V_αk|²` then follow from the eigenvector-eigenvalue identity, the
//! same "Rosetta" relation NuFast uses for `|V_ek|²`, so no eigenvectors are
//! ever computed.

use core::f64::consts::PI;

use num_complex::Complex64;

use crate::error::{Result, SolarError};
use crate::vacuum::{Matrix3, MixingParameters};
use crate::{EV_SQ_KM_TO_GEV_OVER4, YE_RHO_E_TO_A};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Effective Hamiltonian at a fixed energy and matter potential.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hamiltonian {
    mass_squared: Matrix3,
    energy: f64,
    potential: f64,
}

impl Hamiltonian {
    /// Vacuum Hamiltonian at energy `E` (GeV).
    ///
    /// Fails with [`SolarError::EnergyOutOfDomain`] unless `E` is finite and positive.
    pub fn vacuum(mixing: &MixingParameters, E: f64) -> Result<Self> {
        if !(E.is_finite() && E > 0.0) {
            return Err(SolarError::EnergyOutOfDomain { energy: E });
        }

        let u = mixing.pmns();
        let masses = [0.0, mixing.Dmsq21, mixing.Dmsq31];

        let mut mass_squared = [[ZERO; 3]; 3];
        for (a, row) in mass_squared.iter_mut().enumerate() {
            for (b, entry) in row.iter_mut().enumerate() {
                *entry = (0..3).map(|i| u[a][i] * u[b][i].conj() * masses[i]).sum();
            }
        }

        Ok(Self {
            mass_squared,
            energy: E,
            potential: 0.0,
        })
    }

    /// Hamiltonian in matter with electron density `ρ·Y_e` (g/cm³).
    pub fn in_matter(mixing: &MixingParameters, E: f64, rho_ye: f64) -> Result<Self> {
        Ok(Self::vacuum(mixing, E)?.with_potential(YE_RHO_E_TO_A * rho_ye * E))
    }

    /// Replace the matter potential `A` (eV²) on the ν_e diagonal.
    pub fn with_potential(mut self, A: f64) -> Self {
        self.mass_squared[0][0] += A - self.potential;
        self.potential = A;
        self
    }

    /// Neutrino energy in GeV.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Matter potential `A` in eV².
    pub fn matter_potential(&self) -> f64 {
        self.potential
    }

    /// Effective mass-squared matrix `2E·H` in the flavor basis (eV²).
    pub fn mass_squared(&self) -> &Matrix3 {
        &self.mass_squared
    }

    /// Phase (radians) accumulated per km by a unit of `M²` eigenvalue.
    pub(crate) fn phase_per_km(&self) -> f64 {
        // λ L / 2E = 2 · (λ L / 4E)
        2.0 * EV_SQ_KM_TO_GEV_OVER4 / self.energy
    }

    /// The generator `H` in rad/km, flavor basis.
    pub fn generator(&self) -> Matrix3 {
        let scale = self.phase_per_km();
        self.mass_squared.map(|row| row.map(|h| h * scale))
    }

    /// `U† M² U`: the Hamiltonian seen in the vacuum mass basis.
    ///
    /// Diagonal, equal to `diag(0, Δm²₂₁, Δm²₃₁)`, when the potential vanishes.
    pub fn to_mass_basis(&self, mixing: &MixingParameters) -> Matrix3 {
        let u = mixing.pmns();
        matmul(&matmul(&dagger(&u), &self.mass_squared), &u)
    }

    /// Characteristic polynomial `λ³ - aλ² + bλ - c` as `(a, b, c)`.
    fn invariants(&self) -> (f64, f64, f64) {
        let h = &self.mass_squared;
        let (h00, h11, h22) = (h[0][0].re, h[1][1].re, h[2][2].re);
        let (n01, n02, n12) = (h[0][1].norm_sqr(), h[0][2].norm_sqr(), h[1][2].norm_sqr());

        let a = h00 + h11 + h22;
        let b = h00 * h11 + h00 * h22 + h11 * h22 - n01 - n02 - n12;
        let c = h00 * h11 * h22 + 2.0 * (h[0][1] * h[1][2] * h[2][0]).re
            - h00 * n12
            - h11 * n02
            - h22 * n01;
        (a, b, c)
    }

    /// Eigenvalues of `M²` (eV²) in ascending order.
    ///
    /// `newton_iterations` Newton steps on the characteristic cubic polish the
    /// closed-form roots, which lose precision when two levels are close.
    pub fn eigenvalues(&self, newton_iterations: u8) -> [f64; 3] {
        let (a, b, c) = self.invariants();

        // λ = t + a/3 turns the cubic into t³ + p t + q = 0, p ≤ 0 for Hermitian M²
        let shift = a / 3.0;
        let p = b - a * a / 3.0;
        let q = -2.0 * a * a * a / 27.0 + a * b / 3.0 - c;

        let mut lambda = if p >= 0.0 {
            [shift; 3]
        } else {
            let m = 2.0 * (-p / 3.0).sqrt();
            let arg = (3.0 * q / (p * m)).clamp(-1.0, 1.0);
            let theta = arg.acos() / 3.0;
            [0, 1, 2].map(|k| shift + m * (theta - 2.0 * PI * k as f64 / 3.0).cos())
        };

        for _ in 0..newton_iterations {
            for l in lambda.iter_mut() {
                let f = ((*l - a) * *l + b) * *l - c;
                let df = (3.0 * *l - 2.0 * a) * *l + b;
                if df != 0.0 {
                    *l -= f / df;
                }
            }
        }

        lambda.sort_by(f64::total_cmp);
        lambda
    }

    /// Squared moduli `|V_αk|²` of the matter mixing matrix, `[α][k]`, with
    /// `k` labelling eigenvalues in ascending order.
    ///
    /// Requires non-degenerate eigenvalues, which holds for any mixing with
    /// non-zero angles.
    pub fn mixing_moduli(&self, newton_iterations: u8) -> [[f64; 3]; 3] {
        let lambda = self.eigenvalues(newton_iterations);
        mixing_moduli_for(&self.mass_squared, &lambda)
    }
}

/// Eigenvector-eigenvalue identity:
/// `|V_αk|² Π_{j≠k}(λ_k - λ_j) = (λ_k - h_ββ)(λ_k - h_γγ) - |h_βγ|²`
/// with `β, γ` the two flavors other than `α`.
pub(crate) fn mixing_moduli_for(h: &Matrix3, lambda: &[f64; 3]) -> [[f64; 3]; 3] {
    let mut moduli = [[0.0; 3]; 3];
    for (alpha, row) in moduli.iter_mut().enumerate() {
        let (beta, gamma) = match alpha {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let S = h[beta][beta].re + h[gamma][gamma].re;
        let T = h[beta][beta].re * h[gamma][gamma].re - h[beta][gamma].norm_sqr();

        for (k, entry) in row.iter_mut().enumerate() {
            let l = lambda[k];
            let denom: f64 = (0..3).filter(|&j| j != k).map(|j| l - lambda[j]).product();
            *entry = (l * (l - S) + T) / denom;
        }
    }
    moduli
}

pub(crate) fn matmul(x: &Matrix3, y: &Matrix3) -> Matrix3 {
    let mut out = [[ZERO; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, entry) in row.iter_mut().enumerate() {
            *entry = (0..3).map(|k| x[i][k] * y[k][j]).sum();
        }
    }
    out
}

pub(crate) fn dagger(x: &Matrix3) -> Matrix3 {
    let mut out = [[ZERO; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, entry) in row.iter_mut().enumerate() {
            *entry = x[j][i].conj();
        }
    }
    out
}
