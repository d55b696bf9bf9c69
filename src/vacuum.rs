//! Three-flavor mixing parameters and closed-form vacuum probabilities.

use core::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolarError};
use crate::EV_SQ_KM_TO_GEV_OVER4;

/// 3×3 probability matrix type.
///
/// Indexed as `probs[α][β]` = P(ν_α → ν_β) where:
/// - 0 = electron (e)
/// - 1 = muon (μ)
/// - 2 = tau (τ)
pub type ProbabilityMatrix = [[f64; 3]; 3];

/// Complex 3×3 matrix, row-major.
pub type Matrix3 = [[Complex64; 3]; 3];

/// Lepton mixing and mass splittings.
///
/// All angles are specified as sin²θ, CP phase in radians, mass splittings
/// in eV². Baseline and energy are supplied per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixingParameters {
    /// sin²θ₁₂ (solar mixing angle)
    pub s12sq: f64,
    /// sin²θ₁₃ (reactor mixing angle)
    pub s13sq: f64,
    /// sin²θ₂₃ (atmospheric mixing angle)
    pub s23sq: f64,
    /// CP-violating phase δ in radians
    pub delta: f64,
    /// Δm²₂₁ in eV² (solar mass splitting, always positive)
    pub Dmsq21: f64,
    /// Δm²₃₁ in eV² (atmospheric mass splitting, positive for NO, negative for IO)
    pub Dmsq31: f64,
}

impl Default for MixingParameters {
    fn default() -> Self {
        Self::nufit52_no()
    }
}

impl MixingParameters {
    /// NuFit 5.2 best-fit values (Normal Ordering).
    pub fn nufit52_no() -> Self {
        Self {
            s12sq: 0.307,
            s13sq: 0.02203,
            s23sq: 0.546,
            delta: 1.36 * PI,
            Dmsq21: 7.42e-5,
            Dmsq31: 2.517e-3,
        }
    }

    /// NuFit 5.2 best-fit values (Inverted Ordering).
    pub fn nufit52_io() -> Self {
        Self {
            s12sq: 0.307,
            s13sq: 0.02219,
            s23sq: 0.539,
            delta: 1.56 * PI,
            Dmsq21: 7.42e-5,
            Dmsq31: -2.498e-3,
        }
    }

    /// Check that every mass state couples to ν_e.
    ///
    /// Adiabatic propagation labels matter eigenstates by eigenvalue order,
    /// which only holds while levels never cross. With `θ₁₂` or `θ₁₃` at 0 or
    /// π/2 a ν_e-free state decouples and its level crosses the ν_e-like one
    /// as the density changes.
    pub fn check_adiabatic(&self) -> Result<()> {
        for (parameter, value) in [("s12sq", self.s12sq), ("s13sq", self.s13sq)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(SolarError::DegenerateMixing { parameter, value });
            }
        }
        Ok(())
    }

    /// The PMNS matrix `U = R₂₃ · U₁₃(δ) · R₁₂`, indexed `U[α][i]`.
    pub fn pmns(&self) -> Matrix3 {
        let s12 = self.s12sq.sqrt();
        let s13 = self.s13sq.sqrt();
        let s23 = self.s23sq.sqrt();
        let c12 = (1.0 - self.s12sq).sqrt();
        let c13 = (1.0 - self.s13sq).sqrt();
        let c23 = (1.0 - self.s23sq).sqrt();

        let eid = Complex64::from_polar(1.0, self.delta);
        let re = |x: f64| Complex64::new(x, 0.0);

        [
            [re(c12 * c13), re(s12 * c13), eid.conj() * s13],
            [
                re(-s12 * c23) - eid * (c12 * s23 * s13),
                re(c12 * c23) - eid * (s12 * s23 * s13),
                re(s23 * c13),
            ],
            [
                re(s12 * s23) - eid * (c12 * c23 * s13),
                re(-c12 * s23) - eid * (s12 * c23 * s13),
                re(c23 * c13),
            ],
        ]
    }

    /// Squared PMNS moduli plus the (scaled) Jarlskog invariant.
    fn squared_elements(&self) -> SquaredElements {
        let Self {
            s12sq,
            s13sq,
            s23sq,
            delta,
            ..
        } = *self;

        let c13sq = 1.0 - s13sq;

        let Ue3sq = s13sq;
        let Ue2sq = c13sq * s12sq;

        // Um2sq and Ut2sq are used here as temporary variables
        let Um3sq = c13sq * s23sq;
        let Ut2sq = s13sq * s12sq * s23sq;
        let Um2sq = (1.0 - s12sq) * (1.0 - s23sq);

        let Jrr = (Um2sq * Ut2sq).sqrt();
        let Um2sq = Um2sq + Ut2sq - 2.0 * Jrr * delta.cos();
        let J8 = 8.0 * Jrr * c13sq * delta.sin();

        let Ue1sq = 1.0 - Ue3sq - Ue2sq;
        let Um1sq = 1.0 - Um3sq - Um2sq;

        let Ut3sq = 1.0 - Um3sq - Ue3sq;
        let Ut2sq = 1.0 - Um2sq - Ue2sq;
        let Ut1sq = 1.0 - Um1sq - Ue1sq;

        SquaredElements {
            e: [Ue1sq, Ue2sq, Ue3sq],
            m: [Um1sq, Um2sq, Um3sq],
            t: [Ut1sq, Ut2sq, Ut3sq],
            J8,
        }
    }
}

struct SquaredElements {
    e: [f64; 3],
    m: [f64; 3],
    t: [f64; 3],
    /// 8·J, with J the Jarlskog invariant
    J8: f64,
}

impl SquaredElements {
    /// Build the probability matrix from the kinematic terms
    /// `2 sin²Δij` and the CP-odd `sinΔ21 sinΔ31 sinΔ32`.
    fn assemble(
        &self,
        sinsq21_2: f64,
        sinsq31_2: f64,
        sinsq32_2: f64,
        triple_sin: f64,
    ) -> ProbabilityMatrix {
        let [Ue1sq, Ue2sq, Ue3sq] = self.e;
        let [Um1sq, Um2sq, Um3sq] = self.m;
        let [Ut1sq, Ut2sq, Ut3sq] = self.t;

        let Pme_CPC = (Ut3sq - Um2sq * Ue1sq - Um1sq * Ue2sq) * sinsq21_2
            + (Ut2sq - Um3sq * Ue1sq - Um1sq * Ue3sq) * sinsq31_2
            + (Ut1sq - Um3sq * Ue2sq - Um2sq * Ue3sq) * sinsq32_2;

        let Pme_CPV = -self.J8 * triple_sin;

        let Pmm = 1.0
            - 2.0
                * (Um2sq * Um1sq * sinsq21_2
                    + Um3sq * Um1sq * sinsq31_2
                    + Um3sq * Um2sq * sinsq32_2);

        let Pee = 1.0
            - 2.0
                * (Ue2sq * Ue1sq * sinsq21_2
                    + Ue3sq * Ue1sq * sinsq31_2
                    + Ue3sq * Ue2sq * sinsq32_2);

        let mut probs = [[0.0; 3]; 3];

        probs[0][0] = Pee;
        probs[0][1] = Pme_CPC - Pme_CPV;
        probs[0][2] = 1.0 - Pee - probs[0][1];

        probs[1][0] = Pme_CPC + Pme_CPV;
        probs[1][1] = Pmm;
        probs[1][2] = 1.0 - probs[1][0] - Pmm;

        probs[2][0] = 1.0 - Pee - probs[1][0];
        probs[2][1] = 1.0 - probs[0][1] - Pmm;
        probs[2][2] = 1.0 - probs[0][2] - probs[1][2];

        probs
    }
}

/// Coherent vacuum oscillation probabilities over a baseline `L` (km) at
/// energy `E` (GeV).
///
/// Returns a 3×3 matrix where `probs[α][β]` = P(ν_α → ν_β).
///
/// # Example
///
/// ```rust
/// use nusolar::{MixingParameters, probability_vacuum};
///
/// let probs = probability_vacuum(&MixingParameters::nufit52_no(), 295.0, 0.6);
///
/// // Check unitarity
/// let row_sum: f64 = probs[1].iter().sum();
/// assert!((row_sum - 1.0).abs() < 1e-10);
/// ```
pub fn probability_vacuum(mixing: &MixingParameters, L: f64, E: f64) -> ProbabilityMatrix {
    let elements = mixing.squared_elements();

    let Lover4E = EV_SQ_KM_TO_GEV_OVER4 * L / E;

    let D21 = mixing.Dmsq21 * Lover4E;
    let D31 = mixing.Dmsq31 * Lover4E;

    let sinD21 = D21.sin();
    let sinD31 = D31.sin();
    let sinD32 = (D31 - D21).sin();

    elements.assemble(
        2.0 * sinD21 * sinD21,
        2.0 * sinD31 * sinD31,
        2.0 * sinD32 * sinD32,
        sinD21 * sinD31 * sinD32,
    )
}

/// Vacuum probabilities with every oscillating term averaged out.
///
/// This is the limit reached by any neutrino travelling a distance much longer
/// than its oscillation lengths with finite energy resolution, e.g. from the
/// solar surface to the Earth: `P(α→β) = Σᵢ |U_αi|² |U_βi|²`.
pub fn probability_vacuum_averaged(mixing: &MixingParameters) -> ProbabilityMatrix {
    // <2 sin²Δ> = 1, <sinΔ21 sinΔ31 sinΔ32> = 0
    mixing.squared_elements().assemble(1.0, 1.0, 1.0, 0.0)
}

/// Clamp all probabilities to [0, 1] and ensure row unitarity.
///
/// Useful when numerical precision issues cause slight violations.
pub fn normalize_probabilities(probs: &mut ProbabilityMatrix) {
    for row in probs.iter_mut() {
        normalize_row(row);
    }
}

/// [`normalize_probabilities`] for the outcomes of a single initial flavor.
pub fn normalize_row(row: &mut [f64; 3]) {
    for p in row.iter_mut() {
        *p = p.clamp(0.0, 1.0);
    }
    let sum: f64 = row.iter().sum();
    if sum > 0.0 && (sum - 1.0).abs() > 1e-10 {
        for p in row.iter_mut() {
            *p /= sum;
        }
    }
}
