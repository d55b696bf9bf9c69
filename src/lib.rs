//! # nusolar
//!
//! Solar neutrino oscillation probabilities: three-flavor MSW Hamiltonians in
//! the solar interior, adiabatic propagation to the surface, and averages over
//! the production region.
//!
//! Built in the NuFast style: closed-form eigenvalues and the "Rosetta"
//! eigenvector-eigenvalue identity instead of numerical diagonalisation.
//!
//! ## Features
//!
//! - **Matter Hamiltonian**: flavor-basis
//!   `M² = U diag(0, Δm²₂₁, Δm²₃₁) U† + diag(A, 0, 0)` built from any
//!   [`SolarModelProvider`]
//! - **Survival probabilities**: adiabatic, phase-averaged `P(ν_e → ν_β)` for a
//!   neutrino produced at any radius
//! - **Radial averages**: production-flux weighted `⟨P_ee⟩(E)` through an
//!   adaptive Gauss-Kronrod quadrature
//! - **Vacuum**: closed-form coherent and averaged three-flavor probabilities
//! - **Constant-density evolution**: exact `exp(-iHL)` for flavor states
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use nusolar::{AnalyticSolarModel, SolarProbabilityEngine};
//!
//! let mut engine = SolarProbabilityEngine::new();
//! engine.set_solar_model(Arc::new(AnalyticSolarModel::boron8()));
//!
//! // 10 MeV ⁸B neutrino produced near the centre: MSW suppressed
//! let pee = engine.solar_oscillation_probability(0.010, 0.05).unwrap();
//! assert!(pee > 0.25 && pee < 0.35);
//!
//! // Averaged over where ⁸B neutrinos are actually made
//! let avg = engine.radial_integrated_fluxes(0.010).unwrap();
//! assert!((0.0..=1.0).contains(&avg));
//! ```
//!
//! ## Units
//!
//! | Quantity | Unit |
//! |----------|------|
//! | Energy   | GeV  |
//! | Mass splitting, potential | eV² |
//! | Baseline | km   |
//! | Density  | g/cm³ |
//! | Radius   | fraction of R☉ |

// Allow physics naming conventions (standard in neutrino oscillation literature)
#![allow(non_snake_case)]

pub mod config;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod hamiltonian;
pub mod quadrature;
pub mod solar_model;
pub mod vacuum;

pub use config::{CanonicalRadius, ConvergencePolicy, EngineConfig, QuadratureOptions};
pub use engine::SolarProbabilityEngine;
pub use error::{Result, SolarError};
pub use evolution::{
    adiabatic_probabilities, adiabatic_probability, propagator, Flavor, FlavorState,
};
pub use hamiltonian::Hamiltonian;
pub use quadrature::{integrate, integrate_with, try_integrate, Quadrature};
pub use solar_model::{
    AnalyticSolarModel, FluxSource, SolarModelProvider, Table, TabulatedSolarModel,
};
pub use vacuum::{
    normalize_probabilities, normalize_row, probability_vacuum, probability_vacuum_averaged,
    Matrix3, MixingParameters, ProbabilityMatrix,
};

/// Conversion factor: eV² × km → GeV (divided by 4)
///
/// This combines ħc and unit conversions for the oscillation phase:
/// Δ = Δm² × L / (4E) in natural units
pub const EV_SQ_KM_TO_GEV_OVER4: f64 = 1e-9 / 1.97327e-7 * 1e3 / 4.0;

/// Matter potential conversion factor: Y_e × ρ × E → A
///
/// A = 2√2 G_F N_e E where N_e = Y_e × ρ × N_A / m_nucleon
/// This constant is approximately 1.52 × 10⁻⁴ eV² / (g/cm³ × GeV)
pub const YE_RHO_E_TO_A: f64 = 1.52e-4;
