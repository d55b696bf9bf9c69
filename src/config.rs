//! Engine configuration.
//!
//! Plain serde data with defaults for every field, so a partial document
//! (JSON, TOML, ...) only needs to name what it overrides.

use serde::{Deserialize, Serialize};

use crate::vacuum::MixingParameters;

/// What to do when an integral misses its tolerance within the subdivision budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergencePolicy {
    /// Return the best estimate and log a warning.
    #[default]
    BestEffort,
    /// Fail with [`crate::SolarError::NotConverged`].
    Strict,
}

/// Tolerances and budget of the adaptive quadrature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadratureOptions {
    /// Absolute error target; 0 disables it.
    pub abs_tol: f64,
    /// Relative error target.
    pub rel_tol: f64,
    /// Maximum number of subintervals.
    pub limit: usize,
    pub policy: ConvergencePolicy,
}

impl Default for QuadratureOptions {
    fn default() -> Self {
        Self {
            abs_tol: 0.0,
            rel_tol: 1e-2,
            limit: 10_000,
            policy: ConvergencePolicy::BestEffort,
        }
    }
}

impl QuadratureOptions {
    /// Error target for an integral estimate `value`.
    pub fn tolerance(&self, value: f64) -> f64 {
        self.abs_tol.max(self.rel_tol * value.abs())
    }
}

/// Radius at which [`crate::SolarProbabilityEngine::pee_square`] evaluates
/// the survival probability.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalRadius {
    /// Production-flux weighted mean radius at the requested energy.
    #[default]
    FluxCentroid,
    /// Fixed normalized radius.
    Fixed(f64),
}

/// Configuration of a [`crate::SolarProbabilityEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mixing: MixingParameters,
    pub quadrature: QuadratureOptions,
    /// Normalized radius beyond which propagation is treated as vacuum;
    /// `None` uses the outer edge of the bound model's radius domain.
    pub vacuum_radius: Option<f64>,
    pub canonical_radius: CanonicalRadius,
    /// Newton steps polishing the matter eigenvalues.
    pub newton_iterations: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mixing: MixingParameters::nufit52_no(),
            quadrature: QuadratureOptions::default(),
            vacuum_radius: None,
            canonical_radius: CanonicalRadius::FluxCentroid,
            newton_iterations: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.quadrature.abs_tol, 0.0);
        assert_eq!(config.quadrature.rel_tol, 1e-2);
        assert_eq!(config.quadrature.limit, 10_000);
        assert_eq!(config.quadrature.policy, ConvergencePolicy::BestEffort);
        assert_eq!(config.vacuum_radius, None);
        assert_eq!(config.mixing, MixingParameters::nufit52_no());
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{
            "quadrature": { "rel_tol": 1e-4, "policy": "strict" },
            "canonical_radius": { "fixed": 0.1 },
            "newton_iterations": 3
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.quadrature.rel_tol, 1e-4);
        assert_eq!(config.quadrature.limit, 10_000);
        assert_eq!(config.quadrature.policy, ConvergencePolicy::Strict);
        assert_eq!(config.canonical_radius, CanonicalRadius::Fixed(0.1));
        assert_eq!(config.newton_iterations, 3);
        assert_eq!(config.vacuum_radius, None);

        let pinned: EngineConfig = serde_json::from_str(r#"{ "vacuum_radius": 0.9 }"#).unwrap();
        assert_eq!(pinned.vacuum_radius, Some(0.9));
    }

    #[test]
    fn test_mixing_from_json() {
        let json = r#"{
            "mixing": {
                "s12sq": 0.307, "s13sq": 0.02219, "s23sq": 0.539,
                "delta": 4.899, "Dmsq21": 7.42e-5, "Dmsq31": -2.498e-3
            }
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(config.mixing.Dmsq31 < 0.0);
        assert_eq!(config.canonical_radius, CanonicalRadius::FluxCentroid);
    }

    #[test]
    fn test_tolerance_uses_larger_target() {
        let options = QuadratureOptions {
            abs_tol: 1e-3,
            ..QuadratureOptions::default()
        };
        assert_eq!(options.tolerance(0.01), 1e-3);
        assert_eq!(options.tolerance(10.0), 0.1);
    }
}
