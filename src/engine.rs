//! Solar oscillation probabilities.
//!
//! [`SolarProbabilityEngine`] glues a [`SolarModelProvider`], the matter
//! Hamiltonian and the adiabatic projection into two observables:
//!
//! - the survival probability of a ν_e produced at a given radius, and
//! - its production-weighted average over the solar core,
//!
//! ```text
//! p(E) = ∫ P(E, r) Φ(E, r) dr / ∫ Φ(E, r) dr
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::config::{CanonicalRadius, EngineConfig};
use crate::error::{Result, SolarError};
use crate::evolution::{adiabatic_probabilities, Flavor};
use crate::hamiltonian::Hamiltonian;
use crate::quadrature::try_integrate;
use crate::solar_model::SolarModelProvider;
use crate::vacuum::normalize_row;

/// Probability engine bound to at most one solar model.
#[derive(Debug, Clone, Default)]
pub struct SolarProbabilityEngine {
    config: EngineConfig,
    solar_model: Option<Arc<dyn SolarModelProvider>>,
}

impl SolarProbabilityEngine {
    /// Engine with the default configuration and no model.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            solar_model: None,
        }
    }

    /// Engine for `flavors` active neutrino flavors.
    ///
    /// Only the three Standard Model flavors are modelled; any other count
    /// fails with [`SolarError::UnsupportedFlavorCount`].
    pub fn with_flavors(flavors: usize, config: EngineConfig) -> Result<Self> {
        if flavors != Flavor::ALL.len() {
            return Err(SolarError::UnsupportedFlavorCount(flavors));
        }
        Ok(Self::with_config(config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bind `model`, replacing any previous one.
    pub fn set_solar_model(&mut self, model: Arc<dyn SolarModelProvider>) {
        debug!(rebinding = self.solar_model.is_some(), ?model, "solar model bound");
        self.solar_model = Some(model);
    }

    /// The bound model, or [`SolarError::NoSolarModel`].
    pub fn solar_model(&self) -> Result<&Arc<dyn SolarModelProvider>> {
        self.solar_model.as_ref().ok_or(SolarError::NoSolarModel)
    }

    /// Effective Hamiltonian at energy `E` (GeV) and normalized radius `r`.
    pub fn hamiltonian(&self, E: f64, r: f64) -> Result<Hamiltonian> {
        let rho_ye = self.solar_model()?.electron_density(r)?;
        Hamiltonian::in_matter(&self.config.mixing, E, rho_ye)
    }

    /// Hamiltonian where propagation becomes vacuum-like: the configured
    /// vacuum radius, or else the outer edge of the model.
    fn exit_hamiltonian(&self, model: &dyn SolarModelProvider, E: f64) -> Result<Hamiltonian> {
        self.config.mixing.check_adiabatic()?;
        let r = self.config.vacuum_radius.unwrap_or_else(|| model.radius_domain().1);
        Hamiltonian::in_matter(&self.config.mixing, E, model.electron_density(r)?)
    }

    fn probabilities_from(&self, E: f64, r: f64, exit: &Hamiltonian) -> Result<[f64; 3]> {
        let production = self.hamiltonian(E, r)?;
        let newton = self.config.newton_iterations;
        let mut probs = adiabatic_probabilities(&production, exit, Flavor::Electron, newton);
        normalize_row(&mut probs);
        Ok(probs)
    }

    /// P(ν_e → ν_β) for every β, for a ν_e produced at `r` with energy `E`.
    pub fn transition_probabilities(&self, E: f64, r: f64) -> Result<[f64; 3]> {
        let exit = self.exit_hamiltonian(self.solar_model()?.as_ref(), E)?;
        self.probabilities_from(E, r, &exit)
    }

    /// P(ν_e → `flavor`) for a ν_e produced at `r` with energy `E`.
    pub fn transition_probability(&self, E: f64, r: f64, flavor: Flavor) -> Result<f64> {
        Ok(self.transition_probabilities(E, r)?[flavor.index()])
    }

    /// Electron survival probability at Earth for a ν_e produced at radius `r`.
    ///
    /// The produced state follows the matter eigenstates adiabatically out to
    /// the vacuum radius; interference is lost on the way to the detector.
    pub fn solar_oscillation_probability(&self, E: f64, r: f64) -> Result<f64> {
        self.transition_probability(E, r, Flavor::Electron)
    }

    /// Square of the survival probability at the canonical radius.
    pub fn pee_square(&self, E: f64) -> Result<f64> {
        let r = match self.config.canonical_radius {
            CanonicalRadius::FluxCentroid => self.flux_centroid(E)?,
            CanonicalRadius::Fixed(r) => r,
        };
        let pee = self.solar_oscillation_probability(E, r)?;
        Ok(pee * pee)
    }

    /// Production-weighted mean radius `∫ r Φ dr / ∫ Φ dr` at energy `E`.
    pub fn flux_centroid(&self, E: f64) -> Result<f64> {
        let model = self.solar_model()?;
        let norm = self.production_norm(model.as_ref(), E)?;
        let moment =
            self.radial_integral(model.as_ref(), |r| Ok(r * model.production_flux(E, r)?))?;
        Ok(moment / norm)
    }

    /// Production-weighted survival probability at energy `E`.
    pub fn radial_integrated_fluxes(&self, E: f64) -> Result<f64> {
        let model = self.solar_model()?;
        let norm = self.production_norm(model.as_ref(), E)?;
        let exit = self.exit_hamiltonian(model.as_ref(), E)?;

        let weighted = self.radial_integral(model.as_ref(), |r| {
            let phi = model.production_flux(E, r)?;
            if phi == 0.0 {
                return Ok(0.0);
            }
            Ok(self.probabilities_from(E, r, &exit)?[Flavor::Electron.index()] * phi)
        })?;

        let p = (weighted / norm).clamp(0.0, 1.0);
        debug!(energy = E, probability = p, "radially integrated survival probability");
        Ok(p)
    }

    /// ∫ Φ(E, r) dr; fails when nothing is produced at `E`.
    fn production_norm(&self, model: &dyn SolarModelProvider, E: f64) -> Result<f64> {
        let norm = self.radial_integral(model, |r| model.production_flux(E, r))?;
        if norm > 0.0 {
            Ok(norm)
        } else {
            Err(SolarError::EnergyOutOfDomain { energy: E })
        }
    }

    fn radial_integral<F>(&self, model: &dyn SolarModelProvider, f: F) -> Result<f64>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        let (r0, r1) = model.radius_domain();
        let options = &self.config.quadrature;
        try_integrate(f, r0, r1, options)?.value_under(options.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConvergencePolicy, QuadratureOptions};
    use crate::solar_model::{AnalyticSolarModel, TabulatedSolarModel};
    use crate::vacuum::{probability_vacuum_averaged, MixingParameters};
    use approx::assert_abs_diff_eq;

    fn engine_with(model: AnalyticSolarModel) -> SolarProbabilityEngine {
        let mut engine = SolarProbabilityEngine::new();
        engine.set_solar_model(Arc::new(model));
        engine
    }

    /// Independent fine trapezoid for ∫ P Φ dr / ∫ Φ dr.
    fn trapezoid_average(engine: &SolarProbabilityEngine, E: f64, n: usize) -> f64 {
        let model = engine.solar_model().unwrap();
        let (mut num, mut den) = (0.0, 0.0);
        for i in 0..=n {
            let r = i as f64 / n as f64;
            let w = if i == 0 || i == n { 0.5 } else { 1.0 };
            let phi = model.production_flux(E, r).unwrap();
            den += w * phi;
            if phi > 0.0 {
                num += w * phi * engine.solar_oscillation_probability(E, r).unwrap();
            }
        }
        num / den
    }

    #[test]
    fn test_unbound_engine_fails_fast() {
        let engine = SolarProbabilityEngine::new();
        assert!(matches!(engine.solar_model(), Err(SolarError::NoSolarModel)));
        assert_eq!(engine.hamiltonian(0.01, 0.1).unwrap_err(), SolarError::NoSolarModel);
        assert_eq!(
            engine.solar_oscillation_probability(0.01, 0.1).unwrap_err(),
            SolarError::NoSolarModel
        );
        assert_eq!(engine.pee_square(0.01).unwrap_err(), SolarError::NoSolarModel);
        for result in [engine.radial_integrated_fluxes(0.01), engine.flux_centroid(0.01)] {
            assert_eq!(result.unwrap_err(), SolarError::NoSolarModel);
        }
    }

    #[test]
    fn test_get_returns_bound_model() {
        let model: Arc<dyn SolarModelProvider> = Arc::new(AnalyticSolarModel::boron8());
        let mut engine = SolarProbabilityEngine::new();
        engine.set_solar_model(Arc::clone(&model));
        assert!(Arc::ptr_eq(engine.solar_model().unwrap(), &model));
    }

    #[test]
    fn test_probability_bounds() {
        let engine = engine_with(AnalyticSolarModel::boron8());
        for E in [0.001, 0.005, 0.01, 0.015] {
            for r in [0.0, 0.02, 0.05, 0.1, 0.3, 0.9, 1.0] {
                let p = engine.solar_oscillation_probability(E, r).unwrap();
                assert!((0.0..=1.0).contains(&p), "P({E}, {r}) = {p}");

                let all = engine.transition_probabilities(E, r).unwrap();
                assert_abs_diff_eq!(all.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
                assert_eq!(all[0], p);
            }
        }
    }

    #[test]
    fn test_msw_suppression_at_high_energy() {
        let engine = engine_with(AnalyticSolarModel::boron8());
        let p = engine.solar_oscillation_probability(0.010, 0.05).unwrap();
        assert!((0.25..0.35).contains(&p), "⁸B P_ee at 10 MeV = {p}");
    }

    #[test]
    fn test_vacuum_dominated_at_low_energy() {
        let engine = engine_with(AnalyticSolarModel::pp());
        let p = engine.solar_oscillation_probability(0.0003, 0.1).unwrap();
        assert!((0.5..0.6).contains(&p), "pp P_ee at 0.3 MeV = {p}");
    }

    #[test]
    fn test_zero_matter_limit_is_vacuum() {
        for mixing in [MixingParameters::nufit52_no(), MixingParameters::nufit52_io()] {
            let mut engine = SolarProbabilityEngine::with_config(EngineConfig {
                mixing,
                ..EngineConfig::default()
            });
            engine.set_solar_model(Arc::new(AnalyticSolarModel::boron8().without_matter()));

            let vacuum = probability_vacuum_averaged(&mixing);
            for r in [0.0, 0.05, 0.5] {
                let probs = engine.transition_probabilities(0.01, r).unwrap();
                for b in 0..3 {
                    assert_abs_diff_eq!(probs[b], vacuum[0][b], epsilon = 1e-8);
                }
            }
            assert_abs_diff_eq!(
                engine.radial_integrated_fluxes(0.01).unwrap(),
                vacuum[0][0],
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn test_rebinding_replaces_model() {
        let mut engine = engine_with(AnalyticSolarModel::boron8());
        let dense = engine.hamiltonian(0.01, 0.05).unwrap();
        let p_dense = engine.solar_oscillation_probability(0.01, 0.05).unwrap();
        assert!(dense.matter_potential() > 0.0);

        engine.set_solar_model(Arc::new(AnalyticSolarModel::boron8().without_matter()));
        let empty = engine.hamiltonian(0.01, 0.05).unwrap();
        let p_empty = engine.solar_oscillation_probability(0.01, 0.05).unwrap();

        assert_eq!(empty.matter_potential(), 0.0);
        assert_eq!(
            empty,
            Hamiltonian::vacuum(&MixingParameters::nufit52_no(), 0.01).unwrap()
        );
        let vacuum = probability_vacuum_averaged(&MixingParameters::nufit52_no())[0][0];
        assert_abs_diff_eq!(p_empty, vacuum, epsilon = 1e-8);
        assert!((p_dense - p_empty).abs() > 0.1);
    }

    #[test]
    fn test_radial_average_matches_trapezoid() {
        let engine = engine_with(AnalyticSolarModel::boron8());
        for E in [0.002, 0.006, 0.012] {
            let p = engine.radial_integrated_fluxes(E).unwrap();
            let reference = trapezoid_average(&engine, E, 4000);
            assert!((0.0..=1.0).contains(&p));
            assert!(
                (p - reference).abs() <= 2e-2 * reference,
                "E = {E}: quadrature {p}, trapezoid {reference}"
            );
        }
    }

    #[test]
    fn test_radial_average_lies_between_extremes() {
        let engine = engine_with(AnalyticSolarModel::boron8());
        let E = 0.01;
        let p = engine.radial_integrated_fluxes(E).unwrap();
        assert!((0.25..0.4).contains(&p), "⁸B <P_ee> at 10 MeV = {p}");

        // Denser production sites are more suppressed; the average sits above the centre value
        let centre = engine.solar_oscillation_probability(E, 0.0).unwrap();
        let edge = engine.solar_oscillation_probability(E, 0.3).unwrap();
        assert!(centre <= p && p <= edge, "{centre} <= {p} <= {edge}");
    }

    #[test]
    fn test_flux_centroid_and_pee_square() {
        let engine = engine_with(AnalyticSolarModel::boron8());
        let E = 0.01;

        // For r² exp(-(r/r_p)²): <r> = 2 r_p / √π
        let centroid = engine.flux_centroid(E).unwrap();
        let expected = 2.0 * 0.045 / std::f64::consts::PI.sqrt();
        assert!((centroid - expected).abs() < 1e-2 * expected, "centroid {centroid}");

        let pee = engine.solar_oscillation_probability(E, centroid).unwrap();
        assert_abs_diff_eq!(engine.pee_square(E).unwrap(), pee * pee, epsilon = 1e-12);

        let mut fixed = SolarProbabilityEngine::with_config(EngineConfig {
            canonical_radius: CanonicalRadius::Fixed(0.2),
            ..EngineConfig::default()
        });
        fixed.set_solar_model(Arc::new(AnalyticSolarModel::boron8()));
        let at = fixed.solar_oscillation_probability(E, 0.2).unwrap();
        assert_abs_diff_eq!(fixed.pee_square(E).unwrap(), at * at, epsilon = 1e-15);
    }

    #[test]
    fn test_collaborator_errors_pass_through() {
        let engine = engine_with(AnalyticSolarModel::boron8());
        assert_eq!(
            engine.solar_oscillation_probability(0.01, 1.5).unwrap_err(),
            SolarError::RadiusOutOfDomain {
                radius: 1.5,
                min: 0.0,
                max: 1.0
            }
        );
        assert!(matches!(
            engine.solar_oscillation_probability(-0.01, 0.1),
            Err(SolarError::EnergyOutOfDomain { .. })
        ));
        // Beyond the ⁸B endpoint the model has nothing to integrate
        assert!(matches!(
            engine.radial_integrated_fluxes(0.02),
            Err(SolarError::EnergyOutOfDomain { .. })
        ));
    }

    #[test]
    fn test_strict_policy_surfaces_non_convergence() {
        let mut engine = SolarProbabilityEngine::with_config(EngineConfig {
            quadrature: QuadratureOptions {
                rel_tol: 1e-15,
                limit: 2,
                policy: ConvergencePolicy::Strict,
                ..QuadratureOptions::default()
            },
            ..EngineConfig::default()
        });
        engine.set_solar_model(Arc::new(AnalyticSolarModel::boron8()));
        assert!(matches!(
            engine.radial_integrated_fluxes(0.01),
            Err(SolarError::NotConverged { .. })
        ));

        let mut relaxed = engine.clone();
        relaxed.config.quadrature.policy = ConvergencePolicy::BestEffort;
        let p = relaxed.radial_integrated_fluxes(0.01).unwrap();
        assert!(p.is_finite());
    }

    #[test]
    fn test_tabulated_profile_agrees_with_analytic() {
        let analytic = AnalyticSolarModel::boron8();
        let mut tabulated = SolarProbabilityEngine::new();
        let sampled = TabulatedSolarModel::sample(&analytic, 1001).unwrap();
        tabulated.set_solar_model(Arc::new(sampled));
        let reference = engine_with(analytic);

        for r in [0.01, 0.05, 0.2] {
            assert_abs_diff_eq!(
                tabulated.solar_oscillation_probability(0.009, r).unwrap(),
                reference.solar_oscillation_probability(0.009, r).unwrap(),
                epsilon = 1e-4
            );
        }
    }

    #[test]
    fn test_exit_radius_follows_short_table() {
        let analytic = AnalyticSolarModel::boron8();
        let radius: Vec<f64> = (0..=95).map(|i| i as f64 / 100.0).collect();
        let density = radius.iter().map(|&r| analytic.density(r).unwrap()).collect();
        let fraction = radius.iter().map(|&r| analytic.electron_fraction(r).unwrap()).collect();
        let table: Arc<dyn SolarModelProvider> =
            Arc::new(TabulatedSolarModel::new(radius, density, fraction).unwrap());

        let mut engine = SolarProbabilityEngine::new();
        engine.set_solar_model(Arc::clone(&table));
        let p = engine.solar_oscillation_probability(0.01, 0.1).unwrap();
        assert!((0.25..0.4).contains(&p), "P_ee = {p}");

        let mut pinned = SolarProbabilityEngine::with_config(EngineConfig {
            vacuum_radius: Some(0.95),
            ..EngineConfig::default()
        });
        pinned.set_solar_model(Arc::clone(&table));
        assert_eq!(pinned.solar_oscillation_probability(0.01, 0.1).unwrap(), p);

        let mut beyond = SolarProbabilityEngine::with_config(EngineConfig {
            vacuum_radius: Some(1.0),
            ..EngineConfig::default()
        });
        beyond.set_solar_model(table);
        assert_eq!(
            beyond.solar_oscillation_probability(0.01, 0.1).unwrap_err(),
            SolarError::RadiusOutOfDomain {
                radius: 1.0,
                min: 0.0,
                max: 0.95
            }
        );
    }

    #[test]
    fn test_decoupled_electron_is_rejected() {
        let mut engine = SolarProbabilityEngine::with_config(EngineConfig {
            mixing: MixingParameters {
                s12sq: 0.0,
                s13sq: 0.0,
                ..MixingParameters::nufit52_no()
            },
            ..EngineConfig::default()
        });
        engine.set_solar_model(Arc::new(AnalyticSolarModel::boron8()));

        let degenerate = SolarError::DegenerateMixing {
            parameter: "s12sq",
            value: 0.0,
        };
        assert_eq!(engine.solar_oscillation_probability(0.01, 0.1).unwrap_err(), degenerate);
        assert_eq!(engine.radial_integrated_fluxes(0.01).unwrap_err(), degenerate);
        // The Hamiltonian itself is well defined
        assert!(engine.hamiltonian(0.01, 0.1).is_ok());
    }

    #[test]
    fn test_weak_mixing_below_resonance_survives() {
        // A ≈ 4e-6 eV² stays below Δm²₂₁: ν_e remains the lowest level throughout
        let mut engine = SolarProbabilityEngine::with_config(EngineConfig {
            mixing: MixingParameters {
                s12sq: 1e-6,
                s13sq: 1e-6,
                ..MixingParameters::nufit52_no()
            },
            ..EngineConfig::default()
        });
        engine.set_solar_model(Arc::new(AnalyticSolarModel::pp()));
        let p = engine.solar_oscillation_probability(0.0003, 0.1).unwrap();
        assert!(p > 0.999, "P_ee = {p}");
    }

    #[test]
    fn test_only_three_flavors_supported() {
        assert!(SolarProbabilityEngine::with_flavors(3, EngineConfig::default()).is_ok());
        for flavors in [1, 2, 4] {
            assert_eq!(
                SolarProbabilityEngine::with_flavors(flavors, EngineConfig::default()).unwrap_err(),
                SolarError::UnsupportedFlavorCount(flavors)
            );
        }
    }

    #[test]
    fn test_engine_is_shareable_across_threads() {
        let engine = Arc::new(engine_with(AnalyticSolarModel::boron8()));
        let handles: Vec<_> = [0.004, 0.008, 0.012]
            .into_iter()
            .map(|E| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.radial_integrated_fluxes(E))
            })
            .collect();
        for (handle, E) in handles.into_iter().zip([0.004, 0.008, 0.012]) {
            let threaded = handle.join().unwrap().unwrap();
            assert_eq!(threaded, engine.radial_integrated_fluxes(E).unwrap());
        }
    }
}
