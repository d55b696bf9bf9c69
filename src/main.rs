//! nusolar CLI - solar survival probabilities at a glance
//!
//! Run with: `cargo run --release` (set `RUST_LOG=debug` for engine logs)

use std::sync::Arc;

use nusolar::{AnalyticSolarModel, EngineConfig, SolarProbabilityEngine, SolarError};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), SolarError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("nusolar - Solar Neutrino Survival Probabilities");
    println!("===============================================\n");

    let config = EngineConfig::default();
    println!("Mixing (NuFit 5.2, Normal Ordering):");
    println!("  sin²θ₁₂ = {}", config.mixing.s12sq);
    println!("  sin²θ₁₃ = {}", config.mixing.s13sq);
    println!("  Δm²₂₁   = {} eV²", config.mixing.Dmsq21);
    println!();

    let models = [("pp", AnalyticSolarModel::pp()), ("8B", AnalyticSolarModel::boron8())];
    for (label, model) in models {
        let mut engine = SolarProbabilityEngine::with_config(config);
        engine.set_solar_model(Arc::new(model));

        println!("{label} neutrinos (endpoint {:.3} MeV):", model.endpoint * 1e3);
        println!("  E [MeV]   P_ee(r̄)   <P_ee>    P_ee²(r̄)   r̄");
        for fraction in [0.1, 0.3, 0.5, 0.7, 0.9] {
            let energy = fraction * model.endpoint;
            let centroid = engine.flux_centroid(energy)?;
            println!(
                "  {:>7.3}  {:>8.5}  {:>8.5}  {:>9.5}  {:>6.4}",
                energy * 1e3,
                engine.solar_oscillation_probability(energy, centroid)?,
                engine.radial_integrated_fluxes(energy)?,
                engine.pee_square(energy)?,
                centroid
            );
        }
        println!();
    }

    let vacuum = nusolar::probability_vacuum_averaged(&config.mixing);
    println!("Averaged vacuum P_ee: {:.5}", vacuum[0][0]);
    Ok(())
}
