//! Error type shared by the solar models, the evolution engine and the
//! probability engine.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SolarError>;

/// Failure modes of a solar probability computation.
///
/// The probability engine itself raises [`SolarError::NoSolarModel`] and the
/// configuration checks ([`SolarError::UnsupportedFlavorCount`],
/// [`SolarError::DegenerateMixing`]); every other variant originates in a
/// collaborator (solar model, evolution engine, quadrature policy) and is
/// passed through unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolarError {
    /// A probability was requested before a solar model was bound.
    #[error("No solar model set.")]
    NoSolarModel,

    /// Radius outside the domain covered by the solar model.
    #[error("radius {radius} outside solar model domain [{min}, {max}]")]
    RadiusOutOfDomain { radius: f64, min: f64, max: f64 },

    /// Energy (GeV) not finite, not positive, or outside the production spectrum.
    #[error("energy {energy} GeV outside supported range")]
    EnergyOutOfDomain { energy: f64 },

    /// Malformed tabulated profile.
    #[error("invalid solar model table: {0}")]
    InvalidTable(String),

    /// Only three active flavors are modelled.
    #[error("{0} neutrino flavors requested, only 3 are supported")]
    UnsupportedFlavorCount(usize),

    /// A mixing angle that decouples ν_e, letting matter levels cross.
    #[error("{parameter} = {value} must lie strictly inside (0, 1) for adiabatic propagation")]
    DegenerateMixing { parameter: &'static str, value: f64 },

    /// Quadrature missed its tolerance under [`crate::ConvergencePolicy::Strict`].
    #[error(
        "quadrature did not converge after {subintervals} subintervals \
         (estimate {estimate:.6e}, error {abs_error:.2e})"
    )]
    NotConverged {
        estimate: f64,
        abs_error: f64,
        subintervals: usize,
    },
}
