//! Solar structure inputs: matter profile and neutrino production.
//!
//! The engine only sees the [`SolarModelProvider`] trait. Two providers ship
//! with the crate: [`AnalyticSolarModel`], an exponential electron-density
//! profile good to a few percent inside the core, and [`TabulatedSolarModel`],
//! which interpolates tables taken from a standard solar model.
//!
//! Radii are fractions of the solar radius, energies are in GeV, densities in
//! g/cm³. Production densities are per unit energy and per unit normalized
//! radius; only their shape in `r` matters for radial averages.

use core::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolarError};

/// Local matter and production data of a star, queried by radius.
///
/// Implementations are read-only and shared between engines and threads.
/// Every query signals its own domain violations.
pub trait SolarModelProvider: Send + Sync + fmt::Debug {
    /// Normalized radius interval covered by the model.
    fn radius_domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    /// Mass density ρ(r) in g/cm³.
    fn density(&self, r: f64) -> Result<f64>;

    /// Electron fraction Y_e(r), electrons per nucleon.
    fn electron_fraction(&self, r: f64) -> Result<f64>;

    /// ρ·Y_e in g/cm³, i.e. the electron number density in units of N_A/cm³.
    fn electron_density(&self, r: f64) -> Result<f64> {
        Ok(self.density(r)? * self.electron_fraction(r)?)
    }

    /// Differential production flux dΦ/dE dr at energy `energy` and radius `r`.
    fn production_flux(&self, energy: f64, r: f64) -> Result<f64>;
}

/// Hydrogen profile scale (fraction of the solar radius) of [`AnalyticSolarModel`].
const HYDROGEN_CORE_RADIUS: f64 = 0.12;

/// Exponential solar profile with a single production source.
///
/// - `n_e(r) / N_A = n₀ exp(-r / r_s)` (Bahcall's fit, `n₀ = 245`, `r_s = 1/10.54`)
/// - hydrogen fraction `X(r) = X_s - (X_s - X_c) exp(-(r/0.12)²)`, `Y_e = (1 + X) / 2`
/// - production `Φ(E, r) = Φ₀ · S(E) · R(r)` with the beta-like spectrum
///   `S(E) ∝ E²(Q - E)²` and the radial profile `R(r) ∝ r² exp(-(r/r_p)²)`,
///   both normalized to unit area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyticSolarModel {
    /// Central electron density n₀ in N_A/cm³
    pub core_electron_density: f64,
    /// Exponential scale height r_s, fraction of the solar radius
    pub scale_height: f64,
    /// Central hydrogen mass fraction X_c
    pub core_hydrogen: f64,
    /// Surface hydrogen mass fraction X_s
    pub surface_hydrogen: f64,
    /// Total flux Φ₀ at Earth in cm⁻² s⁻¹
    pub total_flux: f64,
    /// Spectrum endpoint Q in GeV
    pub endpoint: f64,
    /// Radius of peak production r_p
    pub production_radius: f64,
}

impl AnalyticSolarModel {
    /// ⁸B neutrinos: endpoint 16.36 MeV, produced around 0.045 R☉.
    pub fn boron8() -> Self {
        Self {
            core_electron_density: 245.0,
            scale_height: 1.0 / 10.54,
            core_hydrogen: 0.34,
            surface_hydrogen: 0.73,
            total_flux: 5.46e6,
            endpoint: 16.36e-3,
            production_radius: 0.045,
        }
    }

    /// pp neutrinos: endpoint 0.420 MeV, produced around 0.1 R☉.
    pub fn pp() -> Self {
        Self {
            total_flux: 5.98e10,
            endpoint: 0.420e-3,
            production_radius: 0.10,
            ..Self::boron8()
        }
    }

    /// Same production, no matter: the vacuum limit.
    pub fn without_matter(self) -> Self {
        Self {
            core_electron_density: 0.0,
            ..self
        }
    }

    fn check_radius(&self, r: f64) -> Result<()> {
        if (0.0..=1.0).contains(&r) {
            Ok(())
        } else {
            Err(SolarError::RadiusOutOfDomain {
                radius: r,
                min: 0.0,
                max: 1.0,
            })
        }
    }

    fn hydrogen_fraction(&self, r: f64) -> f64 {
        let core = (-(r / HYDROGEN_CORE_RADIUS).powi(2)).exp();
        self.surface_hydrogen - (self.surface_hydrogen - self.core_hydrogen) * core
    }

    fn spectrum(&self, energy: f64) -> f64 {
        let q = self.endpoint;
        30.0 * energy * energy * (q - energy).powi(2) / q.powi(5)
    }

    fn radial_profile(&self, r: f64) -> f64 {
        let rp = self.production_radius;
        // ∫₀^∞ r² exp(-(r/r_p)²) dr = √π r_p³ / 4
        4.0 / (PI.sqrt() * rp.powi(3)) * r * r * (-(r / rp).powi(2)).exp()
    }
}

impl SolarModelProvider for AnalyticSolarModel {
    fn density(&self, r: f64) -> Result<f64> {
        Ok(self.electron_density(r)? / self.electron_fraction(r)?)
    }

    fn electron_fraction(&self, r: f64) -> Result<f64> {
        self.check_radius(r)?;
        Ok(0.5 * (1.0 + self.hydrogen_fraction(r)))
    }

    fn electron_density(&self, r: f64) -> Result<f64> {
        self.check_radius(r)?;
        Ok(self.core_electron_density * (-r / self.scale_height).exp())
    }

    fn production_flux(&self, energy: f64, r: f64) -> Result<f64> {
        self.check_radius(r)?;
        if !(energy > 0.0 && energy < self.endpoint) {
            return Err(SolarError::EnergyOutOfDomain { energy });
        }
        Ok(self.total_flux * self.spectrum(energy) * self.radial_profile(r))
    }
}

/// Strictly increasing grid with values, linearly interpolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableColumns", into = "TableColumns")]
pub struct Table {
    x: Vec<f64>,
    y: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct TableColumns {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TryFrom<TableColumns> for Table {
    type Error = SolarError;

    fn try_from(columns: TableColumns) -> Result<Self> {
        Table::new(columns.x, columns.y)
    }
}

impl From<Table> for TableColumns {
    fn from(table: Table) -> Self {
        Self {
            x: table.x,
            y: table.y,
        }
    }
}

impl Table {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(SolarError::InvalidTable(format!(
                "grid has {} points but {} values",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(SolarError::InvalidTable("at least two points required".into()));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(SolarError::InvalidTable("non-finite entry".into()));
        }
        if let Some(w) = x.windows(2).find(|w| w[1] <= w[0]) {
            return Err(SolarError::InvalidTable(format!(
                "grid not strictly increasing at {} -> {}",
                w[0], w[1]
            )));
        }
        Ok(Self { x, y })
    }

    /// `(first, last)` grid point.
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn values(&self) -> &[f64] {
        &self.y
    }

    /// Linear interpolation; `None` outside the grid.
    pub fn interpolate(&self, at: f64) -> Option<f64> {
        let (lo, hi) = self.domain();
        if !(lo..=hi).contains(&at) {
            return None;
        }
        let upper = self.x.partition_point(|&x| x <= at);
        if upper == self.x.len() {
            return Some(self.y[upper - 1]);
        }
        let i = upper - 1;
        let t = (at - self.x[i]) / (self.x[i + 1] - self.x[i]);
        Some(self.y[i] + t * (self.y[i + 1] - self.y[i]))
    }
}

/// One neutrino-producing reaction in a [`TabulatedSolarModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxSource {
    /// Reaction label, e.g. `"8B"`.
    pub name: String,
    /// Total flux at Earth in cm⁻² s⁻¹
    pub total: f64,
    /// Normalized spectrum dN/dE over energy (GeV); zero outside the grid
    pub spectrum: Table,
    /// Normalized production fraction dφ/dr over radius; zero outside the grid
    pub radial: Table,
}

impl FluxSource {
    fn flux(&self, energy: f64, r: f64) -> f64 {
        match (self.spectrum.interpolate(energy), self.radial.interpolate(r)) {
            (Some(s), Some(p)) => self.total * s * p,
            _ => 0.0,
        }
    }
}

/// Solar model read from radial tables.
///
/// Deserialization runs the same checks as [`TabulatedSolarModel::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelColumns", into = "ModelColumns")]
pub struct TabulatedSolarModel {
    density: Table,
    electron_fraction: Table,
    sources: Vec<FluxSource>,
}

#[derive(Serialize, Deserialize)]
struct ModelColumns {
    density: Table,
    electron_fraction: Table,
    #[serde(default)]
    sources: Vec<FluxSource>,
}

impl TryFrom<ModelColumns> for TabulatedSolarModel {
    type Error = SolarError;

    fn try_from(columns: ModelColumns) -> Result<Self> {
        let model = Self::from_tables(columns.density, columns.electron_fraction)?;
        Ok(columns.sources.into_iter().fold(model, Self::with_source))
    }
}

impl From<TabulatedSolarModel> for ModelColumns {
    fn from(model: TabulatedSolarModel) -> Self {
        Self {
            density: model.density,
            electron_fraction: model.electron_fraction,
            sources: model.sources,
        }
    }
}

impl TabulatedSolarModel {
    /// Profile on a shared radius grid.
    pub fn new(radius: Vec<f64>, density: Vec<f64>, electron_fraction: Vec<f64>) -> Result<Self> {
        Self::from_tables(
            Table::new(radius.clone(), density)?,
            Table::new(radius, electron_fraction)?,
        )
    }

    /// Profile from already built tables, which must share their radius grid.
    pub fn from_tables(density: Table, electron_fraction: Table) -> Result<Self> {
        if density.x != electron_fraction.x {
            return Err(SolarError::InvalidTable(
                "density and electron fraction use different radius grids".into(),
            ));
        }
        if density.values().iter().any(|&rho| rho < 0.0) {
            return Err(SolarError::InvalidTable("negative density".into()));
        }
        if electron_fraction.values().iter().any(|y| !(0.0..=1.0).contains(y)) {
            return Err(SolarError::InvalidTable("electron fraction outside [0, 1]".into()));
        }
        Ok(Self {
            density,
            electron_fraction,
            sources: Vec::new(),
        })
    }

    /// Sample another provider's matter profile at `points` uniformly spaced
    /// radii spanning its domain. Production sources are not copied.
    pub fn sample(model: &dyn SolarModelProvider, points: usize) -> Result<Self> {
        let (lo, hi) = model.radius_domain();
        let n = points.max(2);
        let radius: Vec<f64> = (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect();
        let density = radius.iter().map(|&r| model.density(r)).collect::<Result<Vec<_>>>()?;
        let electron_fraction = radius
            .iter()
            .map(|&r| model.electron_fraction(r))
            .collect::<Result<Vec<_>>>()?;
        Self::new(radius, density, electron_fraction)
    }

    pub fn with_source(mut self, source: FluxSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(&self) -> &[FluxSource] {
        &self.sources
    }

    fn lookup(&self, table: &Table, r: f64) -> Result<f64> {
        table.interpolate(r).ok_or_else(|| {
            let (min, max) = self.radius_domain();
            SolarError::RadiusOutOfDomain { radius: r, min, max }
        })
    }
}

impl SolarModelProvider for TabulatedSolarModel {
    fn radius_domain(&self) -> (f64, f64) {
        self.density.domain()
    }

    fn density(&self, r: f64) -> Result<f64> {
        self.lookup(&self.density, r)
    }

    fn electron_fraction(&self, r: f64) -> Result<f64> {
        self.lookup(&self.electron_fraction, r)
    }

    fn production_flux(&self, energy: f64, r: f64) -> Result<f64> {
        if !(energy.is_finite() && energy > 0.0) {
            return Err(SolarError::EnergyOutOfDomain { energy });
        }
        let (min, max) = self.radius_domain();
        if !(min..=max).contains(&r) {
            return Err(SolarError::RadiusOutOfDomain { radius: r, min, max });
        }
        Ok(self.sources.iter().map(|s| s.flux(energy, r)).sum())
    }
}
