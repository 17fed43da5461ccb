//! Particle property parameter set and fragment percentage

use crate::error::{FragmentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Particle classification understood by the visualization consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleClass {
    Oil,
    #[default]
    Other,
    Bubble,
    FaecalPellets,
    Copepod,
    DiatomChain,
    OilyGas,
}

impl ParticleClass {
    /// All classes in consumer order
    pub const ALL: [Self; 7] = [
        Self::Oil,
        Self::Other,
        Self::Bubble,
        Self::FaecalPellets,
        Self::Copepod,
        Self::DiatomChain,
        Self::OilyGas,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Oil => "oil",
            Self::Other => "other",
            Self::Bubble => "bubble",
            Self::FaecalPellets => "faecal_pellets",
            Self::Copepod => "copepod",
            Self::DiatomChain => "diatom_chain",
            Self::OilyGas => "oily_gas",
        }
    }
}

impl fmt::Display for ParticleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticleClass {
    type Err = FragmentError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| FragmentError::invalid(format!("unknown particle class '{s}'")))
    }
}

/// Particle size classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    #[default]
    Medium,
    Large,
}

impl SizeClass {
    pub const ALL: [Self; 3] = [Self::Small, Self::Medium, Self::Large];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeClass {
    type Err = FragmentError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| FragmentError::invalid(format!("unknown size class '{s}'")))
    }
}

/// Default particle diameter in millimeters
pub const DEFAULT_DIAMETER_MM: f64 = 0.1;

/// Default particle density in kg/m³ (sea water)
pub const DEFAULT_DENSITY: f64 = 1027.0;

/// Properties applied uniformly to every synthesized value of a run
///
/// Diameter is held in meters; callers supply millimeters through
/// [`ParticleProperties::from_millimeters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleProperties {
    class: ParticleClass,
    size_class: SizeClass,
    diameter_m: f64,
    density: f64,
}

impl ParticleProperties {
    /// Build from a diameter in millimeters
    ///
    /// # Errors
    /// Returns [`FragmentError::InvalidParameter`] when diameter or density is
    /// not a finite positive number.
    pub fn from_millimeters(
        class: ParticleClass,
        size_class: SizeClass,
        diameter_mm: f64,
        density: f64,
    ) -> Result<Self> {
        if !diameter_mm.is_finite() || diameter_mm <= 0.0 {
            return Err(FragmentError::invalid(format!(
                "particle diameter must be positive, got {diameter_mm} mm"
            )));
        }
        if !density.is_finite() || density <= 0.0 {
            return Err(FragmentError::invalid(format!(
                "particle density must be positive, got {density} kg/m3"
            )));
        }
        Ok(Self {
            class,
            size_class,
            diameter_m: diameter_mm / 1000.0,
            density,
        })
    }

    #[inline]
    #[must_use]
    pub fn class(&self) -> ParticleClass {
        self.class
    }

    #[inline]
    #[must_use]
    pub fn size_class(&self) -> SizeClass {
        self.size_class
    }

    /// Diameter in meters
    #[inline]
    #[must_use]
    pub fn diameter_m(&self) -> f64 {
        self.diameter_m
    }

    /// Density in kg/m³
    #[inline]
    #[must_use]
    pub fn density(&self) -> f64 {
        self.density
    }
}

impl Default for ParticleProperties {
    fn default() -> Self {
        Self {
            class: ParticleClass::default(),
            size_class: SizeClass::default(),
            diameter_m: DEFAULT_DIAMETER_MM / 1000.0,
            density: DEFAULT_DENSITY,
        }
    }
}

/// Share of trajectories per fragment, in (0, 100]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct FragmentPercentage(f64);

impl FragmentPercentage {
    /// Whole dataset in one fragment
    pub const FULL: Self = Self(100.0);

    /// # Errors
    /// Returns [`FragmentError::InvalidParameter`] outside (0, 100] or for NaN.
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && value > 0.0 && value <= 100.0 {
            Ok(Self(value))
        } else {
            Err(FragmentError::invalid(format!(
                "percentage must be in (0, 100], got {value}"
            )))
        }
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for FragmentPercentage {
    type Error = FragmentError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for FragmentPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millimeters_become_meters() {
        let p = ParticleProperties::from_millimeters(ParticleClass::Oil, SizeClass::Large, 5.0, 900.0)
            .unwrap();
        assert!((p.diameter_m() - 0.005).abs() < 1e-12);
        assert_eq!(p.class(), ParticleClass::Oil);
        assert_eq!(p.size_class(), SizeClass::Large);
    }

    #[test]
    fn defaults_match_sea_water_particle() {
        let p = ParticleProperties::default();
        assert!((p.diameter_m() - 1e-4).abs() < 1e-12);
        assert_eq!(p.density(), 1027.0);
        assert_eq!(p.class(), ParticleClass::Other);
        assert_eq!(p.size_class(), SizeClass::Medium);
    }

    #[test]
    fn non_positive_properties_rejected() {
        for (d, rho) in [(0.0, 1027.0), (-1.0, 1027.0), (f64::NAN, 1027.0), (0.1, 0.0)] {
            let err = ParticleProperties::from_millimeters(ParticleClass::Other, SizeClass::Medium, d, rho)
                .unwrap_err();
            assert!(err.is_invalid_parameter());
        }
    }

    #[test]
    fn percentage_domain() {
        assert!(FragmentPercentage::new(100.0).is_ok());
        assert!(FragmentPercentage::new(0.001).is_ok());
        for bad in [0.0, -5.0, 100.5, f64::NAN, f64::INFINITY] {
            assert!(FragmentPercentage::new(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn classes_parse_and_print() {
        for class in ParticleClass::ALL {
            assert_eq!(class.to_string().parse::<ParticleClass>().unwrap(), class);
        }
        assert_eq!("faecal_pellets".parse::<ParticleClass>().unwrap(), ParticleClass::FaecalPellets);
        assert!("sand".parse::<ParticleClass>().is_err());
        assert_eq!("small".parse::<SizeClass>().unwrap(), SizeClass::Small);
    }
}
