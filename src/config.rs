//! TOML-based run configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::measure::AdoptionScheme;

/// Discount rate used for portfolio metrics and residential consumer ANPV.
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.07;

/// Discount rates of the seven commercial adopter tiers, most to least
/// myopic.
pub const COMMERCIAL_TIER_RATES: [f64; 7] = [10.0, 1.0, 0.45, 0.25, 0.15, 0.065, 0.0];

/// Top-level run configuration parsed from TOML.
///
/// Every section has defaults matching the `aeo` preset. Load from TOML with
/// [`RunConfig::from_toml_file`] or pick a preset with
/// [`RunConfig::from_preset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Modeling years.
    #[serde(default)]
    pub horizon: HorizonConfig,
    /// Discounting parameters.
    #[serde(default)]
    pub finance: FinanceConfig,
    /// Commercial adopter tiers.
    #[serde(default)]
    pub commercial: CommercialConfig,
    /// Adoption schemes to evaluate.
    #[serde(default)]
    pub adoption: AdoptionConfig,
    /// Built-in sample portfolio parameters.
    #[serde(default)]
    pub sample: SampleConfig,
}

/// First and last modeling year, both inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HorizonConfig {
    pub first_year: i32,
    pub last_year: i32,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            first_year: 2009,
            last_year: 2040,
        }
    }
}

impl HorizonConfig {
    /// Number of modeled years (0 for an inverted horizon).
    pub fn len(&self) -> usize {
        usize::try_from(self.last_year - self.first_year + 1).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calendar year at offset `idx`.
    pub fn year(&self, idx: usize) -> i32 {
        self.first_year + idx as i32
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.first_year..=self.last_year
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinanceConfig {
    /// Rate for NPV-based portfolio metrics (CCE, CCC).
    pub discount_rate: f64,
    /// Rate for residential consumer ANPV.
    pub residential_rate: f64,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            discount_rate: DEFAULT_DISCOUNT_RATE,
            residential_rate: DEFAULT_DISCOUNT_RATE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommercialConfig {
    /// One discount rate per adopter tier (exactly 7).
    pub tier_rates: Vec<f64>,
}

impl Default for CommercialConfig {
    fn default() -> Self {
        Self {
            tier_rates: COMMERCIAL_TIER_RATES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdoptionConfig {
    /// Schemes evaluated, in order. The first one supplies consumer metrics.
    pub schemes: Vec<AdoptionScheme>,
}

impl Default for AdoptionConfig {
    fn default() -> Self {
        Self {
            schemes: AdoptionScheme::ALL.to_vec(),
        }
    }
}

/// Parameters of the seeded sample portfolio used when no measure file is
/// given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleConfig {
    /// Master random seed.
    pub seed: u64,
    /// Ensemble size for sampled lifetimes and installed costs.
    pub samples: usize,
    /// Standard deviation of sampled values as a fraction of the mean.
    pub spread: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            samples: 50,
            spread: 0.1,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"horizon.first_year"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl RunConfig {
    /// Names accepted by [`RunConfig::from_preset`].
    pub const PRESETS: &[&str] = &["aeo", "short"];

    /// Full AEO horizon with both adoption schemes.
    pub fn aeo() -> Self {
        Self {
            horizon: HorizonConfig::default(),
            finance: FinanceConfig::default(),
            commercial: CommercialConfig::default(),
            adoption: AdoptionConfig::default(),
            sample: SampleConfig::default(),
        }
    }

    /// Three-year horizon with small ensembles, for quick checks.
    pub fn short() -> Self {
        Self {
            horizon: HorizonConfig {
                first_year: 2015,
                last_year: 2017,
            },
            sample: SampleConfig {
                samples: 5,
                ..SampleConfig::default()
            },
            ..Self::aeo()
        }
    }

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "aeo" => Ok(Self::aeo()),
            "short" => Ok(Self::short()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns every violation found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.horizon.first_year > self.horizon.last_year {
            errors.push(ConfigError {
                field: "horizon.first_year".into(),
                message: "must be <= horizon.last_year".into(),
            });
        }

        let fin = &self.finance;
        if !fin.discount_rate.is_finite() || fin.discount_rate < 0.0 {
            errors.push(ConfigError {
                field: "finance.discount_rate".into(),
                message: "must be a finite rate >= 0".into(),
            });
        }
        if !fin.residential_rate.is_finite() || fin.residential_rate < 0.0 {
            errors.push(ConfigError {
                field: "finance.residential_rate".into(),
                message: "must be a finite rate >= 0".into(),
            });
        }

        let tiers = &self.commercial.tier_rates;
        if tiers.len() != COMMERCIAL_TIER_RATES.len() {
            errors.push(ConfigError {
                field: "commercial.tier_rates".into(),
                message: format!(
                    "must list {} rates, got {}",
                    COMMERCIAL_TIER_RATES.len(),
                    tiers.len()
                ),
            });
        }
        if tiers.iter().any(|r| !r.is_finite() || *r < 0.0) {
            errors.push(ConfigError {
                field: "commercial.tier_rates".into(),
                message: "rates must be finite and >= 0".into(),
            });
        }

        let schemes = &self.adoption.schemes;
        if schemes.is_empty() {
            errors.push(ConfigError {
                field: "adoption.schemes".into(),
                message: "must name at least one scheme".into(),
            });
        }
        for (i, s) in schemes.iter().enumerate() {
            if schemes[..i].contains(s) {
                errors.push(ConfigError {
                    field: "adoption.schemes".into(),
                    message: format!("scheme \"{s}\" listed twice"),
                });
            }
        }

        if self.sample.samples == 0 {
            errors.push(ConfigError {
                field: "sample.samples".into(),
                message: "must be > 0".into(),
            });
        }
        if !(0.0..1.0).contains(&self.sample.spread) {
            errors.push(ConfigError {
                field: "sample.spread".into(),
                message: "must be in [0.0, 1.0)".into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aeo_preset_valid() {
        let errors = RunConfig::aeo().validate();
        assert!(errors.is_empty(), "aeo should be valid: {errors:?}");
        assert_eq!(RunConfig::aeo().horizon.len(), 32);
    }

    #[test]
    fn from_preset_unknown() {
        let err = RunConfig::from_preset("nonexistent");
        assert!(err.as_ref().is_err_and(|e| e.message.contains("unknown preset")));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in RunConfig::PRESETS {
            let cfg = RunConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(errors.is_empty(), "preset \"{name}\" should be valid: {errors:?}");
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[horizon]
first_year = 2020
last_year = 2030

[finance]
discount_rate = 0.05
residential_rate = 0.07

[commercial]
tier_rates = [10.0, 1.0, 0.45, 0.25, 0.15, 0.065, 0.0]

[adoption]
schemes = ["Technical potential"]

[sample]
seed = 7
samples = 10
spread = 0.2
"#;
        let cfg = RunConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.horizon.len()), Some(11));
        assert_eq!(
            cfg.as_ref().map(|c| c.adoption.schemes.clone()),
            Some(vec![AdoptionScheme::TechnicalPotential])
        );
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[finance]
discount_rate = 0.07
bogus_field = true
"#;
        assert!(RunConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_scheme_rejected() {
        let toml = r#"
[adoption]
schemes = ["Partial potential"]
"#;
        assert!(RunConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_collects_every_violation() {
        let mut cfg = RunConfig::aeo();
        cfg.horizon.first_year = 2050;
        cfg.commercial.tier_rates = vec![0.1, 0.2];
        cfg.adoption.schemes.clear();
        cfg.sample.samples = 0;
        let errors = cfg.validate();
        for field in [
            "horizon.first_year",
            "commercial.tier_rates",
            "adoption.schemes",
            "sample.samples",
        ] {
            assert!(errors.iter().any(|e| e.field == field), "missing {field}");
        }
    }

    #[test]
    fn duplicate_scheme_flagged() {
        let mut cfg = RunConfig::aeo();
        cfg.adoption.schemes = vec![
            AdoptionScheme::TechnicalPotential,
            AdoptionScheme::TechnicalPotential,
        ];
        assert!(cfg.validate().iter().any(|e| e.field == "adoption.schemes"));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[horizon]
last_year = 2012
"#;
        let cfg = RunConfig::from_toml_str(toml).ok();
        assert_eq!(cfg.as_ref().map(|c| c.horizon.first_year), Some(2009));
        assert_eq!(cfg.as_ref().map(|c| c.horizon.len()), Some(4));
        assert_eq!(cfg.as_ref().map(|c| c.finance.discount_rate), Some(0.07));
        assert_eq!(cfg.as_ref().map(|c| c.commercial.tier_rates.len()), Some(7));
    }
}
