//! Energy conservation measures and their market data.

pub mod key;
pub mod markets;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::HorizonConfig;
use crate::ensemble::{Series, Value};
use crate::error::EngineError;
use crate::finance::metrics::ConsumerMetrics;
use key::{MicrosegmentKey, Vintage, is_residential_bldg};
use markets::{ContributingInput, Lifetime, MarketSet};

/// Consumer adoption assumption a measure's markets were prepared under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AdoptionScheme {
    #[serde(rename = "Technical potential")]
    TechnicalPotential,
    #[serde(rename = "Max adoption potential")]
    MaxAdoptionPotential,
}

impl AdoptionScheme {
    pub const ALL: [AdoptionScheme; 2] = [
        AdoptionScheme::TechnicalPotential,
        AdoptionScheme::MaxAdoptionPotential,
    ];
}

impl fmt::Display for AdoptionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdoptionScheme::TechnicalPotential => write!(f, "Technical potential"),
            AdoptionScheme::MaxAdoptionPotential => write!(f, "Max adoption potential"),
        }
    }
}

/// Whether figures are taken before or after measure competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Uncompeted,
    Competed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Uncompeted => write!(f, "uncompeted"),
            Stage::Competed => write!(f, "competed"),
        }
    }
}

/// Static characteristics of a measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeasureDefinition {
    pub name: String,
    pub climate_zone: Vec<String>,
    pub bldg_type: Vec<String>,
    pub fuel_type: Vec<String>,
    pub end_use: Vec<String>,
    pub technology: Vec<String>,
    pub structure_type: Vec<Vintage>,
    /// First year the measure is available (defaults to the horizon start).
    #[serde(default)]
    pub market_entry_year: Option<i32>,
    /// First year the measure is no longer available.
    #[serde(default)]
    pub market_exit_year: Option<i32>,
    /// Product lifetime in years.
    pub product_lifetime: Value,
}

impl MeasureDefinition {
    /// Whether any of the measure's building types is residential.
    pub fn applies_residential(&self) -> bool {
        self.bldg_type.iter().any(|b| is_residential_bldg(b))
    }

    /// Whether any of the measure's building types is commercial.
    pub fn applies_commercial(&self) -> bool {
        self.bldg_type.iter().any(|b| !is_residential_bldg(b))
    }

    /// Names the first field of `key` that falls outside the measure's
    /// declared scope. Secondary keys describe induced effects in other end
    /// uses, so only their location, building type and vintage are checked.
    pub fn out_of_scope(&self, key: &MicrosegmentKey) -> Option<&'static str> {
        let listed = |list: &[String], v: &str| list.iter().any(|x| x == v);
        if !listed(&self.climate_zone, &key.climate_zone) {
            return Some("climate_zone");
        }
        if !listed(&self.bldg_type, &key.bldg_type) {
            return Some("bldg_type");
        }
        if !self.structure_type.contains(&key.vintage) {
            return Some("structure_type");
        }
        if !key.is_primary() {
            return None;
        }
        if !listed(&self.fuel_type, &key.fuel) {
            return Some("fuel_type");
        }
        if !listed(&self.end_use, &key.end_use) {
            return Some("end_use");
        }
        if !listed(&self.technology, &key.technology) {
            return Some("technology");
        }
        None
    }

    fn validate(&self) -> Result<(), EngineError> {
        let invalid = |reason: &str| EngineError::InvalidMeasure {
            measure: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.bldg_type.is_empty() {
            return Err(invalid("no building types"));
        }
        if self.climate_zone.is_empty() {
            return Err(invalid("no climate zones"));
        }
        if let (Some(entry), Some(exit)) = (self.market_entry_year, self.market_exit_year)
            && entry >= exit
        {
            return Err(invalid("market_entry_year must precede market_exit_year"));
        }
        if self.product_lifetime.samples() == Some(0) {
            return Err(invalid("empty ensemble"));
        }
        if self.product_lifetime.mean() <= 0.0 {
            return Err(invalid("product_lifetime must be > 0"));
        }
        Ok(())
    }
}

/// Market input of one adoption scheme, as read from a measure file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemeInput {
    /// Baseline technology lifetime per year.
    pub baseline_lifetime: Series,
    pub contributing: Vec<ContributingInput>,
}

/// One measure as supplied by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeasureInput {
    pub definition: MeasureDefinition,
    pub markets: BTreeMap<AdoptionScheme, SchemeInput>,
}

/// A validated measure with its uncompeted and competed markets.
#[derive(Debug, Clone)]
pub struct Measure {
    pub definition: MeasureDefinition,
    pub uncompeted: BTreeMap<AdoptionScheme, MarketSet>,
    pub competed: BTreeMap<AdoptionScheme, MarketSet>,
    /// Filled by the uncompeted pass; read by the market-share models.
    pub consumer: Option<ConsumerMetrics>,
    on_market: Vec<bool>,
}

impl Measure {
    /// Validates `input` against `horizon` and builds master records by
    /// summing contributing records.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidMeasure`] or
    /// [`EngineError::SeriesLength`] for malformed input, including
    /// contributing keys outside the measure's declared scope.
    pub fn new(input: MeasureInput, horizon: &HorizonConfig) -> Result<Self, EngineError> {
        let MeasureInput {
            definition,
            markets,
        } = input;
        definition.validate()?;
        if markets.is_empty() {
            return Err(EngineError::InvalidMeasure {
                measure: definition.name.clone(),
                reason: "no market data".into(),
            });
        }

        let years = horizon.len();
        let mut uncompeted = BTreeMap::new();
        for (scheme, scheme_input) in markets {
            for c in &scheme_input.contributing {
                if let Some(field) = definition.out_of_scope(&c.key) {
                    return Err(EngineError::InvalidMeasure {
                        measure: definition.name.clone(),
                        reason: format!("{} is outside the measure's {field}", c.key),
                    });
                }
            }
            let lifetime = Lifetime {
                baseline: scheme_input.baseline_lifetime,
                measure: definition.product_lifetime.clone(),
            };
            let set = MarketSet::from_contributing(
                &definition.name,
                lifetime,
                scheme_input.contributing,
                years,
            )?;
            uncompeted.insert(scheme, set);
        }

        let entry = definition.market_entry_year.unwrap_or(horizon.first_year);
        let exit = definition.market_exit_year.unwrap_or(i32::MAX);
        let on_market: Vec<bool> = horizon.years().map(|y| y >= entry && y < exit).collect();
        if !on_market.iter().any(|o| *o) {
            warn!(measure = %definition.name, "measure is never on the market within the horizon");
        }

        Ok(Self {
            definition,
            competed: uncompeted.clone(),
            uncompeted,
            consumer: None,
            on_market,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Whether the measure is available in the year at offset `idx`.
    pub fn on_market(&self, idx: usize) -> bool {
        self.on_market.get(idx).copied().unwrap_or(false)
    }

    pub fn markets(&self, scheme: AdoptionScheme, stage: Stage) -> Option<&MarketSet> {
        match stage {
            Stage::Uncompeted => self.uncompeted.get(&scheme),
            Stage::Competed => self.competed.get(&scheme),
        }
    }

    /// Replaces the competed markets of `scheme` with a fresh copy of the
    /// uncompeted ones.
    pub fn reset_competed(&mut self, scheme: AdoptionScheme) -> Result<(), EngineError> {
        let fresh = self
            .uncompeted
            .get(&scheme)
            .cloned()
            .ok_or_else(|| EngineError::MissingScheme {
                measure: self.definition.name.clone(),
                scheme,
            })?;
        self.competed.insert(scheme, fresh);
        Ok(())
    }
}
