//! Market records: the shared shape of master and contributing microsegments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::COMMERCIAL_TIER_RATES;
use crate::ensemble::{Series, Value, zero_series};
use crate::error::EngineError;
use crate::measure::key::MicrosegmentKey;

/// Baseline vs. efficient-case values of one quantity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Split {
    pub baseline: Series,
    pub efficient: Series,
}

/// All addressable units vs. units captured by the measure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StockSplit {
    pub all: Series,
    pub measure: Series,
}

/// Cumulative (total) vs. annual (competed) scope of a quantity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scoped<T> {
    pub total: T,
    pub competed: T,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CostRecord {
    pub stock: Scoped<Split>,
    pub energy: Scoped<Split>,
    pub carbon: Scoped<Split>,
}

/// Stock, energy, carbon and cost series of one microsegment (or the sum of
/// several, for a master record).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarketRecord {
    pub stock: Scoped<StockSplit>,
    pub energy: Scoped<Split>,
    pub carbon: Scoped<Split>,
    pub cost: CostRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Total,
    Competed,
}

/// Which channels an adjustment touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSet {
    /// Every stock, energy, carbon and cost series.
    All,
    /// Energy, carbon, energy cost and carbon cost only.
    EnergyOnly,
}

fn split_zeros(years: usize) -> Split {
    Split {
        baseline: zero_series(years),
        efficient: zero_series(years),
    }
}

fn scoped_split_zeros(years: usize) -> Scoped<Split> {
    Scoped {
        total: split_zeros(years),
        competed: split_zeros(years),
    }
}

impl MarketRecord {
    /// A record of `years` zero values in every channel.
    pub fn zeros(years: usize) -> Self {
        let stock = || StockSplit {
            all: zero_series(years),
            measure: zero_series(years),
        };
        Self {
            stock: Scoped {
                total: stock(),
                competed: stock(),
            },
            energy: scoped_split_zeros(years),
            carbon: scoped_split_zeros(years),
            cost: CostRecord {
                stock: scoped_split_zeros(years),
                energy: scoped_split_zeros(years),
                carbon: scoped_split_zeros(years),
            },
        }
    }

    /// Channels of one scope, in a fixed order shared with
    /// [`MarketRecord::channels_mut`].
    pub fn channels(&self, scope: Scope, set: ChannelSet) -> Vec<&Series> {
        let (stock, energy, carbon, c_stock, c_energy, c_carbon) = match scope {
            Scope::Total => (
                &self.stock.total,
                &self.energy.total,
                &self.carbon.total,
                &self.cost.stock.total,
                &self.cost.energy.total,
                &self.cost.carbon.total,
            ),
            Scope::Competed => (
                &self.stock.competed,
                &self.energy.competed,
                &self.carbon.competed,
                &self.cost.stock.competed,
                &self.cost.energy.competed,
                &self.cost.carbon.competed,
            ),
        };
        let mut out = Vec::with_capacity(12);
        if set == ChannelSet::All {
            out.extend([&stock.all, &stock.measure]);
        }
        out.extend([&energy.baseline, &energy.efficient]);
        out.extend([&carbon.baseline, &carbon.efficient]);
        if set == ChannelSet::All {
            out.extend([&c_stock.baseline, &c_stock.efficient]);
        }
        out.extend([&c_energy.baseline, &c_energy.efficient]);
        out.extend([&c_carbon.baseline, &c_carbon.efficient]);
        out
    }

    pub fn channels_mut(&mut self, scope: Scope, set: ChannelSet) -> Vec<&mut Series> {
        let (stock, energy, carbon, c_stock, c_energy, c_carbon) = match scope {
            Scope::Total => (
                &mut self.stock.total,
                &mut self.energy.total,
                &mut self.carbon.total,
                &mut self.cost.stock.total,
                &mut self.cost.energy.total,
                &mut self.cost.carbon.total,
            ),
            Scope::Competed => (
                &mut self.stock.competed,
                &mut self.energy.competed,
                &mut self.carbon.competed,
                &mut self.cost.stock.competed,
                &mut self.cost.energy.competed,
                &mut self.cost.carbon.competed,
            ),
        };
        let mut out = Vec::with_capacity(12);
        if set == ChannelSet::All {
            out.extend([&mut stock.all, &mut stock.measure]);
        }
        out.extend([&mut energy.baseline, &mut energy.efficient]);
        out.extend([&mut carbon.baseline, &mut carbon.efficient]);
        if set == ChannelSet::All {
            out.extend([&mut c_stock.baseline, &mut c_stock.efficient]);
        }
        out.extend([&mut c_energy.baseline, &mut c_energy.efficient]);
        out.extend([&mut c_carbon.baseline, &mut c_carbon.efficient]);
        out
    }

    /// Adds `other` into `self`, channel by channel.
    ///
    /// # Errors
    ///
    /// Fails on series length or ensemble shape mismatch.
    pub fn accumulate(&mut self, other: &MarketRecord) -> Result<(), EngineError> {
        for scope in [Scope::Total, Scope::Competed] {
            let src = other.channels(scope, ChannelSet::All);
            let dst = self.channels_mut(scope, ChannelSet::All);
            for (d, s) in dst.into_iter().zip(src) {
                if d.len() != s.len() {
                    return Err(EngineError::SeriesLength {
                        field: "market record".into(),
                        found: s.len(),
                        expected: d.len(),
                    });
                }
                for (dv, sv) in d.iter_mut().zip(s) {
                    *dv = dv.try_add(sv)?;
                }
            }
        }
        Ok(())
    }

    /// Verifies that every series spans `years` entries.
    pub fn check_years(&self, years: usize, label: &str) -> Result<(), EngineError> {
        for scope in [Scope::Total, Scope::Competed] {
            for series in self.channels(scope, ChannelSet::All) {
                if series.len() != years {
                    return Err(EngineError::SeriesLength {
                        field: label.to_string(),
                        found: series.len(),
                        expected: years,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Baseline lifetime per year and the measure's product lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Lifetime {
    pub baseline: Series,
    pub measure: Value,
}

/// Market-share model inputs carried by a primary contributing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case", deny_unknown_fields)]
pub enum ChoiceParams {
    /// Logit coefficients on annualized capital and operating cost, per year.
    Residential { b1: Vec<f64>, b2: Vec<f64> },
    /// Per-year population weight of each commercial discount-rate tier.
    Commercial { tier_weights: Vec<Vec<f64>> },
}

/// Allowed drift of a year's tier weights from a sum of 1.
const TIER_WEIGHT_TOLERANCE: f64 = 1e-6;

impl ChoiceParams {
    /// Checks that the parameters cover `years` years. Residential
    /// coefficients must be finite; commercial weights must give every tier
    /// a finite, non-negative weight and sum to 1 in each year.
    pub fn check(&self, years: usize) -> Result<(), String> {
        match self {
            ChoiceParams::Residential { b1, b2 } => {
                for (name, series) in [("b1", b1), ("b2", b2)] {
                    if series.len() != years {
                        return Err(format!(
                            "{name} has {} years, expected {years}",
                            series.len()
                        ));
                    }
                    if series.iter().any(|b| !b.is_finite()) {
                        return Err(format!("{name} is not finite"));
                    }
                }
            }
            ChoiceParams::Commercial { tier_weights } => {
                if tier_weights.len() != years {
                    return Err(format!(
                        "tier_weights has {} years, expected {years}",
                        tier_weights.len()
                    ));
                }
                let tiers = COMMERCIAL_TIER_RATES.len();
                for (y, weights) in tier_weights.iter().enumerate() {
                    if weights.len() != tiers {
                        return Err(format!(
                            "tier_weights[{y}] has {} tiers, expected {tiers}",
                            weights.len()
                        ));
                    }
                    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        return Err(format!("tier_weights[{y}] has a negative or non-finite weight"));
                    }
                    let sum: f64 = weights.iter().sum();
                    if (sum - 1.0).abs() > TIER_WEIGHT_TOLERANCE {
                        return Err(format!("tier_weights[{y}] sums to {sum}, expected 1"));
                    }
                }
            }
        }
        Ok(())
    }
}

fn full_scaling() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompetitionData {
    #[serde(default)]
    pub choice: Option<ChoiceParams>,
    /// Fraction of the microsegment the measure can address, in [0, 1].
    #[serde(default = "full_scaling")]
    pub submarket_scaling: f64,
}

impl Default for CompetitionData {
    fn default() -> Self {
        Self {
            choice: None,
            submarket_scaling: full_scaling(),
        }
    }
}

/// One contributing microsegment as supplied by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContributingInput {
    pub key: MicrosegmentKey,
    pub markets: MarketRecord,
    #[serde(default)]
    pub competition: CompetitionData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contributing {
    pub record: MarketRecord,
    pub competition: CompetitionData,
}

/// Master record, lifetimes and contributing records of one measure under
/// one adoption scheme and stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSet {
    pub master: MarketRecord,
    pub lifetime: Lifetime,
    pub contributing: BTreeMap<MicrosegmentKey, Contributing>,
}

impl MarketSet {
    /// Builds the master record by summing every contributing record.
    ///
    /// # Errors
    ///
    /// Fails when a series does not span `years`, when a key appears twice,
    /// when choice parameters are malformed or when ensembles disagree in
    /// length.
    pub fn from_contributing(
        measure: &str,
        lifetime: Lifetime,
        inputs: Vec<ContributingInput>,
        years: usize,
    ) -> Result<Self, EngineError> {
        if lifetime.baseline.len() != years {
            return Err(EngineError::SeriesLength {
                field: format!("{measure}: lifetime.baseline"),
                found: lifetime.baseline.len(),
                expected: years,
            });
        }

        let mut master = MarketRecord::zeros(years);
        let mut contributing = BTreeMap::new();
        for input in inputs {
            input
                .markets
                .check_years(years, &format!("{measure}: {}", input.key))?;
            if !(0.0..=1.0).contains(&input.competition.submarket_scaling) {
                return Err(EngineError::InvalidMeasure {
                    measure: measure.to_string(),
                    reason: format!("submarket_scaling outside [0, 1] for {}", input.key),
                });
            }
            if let Some(choice) = &input.competition.choice {
                choice
                    .check(years)
                    .map_err(|reason| EngineError::InvalidMeasure {
                        measure: measure.to_string(),
                        reason: format!("{reason} for {}", input.key),
                    })?;
            }
            master.accumulate(&input.markets)?;
            let entry = Contributing {
                record: input.markets,
                competition: input.competition,
            };
            if contributing.insert(input.key.clone(), entry).is_some() {
                return Err(EngineError::InvalidMeasure {
                    measure: measure.to_string(),
                    reason: format!("duplicate contributing key {}", input.key),
                });
            }
        }

        Ok(Self {
            master,
            lifetime,
            contributing,
        })
    }
}
