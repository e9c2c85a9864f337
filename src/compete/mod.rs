//! Measure competition over shared microsegments.
//!
//! One call to [`compete`] runs three passes over a single adoption scheme:
//! primary microsegments are apportioned between competing measures,
//! secondary microsegments follow their primary group, and heating/cooling
//! supply-demand overlaps are halved. Only competed-stage market sets are
//! touched.

pub mod adjust;
pub mod commercial;
pub mod ledger;
pub mod overlap;
pub mod residential;
pub mod secondary;
pub mod submarket;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::ensemble::{Series, Value, zero_series};
use crate::error::EngineError;
use crate::finance::metrics::ConsumerMetrics;
use crate::measure::key::{GroupKey, MicrosegmentKey};
use crate::measure::markets::{ChannelSet, CompetitionData, MarketSet};
use crate::measure::{AdoptionScheme, Measure};
use adjust::Shares;
use ledger::{AdjustmentKind, AdjustmentLedger};

/// One measure's view of a contested microsegment.
#[derive(Debug, Clone)]
pub struct Competitor<'a> {
    name: &'a str,
    on_market: Vec<bool>,
    consumer: Option<&'a ConsumerMetrics>,
    competition: &'a CompetitionData,
}

impl<'a> Competitor<'a> {
    fn new(
        measure: &'a Measure,
        scheme: AdoptionScheme,
        key: &MicrosegmentKey,
        years: usize,
    ) -> Result<Self, EngineError> {
        let competition = measure
            .competed
            .get(&scheme)
            .and_then(|set| set.contributing.get(key))
            .map(|c| &c.competition)
            .ok_or_else(|| EngineError::InvalidMeasure {
                measure: measure.name().to_string(),
                reason: format!("does not contribute to {key}"),
            })?;
        Ok(Self {
            name: measure.name(),
            on_market: (0..years).map(|y| measure.on_market(y)).collect(),
            consumer: measure.consumer.as_ref(),
            competition,
        })
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn on_market(&self, y: usize) -> bool {
        self.on_market.get(y).copied().unwrap_or(false)
    }

    /// # Errors
    ///
    /// Returns [`EngineError::MissingConsumerMetrics`] before the
    /// uncompeted pass has run.
    pub fn consumer(&self) -> Result<&'a ConsumerMetrics, EngineError> {
        self.consumer
            .ok_or_else(|| EngineError::MissingConsumerMetrics {
                measure: self.name.to_string(),
            })
    }
}

/// Running mean of `competed` over all years to date.
///
/// Stock captured in earlier years is not recontested, so a measure's share
/// of the cumulative market moves slowly toward its annual share.
pub fn cumulative_mean(competed: &Series) -> Result<Series, EngineError> {
    let mut sum = Value::Scalar(0.0);
    let mut out = Vec::with_capacity(competed.len());
    for (y, v) in competed.iter().enumerate() {
        sum = sum.try_add(v)?;
        out.push(sum.scale(1.0 / (y + 1) as f64));
    }
    Ok(out)
}

/// Energy a measure captures in one primary group, before and after
/// apportionment.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedEnergy {
    pub original_total: Series,
    pub original_competed: Series,
    pub adjusted_total: Series,
    pub adjusted_competed: Series,
}

impl CapturedEnergy {
    fn zeros(years: usize) -> Self {
        Self {
            original_total: zero_series(years),
            original_competed: zero_series(years),
            adjusted_total: zero_series(years),
            adjusted_competed: zero_series(years),
        }
    }
}

fn add_into(acc: &mut Series, v: &Series) -> Result<(), EngineError> {
    for (a, b) in acc.iter_mut().zip(v) {
        *a = a.try_add(b)?;
    }
    Ok(())
}

/// Counts of adjustments made during one scheme's competition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompetitionSummary {
    /// Primary microsegments with two or more competitors.
    pub contested: usize,
    /// (measure, secondary microsegment) pairs rescaled.
    pub secondary: usize,
    /// (measure, microsegment) pairs halved for supply-demand overlap.
    pub overlap: usize,
}

fn apply_to(
    ledger: &mut AdjustmentLedger,
    kind: AdjustmentKind,
    measure: &mut Measure,
    scheme: AdoptionScheme,
    key: &MicrosegmentKey,
    shares: &Shares,
    channels: ChannelSet,
) -> Result<(), EngineError> {
    let Measure {
        definition,
        competed,
        ..
    } = measure;
    let set: &mut MarketSet = competed
        .get_mut(&scheme)
        .ok_or_else(|| EngineError::MissingScheme {
            measure: definition.name.clone(),
            scheme,
        })?;
    adjust::apply(ledger, kind, &definition.name, set, key, shares, channels)
}

fn contributes(measure: &Measure, scheme: AdoptionScheme, key: &MicrosegmentKey) -> bool {
    measure
        .competed
        .get(&scheme)
        .is_some_and(|set| set.contributing.contains_key(key))
}

/// Competes every measure's competed-stage markets for `scheme` in place.
///
/// Measures without markets for `scheme` are left alone.
///
/// # Errors
///
/// Fails on missing choice data or consumer metrics for a contested key, on
/// ensemble shape mismatch, and on any adjustment applied twice.
pub fn compete(
    measures: &mut [Measure],
    scheme: AdoptionScheme,
    years: usize,
) -> Result<CompetitionSummary, EngineError> {
    let keys: BTreeSet<MicrosegmentKey> = measures
        .iter()
        .filter_map(|m| m.competed.get(&scheme))
        .flat_map(|set| set.contributing.keys().cloned())
        .collect();
    info!(%scheme, keys = keys.len(), "competing measures");

    let mut ledger = AdjustmentLedger::new();
    let mut summary = CompetitionSummary::default();
    let mut captured: BTreeMap<(usize, GroupKey), CapturedEnergy> = BTreeMap::new();

    for key in keys.iter().filter(|k| k.is_primary()) {
        let idx: Vec<usize> = (0..measures.len())
            .filter(|&i| contributes(&measures[i], scheme, key))
            .collect();
        record_captured(measures, scheme, key, &idx, years, &mut captured, false)?;

        if idx.len() >= 2 {
            let shares = primary_shares(measures, scheme, key, &idx, years)?;
            for (&i, s) in idx.iter().zip(&shares) {
                apply_to(
                    &mut ledger,
                    AdjustmentKind::Share,
                    &mut measures[i],
                    scheme,
                    key,
                    s,
                    ChannelSet::All,
                )?;
            }
            summary.contested += 1;
            debug!(%key, competitors = idx.len(), "primary microsegment apportioned");
        }

        record_captured(measures, scheme, key, &idx, years, &mut captured, true)?;
    }

    for key in keys.iter().filter(|k| !k.is_primary()) {
        for (i, measure) in measures.iter_mut().enumerate() {
            if !contributes(measure, scheme, key) {
                continue;
            }
            let Some(cap) = captured.get(&(i, key.group())) else {
                continue;
            };
            if !secondary::is_linked(cap) {
                continue;
            }
            let shares = secondary::ratios(cap)?;
            apply_to(
                &mut ledger,
                AdjustmentKind::Secondary,
                measure,
                scheme,
                key,
                &shares,
                ChannelSet::EnergyOnly,
            )?;
            summary.secondary += 1;
        }
    }

    for key in keys.iter() {
        if overlap::counterpart(key, &keys).is_none() {
            continue;
        }
        let shares = overlap::shares(years);
        for measure in measures.iter_mut() {
            if !contributes(measure, scheme, key) {
                continue;
            }
            apply_to(
                &mut ledger,
                AdjustmentKind::Overlap,
                measure,
                scheme,
                key,
                &shares,
                ChannelSet::EnergyOnly,
            )?;
            summary.overlap += 1;
        }
    }

    info!(
        %scheme,
        contested = summary.contested,
        secondary = summary.secondary,
        overlap = summary.overlap,
        "competition finished"
    );
    Ok(summary)
}

/// Final total and competed shares of each competitor for one primary key.
fn primary_shares(
    measures: &[Measure],
    scheme: AdoptionScheme,
    key: &MicrosegmentKey,
    idx: &[usize],
    years: usize,
) -> Result<Vec<Shares>, EngineError> {
    let competitors = idx
        .iter()
        .map(|&i| Competitor::new(&measures[i], scheme, key, years))
        .collect::<Result<Vec<_>, _>>()?;

    let competed = if key.is_residential() {
        residential::competed_shares(key, &competitors, years)?
    } else {
        commercial::competed_shares(key, &competitors, years)?
    };
    let total = competed
        .iter()
        .map(cumulative_mean)
        .collect::<Result<Vec<_>, _>>()?;

    let scaling: Vec<f64> = competitors
        .iter()
        .map(|c| c.competition.submarket_scaling)
        .collect();
    let competed = submarket::reconcile(&competed, &scaling)?;
    let total = submarket::reconcile(&total, &scaling)?;

    Ok(competed
        .into_iter()
        .zip(total)
        .map(|(competed, total)| Shares { total, competed })
        .collect())
}

/// Adds the energy each of `idx` captures at `key` to its group tally.
fn record_captured(
    measures: &[Measure],
    scheme: AdoptionScheme,
    key: &MicrosegmentKey,
    idx: &[usize],
    years: usize,
    captured: &mut BTreeMap<(usize, GroupKey), CapturedEnergy>,
    adjusted: bool,
) -> Result<(), EngineError> {
    for &i in idx {
        let Some(entry) = measures[i]
            .competed
            .get(&scheme)
            .and_then(|set| set.contributing.get(key))
        else {
            continue;
        };
        let energy = &entry.record.energy;
        let tally = captured
            .entry((i, key.group()))
            .or_insert_with(|| CapturedEnergy::zeros(years));
        if adjusted {
            add_into(&mut tally.adjusted_total, &energy.total.baseline)?;
            add_into(&mut tally.adjusted_competed, &energy.competed.baseline)?;
        } else {
            add_into(&mut tally.original_total, &energy.total.baseline)?;
            add_into(&mut tally.original_competed, &energy.competed.baseline)?;
        }
    }
    Ok(())
}
