//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use ecm_compete::config::{AdoptionConfig, HorizonConfig, RunConfig};
use ecm_compete::ensemble::Value;
use ecm_compete::measure::key::{MicrosegmentKey, SegmentType, TechType, Vintage};
use ecm_compete::measure::markets::{
    ChannelSet, ChoiceParams, CompetitionData, ContributingInput, MarketRecord, Scope,
};
use ecm_compete::measure::{AdoptionScheme, MeasureDefinition, MeasureInput, SchemeInput};

pub const FIRST_YEAR: i32 = 2020;

/// Technical-potential-only run over `years` years, with a zero residential
/// rate so annualized costs equal per-unit costs for one-year lifetimes.
pub fn config(years: usize) -> RunConfig {
    let mut config = RunConfig::aeo();
    config.horizon = HorizonConfig {
        first_year: FIRST_YEAR,
        last_year: FIRST_YEAR + years as i32 - 1,
    };
    config.adoption = AdoptionConfig {
        schemes: vec![AdoptionScheme::TechnicalPotential],
    };
    config.finance.residential_rate = 0.0;
    config
}

pub fn key(
    segment: SegmentType,
    bldg_type: &str,
    end_use: &str,
    tech_type: TechType,
    technology: &str,
) -> MicrosegmentKey {
    MicrosegmentKey {
        segment,
        climate_zone: "AIA_CZ2".into(),
        bldg_type: bldg_type.into(),
        fuel: "electricity".into(),
        end_use: end_use.into(),
        tech_type,
        technology: technology.into(),
        vintage: Vintage::Existing,
    }
}

/// Residential lighting microsegment.
pub fn lighting_key() -> MicrosegmentKey {
    key(
        SegmentType::Primary,
        "single family home",
        "lighting",
        TechType::Supply,
        "general service",
    )
}

/// Commercial lighting microsegment.
pub fn office_lighting_key() -> MicrosegmentKey {
    key(
        SegmentType::Primary,
        "large office",
        "lighting",
        TechType::Supply,
        "T8 F32",
    )
}

/// Flat market figures for one microsegment.
#[derive(Debug, Clone, Copy)]
pub struct Flat {
    pub stock: f64,
    pub energy_baseline: f64,
    pub energy_efficient: f64,
    pub cost_baseline: f64,
    pub cost_efficient: f64,
}

impl Default for Flat {
    fn default() -> Self {
        Self {
            stock: 100.0,
            energy_baseline: 1_000.0,
            energy_efficient: 600.0,
            cost_baseline: 50.0,
            cost_efficient: 100.0,
        }
    }
}

/// The same figures in every year and in both scopes.
pub fn record(years: usize, f: Flat) -> MarketRecord {
    let cells = [
        f.stock,
        f.stock,
        f.energy_baseline,
        f.energy_efficient,
        f.energy_baseline * 1e-7,
        f.energy_efficient * 1e-7,
        f.cost_baseline,
        f.cost_efficient,
        f.energy_baseline * 10.0,
        f.energy_efficient * 10.0,
        0.0,
        0.0,
    ];
    let mut rec = MarketRecord::zeros(years);
    for scope in [Scope::Total, Scope::Competed] {
        for (series, v) in rec.channels_mut(scope, ChannelSet::All).into_iter().zip(cells) {
            *series = vec![Value::Scalar(v); years];
        }
    }
    rec
}

pub fn residential_choice(b1: f64, b2: f64, years: usize) -> Option<ChoiceParams> {
    Some(ChoiceParams::Residential {
        b1: vec![b1; years],
        b2: vec![b2; years],
    })
}

pub fn tier_choice(years: usize) -> Option<ChoiceParams> {
    Some(ChoiceParams::Commercial {
        tier_weights: vec![vec![0.3, 0.2, 0.2, 0.1, 0.1, 0.05, 0.05]; years],
    })
}

pub fn contributing(
    key: MicrosegmentKey,
    markets: MarketRecord,
    choice: Option<ChoiceParams>,
) -> ContributingInput {
    ContributingInput {
        key,
        markets,
        competition: CompetitionData {
            choice,
            submarket_scaling: 1.0,
        },
    }
}

/// A one-year-lifetime measure contributing `segments` under technical
/// potential. Its declared fuels, end uses and technologies are those of
/// the primary segments.
pub fn measure(
    name: &str,
    bldg_type: &str,
    years: usize,
    segments: Vec<ContributingInput>,
) -> MeasureInput {
    let declared = |field: fn(&MicrosegmentKey) -> &str| {
        let mut values: Vec<String> = segments
            .iter()
            .filter(|s| s.key.is_primary())
            .map(|s| field(&s.key).to_string())
            .collect();
        values.sort();
        values.dedup();
        values
    };
    MeasureInput {
        definition: MeasureDefinition {
            name: name.into(),
            climate_zone: vec!["AIA_CZ2".into()],
            bldg_type: vec![bldg_type.into()],
            fuel_type: declared(|k| k.fuel.as_str()),
            end_use: declared(|k| k.end_use.as_str()),
            technology: declared(|k| k.technology.as_str()),
            structure_type: vec![Vintage::Existing],
            market_entry_year: None,
            market_exit_year: None,
            product_lifetime: Value::Scalar(1.0),
        },
        markets: BTreeMap::from([(
            AdoptionScheme::TechnicalPotential,
            SchemeInput {
                baseline_lifetime: vec![Value::Scalar(1.0); years],
                contributing: segments,
            },
        )]),
    }
}

pub fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}
