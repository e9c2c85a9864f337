//! Seeded sample portfolio used when no measure file is supplied.
//!
//! The portfolio exercises every competition path: two residential lighting
//! measures share a microsegment, one of them also carries a secondary
//! heating microsegment, a heat pump and a window measure form a
//! heating supply/demand pair, and two commercial cooling measures compete
//! across discount-rate tiers. Lifetimes and installed costs are drawn as
//! ensembles so every downstream metric carries a distribution.

use rand::{SeedableRng, rngs::StdRng};

use crate::config::RunConfig;
use crate::ensemble::{Value, sample_normal};
use crate::error::EngineError;
use crate::measure::key::{MicrosegmentKey, SegmentType, TechType, Vintage};
use crate::measure::markets::{
    ChannelSet, ChoiceParams, CompetitionData, ContributingInput, MarketRecord, Scope,
};
use crate::measure::{AdoptionScheme, MeasureDefinition, MeasureInput, SchemeInput};

/// Residential logit coefficients on annualized capital and operating cost.
const RESIDENTIAL_B1: f64 = -0.003;
const RESIDENTIAL_B2: f64 = -0.012;

/// Population share of each commercial discount-rate tier for cooling.
const COOLING_TIER_WEIGHTS: [f64; 7] = [0.264, 0.225, 0.193, 0.192, 0.106, 0.016, 0.004];

/// MMTon CO2 per MMBtu of site electricity.
const CARBON_INTENSITY: f64 = 6.0e-8;
/// $ per MMBtu of electricity.
const ENERGY_PRICE: f64 = 35.0;
/// $ per ton CO2.
const CARBON_PRICE: f64 = 40.0;

/// Per-unit characteristics of one contributing microsegment.
#[derive(Debug, Clone)]
struct Profile {
    /// Addressable units.
    units: f64,
    baseline_energy: f64,
    measure_energy: f64,
    baseline_cost: f64,
    /// Typical baseline replacement interval; sets the annual market.
    baseline_life: f64,
    /// Secondary microsegments carry no stock of their own.
    counts_stock: bool,
}

impl Profile {
    /// Channel values for one year and scope, in [`MarketRecord::channels`]
    /// order.
    fn cells(&self, units: f64, captured_fraction: f64, installed: &Value) -> [Value; 12] {
        let captured = units * captured_fraction;
        let remaining = units - captured;
        let energy_b = units * self.baseline_energy;
        let energy_e = remaining * self.baseline_energy + captured * self.measure_energy;
        let carbon_b = energy_b * CARBON_INTENSITY;
        let carbon_e = energy_e * CARBON_INTENSITY;
        let (stock_all, stock_measure, cost_b, cost_e) = if self.counts_stock {
            let bc = self.baseline_cost;
            (
                units,
                captured,
                Value::Scalar(units * bc),
                installed.map(|mc| remaining * bc + captured * mc),
            )
        } else {
            (0.0, 0.0, Value::Scalar(0.0), Value::Scalar(0.0))
        };
        [
            Value::Scalar(stock_all),
            Value::Scalar(stock_measure),
            Value::Scalar(energy_b),
            Value::Scalar(energy_e),
            Value::Scalar(carbon_b),
            Value::Scalar(carbon_e),
            cost_b,
            cost_e,
            Value::Scalar(energy_b * ENERGY_PRICE),
            Value::Scalar(energy_e * ENERGY_PRICE),
            Value::Scalar(carbon_b * 1e6 * CARBON_PRICE),
            Value::Scalar(carbon_e * 1e6 * CARBON_PRICE),
        ]
    }

    fn record(&self, capture: &[f64], installed: &Value) -> MarketRecord {
        let mut rec = MarketRecord::zeros(capture.len());
        let turnover = 1.0 / self.baseline_life.max(1.0);
        for (y, &c) in capture.iter().enumerate() {
            for (scope, units) in [
                (Scope::Total, self.units),
                (Scope::Competed, self.units * turnover),
            ] {
                let cells = self.cells(units, c, installed);
                for (series, v) in rec.channels_mut(scope, ChannelSet::All).into_iter().zip(cells)
                {
                    series[y] = v;
                }
            }
        }
        rec
    }
}

/// Fraction of the addressable market captured in each year.
fn capture(scheme: AdoptionScheme, years: usize) -> Vec<f64> {
    match scheme {
        AdoptionScheme::TechnicalPotential => vec![1.0; years],
        AdoptionScheme::MaxAdoptionPotential => (0..years)
            .map(|y| ((y + 1) as f64 / years as f64).min(1.0))
            .collect(),
    }
}

fn key(
    segment: SegmentType,
    climate_zone: &str,
    bldg_type: &str,
    end_use: &str,
    tech_type: TechType,
    technology: &str,
    vintage: Vintage,
) -> MicrosegmentKey {
    MicrosegmentKey {
        segment,
        climate_zone: climate_zone.into(),
        bldg_type: bldg_type.into(),
        fuel: "electricity".into(),
        end_use: end_use.into(),
        tech_type,
        technology: technology.into(),
        vintage,
    }
}

/// A contributing microsegment before capture is applied.
struct Segment {
    key: MicrosegmentKey,
    profile: Profile,
    choice: Option<ChoiceParams>,
    submarket_scaling: f64,
}

/// Static figures of one sample measure.
struct Template {
    name: &'static str,
    climate_zone: &'static str,
    bldg_type: &'static str,
    end_use: &'static str,
    technology: &'static str,
    vintage: Vintage,
    entry_offset: Option<i32>,
    lifetime: f64,
    installed_cost: f64,
    segments: Vec<Segment>,
}

struct Sampler {
    rng: StdRng,
    samples: usize,
    spread: f64,
}

impl Sampler {
    fn draw(&mut self, mean: f64, floor: f64) -> Value {
        sample_normal(&mut self.rng, mean, self.spread * mean, self.samples, floor)
    }
}

fn build(t: Template, config: &RunConfig, sampler: &mut Sampler) -> MeasureInput {
    let years = config.horizon.len();
    let product_lifetime = sampler.draw(t.lifetime, 1.0);
    let installed_cost = sampler.draw(t.installed_cost, 0.0);

    let markets = config
        .adoption
        .schemes
        .iter()
        .map(|&scheme| {
            let fractions = capture(scheme, years);
            let baseline_life = t
                .segments
                .iter()
                .find(|s| s.profile.counts_stock)
                .map_or(1.0, |s| s.profile.baseline_life);
            let contributing = t
                .segments
                .iter()
                .map(|s| ContributingInput {
                    key: s.key.clone(),
                    markets: s.profile.record(&fractions, &installed_cost),
                    competition: CompetitionData {
                        choice: s.choice.clone(),
                        submarket_scaling: s.submarket_scaling,
                    },
                })
                .collect();
            (
                scheme,
                SchemeInput {
                    baseline_lifetime: vec![Value::Scalar(baseline_life); years],
                    contributing,
                },
            )
        })
        .collect();

    MeasureInput {
        definition: MeasureDefinition {
            name: t.name.to_string(),
            climate_zone: vec![t.climate_zone.to_string()],
            bldg_type: vec![t.bldg_type.to_string()],
            fuel_type: vec!["electricity".to_string()],
            end_use: vec![t.end_use.to_string()],
            technology: vec![t.technology.to_string()],
            structure_type: vec![t.vintage],
            market_entry_year: t.entry_offset.map(|o| config.horizon.first_year + o),
            market_exit_year: None,
            product_lifetime,
        },
        markets,
    }
}

/// Builds the sample portfolio for `config`'s horizon and schemes.
///
/// The same seed always yields the same portfolio.
///
/// # Errors
///
/// Returns [`EngineError::Input`] when the horizon is empty or the ensemble
/// size is zero.
pub fn sample_portfolio(config: &RunConfig) -> Result<Vec<MeasureInput>, EngineError> {
    let years = config.horizon.len();
    if years == 0 {
        return Err(EngineError::Input("sample portfolio needs a non-empty horizon".into()));
    }
    if config.sample.samples == 0 {
        return Err(EngineError::Input("sample portfolio needs at least one sample".into()));
    }

    let mut sampler = Sampler {
        rng: StdRng::seed_from_u64(config.sample.seed),
        samples: config.sample.samples,
        spread: config.sample.spread,
    };
    let residential = Some(ChoiceParams::Residential {
        b1: vec![RESIDENTIAL_B1; years],
        b2: vec![RESIDENTIAL_B2; years],
    });
    let cooling_tiers = Some(ChoiceParams::Commercial {
        tier_weights: vec![COOLING_TIER_WEIGHTS.to_vec(); years],
    });

    let lighting = key(
        SegmentType::Primary,
        "AIA_CZ1",
        "single family home",
        "lighting",
        TechType::Supply,
        "A19 incandescent",
        Vintage::Existing,
    );
    let lighting_gain = key(
        SegmentType::Secondary,
        "AIA_CZ1",
        "single family home",
        "heating",
        TechType::Demand,
        "lighting gain",
        Vintage::Existing,
    );
    let heat_pump = key(
        SegmentType::Primary,
        "AIA_CZ4",
        "single family home",
        "heating",
        TechType::Supply,
        "resistance heat",
        Vintage::Existing,
    );
    let windows = key(
        SegmentType::Primary,
        "AIA_CZ4",
        "single family home",
        "heating",
        TechType::Demand,
        "windows conduction",
        Vintage::Existing,
    );
    let rooftop = key(
        SegmentType::Primary,
        "AIA_CZ3",
        "assembly",
        "cooling",
        TechType::Supply,
        "rooftop_AC",
        Vintage::New,
    );

    let lamps = |measure_energy| Profile {
        units: 2.0e7,
        baseline_energy: 0.06,
        measure_energy,
        baseline_cost: 1.5,
        baseline_life: 2.0,
        counts_stock: true,
    };
    let rtu = |measure_energy| Profile {
        units: 1.2e5,
        baseline_energy: 120.0,
        measure_energy,
        baseline_cost: 9_000.0,
        baseline_life: 16.0,
        counts_stock: true,
    };

    let templates = vec![
        Template {
            name: "ENERGY STAR LED A19",
            climate_zone: "AIA_CZ1",
            bldg_type: "single family home",
            end_use: "lighting",
            technology: "A19 incandescent",
            vintage: Vintage::Existing,
            entry_offset: None,
            lifetime: 20.0,
            installed_cost: 5.0,
            segments: vec![
                Segment {
                    key: lighting.clone(),
                    profile: lamps(0.012),
                    choice: residential.clone(),
                    submarket_scaling: 1.0,
                },
                Segment {
                    key: lighting_gain,
                    profile: Profile {
                        units: 2.0e7,
                        baseline_energy: 0.01,
                        measure_energy: 0.014,
                        baseline_cost: 0.0,
                        baseline_life: 2.0,
                        counts_stock: false,
                    },
                    choice: None,
                    submarket_scaling: 1.0,
                },
            ],
        },
        Template {
            name: "Advanced CFL",
            climate_zone: "AIA_CZ1",
            bldg_type: "single family home",
            end_use: "lighting",
            technology: "A19 incandescent",
            vintage: Vintage::Existing,
            entry_offset: None,
            lifetime: 9.0,
            installed_cost: 2.5,
            segments: vec![Segment {
                key: lighting,
                profile: lamps(0.016),
                choice: residential.clone(),
                submarket_scaling: 1.0,
            }],
        },
        Template {
            name: "ENERGY STAR ASHP",
            climate_zone: "AIA_CZ4",
            bldg_type: "single family home",
            end_use: "heating",
            technology: "resistance heat",
            vintage: Vintage::Existing,
            entry_offset: None,
            lifetime: 15.0,
            installed_cost: 6_500.0,
            segments: vec![Segment {
                key: heat_pump,
                profile: Profile {
                    units: 5.0e6,
                    baseline_energy: 40.0,
                    measure_energy: 25.0,
                    baseline_cost: 4_000.0,
                    baseline_life: 18.0,
                    counts_stock: true,
                },
                choice: residential.clone(),
                submarket_scaling: 1.0,
            }],
        },
        Template {
            name: "High-performance windows",
            climate_zone: "AIA_CZ4",
            bldg_type: "single family home",
            end_use: "heating",
            technology: "windows conduction",
            vintage: Vintage::Existing,
            entry_offset: None,
            lifetime: 30.0,
            installed_cost: 3_000.0,
            segments: vec![Segment {
                key: windows,
                profile: Profile {
                    units: 5.0e6,
                    baseline_energy: 8.0,
                    measure_energy: 5.0,
                    baseline_cost: 500.0,
                    baseline_life: 25.0,
                    counts_stock: true,
                },
                choice: residential,
                submarket_scaling: 1.0,
            }],
        },
        Template {
            name: "Efficient RTU",
            climate_zone: "AIA_CZ3",
            bldg_type: "assembly",
            end_use: "cooling",
            technology: "rooftop_AC",
            vintage: Vintage::New,
            entry_offset: None,
            lifetime: 16.0,
            installed_cost: 11_000.0,
            segments: vec![Segment {
                key: rooftop.clone(),
                profile: rtu(90.0),
                choice: cooling_tiers.clone(),
                submarket_scaling: 1.0,
            }],
        },
        Template {
            name: "VRF heat recovery",
            climate_zone: "AIA_CZ3",
            bldg_type: "assembly",
            end_use: "cooling",
            technology: "rooftop_AC",
            vintage: Vintage::New,
            entry_offset: (years > 1).then_some(1),
            lifetime: 20.0,
            installed_cost: 16_000.0,
            segments: vec![Segment {
                key: rooftop,
                profile: rtu(75.0),
                choice: cooling_tiers,
                submarket_scaling: 0.8,
            }],
        },
    ];

    Ok(templates
        .into_iter()
        .map(|t| build(t, config, &mut sampler))
        .collect())
}
