//! Integration tests for measure competition through the engine.

mod common;

use common::{Flat, approx, contributing, lighting_key, measure, record};
use ecm_compete::engine::Engine;
use ecm_compete::ensemble::Value;
use ecm_compete::error::EngineError;
use ecm_compete::measure::key::{MicrosegmentKey, SegmentType, TechType};
use ecm_compete::measure::markets::{ChoiceParams, MarketSet};
use ecm_compete::measure::{AdoptionScheme, MeasureInput, Stage};

const TP: AdoptionScheme = AdoptionScheme::TechnicalPotential;

/// Two residential lighting measures scoring exp(1) and exp(3).
fn residential_pair(years: usize) -> Vec<MeasureInput> {
    let choice = common::residential_choice(1.0, 0.0, years);
    let cheap = Flat {
        cost_efficient: 100.0,
        ..Flat::default()
    };
    let costly = Flat {
        cost_efficient: 300.0,
        ..Flat::default()
    };
    vec![
        measure(
            "LED",
            "single family home",
            years,
            vec![contributing(lighting_key(), record(years, cheap), choice.clone())],
        ),
        measure(
            "CFL",
            "single family home",
            years,
            vec![contributing(lighting_key(), record(years, costly), choice)],
        ),
    ]
}

/// Runs the uncompeted and competition passes and returns the engine.
fn competed(years: usize, inputs: Vec<MeasureInput>) -> Result<Engine, EngineError> {
    let mut engine = Engine::new(common::config(years), inputs)?;
    engine.uncompeted_pass()?;
    engine.competition_pass()?;
    Ok(engine)
}

fn competed_set(engine: &Engine, i: usize) -> Option<&MarketSet> {
    engine.measures().get(i)?.markets(TP, Stage::Competed)
}

fn secondary_key() -> MicrosegmentKey {
    common::key(
        SegmentType::Secondary,
        "single family home",
        "heating",
        TechType::Demand,
        "lighting gain",
    )
}

#[test]
fn residential_shares_follow_logit_scores() {
    let engine = competed(3, residential_pair(3));
    assert!(engine.is_ok(), "{:?}", engine.err());
    let Ok(engine) = engine else { return };

    let share = 1.0 / (1.0 + 2f64.exp());
    for (i, expected) in [(0, share), (1, 1.0 - share)] {
        let set = competed_set(&engine, i);
        assert!(set.is_some());
        let Some(set) = set else { return };
        for y in 0..3 {
            let annual = set.master.stock.competed.measure[y].mean();
            let cumulative = set.master.stock.total.measure[y].mean();
            assert!(approx(annual, 100.0 * expected, 1e-9), "annual {annual}");
            assert!(approx(cumulative, 100.0 * expected, 1e-9), "total {cumulative}");
        }
    }
    // 0.119 / 0.881
    let led = competed_set(&engine, 0).map(|s| s.master.stock.competed.measure[0].mean());
    assert!(led.is_some_and(|v| approx(v, 11.92, 0.01)));
}

#[test]
fn under_one_captured_unit_still_competes_on_cost() {
    let years = 1;
    let choice = common::residential_choice(-1.0, 0.0, years);
    let mut cheap = record(
        years,
        Flat {
            cost_efficient: 100.0,
            ..Flat::default()
        },
    );
    cheap.stock.total.measure = vec![Value::Scalar(0.5); years];
    let costly = record(
        years,
        Flat {
            cost_efficient: 300.0,
            ..Flat::default()
        },
    );
    let inputs = vec![
        measure(
            "LED",
            "single family home",
            years,
            vec![contributing(lighting_key(), cheap, choice.clone())],
        ),
        measure(
            "CFL",
            "single family home",
            years,
            vec![contributing(lighting_key(), costly, choice)],
        ),
    ];
    let engine = competed(years, inputs);
    assert!(engine.is_ok(), "{:?}", engine.err());
    let Ok(engine) = engine else { return };

    // per-unit capital 1 vs 3: exp(-1) against exp(-3)
    let share = 1.0 / (1.0 + (-2f64).exp());
    let led = competed_set(&engine, 0).map(|s| s.master.stock.competed.measure[0].mean());
    let cfl = competed_set(&engine, 1).map(|s| s.master.stock.competed.measure[0].mean());
    assert!(led.is_some_and(|v| approx(v, 100.0 * share, 1e-9)), "{led:?}");
    assert!(cfl.is_some_and(|v| approx(v, 100.0 * (1.0 - share), 1e-9)), "{cfl:?}");
}

#[test]
fn competed_stock_partitions_the_market() {
    let Ok(engine) = competed(2, residential_pair(2)) else {
        panic!("competition failed");
    };
    for y in 0..2 {
        let sum: f64 = (0..2)
            .filter_map(|i| competed_set(&engine, i))
            .map(|s| s.master.stock.competed.measure[y].mean())
            .sum();
        assert!(approx(sum, 100.0, 1e-9));
    }
}

#[test]
fn uncompeted_markets_untouched_by_competition() {
    let Ok(engine) = competed(2, residential_pair(2)) else {
        panic!("competition failed");
    };
    let before = engine.measures()[0]
        .markets(TP, Stage::Uncompeted)
        .map(|s| s.master.stock.competed.measure[0].mean());
    assert_eq!(before, Some(100.0));
}

#[test]
fn late_entrant_shares_cumulative_market_gradually() {
    let mut inputs = residential_pair(2);
    inputs[1].definition.market_entry_year = Some(common::FIRST_YEAR + 1);
    let Ok(engine) = competed(2, inputs) else {
        panic!("competition failed");
    };
    let share = 1.0 / (1.0 + 2f64.exp());
    let led = competed_set(&engine, 0);
    assert!(led.is_some());
    if let Some(led) = led {
        assert!(approx(led.master.stock.competed.measure[0].mean(), 100.0, 1e-9));
        assert!(approx(led.master.stock.competed.measure[1].mean(), 100.0 * share, 1e-9));
        let cumulative = 100.0 * (1.0 + share) / 2.0;
        assert!(approx(led.master.stock.total.measure[1].mean(), cumulative, 1e-9));
    }
}

#[test]
fn commercial_tie_splits_every_tier() {
    let years = 2;
    let office = |name: &str| {
        measure(
            name,
            "large office",
            years,
            vec![contributing(
                common::office_lighting_key(),
                record(years, Flat::default()),
                common::tier_choice(years),
            )],
        )
    };
    let Ok(engine) = competed(years, vec![office("LED troffer"), office("LED retrofit kit")])
    else {
        panic!("competition failed");
    };
    for i in 0..2 {
        let stock = competed_set(&engine, i).map(|s| s.master.stock.competed.measure[1].mean());
        assert!(stock.is_some_and(|v| approx(v, 50.0, 1e-9)), "{stock:?}");
    }
}

#[test]
fn truncated_tier_weights_rejected() {
    let years = 1;
    let short = Some(ChoiceParams::Commercial {
        tier_weights: vec![vec![0.2, 0.1]],
    });
    let office = |name: &str| {
        measure(
            name,
            "large office",
            years,
            vec![contributing(
                common::office_lighting_key(),
                record(years, Flat::default()),
                short.clone(),
            )],
        )
    };
    let result = Engine::new(
        common::config(years),
        vec![office("LED troffer"), office("LED retrofit kit")],
    );
    assert!(matches!(result, Err(EngineError::InvalidMeasure { .. })));
}

#[test]
fn secondary_follows_primary_share() {
    let years = 2;
    let mut inputs = residential_pair(years);
    let gain = Flat {
        stock: 0.0,
        energy_baseline: 500.0,
        energy_efficient: 520.0,
        cost_baseline: 0.0,
        cost_efficient: 0.0,
    };
    let schemes = inputs[0].markets.get_mut(&TP);
    assert!(schemes.is_some());
    if let Some(scheme) = schemes {
        scheme
            .contributing
            .push(contributing(secondary_key(), record(years, gain), None));
    }

    let mut engine = Engine::new(common::config(years), inputs).unwrap_or_else(|e| panic!("{e}"));
    assert!(engine.uncompeted_pass().is_ok());
    let summary = engine.competition_pass().unwrap_or_default();
    assert_eq!(summary.get(&TP).map(|s| s.secondary), Some(1));

    let share = 1.0 / (1.0 + 2f64.exp());
    let energy = competed_set(&engine, 0)
        .and_then(|s| s.contributing.get(&secondary_key()))
        .map(|c| c.record.energy.total.baseline[1].mean());
    assert!(energy.is_some_and(|e| approx(e, 500.0 * share, 1e-9)), "{energy:?}");
}

#[test]
fn uncontested_primary_leaves_secondary_unchanged() {
    let years = 2;
    let gain = Flat {
        stock: 0.0,
        ..Flat::default()
    };
    let led = measure(
        "LED",
        "single family home",
        years,
        vec![
            contributing(lighting_key(), record(years, Flat::default()), None),
            contributing(secondary_key(), record(years, gain), None),
        ],
    );
    let Ok(engine) = competed(years, vec![led]) else {
        panic!("competition failed");
    };
    let energy = competed_set(&engine, 0)
        .and_then(|s| s.contributing.get(&secondary_key()))
        .map(|c| c.record.energy.total.baseline[0].mean());
    assert_eq!(energy, Some(1_000.0));
}

#[test]
fn supply_demand_overlap_halves_energy_only() {
    let years = 2;
    let heating = |tech_type, technology: &str| {
        common::key(
            SegmentType::Primary,
            "single family home",
            "heating",
            tech_type,
            technology,
        )
    };
    let inputs = vec![
        measure(
            "ASHP",
            "single family home",
            years,
            vec![contributing(
                heating(TechType::Supply, "resistance heat"),
                record(years, Flat::default()),
                None,
            )],
        ),
        measure(
            "Windows",
            "single family home",
            years,
            vec![contributing(
                heating(TechType::Demand, "windows conduction"),
                record(years, Flat::default()),
                None,
            )],
        ),
    ];
    let mut engine = Engine::new(common::config(years), inputs).unwrap_or_else(|e| panic!("{e}"));
    assert!(engine.uncompeted_pass().is_ok());
    let summary = engine.competition_pass().unwrap_or_default();
    assert_eq!(summary.get(&TP).map(|s| s.overlap), Some(2));

    for i in 0..2 {
        let set = competed_set(&engine, i);
        assert!(set.is_some());
        if let Some(set) = set {
            assert!(approx(set.master.energy.total.baseline[0].mean(), 500.0, 1e-9));
            assert!(approx(set.master.energy.competed.efficient[1].mean(), 300.0, 1e-9));
            assert!(approx(set.master.stock.total.measure[0].mean(), 100.0, 1e-9));
        }
    }
}

#[test]
fn competition_pass_is_repeatable() {
    let mut engine =
        Engine::new(common::config(2), residential_pair(2)).unwrap_or_else(|e| panic!("{e}"));
    assert!(engine.uncompeted_pass().is_ok());
    assert!(engine.competition_pass().is_ok());
    let first = competed_set(&engine, 0).cloned();
    assert!(engine.competition_pass().is_ok());
    assert_eq!(competed_set(&engine, 0).cloned(), first);
}

#[test]
fn contested_key_without_choice_data_fails() {
    let years = 2;
    let inputs = (0..2)
        .map(|i| {
            measure(
                &format!("lamp {i}"),
                "single family home",
                years,
                vec![contributing(lighting_key(), record(years, Flat::default()), None)],
            )
        })
        .collect();
    let result = Engine::new(common::config(years), inputs).and_then(Engine::run);
    assert!(matches!(result, Err(EngineError::MissingChoiceData { .. })));
}

#[test]
fn competing_before_uncompeted_pass_fails() {
    let engine = Engine::new(common::config(2), residential_pair(2));
    assert!(engine.is_ok());
    if let Ok(mut engine) = engine {
        assert!(matches!(
            engine.competition_pass(),
            Err(EngineError::MissingConsumerMetrics { .. })
        ));
    }
}

#[test]
fn missing_scheme_rejected_at_construction() {
    let mut config = common::config(2);
    config.adoption.schemes = AdoptionScheme::ALL.to_vec();
    let result = Engine::new(config, residential_pair(2));
    assert!(matches!(
        result,
        Err(EngineError::MissingScheme {
            scheme: AdoptionScheme::MaxAdoptionPotential,
            ..
        })
    ));
}

#[test]
fn duplicate_measure_names_rejected() {
    let mut inputs = residential_pair(2);
    inputs[1].definition.name = "LED".into();
    assert!(matches!(
        Engine::new(common::config(2), inputs),
        Err(EngineError::InvalidMeasure { .. })
    ));
}
