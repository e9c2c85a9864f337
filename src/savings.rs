//! Yearly savings and financial metrics of one measure's market set.

use serde::Serialize;
use tracing::{debug, warn};

use crate::ensemble::{Series, Value, zip_series};
use crate::error::EngineError;
use crate::finance::metrics::{
    ConsumerMetrics, ConsumerYear, MetricParams, PortfolioYear, UnitInputs, evaluate,
};
use crate::measure::markets::{MarketRecord, MarketSet, Scoped, Split};

/// Baseline minus efficient value of one quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Savings {
    /// Against the cumulative (total) market.
    pub total: Series,
    /// Against the annual (competed) market.
    pub annual: Series,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsRecord {
    pub stock_cost: Savings,
    pub energy: Savings,
    pub energy_cost: Savings,
    pub carbon: Savings,
    pub carbon_cost: Savings,
}

fn saved(split: &Scoped<Split>) -> Result<Savings, EngineError> {
    let diff = |s: &Split| zip_series(&s.baseline, &s.efficient, Value::try_sub);
    Ok(Savings {
        total: diff(&split.total)?,
        annual: diff(&split.competed)?,
    })
}

impl SavingsRecord {
    /// Savings implied by a master record.
    ///
    /// # Errors
    ///
    /// Fails on ensemble shape mismatch.
    pub fn from_master(master: &MarketRecord) -> Result<Self, EngineError> {
        Ok(Self {
            stock_cost: saved(&master.cost.stock)?,
            energy: saved(&master.energy)?,
            energy_cost: saved(&master.cost.energy)?,
            carbon: saved(&master.carbon)?,
            carbon_cost: saved(&master.cost.carbon)?,
        })
    }
}

/// Savings and portfolio metrics of one measure, scheme and stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOutcome {
    pub savings: SavingsRecord,
    pub portfolio: Vec<PortfolioYear>,
}

/// Result of one calculator pass.
#[derive(Debug, Clone)]
pub struct Calculation {
    pub outcome: StageOutcome,
    pub consumer: ConsumerMetrics,
}

/// Derives savings and per-unit metrics for every year of `set`.
///
/// Years with no addressable units report [`crate::SENTINEL`] for every
/// metric. Years where fewer than one unit is captured still carry ANPV,
/// which depends only on per-unit costs, but report the sentinel for
/// CCE, CCC, IRR and payback.
///
/// # Errors
///
/// Fails when ensemble lengths disagree.
pub fn calculate(
    measure: &str,
    set: &MarketSet,
    params: &MetricParams,
) -> Result<Calculation, EngineError> {
    let master = &set.master;
    let savings = SavingsRecord::from_master(master)?;

    let years = master.stock.total.all.len();
    let mut portfolio = Vec::with_capacity(years);
    let mut consumer = Vec::with_capacity(years);
    let mut sentinel_years = 0usize;

    for y in 0..years {
        let units = &master.stock.total.all[y];
        let captured = &master.stock.total.measure[y];
        if units.is_zero() {
            sentinel_years += 1;
            portfolio.push(PortfolioYear::sentinel());
            consumer.push(ConsumerYear::sentinel(params));
            continue;
        }

        let per_unit = |v: &Value| v.div_or_zero(units);
        let stock_cost = &master.cost.stock.total;
        let baseline_cost = per_unit(&stock_cost.baseline[y])?;
        let measure_cost = per_unit(&stock_cost.efficient[y])?;
        let inputs = UnitInputs {
            baseline_life: set.lifetime.baseline[y].map(|l| l.max(1.0)),
            measure_life: set.lifetime.measure.map(|l| l.max(1.0).round()),
            incremental_cost: baseline_cost.try_sub(&measure_cost)?,
            baseline_cost,
            measure_cost,
            energy_savings: per_unit(&savings.energy.total[y])?,
            energy_cost_savings: per_unit(&savings.energy_cost.total[y])?,
            carbon_savings: per_unit(&savings.carbon.total[y])?,
            carbon_cost_savings: per_unit(&savings.carbon_cost.total[y])?,
            measure_energy_cost: per_unit(&master.cost.energy.total.efficient[y])?,
            measure_carbon_cost: per_unit(&master.cost.carbon.total.efficient[y])?,
        };
        let (p, c) = evaluate(&inputs, params)?;
        if captured.max() < 1.0 {
            sentinel_years += 1;
            portfolio.push(PortfolioYear::sentinel());
            consumer.push(c.anpv_only());
        } else {
            portfolio.push(p);
            consumer.push(c);
        }
    }

    if sentinel_years > 0 {
        warn!(
            measure,
            sentinel_years, "no addressable or captured units; metrics set to sentinel"
        );
    }
    debug!(measure, years, "metrics computed");

    Ok(Calculation {
        outcome: StageOutcome { savings, portfolio },
        consumer: ConsumerMetrics { years: consumer },
    })
}
