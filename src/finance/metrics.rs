//! Portfolio and consumer metrics for one year of one measure.
//!
//! The scalar engine works on [`UnitEconomics`]; [`evaluate`] runs it once
//! per ensemble element and reassembles [`Value`]s.

use serde::Serialize;

use super::{annualize, irr, npv, payback};
use crate::SENTINEL;
use crate::ensemble::{Value, common_samples};
use crate::error::EngineError;

/// Carbon quantities are in MMTons; CCC is reported per ton.
const CARBON_SCALE: f64 = 1e6;

/// Per-unit economics of one measure in one year, all values scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitEconomics {
    /// Baseline technology lifetime, clamped to at least one year.
    pub baseline_life: u32,
    /// Measure lifetime, rounded and clamped to at least one year.
    pub measure_life: u32,
    pub baseline_cost: f64,
    /// Baseline minus measure capital cost; negative for a costlier measure.
    pub incremental_cost: f64,
    pub measure_cost: f64,
    pub energy_savings: f64,
    pub energy_cost_savings: f64,
    pub carbon_savings: f64,
    pub carbon_cost_savings: f64,
    pub measure_energy_cost: f64,
    pub measure_carbon_cost: f64,
}

/// Rounds a lifetime in years to a whole number of at least one.
pub fn whole_years(life: f64) -> u32 {
    if !life.is_finite() {
        return 1;
    }
    life.max(1.0).round().min(f64::from(u32::MAX)) as u32
}

impl UnitEconomics {
    /// Incremental capital flow with avoided baseline replacements.
    pub fn capital_flow(&self) -> Vec<f64> {
        let n = self.measure_life as usize;
        let mut flow = vec![0.0; n + 1];
        flow[0] = self.incremental_cost;
        if self.measure_life > self.baseline_life {
            let step = self.baseline_life.max(1) as usize;
            for y in (step..n).step_by(step) {
                flow[y] += self.baseline_cost;
            }
        }
        flow
    }

    /// Constant `per_year` in positions 1..=measure_life.
    pub fn level_flow(&self, per_year: f64) -> Vec<f64> {
        let mut flow = vec![per_year; self.measure_life as usize + 1];
        flow[0] = 0.0;
        flow
    }

    pub fn portfolio(&self, rate: f64) -> PortfolioPoint {
        let capital = npv(rate, &self.capital_flow());
        let energy = npv(rate, &self.level_flow(self.energy_savings));
        let energy_cost = npv(rate, &self.level_flow(self.energy_cost_savings));
        let carbon = npv(rate, &self.level_flow(self.carbon_savings)) * CARBON_SCALE;
        let carbon_cost = npv(rate, &self.level_flow(self.carbon_cost_savings));

        let ratio = |num: f64, den: f64| if den > 0.0 { -num / den } else { SENTINEL };
        PortfolioPoint {
            cce: ratio(capital, energy),
            cce_carbon_benefit: ratio(capital + carbon_cost, energy),
            ccc: ratio(capital, carbon),
            ccc_energy_benefit: ratio(capital + energy_cost, carbon),
        }
    }

    /// Annualized measure unit capital and operating costs at `rate`.
    pub fn anpv(&self, rate: f64) -> AnpvPoint {
        let mut stock_flow = vec![0.0; self.measure_life as usize + 1];
        stock_flow[0] = self.measure_cost;
        let annual = |flow: &[f64]| annualize(npv(rate, flow), rate, self.measure_life);
        AnpvPoint {
            stock: annual(&stock_flow),
            energy: annual(&self.level_flow(self.measure_energy_cost)),
            carbon: annual(&self.level_flow(self.measure_carbon_cost)),
        }
    }

    pub fn consumer(&self, residential: Option<f64>, commercial: Option<&[f64]>) -> ConsumerPoint {
        let capital = self.capital_flow();
        let energy_cost = self.level_flow(self.energy_cost_savings);
        let carbon_cost = self.level_flow(self.carbon_cost_savings);
        let with_energy: Vec<f64> = capital.iter().zip(&energy_cost).map(|(a, b)| a + b).collect();
        let with_carbon: Vec<f64> = with_energy
            .iter()
            .zip(&carbon_cost)
            .map(|(a, b)| a + b)
            .collect();

        let finite_or_sentinel = |v: Option<f64>| v.filter(|x| x.is_finite()).unwrap_or(SENTINEL);
        ConsumerPoint {
            anpv_residential: residential.map(|r| self.anpv(r)),
            anpv_commercial: commercial.map(|rates| rates.iter().map(|r| self.anpv(*r)).collect()),
            irr_energy: finite_or_sentinel(irr(&with_energy)),
            irr_energy_carbon: finite_or_sentinel(irr(&with_carbon)),
            payback_energy: finite_or_sentinel(payback(&with_energy)),
            payback_energy_carbon: finite_or_sentinel(payback(&with_carbon)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioPoint {
    pub cce: f64,
    pub cce_carbon_benefit: f64,
    pub ccc: f64,
    pub ccc_energy_benefit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnpvPoint {
    pub stock: f64,
    pub energy: f64,
    pub carbon: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerPoint {
    pub anpv_residential: Option<AnpvPoint>,
    pub anpv_commercial: Option<Vec<AnpvPoint>>,
    pub irr_energy: f64,
    pub irr_energy_carbon: f64,
    pub payback_energy: f64,
    pub payback_energy_carbon: f64,
}

/// Cost of conserved energy and carbon for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioYear {
    pub cce: Value,
    pub cce_carbon_benefit: Value,
    pub ccc: Value,
    pub ccc_energy_benefit: Value,
}

impl PortfolioYear {
    pub fn sentinel() -> Self {
        let s = Value::Scalar(SENTINEL);
        Self {
            cce: s.clone(),
            cce_carbon_benefit: s.clone(),
            ccc: s.clone(),
            ccc_energy_benefit: s,
        }
    }
}

/// Annualized unit capital (stock) and operating costs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anpv {
    pub stock: Value,
    pub energy: Value,
    pub carbon: Value,
}

impl Anpv {
    fn sentinel() -> Self {
        let s = Value::Scalar(SENTINEL);
        Self {
            stock: s.clone(),
            energy: s.clone(),
            carbon: s,
        }
    }
}

/// Consumer-facing metrics for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumerYear {
    /// Present when the measure applies to a residential building type.
    pub anpv_residential: Option<Anpv>,
    /// One entry per commercial tier, when the measure applies to a
    /// commercial building type.
    pub anpv_commercial: Option<Vec<Anpv>>,
    pub irr_energy: Value,
    pub irr_energy_carbon: Value,
    pub payback_energy: Value,
    pub payback_energy_carbon: Value,
}

impl ConsumerYear {
    pub fn sentinel(params: &MetricParams) -> Self {
        let s = Value::Scalar(SENTINEL);
        Self {
            anpv_residential: params.residential_rate.map(|_| Anpv::sentinel()),
            anpv_commercial: params
                .commercial_rates
                .as_ref()
                .map(|rates| rates.iter().map(|_| Anpv::sentinel()).collect()),
            irr_energy: s.clone(),
            irr_energy_carbon: s.clone(),
            payback_energy: s.clone(),
            payback_energy_carbon: s,
        }
    }

    /// Keeps the annualized costs and replaces IRR and payback with the
    /// sentinel.
    pub fn anpv_only(self) -> Self {
        let s = Value::Scalar(SENTINEL);
        Self {
            irr_energy: s.clone(),
            irr_energy_carbon: s.clone(),
            payback_energy: s.clone(),
            payback_energy_carbon: s,
            ..self
        }
    }
}

/// Consumer metrics of a measure, one entry per horizon year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumerMetrics {
    pub years: Vec<ConsumerYear>,
}

/// Discounting parameters for one measure.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricParams {
    pub discount_rate: f64,
    /// Residential consumer rate, if the measure has residential markets.
    pub residential_rate: Option<f64>,
    /// Commercial tier rates, if the measure has commercial markets.
    pub commercial_rates: Option<Vec<f64>>,
}

/// Per-unit inputs of one year, possibly ensembles.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitInputs {
    pub baseline_life: Value,
    pub measure_life: Value,
    pub baseline_cost: Value,
    pub incremental_cost: Value,
    pub measure_cost: Value,
    pub energy_savings: Value,
    pub energy_cost_savings: Value,
    pub carbon_savings: Value,
    pub carbon_cost_savings: Value,
    pub measure_energy_cost: Value,
    pub measure_carbon_cost: Value,
}

impl UnitInputs {
    fn fields(&self) -> [&Value; 11] {
        [
            &self.baseline_life,
            &self.measure_life,
            &self.baseline_cost,
            &self.incremental_cost,
            &self.measure_cost,
            &self.energy_savings,
            &self.energy_cost_savings,
            &self.carbon_savings,
            &self.carbon_cost_savings,
            &self.measure_energy_cost,
            &self.measure_carbon_cost,
        ]
    }

    fn at(&self, i: usize) -> UnitEconomics {
        UnitEconomics {
            baseline_life: whole_years(self.baseline_life.at(i)),
            measure_life: whole_years(self.measure_life.at(i)),
            baseline_cost: self.baseline_cost.at(i),
            incremental_cost: self.incremental_cost.at(i),
            measure_cost: self.measure_cost.at(i),
            energy_savings: self.energy_savings.at(i),
            energy_cost_savings: self.energy_cost_savings.at(i),
            carbon_savings: self.carbon_savings.at(i),
            carbon_cost_savings: self.carbon_cost_savings.at(i),
            measure_energy_cost: self.measure_energy_cost.at(i),
            measure_carbon_cost: self.measure_carbon_cost.at(i),
        }
    }
}

/// Runs the scalar engine per ensemble element.
///
/// # Errors
///
/// Returns [`EngineError::ShapeMismatch`] if the inputs carry ensembles of
/// different lengths.
pub fn evaluate(
    inputs: &UnitInputs,
    params: &MetricParams,
) -> Result<(PortfolioYear, ConsumerYear), EngineError> {
    let samples = common_samples(&inputs.fields())?;
    let points: Vec<(PortfolioPoint, ConsumerPoint)> = (0..samples.unwrap_or(1))
        .map(|i| {
            let unit = inputs.at(i);
            (
                unit.portfolio(params.discount_rate),
                unit.consumer(params.residential_rate, params.commercial_rates.as_deref()),
            )
        })
        .collect();

    let collect = |f: &dyn Fn(&(PortfolioPoint, ConsumerPoint)) -> f64| {
        Value::from_samples(samples, points.iter().map(f).collect())
    };
    let anpv_at = |pick: &dyn Fn(&ConsumerPoint) -> Option<AnpvPoint>| Anpv {
        stock: collect(&|p| pick(&p.1).map_or(SENTINEL, |a| a.stock)),
        energy: collect(&|p| pick(&p.1).map_or(SENTINEL, |a| a.energy)),
        carbon: collect(&|p| pick(&p.1).map_or(SENTINEL, |a| a.carbon)),
    };

    let portfolio = PortfolioYear {
        cce: collect(&|p| p.0.cce),
        cce_carbon_benefit: collect(&|p| p.0.cce_carbon_benefit),
        ccc: collect(&|p| p.0.ccc),
        ccc_energy_benefit: collect(&|p| p.0.ccc_energy_benefit),
    };
    let consumer = ConsumerYear {
        anpv_residential: params
            .residential_rate
            .map(|_| anpv_at(&|c| c.anpv_residential)),
        anpv_commercial: params.commercial_rates.as_ref().map(|rates| {
            (0..rates.len())
                .map(|tier| {
                    anpv_at(&|c| c.anpv_commercial.as_ref().and_then(|t| t.get(tier).copied()))
                })
                .collect()
        }),
        irr_energy: collect(&|p| p.1.irr_energy),
        irr_energy_carbon: collect(&|p| p.1.irr_energy_carbon),
        payback_energy: collect(&|p| p.1.payback_energy),
        payback_energy_carbon: collect(&|p| p.1.payback_energy_carbon),
    };
    Ok((portfolio, consumer))
}
