//! Portfolio-level summary of a run, printed by the CLI.

use std::collections::BTreeMap;
use std::fmt;

use crate::compete::CompetitionSummary;
use crate::engine::RunResults;
use crate::ensemble::Series;
use crate::measure::{AdoptionScheme, Stage};

/// Final-year savings summed over every measure for one scheme and stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTotals {
    /// Energy savings against the cumulative market.
    pub energy: f64,
    pub energy_cost: f64,
    pub carbon: f64,
    /// Measures with a computable cost of conserved energy in the final year.
    pub cost_effective: usize,
}

/// Aggregate figures derived from a complete run.
///
/// Ensemble values enter as their mean.
#[derive(Debug, Clone)]
pub struct PortfolioReport {
    pub final_year: i32,
    pub measure_count: usize,
    pub totals: BTreeMap<(AdoptionScheme, Stage), StageTotals>,
    pub competition: BTreeMap<AdoptionScheme, CompetitionSummary>,
}

fn last_mean(series: &Series) -> f64 {
    series.last().map_or(0.0, |v| v.mean())
}

impl PortfolioReport {
    pub fn from_results(results: &RunResults) -> Self {
        let mut totals: BTreeMap<(AdoptionScheme, Stage), StageTotals> = BTreeMap::new();
        for m in &results.measures {
            for s in &m.stages {
                let t = totals.entry((s.scheme, s.stage)).or_default();
                t.energy += last_mean(&s.savings.energy.total);
                t.energy_cost += last_mean(&s.savings.energy_cost.total);
                t.carbon += last_mean(&s.savings.carbon.total);
                if s
                    .portfolio
                    .last()
                    .is_some_and(|p| p.cce.applicable_mean() != crate::SENTINEL)
                {
                    t.cost_effective += 1;
                }
            }
        }

        Self {
            final_year: results.last_year,
            measure_count: results.measures.len(),
            totals,
            competition: results.competition.clone(),
        }
    }

    /// Energy savings lost to competition under `scheme`, as a fraction of
    /// the uncompeted total. Zero when nothing was saved before competing.
    pub fn competition_loss(&self, scheme: AdoptionScheme) -> f64 {
        let energy = |stage| self.totals.get(&(scheme, stage)).map_or(0.0, |t| t.energy);
        let before = energy(Stage::Uncompeted);
        if before.abs() < f64::EPSILON {
            return 0.0;
        }
        1.0 - energy(Stage::Competed) / before
    }
}

impl fmt::Display for PortfolioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Portfolio Report ({}) ---", self.final_year)?;
        writeln!(f, "Measures:              {}", self.measure_count)?;
        for ((scheme, stage), t) in &self.totals {
            writeln!(f, "[{scheme}, {stage}]")?;
            writeln!(f, "  Energy savings:      {:.3}", t.energy)?;
            writeln!(f, "  Energy cost savings: {:.2}", t.energy_cost)?;
            writeln!(f, "  Carbon savings:      {:.6}", t.carbon)?;
            writeln!(
                f,
                "  Cost-effective:      {}/{}",
                t.cost_effective, self.measure_count
            )?;
        }
        for (scheme, c) in &self.competition {
            writeln!(
                f,
                "[{scheme}] contested: {}, secondary: {}, overlap: {}, loss: {:.1}%",
                c.contested,
                c.secondary,
                c.overlap,
                100.0 * self.competition_loss(*scheme)
            )?;
        }
        Ok(())
    }
}
