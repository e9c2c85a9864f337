//! Run pipeline: uncompeted metrics, competition, competed metrics.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::compete::{self, CompetitionSummary};
use crate::config::RunConfig;
use crate::error::EngineError;
use crate::finance::metrics::{ConsumerMetrics, MetricParams, PortfolioYear};
use crate::measure::{AdoptionScheme, Measure, MeasureInput, Stage};
use crate::savings::{self, SavingsRecord};

/// Savings and portfolio metrics of one measure under one scheme and stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    pub scheme: AdoptionScheme,
    pub stage: Stage,
    pub savings: SavingsRecord,
    pub portfolio: Vec<PortfolioYear>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureResult {
    pub name: String,
    pub consumer: ConsumerMetrics,
    /// Uncompeted results for every scheme, then competed results.
    pub stages: Vec<StageResult>,
}

impl MeasureResult {
    pub fn stage(&self, scheme: AdoptionScheme, stage: Stage) -> Option<&StageResult> {
        self.stages
            .iter()
            .find(|s| s.scheme == scheme && s.stage == stage)
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResults {
    pub first_year: i32,
    pub last_year: i32,
    pub measures: Vec<MeasureResult>,
    pub competition: BTreeMap<AdoptionScheme, CompetitionSummary>,
}

impl RunResults {
    pub fn measure(&self, name: &str) -> Option<&MeasureResult> {
        self.measures.iter().find(|m| m.name == name)
    }
}

/// Owns the validated measures of one run and drives them through the
/// pipeline.
pub struct Engine {
    config: RunConfig,
    measures: Vec<Measure>,
}

impl Engine {
    /// Validates every measure against the configured horizon and schemes.
    ///
    /// # Errors
    ///
    /// Returns the first invalid measure, or [`EngineError::MissingScheme`]
    /// when a measure lacks markets for a configured scheme.
    pub fn new(config: RunConfig, inputs: Vec<MeasureInput>) -> Result<Self, EngineError> {
        let mut measures = Vec::with_capacity(inputs.len());
        for input in inputs {
            let measure = Measure::new(input, &config.horizon)?;
            for scheme in &config.adoption.schemes {
                if !measure.uncompeted.contains_key(scheme) {
                    return Err(EngineError::MissingScheme {
                        measure: measure.name().to_string(),
                        scheme: *scheme,
                    });
                }
            }
            if measures.iter().any(|m: &Measure| m.name() == measure.name()) {
                return Err(EngineError::InvalidMeasure {
                    measure: measure.name().to_string(),
                    reason: "name used by another measure".into(),
                });
            }
            measures.push(measure);
        }
        Ok(Self { config, measures })
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    fn params(&self, measure: &Measure) -> MetricParams {
        let def = &measure.definition;
        MetricParams {
            discount_rate: self.config.finance.discount_rate,
            residential_rate: def
                .applies_residential()
                .then_some(self.config.finance.residential_rate),
            commercial_rates: def
                .applies_commercial()
                .then(|| self.config.commercial.tier_rates.clone()),
        }
    }

    fn calculate_stage(
        &self,
        measure: &Measure,
        scheme: AdoptionScheme,
        stage: Stage,
    ) -> Result<(StageResult, ConsumerMetrics), EngineError> {
        let set = measure
            .markets(scheme, stage)
            .ok_or_else(|| EngineError::MissingScheme {
                measure: measure.name().to_string(),
                scheme,
            })?;
        let calc = savings::calculate(measure.name(), set, &self.params(measure))?;
        Ok((
            StageResult {
                scheme,
                stage,
                savings: calc.outcome.savings,
                portfolio: calc.outcome.portfolio,
            },
            calc.consumer,
        ))
    }

    /// Computes uncompeted results and stores each measure's consumer
    /// metrics, taken from the first configured scheme.
    pub fn uncompeted_pass(&mut self) -> Result<Vec<Vec<StageResult>>, EngineError> {
        info!(measures = self.measures.len(), "computing uncompeted metrics");
        let mut all = Vec::with_capacity(self.measures.len());
        let mut consumers = Vec::with_capacity(self.measures.len());
        for measure in &self.measures {
            let mut stages = Vec::new();
            let mut consumer = None;
            for scheme in &self.config.adoption.schemes {
                let (result, metrics) = self.calculate_stage(measure, *scheme, Stage::Uncompeted)?;
                consumer.get_or_insert(metrics);
                stages.push(result);
            }
            all.push(stages);
            consumers.push(consumer);
        }
        for (measure, consumer) in self.measures.iter_mut().zip(consumers) {
            measure.consumer = consumer;
        }
        Ok(all)
    }

    /// Competes every configured scheme on fresh copies of the uncompeted
    /// markets.
    pub fn competition_pass(
        &mut self,
    ) -> Result<BTreeMap<AdoptionScheme, CompetitionSummary>, EngineError> {
        let years = self.config.horizon.len();
        let mut summaries = BTreeMap::new();
        for scheme in self.config.adoption.schemes.clone() {
            for measure in &mut self.measures {
                measure.reset_competed(scheme)?;
            }
            let summary = compete::compete(&mut self.measures, scheme, years)?;
            summaries.insert(scheme, summary);
        }
        Ok(summaries)
    }

    fn competed_pass(&self) -> Result<Vec<Vec<StageResult>>, EngineError> {
        info!(measures = self.measures.len(), "computing competed metrics");
        self.measures
            .iter()
            .map(|measure| {
                self.config
                    .adoption
                    .schemes
                    .iter()
                    .map(|scheme| {
                        self.calculate_stage(measure, *scheme, Stage::Competed)
                            .map(|(result, _)| result)
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }

    /// Runs the full pipeline.
    ///
    /// # Errors
    ///
    /// Any fatal condition in any phase aborts the run.
    pub fn run(mut self) -> Result<RunResults, EngineError> {
        let uncompeted = self.uncompeted_pass()?;
        let competition = self.competition_pass()?;
        let competed = self.competed_pass()?;

        let measures = self
            .measures
            .into_iter()
            .zip(uncompeted.into_iter().zip(competed))
            .map(|(measure, (mut stages, competed))| {
                stages.extend(competed);
                MeasureResult {
                    name: measure.definition.name,
                    consumer: measure
                        .consumer
                        .unwrap_or(ConsumerMetrics { years: Vec::new() }),
                    stages,
                }
            })
            .collect();
        info!("run complete");

        Ok(RunResults {
            first_year: self.config.horizon.first_year,
            last_year: self.config.horizon.last_year,
            measures,
            competition,
        })
    }
}
