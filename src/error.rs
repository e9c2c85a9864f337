//! Fatal error conditions raised by the engine.

use thiserror::Error;

use crate::compete::ledger::AdjustmentKind;
use crate::measure::key::MicrosegmentKey;
use crate::measure::AdoptionScheme;

/// Errors that abort a run.
///
/// Recoverable numeric conditions (non-converging IRR, zero addressable
/// stock) never surface here; they are reported through [`crate::SENTINEL`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Two ensembles of different length met in one operation.
    #[error("ensemble shape mismatch: {left} vs {right} samples")]
    ShapeMismatch { left: usize, right: usize },
    /// A time series does not cover the modeling horizon.
    #[error("series `{field}` has {found} years, expected {expected}")]
    SeriesLength {
        field: String,
        found: usize,
        expected: usize,
    },
    /// The measure has no market data for the requested adoption scheme.
    #[error("measure `{measure}` has no markets for scheme `{scheme}`")]
    MissingScheme {
        measure: String,
        scheme: AdoptionScheme,
    },
    /// A contested key lacks the choice data its market-share model needs.
    #[error("measure `{measure}` lacks {what} for {key}")]
    MissingChoiceData {
        measure: String,
        key: MicrosegmentKey,
        what: &'static str,
    },
    /// Competition was attempted before the measure's consumer metrics exist.
    #[error("measure `{measure}` has no consumer metrics; run the uncompeted pass first")]
    MissingConsumerMetrics { measure: String },
    /// The same adjustment was requested twice for one measure and key.
    #[error("{kind} adjustment already applied to measure `{measure}` for {key}")]
    DuplicateAdjustment {
        kind: AdjustmentKind,
        measure: String,
        key: MicrosegmentKey,
    },
    /// A measure definition failed validation.
    #[error("invalid measure `{measure}`: {reason}")]
    InvalidMeasure { measure: String, reason: String },
    /// Measure input could not be parsed.
    #[error("cannot load measures: {0}")]
    Input(String),
}
