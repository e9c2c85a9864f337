//! Measure competition and financial-metrics engine for building energy
//! conservation measures.

pub mod compete;
pub mod config;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod finance;
/// Measure file loading and results export.
pub mod io;
pub mod measure;
pub mod report;
pub mod sample;
pub mod savings;

/// Reported in place of any metric that cannot be computed.
pub const SENTINEL: f64 = 999.0;
