//! Coupling of secondary microsegments to their competed primary group.

use super::CapturedEnergy;
use super::adjust::Shares;
use crate::ensemble::{Value, zip_series};
use crate::error::EngineError;

/// Whether competition could have changed anything the secondary
/// microsegment depends on.
pub fn is_linked(captured: &CapturedEnergy) -> bool {
    !captured
        .original_total
        .iter()
        .chain(&captured.original_competed)
        .all(Value::is_zero)
}

/// Adjusted over original captured energy, per year and scope; 0 wherever
/// nothing was originally captured.
pub fn ratios(captured: &CapturedEnergy) -> Result<Shares, EngineError> {
    Ok(Shares {
        total: zip_series(
            &captured.adjusted_total,
            &captured.original_total,
            Value::div_or_zero,
        )?,
        competed: zip_series(
            &captured.adjusted_competed,
            &captured.original_competed,
            Value::div_or_zero,
        )?,
    })
}
