//! Redistribution of market share that measures cannot address.

use crate::ensemble::{Series, Value};
use crate::error::EngineError;

/// Re-allocates the share each measure loses to its sub-market scaling.
///
/// A measure that can only address `scaling` of a microsegment forfeits
/// `(1 - scaling) * raw` of its fraction. The forfeited total is handed back
/// to all competitors in proportion to their raw fractions, so fractions
/// that summed to one still do.
///
/// `raw[m][y]` is measure `m`'s fraction in year `y`.
pub fn reconcile(raw: &[Series], scaling: &[f64]) -> Result<Vec<Series>, EngineError> {
    let years = raw.first().map_or(0, Vec::len);
    let mut out: Vec<Series> = raw.iter().map(|r| Vec::with_capacity(r.len())).collect();

    for y in 0..years {
        let mut unaddressed = Value::Scalar(0.0);
        for (r, s) in raw.iter().zip(scaling) {
            unaddressed = unaddressed.try_add(&r[y].scale(1.0 - s))?;
        }
        for ((r, s), o) in raw.iter().zip(scaling).zip(out.iter_mut()) {
            let forfeited = r[y].scale(1.0 - s);
            let addition = unaddressed.try_mul(&r[y])?.try_sub(&forfeited)?;
            o.push(r[y].try_add(&addition)?);
        }
    }
    Ok(out)
}
