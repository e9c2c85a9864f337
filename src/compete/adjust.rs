//! The in-place adjustment shared by every competition pass.

use tracing::debug;

use super::ledger::{AdjustmentKind, AdjustmentLedger};
use crate::ensemble::{Series, Value};
use crate::error::EngineError;
use crate::measure::key::MicrosegmentKey;
use crate::measure::markets::{ChannelSet, MarketSet, Scope};

/// Per-year fraction of a contributing record a measure keeps.
#[derive(Debug, Clone, PartialEq)]
pub struct Shares {
    /// Applied to the cumulative (total) channels.
    pub total: Series,
    /// Applied to the annual (competed) channels.
    pub competed: Series,
}

impl Shares {
    /// The same fraction in every year and scope.
    pub fn uniform(share: f64, years: usize) -> Self {
        Self {
            total: vec![Value::Scalar(share); years],
            competed: vec![Value::Scalar(share); years],
        }
    }

    fn scope(&self, scope: Scope) -> &Series {
        match scope {
            Scope::Total => &self.total,
            Scope::Competed => &self.competed,
        }
    }
}

/// Keeps `shares` of the contributing record at `key` and removes the rest
/// from the master record.
///
/// For every selected channel and year:
/// `master -= (1 - share) * contributing; contributing *= share`.
///
/// # Errors
///
/// Returns [`EngineError::DuplicateAdjustment`] if `kind` was already
/// applied to this measure and key, and fails on ensemble shape mismatch or
/// when the measure does not contribute to `key`.
pub fn apply(
    ledger: &mut AdjustmentLedger,
    kind: AdjustmentKind,
    measure: &str,
    set: &mut MarketSet,
    key: &MicrosegmentKey,
    shares: &Shares,
    channels: ChannelSet,
) -> Result<(), EngineError> {
    ledger.claim(kind, measure, key)?;

    let MarketSet {
        master,
        contributing,
        ..
    } = set;
    let entry = contributing
        .get_mut(key)
        .ok_or_else(|| EngineError::InvalidMeasure {
            measure: measure.to_string(),
            reason: format!("does not contribute to {key}"),
        })?;

    for scope in [Scope::Total, Scope::Competed] {
        let share = shares.scope(scope);
        let masters = master.channels_mut(scope, channels);
        let contribs = entry.record.channels_mut(scope, channels);
        for (m, c) in masters.into_iter().zip(contribs) {
            for ((mv, cv), s) in m.iter_mut().zip(c.iter_mut()).zip(share) {
                let kept = cv.try_mul(s)?;
                let removed = cv.try_sub(&kept)?;
                *mv = mv.try_sub(&removed)?;
                *cv = kept;
            }
        }
    }
    debug!(measure, %key, %kind, "adjustment applied");
    Ok(())
}
