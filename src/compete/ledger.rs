//! Exactly-once bookkeeping for competition adjustments.

use std::collections::HashSet;
use std::fmt;

use crate::error::EngineError;
use crate::measure::key::MicrosegmentKey;

/// Kind of in-place adjustment made to a measure's competed markets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjustmentKind {
    /// Market-share apportionment of a primary microsegment.
    Share,
    /// Scaling of a secondary microsegment to its primary group.
    Secondary,
    /// Halving of a heating/cooling supply-demand overlap.
    Overlap,
}

impl fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustmentKind::Share => write!(f, "market share"),
            AdjustmentKind::Secondary => write!(f, "secondary"),
            AdjustmentKind::Overlap => write!(f, "overlap"),
        }
    }
}

/// Records every (kind, measure, key) adjusted during one scheme's
/// competition.
#[derive(Debug, Default)]
pub struct AdjustmentLedger {
    applied: HashSet<(AdjustmentKind, String, MicrosegmentKey)>,
}

impl AdjustmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the right to adjust `key` of `measure` once.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateAdjustment`] if already claimed.
    pub fn claim(
        &mut self,
        kind: AdjustmentKind,
        measure: &str,
        key: &MicrosegmentKey,
    ) -> Result<(), EngineError> {
        if self
            .applied
            .insert((kind, measure.to_string(), key.clone()))
        {
            Ok(())
        } else {
            Err(EngineError::DuplicateAdjustment {
                kind,
                measure: measure.to_string(),
                key: key.clone(),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::key::{SegmentType, TechType, Vintage};

    fn key() -> MicrosegmentKey {
        MicrosegmentKey {
            segment: SegmentType::Primary,
            climate_zone: "AIA_CZ3".into(),
            bldg_type: "assembly".into(),
            fuel: "natural gas".into(),
            end_use: "heating".into(),
            tech_type: TechType::Supply,
            technology: "boiler".into(),
            vintage: Vintage::Existing,
        }
    }

    #[test]
    fn second_claim_fails() {
        let mut ledger = AdjustmentLedger::new();
        assert!(ledger.claim(AdjustmentKind::Share, "m", &key()).is_ok());
        assert!(matches!(
            ledger.claim(AdjustmentKind::Share, "m", &key()),
            Err(EngineError::DuplicateAdjustment {
                kind: AdjustmentKind::Share,
                ..
            })
        ));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn kinds_and_measures_are_independent() {
        let mut ledger = AdjustmentLedger::new();
        assert!(ledger.claim(AdjustmentKind::Share, "m", &key()).is_ok());
        assert!(ledger.claim(AdjustmentKind::Overlap, "m", &key()).is_ok());
        assert!(ledger.claim(AdjustmentKind::Share, "n", &key()).is_ok());
    }
}
