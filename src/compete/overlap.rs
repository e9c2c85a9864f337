//! Heating/cooling supply-demand double counting.

use std::collections::BTreeSet;

use super::adjust::Shares;
use crate::measure::key::MicrosegmentKey;

/// Fraction of an overlapping microsegment's energy each side keeps.
pub const OVERLAP_SHARE: f64 = 0.5;

/// The first key in `keys` describing the opposite side of `key`'s energy
/// flow, if any.
pub fn counterpart<'k>(
    key: &MicrosegmentKey,
    keys: &'k BTreeSet<MicrosegmentKey>,
) -> Option<&'k MicrosegmentKey> {
    keys.iter().find(|other| key.overlaps(other))
}

pub fn shares(years: usize) -> Shares {
    Shares::uniform(OVERLAP_SHARE, years)
}
