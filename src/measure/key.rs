//! Structured microsegment identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Building types modeled with the residential choice model.
pub const RESIDENTIAL_BLDG_TYPES: &[&str] =
    &["single family home", "multi family home", "mobile home"];

/// End uses subject to the heating/cooling supply-demand overlap.
pub const HTCL_END_USES: &[&str] = &["heating", "cooling"];

/// Whether a building type belongs to the residential sector.
pub fn is_residential_bldg(bldg_type: &str) -> bool {
    RESIDENTIAL_BLDG_TYPES.contains(&bldg_type)
}

/// Direct equipment replacement vs. induced (indirect) energy effect.
///
/// Ordered so that primary keys sort ahead of secondary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    Primary,
    Secondary,
}

/// Equipment (supply) vs. envelope/load (demand) technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechType {
    Supply,
    Demand,
}

/// Building vintage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vintage {
    New,
    Existing,
}

/// One addressable (location, building, fuel, end use, technology) slice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MicrosegmentKey {
    pub segment: SegmentType,
    pub climate_zone: String,
    pub bldg_type: String,
    pub fuel: String,
    pub end_use: String,
    pub tech_type: TechType,
    pub technology: String,
    pub vintage: Vintage,
}

/// Climate zone, building type and vintage shared by a primary microsegment
/// and the secondary microsegments it induces.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub climate_zone: String,
    pub bldg_type: String,
    pub vintage: Vintage,
}

impl MicrosegmentKey {
    pub fn is_primary(&self) -> bool {
        self.segment == SegmentType::Primary
    }

    pub fn is_residential(&self) -> bool {
        is_residential_bldg(&self.bldg_type)
    }

    pub fn group(&self) -> GroupKey {
        GroupKey {
            climate_zone: self.climate_zone.clone(),
            bldg_type: self.bldg_type.clone(),
            vintage: self.vintage,
        }
    }

    /// True when `other` describes the opposite side (supply vs. demand) of
    /// the same heating or cooling energy flow.
    pub fn overlaps(&self, other: &MicrosegmentKey) -> bool {
        HTCL_END_USES.contains(&self.end_use.as_str())
            && self.tech_type != other.tech_type
            && self.segment == other.segment
            && self.climate_zone == other.climate_zone
            && self.bldg_type == other.bldg_type
            && self.fuel == other.fuel
            && self.end_use == other.end_use
            && self.vintage == other.vintage
    }
}

impl fmt::Display for MicrosegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:?}, {}, {}, {}, {}, {:?}, {}, {:?})",
            self.segment,
            self.climate_zone,
            self.bldg_type,
            self.fuel,
            self.end_use,
            self.tech_type,
            self.technology,
            self.vintage
        )
    }
}
