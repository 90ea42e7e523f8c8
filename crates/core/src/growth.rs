#![forbid(unsafe_code)]

use crate::error::{ContractViolation, ensure_non_negative};
use serde::Serialize;
use std::borrow::Cow;

/// Visual state of a node, derived from its cumulative record count.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GrowthTier {
    pub tier: u8,
    pub scale: f64,
    pub wireframe: bool,
    pub emissive_intensity: f64,
}

/// Tiers at or above this ordinal render with subdivided geometry.
pub const DETAILED_GEOMETRY_TIER: u8 = 3;

/// Tiers strictly below this ordinal render as wireframe ("little data yet").
pub const WIREFRAME_BELOW_TIER: u8 = 1;

impl GrowthTier {
    pub fn detailed_geometry(&self) -> bool {
        self.tier >= DETAILED_GEOMETRY_TIER
    }

    /// Wireframe meshes are drawn translucent.
    pub fn opacity(&self) -> f64 {
        if self.wireframe { 0.6 } else { 1.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierStep {
    pub min_records: i64,
    pub scale: f64,
    pub emissive_intensity: f64,
}

// Scale increments shrink tier over tier (+0.25, +0.20, +0.15, +0.10) so early
// growth reads clearly and large nodes stay bounded.
pub const STANDARD_TIER_STEPS: [TierStep; 5] = [
    TierStep {
        min_records: 0,
        scale: 0.6,
        emissive_intensity: 0.05,
    },
    TierStep {
        min_records: 5,
        scale: 0.85,
        emissive_intensity: 0.2,
    },
    TierStep {
        min_records: 25,
        scale: 1.05,
        emissive_intensity: 0.35,
    },
    TierStep {
        min_records: 100,
        scale: 1.2,
        emissive_intensity: 0.5,
    },
    TierStep {
        min_records: 500,
        scale: 1.3,
        emissive_intensity: 0.65,
    },
];

#[derive(Clone, Debug, PartialEq)]
pub struct TierTable {
    steps: Cow<'static, [TierStep]>,
    wireframe_below: u8,
}

impl Default for TierTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TierTable {
    pub const fn standard() -> Self {
        Self {
            steps: Cow::Borrowed(&STANDARD_TIER_STEPS),
            wireframe_below: WIREFRAME_BELOW_TIER,
        }
    }

    pub fn try_new(steps: Vec<TierStep>, wireframe_below: u8) -> Result<Self, ContractViolation> {
        let Some(first) = steps.first() else {
            return Err(ContractViolation::InvalidTierTable("at least one tier is required"));
        };
        if first.min_records != 0 {
            return Err(ContractViolation::InvalidTierTable(
                "the first tier must start at 0 records",
            ));
        }
        if steps.len() > usize::from(u8::MAX) {
            return Err(ContractViolation::InvalidTierTable("too many tiers"));
        }
        for pair in steps.windows(2) {
            if pair[1].min_records <= pair[0].min_records {
                return Err(ContractViolation::InvalidTierTable(
                    "tier boundaries must be strictly increasing",
                ));
            }
            if pair[1].scale < pair[0].scale
                || pair[1].emissive_intensity < pair[0].emissive_intensity
            {
                return Err(ContractViolation::InvalidTierTable(
                    "scale and emissive intensity must not decrease",
                ));
            }
        }
        if steps.iter().any(|s| !s.scale.is_finite() || !s.emissive_intensity.is_finite()) {
            return Err(ContractViolation::InvalidTierTable("scale and intensity must be finite"));
        }
        Ok(Self {
            steps: Cow::Owned(steps),
            wireframe_below,
        })
    }

    pub fn steps(&self) -> &[TierStep] {
        &self.steps
    }

    pub fn top_tier(&self) -> u8 {
        (self.steps.len() - 1) as u8
    }

    pub fn classify(&self, record_count: i64) -> Result<GrowthTier, ContractViolation> {
        ensure_non_negative("record_count", record_count)?;
        let index = self
            .steps
            .iter()
            .rposition(|step| record_count >= step.min_records)
            .unwrap_or(0);
        let step = &self.steps[index];
        let tier = index as u8;
        Ok(GrowthTier {
            tier,
            scale: step.scale,
            wireframe: tier < self.wireframe_below,
            emissive_intensity: step.emissive_intensity,
        })
    }
}

static STANDARD_TABLE: TierTable = TierTable::standard();

/// Classify a node's cumulative record count with the standard tier table.
pub fn classify_tier(record_count: i64) -> Result<GrowthTier, ContractViolation> {
    STANDARD_TABLE.classify(record_count)
}
