#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use pdr_oracle::OracleBudget;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdrProfile {
    /// Tight oracle budget and frame cap; gives up early.
    Fast,
    /// Generous budget suitable for CI runs.
    Ci,
    /// No budget and no frame cap.
    Thorough,
}

/// Order among obligations sharing a frame index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    #[default]
    Fifo,
    Lifo,
}

/// Order in which the generalizer tries to drop literals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropOrder {
    /// Ascending variable index.
    #[default]
    Forward,
    Reverse,
    /// Seeded pseudo-random permutation, reshuffled on every pass.
    Shuffled { seed: u64 },
}

pub const MAX_DEPTH_ENV: &str = "PDR_MAX_DEPTH";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdrOptions {
    /// Longest obligation chain before giving up with `Unknown`.
    pub max_obligation_depth: usize,
    /// Give up with `Unknown` once this many frames exist.
    pub max_frames: Option<usize>,
    pub tie_break: TieBreak,
    pub drop_order: DropOrder,
    /// Add the negated cube to blocking queries during generalization.
    pub relative_induction: bool,
    /// Re-queue a blocked obligation one frame higher.
    pub reschedule: bool,
    /// Re-check every verdict before returning it.
    pub certify: bool,
    pub budget: OracleBudget,
}

impl Default for PdrOptions {
    fn default() -> Self {
        Self::for_profile(PdrProfile::Ci)
    }
}

impl PdrOptions {
    pub fn for_profile(profile: PdrProfile) -> Self {
        let (conflict_limit, max_frames) = match profile {
            PdrProfile::Fast => (Some(10_000), Some(64)),
            PdrProfile::Ci => (Some(1_000_000), Some(1_024)),
            PdrProfile::Thorough => (None, None),
        };
        Self {
            max_obligation_depth: 100_000,
            max_frames,
            tie_break: TieBreak::Fifo,
            drop_order: DropOrder::Forward,
            relative_induction: true,
            reschedule: true,
            certify: true,
            budget: OracleBudget {
                conflict_limit,
                time_limit_ms: None,
            },
        }
    }

    /// Apply `PDR_MAX_DEPTH` when set to a number.
    pub fn apply_env(&mut self) {
        if let Some(depth) = std::env::var(MAX_DEPTH_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            self.max_obligation_depth = depth;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_scale_budgets() {
        let fast = PdrOptions::for_profile(PdrProfile::Fast);
        let thorough = PdrOptions::for_profile(PdrProfile::Thorough);
        assert!(fast.budget.conflict_limit.is_some());
        assert_eq!(thorough.budget.conflict_limit, None);
        assert_eq!(thorough.max_frames, None);
        assert_eq!(PdrOptions::default(), PdrOptions::for_profile(PdrProfile::Ci));
    }

    #[test]
    fn defaults_are_fifo_forward_with_relative_induction() {
        let o = PdrOptions::default();
        assert_eq!(o.tie_break, TieBreak::Fifo);
        assert_eq!(o.drop_order, DropOrder::Forward);
        assert!(o.relative_induction && o.reschedule && o.certify);
    }
}
