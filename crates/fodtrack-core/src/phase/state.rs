//! Phase tracking state records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fodmap::FodmapCategory;

/// Both phase-2 counters are capped here.
pub const MAX_REINTRODUCTION_DAYS: u8 = 3;
pub const MAX_BREAK_DAYS: u8 = 3;

/// The three protocol phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Strict low-FODMAP elimination.
    Elimination,
    /// Systematic per-category reintroduction.
    Reintroduction,
    /// Personalized long-term diet.
    Personalization,
}

impl Phase {
    pub fn number(self) -> u8 {
        match self {
            Phase::Elimination => 1,
            Phase::Reintroduction => 2,
            Phase::Personalization => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Phase::Elimination),
            2 => Some(Phase::Reintroduction),
            3 => Some(Phase::Personalization),
            _ => None,
        }
    }
}

/// Per-user tracking counters. Mutated only by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseState {
    pub current_phase: Phase,
    pub phase1_streak_days: u32,
    /// Days into the current reintroduction test, clamped to [0, 3].
    pub phase2_reintroduction_days: u8,
    /// Consecutive low-FODMAP break days, clamped to [0, 3].
    pub phase2_break_days: u8,
    pub phase2_current_group: Option<FodmapCategory>,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self {
            current_phase: Phase::Elimination,
            phase1_streak_days: 0,
            phase2_reintroduction_days: 0,
            phase2_break_days: 0,
            phase2_current_group: None,
        }
    }
}

/// Phase start instants. Set by explicit user action, read-only to the
/// engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub phase1_start: Option<DateTime<Utc>>,
    pub phase2_start: Option<DateTime<Utc>>,
}

/// Outcome of one FODMAP category's reintroduction test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupResult {
    Untested,
    /// Tolerated: no severity above the low ceiling during the window.
    Low,
    /// Triggered symptoms during the test window.
    High,
}

impl GroupResult {
    /// Storage code: 0 untested, 2 low, 3 high.
    pub fn code(self) -> u8 {
        match self {
            GroupResult::Untested => 0,
            GroupResult::Low => 2,
            GroupResult::High => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(GroupResult::Untested),
            2 => Some(GroupResult::Low),
            3 => Some(GroupResult::High),
            _ => None,
        }
    }
}

/// Per-category reintroduction results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupResults {
    results: [GroupResult; 6],
}

impl Default for GroupResults {
    fn default() -> Self {
        Self {
            results: [GroupResult::Untested; 6],
        }
    }
}

impl GroupResults {
    pub fn result(&self, category: FodmapCategory) -> GroupResult {
        self.results[Self::index(category)]
    }

    pub fn set_result(&mut self, category: FodmapCategory, result: GroupResult) {
        self.results[Self::index(category)] = result;
    }

    /// Categories still awaiting a test.
    pub fn untested(&self) -> Vec<FodmapCategory> {
        FodmapCategory::ALL
            .into_iter()
            .filter(|c| self.result(*c) == GroupResult::Untested)
            .collect()
    }

    fn index(category: FodmapCategory) -> usize {
        FodmapCategory::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or(0)
    }
}

/// Per-user reintroduction tracking record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase2Tracking {
    pub results: GroupResults,
    pub current_group: Option<FodmapCategory>,
    /// Start of the current group's 3-day test window; advanced by the
    /// engine once break accumulation runs.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_numbers_round_trip() {
        for phase in [
            Phase::Elimination,
            Phase::Reintroduction,
            Phase::Personalization,
        ] {
            assert_eq!(Phase::from_number(phase.number()), Some(phase));
        }
        assert_eq!(Phase::from_number(0), None);
        assert_eq!(Phase::from_number(4), None);
    }

    #[test]
    fn group_result_codes_round_trip() {
        for result in [GroupResult::Untested, GroupResult::Low, GroupResult::High] {
            assert_eq!(GroupResult::from_code(result.code()), Some(result));
        }
        assert_eq!(GroupResult::from_code(1), None);
    }

    #[test]
    fn group_results_track_per_category() {
        let mut results = GroupResults::default();
        assert_eq!(results.untested().len(), 6);

        results.set_result(FodmapCategory::Lactose, GroupResult::High);
        results.set_result(FodmapCategory::Sorbitol, GroupResult::Low);

        assert_eq!(results.result(FodmapCategory::Lactose), GroupResult::High);
        assert_eq!(results.result(FodmapCategory::Sorbitol), GroupResult::Low);
        assert_eq!(results.result(FodmapCategory::Fructose), GroupResult::Untested);
        assert_eq!(results.untested().len(), 4);
    }
}
