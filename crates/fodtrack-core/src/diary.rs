//! Symptom diary records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Highest recordable symptom severity.
pub const MAX_SEVERITY: u8 = 10;

/// Severities at or below this count as symptom-free.
pub const LOW_SYMPTOM_CEILING: u8 = 2;

/// The four symptom severities recorded per diary entry, each 0-10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomScores {
    pub pain: u8,
    pub bloating: u8,
    pub gas: u8,
    pub nausea: u8,
}

impl SymptomScores {
    /// Build a score set, rejecting values above [`MAX_SEVERITY`].
    pub fn new(pain: u8, bloating: u8, gas: u8, nausea: u8) -> Result<Self, ValidationError> {
        for (field, value) in [
            ("pain", pain),
            ("bloating", bloating),
            ("gas", gas),
            ("nausea", nausea),
        ] {
            if value > MAX_SEVERITY {
                return Err(ValidationError::SeverityOutOfRange {
                    field,
                    value: value as i64,
                });
            }
        }
        Ok(Self {
            pain,
            bloating,
            gas,
            nausea,
        })
    }

    /// The worst of the four severities.
    pub fn worst(&self) -> u8 {
        self.pain.max(self.bloating).max(self.gas).max(self.nausea)
    }

    /// Whether every severity is at or below [`LOW_SYMPTOM_CEILING`].
    pub fn all_low(&self) -> bool {
        self.worst() <= LOW_SYMPTOM_CEILING
    }
}

/// A single symptom diary entry. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: i64,
    pub user_id: i64,
    pub scores: SymptomScores,
    pub note: Option<String>,
    pub logged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_severity() {
        let err = SymptomScores::new(0, 11, 0, 0).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::SeverityOutOfRange {
                field: "bloating",
                value: 11
            }
        ));
    }

    #[test]
    fn low_ceiling_is_inclusive() {
        let at_ceiling = SymptomScores::new(2, 2, 2, 2).unwrap();
        assert!(at_ceiling.all_low());

        let above = SymptomScores::new(2, 3, 0, 0).unwrap();
        assert!(!above.all_low());
        assert_eq!(above.worst(), 3);
    }
}
