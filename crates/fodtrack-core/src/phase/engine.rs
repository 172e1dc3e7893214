//! Streak engine: orchestrates the two calculators over the stores.
//!
//! Every operation takes an injected `now` instant, captured once by the
//! caller and reused throughout, so a computation never straddles a day
//! boundary and tests can simulate arbitrary days. Timezone validation
//! happens before the first store access.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::{bucket_by_local_date, day_start_utc, local_date, parse_utc_offset};
use crate::diary::DiaryEntry;
use crate::error::{CoreError, MissingResource, Result, StoreError};
use crate::fodmap::FodmapCategory;
use crate::food_log::FoodLogEntry;
use crate::phase::elimination::symptom_free_streak;
use crate::phase::reintroduction::{evaluate, Phase2Input, ReintroState};
use crate::phase::state::{GroupResult, Phase2Tracking, PhaseState, PhaseTimings};

/// Read access to a user's diary and food-log history.
pub trait DiaryStore {
    /// Diary entries for the user, optionally only at or after `since`.
    fn diary_entries(&self, user_id: i64, since: Option<DateTime<Utc>>)
        -> Result<Vec<DiaryEntry>, StoreError>;

    /// Food log entries with food references resolved to canonical
    /// FODMAP profiles.
    fn food_log_entries(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<FoodLogEntry>, StoreError>;
}

/// The phase-2 write set. Committed in one transaction: either all of
/// it lands or none of it does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase2Commit {
    pub reintroduction_days: u8,
    pub break_days: u8,
    /// Result to record for a group judged this step.
    pub group_result: Option<(FodmapCategory, GroupResult)>,
    /// Clear the current group on both state and tracking records.
    pub clear_group: bool,
    /// New tracking `updated_at`, set once break accumulation ran.
    pub touch_updated_at: Option<DateTime<Utc>>,
}

/// Read/write access to a user's phase state.
pub trait PhaseStore {
    fn phase_timings(&self, user_id: i64) -> Result<Option<PhaseTimings>, StoreError>;
    fn phase_state(&self, user_id: i64) -> Result<Option<PhaseState>, StoreError>;
    fn phase2_tracking(&self, user_id: i64) -> Result<Option<Phase2Tracking>, StoreError>;

    /// Overwrite the stored phase-1 streak counter.
    fn update_phase1_streak(&self, user_id: i64, streak_days: u32) -> Result<(), StoreError>;

    /// Apply a phase-2 advance atomically.
    fn commit_phase2_advance(&self, user_id: i64, commit: &Phase2Commit)
        -> Result<(), StoreError>;
}

/// Result of a phase-1 streak computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase1Report {
    pub streak_days: u32,
    /// The phase-1 start date the walk was bounded by, if one was set.
    pub phase1_date_used: Option<NaiveDate>,
}

/// Result of one phase-2 advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase2Report {
    pub reintroduction_days: u8,
    pub break_days: u8,
    pub days_since_phase2: i64,
    pub state: ReintroState,
}

/// The reintroduction streak engine.
///
/// A thin orchestrator: reads history and state, runs the pure
/// calculators, writes the results back. Holds no state of its own.
pub struct StreakEngine<S> {
    store: S,
}

impl<S> StreakEngine<S>
where
    S: DiaryStore + PhaseStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Recompute the phase-1 symptom-free streak and persist it.
    ///
    /// Without a phase-1 start date the whole diary history is used.
    ///
    /// # Errors
    /// Fails with a validation error on a malformed timezone (before any
    /// store access) or a store error on read/write failure.
    pub fn compute_phase1_streak(
        &self,
        user_id: i64,
        timezone: &str,
        now: DateTime<Utc>,
    ) -> Result<Phase1Report> {
        let offset = parse_utc_offset(timezone)?;
        let today = local_date(now, offset);

        let timings = self
            .store
            .phase_timings(user_id)?
            .unwrap_or_default();
        let start_date = timings.phase1_start.map(|t| local_date(t, offset));
        let since = start_date.map(|d| day_start_utc(d, offset));

        let entries = self.store.diary_entries(user_id, since)?;
        let buckets =
            bucket_by_local_date(entries.into_iter().map(|e| (e.logged_at, e.scores)), offset);

        let streak_days = symptom_free_streak(today, start_date, &buckets);
        self.store.update_phase1_streak(user_id, streak_days)?;

        Ok(Phase1Report {
            streak_days,
            phase1_date_used: start_date,
        })
    }

    /// Advance the phase-2 reintroduction/break machine by one step.
    ///
    /// # Errors
    /// Fails with `NotFound` when the phase-2 start date, phase state,
    /// or tracking record is missing; with a validation error on a
    /// malformed timezone; or with a store error. Counter updates are
    /// all-or-nothing.
    pub fn advance_phase2(
        &self,
        user_id: i64,
        timezone: &str,
        now: DateTime<Utc>,
    ) -> Result<Phase2Report> {
        let offset = parse_utc_offset(timezone)?;
        let today = local_date(now, offset);

        let phase2_start = self
            .store
            .phase_timings(user_id)?
            .and_then(|t| t.phase2_start)
            .ok_or(CoreError::NotFound {
                resource: MissingResource::Phase2Start,
                user_id,
            })?;
        let state = self.store.phase_state(user_id)?.ok_or(CoreError::NotFound {
            resource: MissingResource::PhaseState,
            user_id,
        })?;
        let tracking = self
            .store
            .phase2_tracking(user_id)?
            .ok_or(CoreError::NotFound {
                resource: MissingResource::Phase2Tracking,
                user_id,
            })?;

        let start_date = local_date(phase2_start, offset);
        let anchor = local_date(tracking.updated_at, offset);
        let since = day_start_utc(start_date.min(anchor), offset);

        let diary = self.store.diary_entries(user_id, Some(since))?;
        let symptoms_by_day =
            bucket_by_local_date(diary.into_iter().map(|e| (e.logged_at, e.scores)), offset);

        let food_logs = self.store.food_log_entries(user_id, Some(since))?;
        let foods_by_day = bucket_by_local_date(
            food_logs.into_iter().flat_map(|e| {
                let at = e.logged_at;
                e.items.into_iter().map(move |item| (at, item))
            }),
            offset,
        );

        let outcome = evaluate(&Phase2Input {
            today,
            phase2_start: start_date,
            anchor,
            break_days: state.phase2_break_days,
            current_group: tracking.current_group,
            symptoms_by_day: &symptoms_by_day,
            foods_by_day: &foods_by_day,
        });

        let commit = Phase2Commit {
            reintroduction_days: outcome.reintroduction_days,
            break_days: outcome.break_days,
            group_result: outcome.group_result,
            clear_group: outcome.group_result.is_some(),
            touch_updated_at: outcome.walked_break.then_some(now),
        };
        self.store.commit_phase2_advance(user_id, &commit)?;

        Ok(Phase2Report {
            reintroduction_days: outcome.reintroduction_days,
            break_days: outcome.break_days,
            days_since_phase2: (today - start_date).num_days().max(0),
            state: outcome.state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::storage::Database;
    use chrono::TimeZone;

    fn instant(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn invalid_timezone_is_rejected_before_store_access() {
        let db = Database::open_memory().unwrap();
        let engine = StreakEngine::new(db);
        // User 42 does not exist; a timezone failure must win anyway.
        let err = engine
            .compute_phase1_streak(42, "Mars/Olympus", instant(1, 12))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidTimezone { .. })
        ));
    }

    #[test]
    fn advance_without_phase2_start_is_not_found() {
        let db = Database::open_memory().unwrap();
        let user_id = db.ensure_user("7001", instant(1, 8)).unwrap();
        let engine = StreakEngine::new(db);
        let err = engine
            .advance_phase2(user_id, "+00:00", instant(1, 12))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                resource: MissingResource::Phase2Start,
                ..
            }
        ));
    }

    #[test]
    fn phase1_streak_without_start_uses_whole_history() {
        let db = Database::open_memory().unwrap();
        let user_id = db.ensure_user("7002", instant(1, 8)).unwrap();
        for day in 1..=3 {
            db.record_diary_entry(
                user_id,
                crate::diary::SymptomScores::new(1, 0, 0, 0).unwrap(),
                None,
                instant(day, 9),
            )
            .unwrap();
        }
        let engine = StreakEngine::new(db);
        let report = engine
            .compute_phase1_streak(user_id, "+00:00", instant(3, 18))
            .unwrap();
        assert_eq!(report.streak_days, 3);
        assert_eq!(report.phase1_date_used, None);
    }
}
