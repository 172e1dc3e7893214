//! Phase-1 symptom-free streak calculator.
//!
//! Pure function over bucketed diary data: no clock reads, no store
//! access. The walk runs backward from `today` one calendar day at a
//! time and never continues past the phase-1 start date.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::diary::SymptomScores;

/// Missing days tolerated inside a streak. One absent day is bridged;
/// two consecutive absent days end the streak.
pub const MISSING_DAY_GRACE: u32 = 1;

/// Count consecutive symptom-free calendar days ending at `today`.
///
/// A day qualifies when it has diary entries and every entry is at or
/// below the low-symptom ceiling. A single day without entries counts
/// only when a qualifying day on its far side bridges it; trailing
/// missing days are never counted. Any severity above the ceiling ends
/// the walk at that day.
pub fn symptom_free_streak(
    today: NaiveDate,
    phase1_start: Option<NaiveDate>,
    entries_by_day: &BTreeMap<NaiveDate, Vec<SymptomScores>>,
) -> u32 {
    let mut streak = 0u32;
    let mut pending_gap = 0u32;
    let mut day = today;

    loop {
        if let Some(start) = phase1_start {
            if day < start {
                break;
            }
        }

        match entries_by_day.get(&day) {
            Some(entries) if entries.iter().all(SymptomScores::all_low) => {
                // A bridged gap is confirmed and counted with this day.
                streak += 1 + pending_gap;
                pending_gap = 0;
            }
            Some(_) => break,
            None => {
                pending_gap += 1;
                if pending_gap > MISSING_DAY_GRACE {
                    break;
                }
            }
        }

        day = match day.pred_opt() {
            Some(prev) => prev,
            None => break,
        };
    }

    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diary::SymptomScores;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .checked_add_days(chrono::Days::new(n as u64))
            .unwrap()
    }

    fn low() -> SymptomScores {
        SymptomScores::new(1, 2, 0, 1).unwrap()
    }

    fn high() -> SymptomScores {
        SymptomScores::new(5, 0, 0, 0).unwrap()
    }

    fn diary(days: &[(u32, SymptomScores)]) -> BTreeMap<NaiveDate, Vec<SymptomScores>> {
        let mut map: BTreeMap<NaiveDate, Vec<SymptomScores>> = BTreeMap::new();
        for (n, scores) in days {
            map.entry(day(*n)).or_default().push(*scores);
        }
        map
    }

    #[test]
    fn five_low_days_give_streak_of_five() {
        let entries = diary(&[
            (0, low()),
            (1, low()),
            (2, low()),
            (3, low()),
            (4, low()),
        ]);
        assert_eq!(symptom_free_streak(day(4), Some(day(0)), &entries), 5);
    }

    #[test]
    fn high_day_stops_the_walk() {
        let entries = diary(&[
            (0, low()),
            (1, low()),
            (2, low()),
            (3, high()),
            (4, low()),
        ]);
        // Day 4 counts, day 3 breaks; nothing earlier is reachable.
        assert_eq!(symptom_free_streak(day(4), Some(day(0)), &entries), 1);
    }

    #[test]
    fn single_missing_day_is_bridged_and_counted() {
        let entries = diary(&[(0, low()), (1, low()), (3, low()), (4, low())]);
        assert_eq!(symptom_free_streak(day(4), Some(day(0)), &entries), 5);
    }

    #[test]
    fn two_consecutive_missing_days_end_the_streak() {
        let entries = diary(&[(0, low()), (1, low()), (4, low()), (5, low())]);
        // Days 5 and 4 count; the day-3/day-2 gap stops the walk and the
        // gap days are not counted.
        assert_eq!(symptom_free_streak(day(5), Some(day(0)), &entries), 2);
    }

    #[test]
    fn mixed_entries_on_one_day_must_all_be_low() {
        let entries = diary(&[(0, low()), (1, low()), (1, high()), (2, low())]);
        assert_eq!(symptom_free_streak(day(2), Some(day(0)), &entries), 1);
    }

    #[test]
    fn walk_never_passes_phase1_start() {
        let entries = diary(&[(0, low()), (1, low()), (2, low()), (3, low())]);
        assert_eq!(symptom_free_streak(day(3), Some(day(2)), &entries), 2);
    }

    #[test]
    fn no_start_date_uses_whole_history() {
        let entries = diary(&[(0, low()), (1, low()), (2, low())]);
        assert_eq!(symptom_free_streak(day(2), None, &entries), 3);
    }

    #[test]
    fn empty_diary_gives_zero() {
        let entries = BTreeMap::new();
        assert_eq!(symptom_free_streak(day(4), Some(day(0)), &entries), 0);
    }

    #[test]
    fn trailing_missing_day_at_start_is_not_counted() {
        // Day 0 (the start) has no entry; days 1-3 qualify. The lone
        // missing day is never confirmed, so it does not count.
        let entries = diary(&[(1, low()), (2, low()), (3, low())]);
        assert_eq!(symptom_free_streak(day(3), Some(day(0)), &entries), 3);
    }

    #[test]
    fn today_without_entry_still_bridges_to_yesterday() {
        let entries = diary(&[(0, low()), (1, low()), (2, low())]);
        // Today (day 3) has no entry yet; the streak counts it once day 2
        // qualifies behind it.
        assert_eq!(symptom_free_streak(day(3), Some(day(0)), &entries), 4);
    }

    #[test]
    fn streak_never_exceeds_window_length() {
        let entries = diary(&[(0, low()), (1, low()), (2, low()), (3, low())]);
        let streak = symptom_free_streak(day(3), Some(day(0)), &entries);
        assert!(streak as i64 <= (day(3) - day(0)).num_days() + 1);
    }
}
