//! Phase-2 reintroduction/break driver.
//!
//! An explicit state machine evaluated by one pure function:
//!
//! ```text
//! AccumulatingReintro -> SymptomCheck -> AccumulatingBreak -> BreakComplete
//! ```
//!
//! One invocation advances the counters by exactly one evaluation step.
//! Repeated calls on the same day converge: the break walk only covers
//! days after the anchor, and the run is seeded from the stored counter.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diary::SymptomScores;
use crate::fodmap::FodmapCategory;
use crate::food_log::LoggedFood;
use crate::phase::state::{GroupResult, MAX_BREAK_DAYS, MAX_REINTRODUCTION_DAYS};

/// Length of a group's reintroduction test window, in days.
const TEST_WINDOW_DAYS: i64 = 3;

/// Where the per-user reintroduction machine currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReintroState {
    /// Counting test days up to three since phase-2 start.
    AccumulatingReintro,
    /// Test window complete, group symptoms not yet judged.
    SymptomCheck,
    /// Counting consecutive low-FODMAP break days.
    AccumulatingBreak,
    /// Three break days reached; ready for the next group.
    BreakComplete,
}

impl ReintroState {
    /// Classify the machine's state from the stored counters.
    pub fn classify(
        reintroduction_days: u8,
        break_days: u8,
        current_group: Option<FodmapCategory>,
    ) -> Self {
        if reintroduction_days < MAX_REINTRODUCTION_DAYS {
            ReintroState::AccumulatingReintro
        } else if current_group.is_some() {
            ReintroState::SymptomCheck
        } else if break_days < MAX_BREAK_DAYS {
            ReintroState::AccumulatingBreak
        } else {
            ReintroState::BreakComplete
        }
    }
}

/// Everything one evaluation step reads. All dates are local calendar
/// dates in the caller's timezone.
#[derive(Debug)]
pub struct Phase2Input<'a> {
    pub today: NaiveDate,
    pub phase2_start: NaiveDate,
    /// Local date of the tracking record's `updated_at`.
    pub anchor: NaiveDate,
    pub break_days: u8,
    pub current_group: Option<FodmapCategory>,
    pub symptoms_by_day: &'a BTreeMap<NaiveDate, Vec<SymptomScores>>,
    pub foods_by_day: &'a BTreeMap<NaiveDate, Vec<LoggedFood>>,
}

/// What one evaluation step decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase2Outcome {
    /// State after the step.
    pub state: ReintroState,
    pub reintroduction_days: u8,
    pub break_days: u8,
    /// Set when this step judged the current group's test window.
    pub group_result: Option<(FodmapCategory, GroupResult)>,
    /// Whether break accumulation ran (and the anchor should advance).
    pub walked_break: bool,
}

/// Advance the phase-2 machine by one evaluation step.
pub fn evaluate(input: &Phase2Input<'_>) -> Phase2Outcome {
    let elapsed = (input.today - input.phase2_start).num_days();
    let reintroduction_days = elapsed.clamp(0, MAX_REINTRODUCTION_DAYS as i64) as u8;

    if reintroduction_days < MAX_REINTRODUCTION_DAYS {
        return Phase2Outcome {
            state: ReintroState::AccumulatingReintro,
            reintroduction_days,
            break_days: input.break_days,
            group_result: None,
            walked_break: false,
        };
    }

    // Test window complete: judge the current group exactly once.
    let group_result = input.current_group.map(|group| {
        let window_end = input.anchor + Duration::days(TEST_WINDOW_DAYS);
        let symptomatic = input
            .symptoms_by_day
            .range(input.anchor..=window_end)
            .any(|(_, entries)| entries.iter().any(|s| !s.all_low()));
        let result = if symptomatic {
            GroupResult::High
        } else {
            GroupResult::Low
        };
        (group, result)
    });

    if input.break_days >= MAX_BREAK_DAYS {
        return Phase2Outcome {
            state: ReintroState::BreakComplete,
            reintroduction_days,
            break_days: MAX_BREAK_DAYS,
            group_result,
            walked_break: false,
        };
    }

    let break_days = walk_break_days(input);
    let state = if break_days >= MAX_BREAK_DAYS {
        ReintroState::BreakComplete
    } else {
        ReintroState::AccumulatingBreak
    };

    Phase2Outcome {
        state,
        reintroduction_days,
        break_days,
        group_result,
        walked_break: true,
    }
}

/// Walk forward over the days not yet credited and recount the break
/// run.
///
/// The run is seeded with the stored counter (alive as of the anchor)
/// and the walk covers `(anchor, today]`. A day passes only when every
/// food item logged that day is low-FODMAP in all six categories; a day
/// with no food log does not pass and resets the run, same as a day with
/// a high item. Reaching three consecutive passes anywhere in the walk
/// completes the break even if a later day fails.
fn walk_break_days(input: &Phase2Input<'_>) -> u8 {
    let start = input.phase2_start.max(input.anchor);
    let mut run = input.break_days as u32;
    let mut best = run;

    let mut day = match start.succ_opt() {
        Some(next) => next,
        None => return input.break_days,
    };
    while day <= input.today {
        let passes = input
            .foods_by_day
            .get(&day)
            .map(|items| !items.is_empty() && items.iter().all(|f| f.profile.is_low_fodmap()))
            .unwrap_or(false);

        if passes {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }

        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    let max_days = MAX_BREAK_DAYS as u32;
    if best >= max_days {
        MAX_BREAK_DAYS
    } else {
        run.min(max_days) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diary::SymptomScores;
    use crate::fodmap::FodmapProfile;
    use crate::food_log::{FoodSource, LoggedFood};

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .checked_add_days(chrono::Days::new(n as u64))
            .unwrap()
    }

    fn low_food() -> LoggedFood {
        LoggedFood {
            source: FoodSource::Catalog(1),
            name: "rice".to_string(),
            profile: FodmapProfile::from_catalog_levels([0, 0, 0, 0, 0, 0]),
        }
    }

    fn high_food() -> LoggedFood {
        LoggedFood {
            source: FoodSource::Catalog(2),
            name: "apple".to_string(),
            profile: FodmapProfile::from_catalog_levels([2, 0, 0, 0, 1, 0]),
        }
    }

    fn high_user_food() -> LoggedFood {
        LoggedFood {
            source: FoodSource::UserAuthored(1),
            name: "homemade jam".to_string(),
            // Raw 0 on the inverted scale means high.
            profile: FodmapProfile::from_user_levels([0, 2, 2, 2, 2, 2]),
        }
    }

    fn foods(days: &[(u32, LoggedFood)]) -> BTreeMap<NaiveDate, Vec<LoggedFood>> {
        let mut map: BTreeMap<NaiveDate, Vec<LoggedFood>> = BTreeMap::new();
        for (n, food) in days {
            map.entry(day(*n)).or_default().push(food.clone());
        }
        map
    }

    fn symptoms(days: &[(u32, SymptomScores)]) -> BTreeMap<NaiveDate, Vec<SymptomScores>> {
        let mut map: BTreeMap<NaiveDate, Vec<SymptomScores>> = BTreeMap::new();
        for (n, scores) in days {
            map.entry(day(*n)).or_default().push(*scores);
        }
        map
    }

    fn input<'a>(
        today: NaiveDate,
        break_days: u8,
        anchor: NaiveDate,
        current_group: Option<FodmapCategory>,
        symptoms_by_day: &'a BTreeMap<NaiveDate, Vec<SymptomScores>>,
        foods_by_day: &'a BTreeMap<NaiveDate, Vec<LoggedFood>>,
    ) -> Phase2Input<'a> {
        Phase2Input {
            today,
            phase2_start: day(0),
            anchor,
            break_days,
            current_group,
            symptoms_by_day,
            foods_by_day,
        }
    }

    #[test]
    fn reintroduction_days_accumulate_and_cap() {
        let s = BTreeMap::new();
        let f = BTreeMap::new();
        for (today, expected) in [(0u32, 0u8), (1, 1), (2, 2), (3, 3), (10, 3)] {
            let outcome = evaluate(&input(day(today), 0, day(0), None, &s, &f));
            assert_eq!(outcome.reintroduction_days, expected, "day {today}");
        }
    }

    #[test]
    fn accumulating_reintro_leaves_break_untouched() {
        let s = BTreeMap::new();
        let f = BTreeMap::new();
        let outcome = evaluate(&input(day(1), 2, day(0), None, &s, &f));
        assert_eq!(outcome.state, ReintroState::AccumulatingReintro);
        assert_eq!(outcome.break_days, 2);
        assert!(!outcome.walked_break);
    }

    #[test]
    fn start_in_the_future_clamps_to_zero() {
        let s = BTreeMap::new();
        let f = BTreeMap::new();
        let mut inp = input(day(0), 0, day(0), None, &s, &f);
        inp.phase2_start = day(5);
        let outcome = evaluate(&inp);
        assert_eq!(outcome.reintroduction_days, 0);
    }

    #[test]
    fn two_low_days_after_reintro_give_two_break_days() {
        // Phase-2 start day 0, today day 5; low food logged on days 4
        // and 5 only.
        let s = BTreeMap::new();
        let f = foods(&[(4, low_food()), (5, low_food())]);
        let outcome = evaluate(&input(day(5), 0, day(0), None, &s, &f));
        assert_eq!(outcome.reintroduction_days, 3);
        assert_eq!(outcome.break_days, 2);
        assert_eq!(outcome.state, ReintroState::AccumulatingBreak);
        assert!(outcome.walked_break);
    }

    #[test]
    fn day_without_food_log_resets_the_run() {
        // Low on days 4-5, nothing on day 6, low on day 7.
        let s = BTreeMap::new();
        let f = foods(&[(4, low_food()), (5, low_food()), (7, low_food())]);
        let outcome = evaluate(&input(day(7), 0, day(0), None, &s, &f));
        assert_eq!(outcome.break_days, 1);
    }

    #[test]
    fn high_item_resets_the_run() {
        let s = BTreeMap::new();
        let f = foods(&[
            (4, low_food()),
            (5, low_food()),
            (6, low_food()),
            (6, high_food()),
        ]);
        let outcome = evaluate(&input(day(6), 0, day(0), None, &s, &f));
        assert_eq!(outcome.break_days, 0);
    }

    #[test]
    fn user_authored_high_disqualifies_like_catalog_high() {
        let s = BTreeMap::new();
        let catalog = foods(&[(4, low_food()), (4, high_food())]);
        let user = foods(&[(4, low_food()), (4, high_user_food())]);
        let from_catalog = evaluate(&input(day(4), 0, day(0), None, &s, &catalog));
        let from_user = evaluate(&input(day(4), 0, day(0), None, &s, &user));
        assert_eq!(from_catalog.break_days, 0);
        assert_eq!(from_user.break_days, from_catalog.break_days);
    }

    #[test]
    fn three_passes_complete_the_break() {
        let s = BTreeMap::new();
        let f = foods(&[(4, low_food()), (5, low_food()), (6, low_food())]);
        let outcome = evaluate(&input(day(6), 0, day(0), None, &s, &f));
        assert_eq!(outcome.break_days, 3);
        assert_eq!(outcome.state, ReintroState::BreakComplete);
    }

    #[test]
    fn three_passes_survive_a_later_failure() {
        // The run reaches three on day 6; day 7 fails. The break is
        // still complete.
        let s = BTreeMap::new();
        let f = foods(&[
            (4, low_food()),
            (5, low_food()),
            (6, low_food()),
            (7, high_food()),
        ]);
        let outcome = evaluate(&input(day(7), 0, day(0), None, &s, &f));
        assert_eq!(outcome.break_days, 3);
        assert_eq!(outcome.state, ReintroState::BreakComplete);
    }

    #[test]
    fn completed_break_is_terminal() {
        let s = BTreeMap::new();
        let f = foods(&[(8, high_food())]);
        let outcome = evaluate(&input(day(8), 3, day(7), None, &s, &f));
        assert_eq!(outcome.break_days, 3);
        assert_eq!(outcome.state, ReintroState::BreakComplete);
        assert!(!outcome.walked_break);
    }

    #[test]
    fn seeded_run_continues_across_invocations() {
        // Yesterday's invocation stored 2 break days with the anchor on
        // day 5; today (day 6) passes, completing the break.
        let s = BTreeMap::new();
        let f = foods(&[(6, low_food())]);
        let outcome = evaluate(&input(day(6), 2, day(5), None, &s, &f));
        assert_eq!(outcome.break_days, 3);
    }

    #[test]
    fn repeated_evaluation_on_same_day_converges() {
        let s = BTreeMap::new();
        let f = foods(&[(4, low_food()), (5, low_food())]);
        let first = evaluate(&input(day(5), 0, day(0), None, &s, &f));
        assert_eq!(first.break_days, 2);
        // Second call: anchor advanced to today, counter stored.
        let second = evaluate(&input(day(5), first.break_days, day(5), None, &s, &f));
        assert_eq!(second.break_days, first.break_days);
        let third = evaluate(&input(day(5), second.break_days, day(5), None, &s, &f));
        assert_eq!(third.break_days, second.break_days);
    }

    #[test]
    fn symptom_check_records_low_when_window_is_quiet() {
        let s = symptoms(&[(1, SymptomScores::new(1, 1, 0, 0).unwrap())]);
        let f = BTreeMap::new();
        let outcome = evaluate(&input(
            day(3),
            0,
            day(0),
            Some(FodmapCategory::Lactose),
            &s,
            &f,
        ));
        assert_eq!(
            outcome.group_result,
            Some((FodmapCategory::Lactose, GroupResult::Low))
        );
    }

    #[test]
    fn symptom_check_records_high_on_any_flareup() {
        let s = symptoms(&[
            (1, SymptomScores::new(1, 1, 0, 0).unwrap()),
            (2, SymptomScores::new(0, 6, 0, 0).unwrap()),
        ]);
        let f = BTreeMap::new();
        let outcome = evaluate(&input(
            day(3),
            0,
            day(0),
            Some(FodmapCategory::Fructan),
            &s,
            &f,
        ));
        assert_eq!(
            outcome.group_result,
            Some((FodmapCategory::Fructan, GroupResult::High))
        );
    }

    #[test]
    fn symptoms_outside_the_window_do_not_count() {
        // Window is [anchor, anchor + 3]; with the anchor on day 0 a
        // flareup on day 4 falls outside it.
        let s = symptoms(&[(4, SymptomScores::new(9, 0, 0, 0).unwrap())]);
        let f = BTreeMap::new();
        let outcome = evaluate(&input(
            day(4),
            0,
            day(0),
            Some(FodmapCategory::Gos),
            &s,
            &f,
        ));
        assert_eq!(
            outcome.group_result,
            Some((FodmapCategory::Gos, GroupResult::Low))
        );
    }

    #[test]
    fn no_group_means_no_symptom_check() {
        let s = symptoms(&[(1, SymptomScores::new(8, 0, 0, 0).unwrap())]);
        let f = BTreeMap::new();
        let outcome = evaluate(&input(day(3), 0, day(0), None, &s, &f));
        assert_eq!(outcome.group_result, None);
    }

    #[test]
    fn classification_covers_all_states() {
        assert_eq!(
            ReintroState::classify(1, 0, None),
            ReintroState::AccumulatingReintro
        );
        assert_eq!(
            ReintroState::classify(3, 0, Some(FodmapCategory::Fructose)),
            ReintroState::SymptomCheck
        );
        assert_eq!(
            ReintroState::classify(3, 1, None),
            ReintroState::AccumulatingBreak
        );
        assert_eq!(ReintroState::classify(3, 3, None), ReintroState::BreakComplete);
    }
}
