use chrono::Utc;
use clap::Subcommand;
use fodtrack_core::{FodmapCategory, PhaseStore, ReintroState, StreakEngine};

#[derive(Subcommand)]
pub enum PhaseAction {
    /// Start (or restart) the elimination phase
    StartElimination {
        /// External user id
        #[arg(long)]
        user: String,
    },
    /// Enter the reintroduction phase
    StartReintroduction {
        /// External user id
        #[arg(long)]
        user: String,
    },
    /// Begin a 3-day test for one FODMAP group
    StartGroup {
        /// External user id
        #[arg(long)]
        user: String,
        /// fructose, lactose, fructan, mannitol, sorbitol, or gos
        #[arg(long)]
        group: String,
    },
    /// Recompute the elimination symptom-free streak
    Streak {
        /// External user id
        #[arg(long)]
        user: String,
        /// UTC offset, e.g. +03:00 (default from config)
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Advance the reintroduction/break counters
    Advance {
        /// External user id
        #[arg(long)]
        user: String,
        /// UTC offset, e.g. +03:00 (default from config)
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Show phase state, timings, and per-group results
    Status {
        /// External user id
        #[arg(long)]
        user: String,
    },
}

pub fn run(action: PhaseAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = super::open_database()?;
    let now = Utc::now();

    match action {
        PhaseAction::StartElimination { user } => {
            let user_id = db.ensure_user(&user, now)?;
            db.begin_elimination(user_id, now)?;
            println!("elimination phase started");
        }
        PhaseAction::StartReintroduction { user } => {
            let user_id = db.ensure_user(&user, now)?;
            db.begin_reintroduction(user_id, now)?;
            println!("reintroduction phase started");
        }
        PhaseAction::StartGroup { user, group } => {
            let user_id = db.ensure_user(&user, now)?;
            let group: FodmapCategory = group.parse()?;
            db.begin_group_test(user_id, group, now)?;
            println!("3-day {group} test started");
        }
        PhaseAction::Streak { user, timezone } => {
            let user_id = db.ensure_user(&user, now)?;
            let timezone = super::resolve_timezone(timezone)?;
            let engine = StreakEngine::new(db);
            let report = engine.compute_phase1_streak(user_id, &timezone, now)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        PhaseAction::Advance { user, timezone } => {
            let user_id = db.ensure_user(&user, now)?;
            let timezone = super::resolve_timezone(timezone)?;
            let engine = StreakEngine::new(db);
            let report = engine.advance_phase2(user_id, &timezone, now)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        PhaseAction::Status { user } => {
            let user_id = db.ensure_user(&user, now)?;
            let state = db.phase_state(user_id)?;
            let timings = db.phase_timings(user_id)?;
            let tracking = db.phase2_tracking(user_id)?;
            let machine = state.as_ref().map(|s| {
                ReintroState::classify(
                    s.phase2_reintroduction_days,
                    s.phase2_break_days,
                    s.phase2_current_group,
                )
            });
            let status = serde_json::json!({
                "state": state,
                "timings": timings,
                "tracking": tracking,
                "machine": machine,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
