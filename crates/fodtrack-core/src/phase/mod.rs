mod elimination;
mod engine;
mod reintroduction;
mod state;

pub use elimination::{symptom_free_streak, MISSING_DAY_GRACE};
pub use engine::{
    DiaryStore, Phase1Report, Phase2Commit, Phase2Report, PhaseStore, StreakEngine,
};
pub use reintroduction::{evaluate, Phase2Input, Phase2Outcome, ReintroState};
pub use state::{
    GroupResult, GroupResults, Phase, Phase2Tracking, PhaseState, PhaseTimings,
    MAX_BREAK_DAYS, MAX_REINTRODUCTION_DAYS,
};
