//! # Fodtrack Core Library
//!
//! This library provides the core business logic for Fodtrack, a
//! low-FODMAP diet tracker. It implements a CLI-first philosophy where
//! all operations are available via a standalone CLI binary, with any
//! frontend being a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Streak Engine**: Pure calculators over timestamped diary and
//!   food-log history, orchestrated against the stores with an injected
//!   "now" so computations are deterministic and testable
//! - **Phase Machine**: An explicit four-state reintroduction driver
//!   (`AccumulatingReintro -> SymptomCheck -> AccumulatingBreak ->
//!   BreakComplete`)
//! - **Storage**: SQLite-based record storage and TOML-based
//!   configuration; FODMAP scale normalization happens at this boundary
//!
//! ## Key Components
//!
//! - [`StreakEngine`]: Orchestrates the phase-1 and phase-2 computations
//! - [`Database`]: Diary, food log, and phase state persistence
//! - [`Config`]: Application configuration management
//! - [`FodmapProfile`]: Canonical six-category FODMAP severity profile

pub mod dates;
pub mod diary;
pub mod error;
pub mod fodmap;
pub mod food_log;
pub mod phase;
pub mod storage;

pub use diary::{DiaryEntry, SymptomScores, LOW_SYMPTOM_CEILING, MAX_SEVERITY};
pub use error::{ConfigError, CoreError, MissingResource, StoreError, ValidationError};
pub use fodmap::{FodmapCategory, FodmapLevel, FodmapProfile};
pub use food_log::{FoodLogEntry, FoodSource, LoggedFood};
pub use phase::{
    DiaryStore, GroupResult, GroupResults, Phase, Phase1Report, Phase2Report, Phase2Tracking,
    PhaseState, PhaseStore, PhaseTimings, ReintroState, StreakEngine,
};
pub use storage::{Config, Database};
