//! SQLite-based storage for users, diaries, food logs, and phase state.
//!
//! This is where raw FODMAP scales die: catalog and user-authored
//! product rows are mapped to canonical [`FodmapProfile`]s as they are
//! read, so everything above this layer compares one scale only.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::data_dir;
use crate::diary::{DiaryEntry, SymptomScores};
use crate::error::StoreError;
use crate::fodmap::{FodmapCategory, FodmapProfile};
use crate::food_log::{FoodLogEntry, FoodSource, LoggedFood};
use crate::phase::{
    DiaryStore, GroupResult, GroupResults, Phase, Phase2Commit, Phase2Tracking, PhaseState,
    PhaseStore, PhaseTimings,
};

/// A catalog product with its FODMAP profile already normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub profile: FodmapProfile,
    pub serving_title: Option<String>,
    pub serving_amount_grams: Option<f64>,
}

/// A user-authored product, normalized from the inverted raw scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProductRecord {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub profile: FodmapProfile,
}

/// SQLite database backing both store seams.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/fodtrack/fodtrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?
            .join("fodtrack.db");
        Self::open_at(&path)
    }

    /// Open the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (primarily for tests).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    telegram_id TEXT NOT NULL UNIQUE,
                    created_at  TEXT NOT NULL,
                    updated_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS diary_entries (
                    id             INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id        INTEGER NOT NULL REFERENCES users(id),
                    pain_level     INTEGER NOT NULL,
                    bloating_level INTEGER NOT NULL,
                    gas_level      INTEGER NOT NULL,
                    nausea_level   INTEGER NOT NULL,
                    note           TEXT,
                    logged_at      TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS products (
                    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                    name                 TEXT NOT NULL,
                    fructose_level       INTEGER NOT NULL,
                    lactose_level        INTEGER NOT NULL,
                    fructan_level        INTEGER NOT NULL,
                    mannitol_level       INTEGER NOT NULL,
                    sorbitol_level       INTEGER NOT NULL,
                    gos_level            INTEGER NOT NULL,
                    serving_title        TEXT,
                    serving_amount_grams REAL
                );

                CREATE TABLE IF NOT EXISTS user_products (
                    id             INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id        INTEGER NOT NULL REFERENCES users(id),
                    name           TEXT NOT NULL,
                    fructose_level INTEGER NOT NULL,
                    lactose_level  INTEGER NOT NULL,
                    fructan_level  INTEGER NOT NULL,
                    mannitol_level INTEGER NOT NULL,
                    sorbitol_level INTEGER NOT NULL,
                    gos_level      INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS food_log (
                    id        INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id   INTEGER NOT NULL REFERENCES users(id),
                    logged_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS food_log_items (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    food_log_id     INTEGER NOT NULL REFERENCES food_log(id),
                    product_id      INTEGER REFERENCES products(id),
                    user_product_id INTEGER REFERENCES user_products(id)
                );

                CREATE TABLE IF NOT EXISTS phase_state (
                    user_id                    INTEGER PRIMARY KEY REFERENCES users(id),
                    current_phase              INTEGER NOT NULL DEFAULT 1,
                    phase1_streak_days         INTEGER NOT NULL DEFAULT 0,
                    phase2_reintroduction_days INTEGER NOT NULL DEFAULT 0,
                    phase2_break_days          INTEGER NOT NULL DEFAULT 0,
                    phase2_current_group       TEXT
                );

                CREATE TABLE IF NOT EXISTS phase_timings (
                    user_id      INTEGER PRIMARY KEY REFERENCES users(id),
                    phase1_start TEXT,
                    phase2_start TEXT
                );

                CREATE TABLE IF NOT EXISTS phase2_tracking (
                    user_id         INTEGER PRIMARY KEY REFERENCES users(id),
                    fructose_result INTEGER NOT NULL DEFAULT 0,
                    lactose_result  INTEGER NOT NULL DEFAULT 0,
                    fructan_result  INTEGER NOT NULL DEFAULT 0,
                    mannitol_result INTEGER NOT NULL DEFAULT 0,
                    sorbitol_result INTEGER NOT NULL DEFAULT 0,
                    gos_result      INTEGER NOT NULL DEFAULT 0,
                    current_group   TEXT,
                    updated_at      TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_diary_user_logged
                    ON diary_entries(user_id, logged_at);
                CREATE INDEX IF NOT EXISTS idx_food_log_user_logged
                    ON food_log(user_id, logged_at);
                CREATE INDEX IF NOT EXISTS idx_food_log_items_log
                    ON food_log_items(food_log_id);",
            )
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))
    }

    // ── Users ────────────────────────────────────────────────────────

    /// Find or create the user with this external id.
    ///
    /// # Errors
    /// Returns an error if the insert or lookup fails.
    pub fn ensure_user(&self, telegram_id: &str, now: DateTime<Utc>) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO users (telegram_id, created_at, updated_at)
             VALUES (?1, ?2, ?2)
             ON CONFLICT(telegram_id) DO NOTHING",
            params![telegram_id, now.to_rfc3339()],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO phase_state (user_id)
             SELECT id FROM users WHERE telegram_id = ?1",
            params![telegram_id],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO phase_timings (user_id)
             SELECT id FROM users WHERE telegram_id = ?1",
            params![telegram_id],
        )?;
        let id = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE telegram_id = ?1",
                params![telegram_id],
                |row| row.get::<_, i64>(0),
            )?;
        Ok(id)
    }

    // ── Diary ────────────────────────────────────────────────────────

    /// Record a diary entry. Entries are immutable once created.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_diary_entry(
        &self,
        user_id: i64,
        scores: SymptomScores,
        note: Option<&str>,
        logged_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO diary_entries
                 (user_id, pain_level, bloating_level, gas_level, nausea_level, note, logged_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user_id,
                scores.pain,
                scores.bloating,
                scores.gas,
                scores.nausea,
                note,
                logged_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ── Products ─────────────────────────────────────────────────────

    /// Add a catalog product. Levels are raw catalog scale, in
    /// [`FodmapCategory::ALL`] order.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn add_product(
        &self,
        name: &str,
        levels: [u8; 6],
        serving_title: Option<&str>,
        serving_amount_grams: Option<f64>,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO products
                 (name, fructose_level, lactose_level, fructan_level,
                  mannitol_level, sorbitol_level, gos_level,
                  serving_title, serving_amount_grams)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                name,
                levels[0],
                levels[1],
                levels[2],
                levels[3],
                levels[4],
                levels[5],
                serving_title,
                serving_amount_grams,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Add a user-authored product. Levels are the raw inverted 0/1/2
    /// scale, in [`FodmapCategory::ALL`] order.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn add_user_product(
        &self,
        user_id: i64,
        name: &str,
        levels: [u8; 6],
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO user_products
                 (user_id, name, fructose_level, lactose_level, fructan_level,
                  mannitol_level, sorbitol_level, gos_level)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user_id,
                name,
                levels[0],
                levels[1],
                levels[2],
                levels[3],
                levels[4],
                levels[5],
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List the catalog, profiles normalized.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn list_products(&self) -> Result<Vec<ProductRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, fructose_level, lactose_level, fructan_level,
                    mannitol_level, sorbitol_level, gos_level,
                    serving_title, serving_amount_grams
             FROM products ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ProductRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                profile: FodmapProfile::from_catalog_levels([
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ]),
                serving_title: row.get(8)?,
                serving_amount_grams: row.get(9)?,
            })
        })?;
        let mut products = Vec::new();
        for row in rows {
            products.push(row?);
        }
        Ok(products)
    }

    /// List one user's authored products, profiles normalized.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn list_user_products(&self, user_id: i64) -> Result<Vec<UserProductRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, fructose_level, lactose_level, fructan_level,
                    mannitol_level, sorbitol_level, gos_level
             FROM user_products WHERE user_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(UserProductRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                profile: FodmapProfile::from_user_levels([
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ]),
            })
        })?;
        let mut products = Vec::new();
        for row in rows {
            products.push(row?);
        }
        Ok(products)
    }

    // ── Food log ─────────────────────────────────────────────────────

    /// Record a food log entry referencing catalog and/or user-authored
    /// products. The entry and its items are written in one transaction.
    ///
    /// # Errors
    /// Returns an error if any referenced product does not exist or an
    /// insert fails; nothing is written in that case.
    pub fn record_food_log(
        &self,
        user_id: i64,
        logged_at: DateTime<Utc>,
        items: &[FoodSource],
    ) -> Result<i64, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO food_log (user_id, logged_at) VALUES (?1, ?2)",
            params![user_id, logged_at.to_rfc3339()],
        )?;
        let log_id = tx.last_insert_rowid();
        for item in items {
            match item {
                FoodSource::Catalog(product_id) => {
                    let exists: Option<i64> = tx
                        .query_row(
                            "SELECT id FROM products WHERE id = ?1",
                            params![product_id],
                            |row| row.get(0),
                        )
                        .optional()?;
                    if exists.is_none() {
                        return Err(StoreError::QueryFailed(format!(
                            "catalog product {product_id} does not exist"
                        )));
                    }
                    tx.execute(
                        "INSERT INTO food_log_items (food_log_id, product_id) VALUES (?1, ?2)",
                        params![log_id, product_id],
                    )?;
                }
                FoodSource::UserAuthored(product_id) => {
                    let exists: Option<i64> = tx
                        .query_row(
                            "SELECT id FROM user_products WHERE id = ?1 AND user_id = ?2",
                            params![product_id, user_id],
                            |row| row.get(0),
                        )
                        .optional()?;
                    if exists.is_none() {
                        return Err(StoreError::QueryFailed(format!(
                            "user product {product_id} does not exist for user {user_id}"
                        )));
                    }
                    tx.execute(
                        "INSERT INTO food_log_items (food_log_id, user_product_id) VALUES (?1, ?2)",
                        params![log_id, product_id],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(log_id)
    }

    // ── Phase lifecycle ──────────────────────────────────────────────

    /// Start (or restart) the elimination phase now.
    ///
    /// # Errors
    /// Returns an error if the updates fail.
    pub fn begin_elimination(&self, user_id: i64, now: DateTime<Utc>) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO phase_timings (user_id, phase1_start) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET phase1_start = excluded.phase1_start",
            params![user_id, now.to_rfc3339()],
        )?;
        tx.execute(
            "INSERT INTO phase_state (user_id, current_phase, phase1_streak_days)
             VALUES (?1, 1, 0)
             ON CONFLICT(user_id) DO UPDATE SET current_phase = 1, phase1_streak_days = 0",
            params![user_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Enter the reintroduction phase now. Counters reset; any previous
    /// per-category results are kept.
    ///
    /// # Errors
    /// Returns an error if the updates fail.
    pub fn begin_reintroduction(&self, user_id: i64, now: DateTime<Utc>) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let stamp = now.to_rfc3339();
        tx.execute(
            "INSERT INTO phase_timings (user_id, phase2_start) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET phase2_start = excluded.phase2_start",
            params![user_id, stamp],
        )?;
        tx.execute(
            "INSERT INTO phase_state
                 (user_id, current_phase, phase2_reintroduction_days, phase2_break_days,
                  phase2_current_group)
             VALUES (?1, 2, 0, 0, NULL)
             ON CONFLICT(user_id) DO UPDATE SET
                 current_phase = 2,
                 phase2_reintroduction_days = 0,
                 phase2_break_days = 0,
                 phase2_current_group = NULL",
            params![user_id],
        )?;
        tx.execute(
            "INSERT INTO phase2_tracking (user_id, current_group, updated_at)
             VALUES (?1, NULL, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                 current_group = NULL,
                 updated_at = excluded.updated_at",
            params![user_id, stamp],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Begin a 3-day reintroduction test for one FODMAP group. Restarts
    /// the phase-2 window: the start date moves to `now` and both
    /// counters reset.
    ///
    /// # Errors
    /// Returns an error if the updates fail.
    pub fn begin_group_test(
        &self,
        user_id: i64,
        group: FodmapCategory,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let stamp = now.to_rfc3339();
        tx.execute(
            "INSERT INTO phase_timings (user_id, phase2_start) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET phase2_start = excluded.phase2_start",
            params![user_id, stamp],
        )?;
        tx.execute(
            "INSERT INTO phase_state
                 (user_id, current_phase, phase2_reintroduction_days, phase2_break_days,
                  phase2_current_group)
             VALUES (?1, 2, 0, 0, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                 current_phase = 2,
                 phase2_reintroduction_days = 0,
                 phase2_break_days = 0,
                 phase2_current_group = ?2",
            params![user_id, group.as_str()],
        )?;
        tx.execute(
            "INSERT INTO phase2_tracking (user_id, current_group, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                 current_group = excluded.current_group,
                 updated_at = excluded.updated_at",
            params![user_id, group.as_str(), stamp],
        )?;
        tx.commit()?;
        Ok(())
    }
}

// ── Row helpers ──────────────────────────────────────────────────────

fn parse_instant(column: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn require_levels(
    side: &str,
    levels: [Option<u8>; 6],
) -> Result<[u8; 6], StoreError> {
    let mut out = [0u8; 6];
    for (i, level) in levels.into_iter().enumerate() {
        out[i] = level.ok_or_else(|| {
            StoreError::QueryFailed(format!("missing {side} FODMAP level in food log join"))
        })?;
    }
    Ok(out)
}

/// Cutoff string usable in `logged_at >= ?`: RFC3339 in UTC compares
/// lexicographically, and the empty string is below every timestamp.
fn since_param(since: Option<DateTime<Utc>>) -> String {
    since.map(|t| t.to_rfc3339()).unwrap_or_default()
}

struct FoodItemRow {
    log_id: i64,
    user_id: i64,
    logged_at: String,
    product_id: Option<i64>,
    user_product_id: Option<i64>,
    catalog_name: Option<String>,
    catalog_levels: [Option<u8>; 6],
    user_name: Option<String>,
    user_levels: [Option<u8>; 6],
}

impl DiaryStore for Database {
    fn diary_entries(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DiaryEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, pain_level, bloating_level, gas_level, nausea_level,
                    note, logged_at
             FROM diary_entries
             WHERE user_id = ?1 AND logged_at >= ?2
             ORDER BY logged_at",
        )?;
        let rows = stmt.query_map(params![user_id, since_param(since)], |row| {
            let logged_at_raw: String = row.get(7)?;
            Ok(DiaryEntry {
                id: row.get(0)?,
                user_id: row.get(1)?,
                scores: SymptomScores {
                    pain: row.get(2)?,
                    bloating: row.get(3)?,
                    gas: row.get(4)?,
                    nausea: row.get(5)?,
                },
                note: row.get(6)?,
                logged_at: parse_instant(7, &logged_at_raw)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn food_log_entries(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<FoodLogEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT f.id, f.user_id, f.logged_at,
                    i.product_id, i.user_product_id,
                    p.name, p.fructose_level, p.lactose_level, p.fructan_level,
                    p.mannitol_level, p.sorbitol_level, p.gos_level,
                    up.name, up.fructose_level, up.lactose_level, up.fructan_level,
                    up.mannitol_level, up.sorbitol_level, up.gos_level
             FROM food_log f
             JOIN food_log_items i ON i.food_log_id = f.id
             LEFT JOIN products p ON p.id = i.product_id
             LEFT JOIN user_products up ON up.id = i.user_product_id
             WHERE f.user_id = ?1 AND f.logged_at >= ?2
             ORDER BY f.logged_at, f.id",
        )?;
        let rows = stmt.query_map(params![user_id, since_param(since)], |row| {
            Ok(FoodItemRow {
                log_id: row.get(0)?,
                user_id: row.get(1)?,
                logged_at: row.get(2)?,
                product_id: row.get(3)?,
                user_product_id: row.get(4)?,
                catalog_name: row.get(5)?,
                catalog_levels: [
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                    row.get(10)?,
                    row.get(11)?,
                ],
                user_name: row.get(12)?,
                user_levels: [
                    row.get(13)?,
                    row.get(14)?,
                    row.get(15)?,
                    row.get(16)?,
                    row.get(17)?,
                    row.get(18)?,
                ],
            })
        })?;

        let mut entries: Vec<FoodLogEntry> = Vec::new();
        for row in rows {
            let row = row?;
            let item = resolve_food_item(&row)?;
            match entries.last_mut() {
                Some(last) if last.id == row.log_id => last.items.push(item),
                _ => entries.push(FoodLogEntry {
                    id: row.log_id,
                    user_id: row.user_id,
                    logged_at: parse_instant(2, &row.logged_at)
                        .map_err(|e| StoreError::QueryFailed(e.to_string()))?,
                    items: vec![item],
                }),
            }
        }
        Ok(entries)
    }
}

fn resolve_food_item(row: &FoodItemRow) -> Result<LoggedFood, StoreError> {
    if let Some(product_id) = row.product_id {
        let name = row.catalog_name.clone().ok_or_else(|| {
            StoreError::QueryFailed(format!("food log references missing product {product_id}"))
        })?;
        Ok(LoggedFood {
            source: FoodSource::Catalog(product_id),
            name,
            profile: FodmapProfile::from_catalog_levels(require_levels(
                "catalog",
                row.catalog_levels,
            )?),
        })
    } else if let Some(product_id) = row.user_product_id {
        let name = row.user_name.clone().ok_or_else(|| {
            StoreError::QueryFailed(format!(
                "food log references missing user product {product_id}"
            ))
        })?;
        Ok(LoggedFood {
            source: FoodSource::UserAuthored(product_id),
            name,
            profile: FodmapProfile::from_user_levels(require_levels("user", row.user_levels)?),
        })
    } else {
        Err(StoreError::QueryFailed(
            "food log item carries no product reference".to_string(),
        ))
    }
}

impl PhaseStore for Database {
    fn phase_timings(&self, user_id: i64) -> Result<Option<PhaseTimings>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT phase1_start, phase2_start FROM phase_timings WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                    ))
                },
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((p1, p2)) => {
                let parse = |raw: Option<String>| -> Result<Option<DateTime<Utc>>, StoreError> {
                    raw.map(|r| {
                        parse_instant(0, &r).map_err(|e| StoreError::QueryFailed(e.to_string()))
                    })
                    .transpose()
                };
                Ok(Some(PhaseTimings {
                    phase1_start: parse(p1)?,
                    phase2_start: parse(p2)?,
                }))
            }
        }
    }

    fn phase_state(&self, user_id: i64) -> Result<Option<PhaseState>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT current_phase, phase1_streak_days, phase2_reintroduction_days,
                        phase2_break_days, phase2_current_group
                 FROM phase_state WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, u8>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, u8>(2)?,
                        row.get::<_, u8>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;
        Ok(row.map(|(phase, streak, reintro, brk, group)| PhaseState {
            current_phase: Phase::from_number(phase).unwrap_or(Phase::Elimination),
            phase1_streak_days: streak,
            phase2_reintroduction_days: reintro,
            phase2_break_days: brk,
            phase2_current_group: group.and_then(|g| g.parse().ok()),
        }))
    }

    fn phase2_tracking(&self, user_id: i64) -> Result<Option<Phase2Tracking>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT fructose_result, lactose_result, fructan_result, mannitol_result,
                        sorbitol_result, gos_result, current_group, updated_at
                 FROM phase2_tracking WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        [
                            row.get::<_, u8>(0)?,
                            row.get::<_, u8>(1)?,
                            row.get::<_, u8>(2)?,
                            row.get::<_, u8>(3)?,
                            row.get::<_, u8>(4)?,
                            row.get::<_, u8>(5)?,
                        ],
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((codes, group, updated_at_raw)) => {
                let mut results = GroupResults::default();
                for (category, code) in FodmapCategory::ALL.into_iter().zip(codes) {
                    results.set_result(
                        category,
                        GroupResult::from_code(code).unwrap_or(GroupResult::Untested),
                    );
                }
                Ok(Some(Phase2Tracking {
                    results,
                    current_group: group.and_then(|g| g.parse().ok()),
                    updated_at: parse_instant(7, &updated_at_raw)
                        .map_err(|e| StoreError::QueryFailed(e.to_string()))?,
                }))
            }
        }
    }

    fn update_phase1_streak(&self, user_id: i64, streak_days: u32) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "INSERT INTO phase_state (user_id, phase1_streak_days) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET phase1_streak_days = ?2",
            params![user_id, streak_days],
        )?;
        if updated == 0 {
            return Err(StoreError::QueryFailed(format!(
                "phase state for user {user_id} could not be written"
            )));
        }
        Ok(())
    }

    fn commit_phase2_advance(
        &self,
        user_id: i64,
        commit: &Phase2Commit,
    ) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;

        let updated = if commit.clear_group {
            tx.execute(
                "UPDATE phase_state
                 SET phase2_reintroduction_days = ?2, phase2_break_days = ?3,
                     phase2_current_group = NULL
                 WHERE user_id = ?1",
                params![user_id, commit.reintroduction_days, commit.break_days],
            )?
        } else {
            tx.execute(
                "UPDATE phase_state
                 SET phase2_reintroduction_days = ?2, phase2_break_days = ?3
                 WHERE user_id = ?1",
                params![user_id, commit.reintroduction_days, commit.break_days],
            )?
        };
        if updated == 0 {
            return Err(StoreError::QueryFailed(format!(
                "phase state missing for user {user_id} during phase-2 commit"
            )));
        }

        if let Some((group, result)) = commit.group_result {
            let column = match group {
                FodmapCategory::Fructose => "fructose_result",
                FodmapCategory::Lactose => "lactose_result",
                FodmapCategory::Fructan => "fructan_result",
                FodmapCategory::Mannitol => "mannitol_result",
                FodmapCategory::Sorbitol => "sorbitol_result",
                FodmapCategory::Gos => "gos_result",
            };
            let updated = tx.execute(
                &format!("UPDATE phase2_tracking SET {column} = ?2 WHERE user_id = ?1"),
                params![user_id, result.code()],
            )?;
            if updated == 0 {
                return Err(StoreError::QueryFailed(format!(
                    "phase 2 tracking missing for user {user_id} during commit"
                )));
            }
        }

        if commit.clear_group {
            tx.execute(
                "UPDATE phase2_tracking SET current_group = NULL WHERE user_id = ?1",
                params![user_id],
            )?;
        }

        if let Some(at) = commit.touch_updated_at {
            let updated = tx.execute(
                "UPDATE phase2_tracking SET updated_at = ?2 WHERE user_id = ?1",
                params![user_id, at.to_rfc3339()],
            )?;
            if updated == 0 {
                return Err(StoreError::QueryFailed(format!(
                    "phase 2 tracking missing for user {user_id} during commit"
                )));
            }
        }

        tx.commit()?;
        Ok(())
    }
}
