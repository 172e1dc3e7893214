pub mod diary;
pub mod food;
pub mod phase;
pub mod product;

use fodtrack_core::{Config, Database};

/// Open the database, honoring a configured path override.
pub fn open_database() -> Result<Database, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    match config.database.path {
        Some(path) => Ok(Database::open_at(&path)?),
        None => Ok(Database::open()?),
    }
}

/// Resolve the timezone to use: the flag if given, the config default
/// otherwise.
pub fn resolve_timezone(flag: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match flag {
        Some(tz) => Ok(tz),
        None => Ok(Config::load()?.timezone),
    }
}
