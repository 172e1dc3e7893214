//! FODMAP categories and severity levels.
//!
//! Two raw scales exist in the data: catalog products use 0 (none)
//! upward, where anything above 1 is high; user-authored products use an
//! inverted 0/1/2 scale where 0 is high and 2 is low. Both are mapped to
//! one canonical [`FodmapLevel`] here, at the data-access boundary, so no
//! comparison site ever sees a raw value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// The six FODMAP categories tracked per food item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FodmapCategory {
    Fructose,
    Lactose,
    Fructan,
    Mannitol,
    Sorbitol,
    Gos,
}

impl FodmapCategory {
    /// All categories in reintroduction-protocol order.
    pub const ALL: [FodmapCategory; 6] = [
        FodmapCategory::Fructose,
        FodmapCategory::Lactose,
        FodmapCategory::Fructan,
        FodmapCategory::Mannitol,
        FodmapCategory::Sorbitol,
        FodmapCategory::Gos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FodmapCategory::Fructose => "fructose",
            FodmapCategory::Lactose => "lactose",
            FodmapCategory::Fructan => "fructan",
            FodmapCategory::Mannitol => "mannitol",
            FodmapCategory::Sorbitol => "sorbitol",
            FodmapCategory::Gos => "gos",
        }
    }
}

impl fmt::Display for FodmapCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FodmapCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fructose" => Ok(FodmapCategory::Fructose),
            "lactose" => Ok(FodmapCategory::Lactose),
            "fructan" => Ok(FodmapCategory::Fructan),
            "mannitol" => Ok(FodmapCategory::Mannitol),
            "sorbitol" => Ok(FodmapCategory::Sorbitol),
            "gos" => Ok(FodmapCategory::Gos),
            _ => Err(ValidationError::InvalidValue {
                field: "fodmap_category".to_string(),
                message: format!("unknown category '{s}'"),
            }),
        }
    }
}

/// Canonical FODMAP severity for one category of one food item.
///
/// Ordering is by severity, so `level <= FodmapLevel::Low` is the
/// low-FODMAP test regardless of which raw scale the value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FodmapLevel {
    None,
    Low,
    Medium,
    High,
}

impl FodmapLevel {
    /// Map a catalog raw level. Catalog scale: 0 none, 1 low, > 1 high.
    pub fn from_catalog(raw: u8) -> Self {
        match raw {
            0 => FodmapLevel::None,
            1 => FodmapLevel::Low,
            _ => FodmapLevel::High,
        }
    }

    /// Map a user-authored raw level. Inverted scale: 0 high, 1 medium,
    /// 2 (and anything above) low.
    pub fn from_user_authored(raw: u8) -> Self {
        match raw {
            0 => FodmapLevel::High,
            1 => FodmapLevel::Medium,
            _ => FodmapLevel::Low,
        }
    }

    /// Whether this level qualifies as low-FODMAP.
    pub fn is_low(self) -> bool {
        self <= FodmapLevel::Low
    }
}

/// Canonical FODMAP severity profile of a food item across all six
/// categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FodmapProfile {
    pub fructose: FodmapLevel,
    pub lactose: FodmapLevel,
    pub fructan: FodmapLevel,
    pub mannitol: FodmapLevel,
    pub sorbitol: FodmapLevel,
    pub gos: FodmapLevel,
}

impl FodmapProfile {
    /// Build a profile from catalog raw levels, in [`FodmapCategory::ALL`]
    /// order.
    pub fn from_catalog_levels(raw: [u8; 6]) -> Self {
        Self::from_raw(raw, FodmapLevel::from_catalog)
    }

    /// Build a profile from user-authored raw levels (inverted scale), in
    /// [`FodmapCategory::ALL`] order.
    pub fn from_user_levels(raw: [u8; 6]) -> Self {
        Self::from_raw(raw, FodmapLevel::from_user_authored)
    }

    fn from_raw(raw: [u8; 6], map: fn(u8) -> FodmapLevel) -> Self {
        Self {
            fructose: map(raw[0]),
            lactose: map(raw[1]),
            fructan: map(raw[2]),
            mannitol: map(raw[3]),
            sorbitol: map(raw[4]),
            gos: map(raw[5]),
        }
    }

    pub fn level(&self, category: FodmapCategory) -> FodmapLevel {
        match category {
            FodmapCategory::Fructose => self.fructose,
            FodmapCategory::Lactose => self.lactose,
            FodmapCategory::Fructan => self.fructan,
            FodmapCategory::Mannitol => self.mannitol,
            FodmapCategory::Sorbitol => self.sorbitol,
            FodmapCategory::Gos => self.gos,
        }
    }

    /// The worst severity across all six categories.
    pub fn highest(&self) -> FodmapLevel {
        FodmapCategory::ALL
            .iter()
            .map(|c| self.level(*c))
            .max()
            .unwrap_or(FodmapLevel::None)
    }

    /// Whether the item is strictly low-FODMAP in every category.
    pub fn is_low_fodmap(&self) -> bool {
        FodmapCategory::ALL.iter().all(|c| self.level(*c).is_low())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_mapping() {
        assert_eq!(FodmapLevel::from_catalog(0), FodmapLevel::None);
        assert_eq!(FodmapLevel::from_catalog(1), FodmapLevel::Low);
        assert_eq!(FodmapLevel::from_catalog(2), FodmapLevel::High);
        assert_eq!(FodmapLevel::from_catalog(3), FodmapLevel::High);
    }

    #[test]
    fn user_authored_mapping_is_inverted() {
        assert_eq!(FodmapLevel::from_user_authored(0), FodmapLevel::High);
        assert_eq!(FodmapLevel::from_user_authored(1), FodmapLevel::Medium);
        assert_eq!(FodmapLevel::from_user_authored(2), FodmapLevel::Low);
    }

    #[test]
    fn cross_scale_disqualification_matches() {
        // A user-authored raw 0 (high) must disqualify exactly like a
        // catalog raw 2 (high).
        let user = FodmapProfile::from_user_levels([0, 2, 2, 2, 2, 2]);
        let catalog = FodmapProfile::from_catalog_levels([2, 0, 0, 0, 0, 0]);
        assert!(!user.is_low_fodmap());
        assert!(!catalog.is_low_fodmap());
        assert_eq!(user.highest(), catalog.highest());
    }

    #[test]
    fn all_low_profiles_pass() {
        let user = FodmapProfile::from_user_levels([2, 2, 2, 2, 2, 2]);
        let catalog = FodmapProfile::from_catalog_levels([1, 0, 1, 0, 1, 0]);
        assert!(user.is_low_fodmap());
        assert!(catalog.is_low_fodmap());
    }

    #[test]
    fn medium_is_not_low() {
        let user = FodmapProfile::from_user_levels([1, 2, 2, 2, 2, 2]);
        assert!(!user.is_low_fodmap());
        assert_eq!(user.highest(), FodmapLevel::Medium);
    }

    #[test]
    fn category_round_trip() {
        for category in FodmapCategory::ALL {
            let parsed: FodmapCategory = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert!("unknown".parse::<FodmapCategory>().is_err());
    }
}
