//! Profile model: role and points for one identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Application role. Only authorities may review reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Community,
    Authority,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Community => "community",
            Role::Authority => "authority",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "community" => Ok(Role::Community),
            "authority" => Ok(Role::Authority),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// User profile stored in the `profiles` table (id = auth user id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub role: Role,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// A fresh profile with zero points.
    pub fn new(id: impl Into<String>, full_name: Option<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            full_name,
            role,
            points: 0,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_authority(&self) -> bool {
        self.role == Role::Authority
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub id: String,
    pub full_name: String,
    pub points: u32,
    pub verified_reports: u32,
    pub total_reports: u32,
    pub rank: u32,
    pub badge: Badge,
    /// Display name of `badge`
    pub badge_label: &'static str,
}

/// Name shown for profiles without a name.
pub const ANONYMOUS_NAME: &str = "Anonymous Guardian";

/// Leaderboard badge, by rank first and then by points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    Champion,
    SilverGuardian,
    BronzeProtector,
    EcoWarrior,
    TopGuardian,
    RisingStar,
    NewGuardian,
}

impl Badge {
    pub fn for_standing(rank: u32, points: u32) -> Self {
        match (rank, points) {
            (1, _) => Badge::Champion,
            (2, _) => Badge::SilverGuardian,
            (3, _) => Badge::BronzeProtector,
            (_, p) if p >= 100 => Badge::EcoWarrior,
            (_, p) if p >= 50 => Badge::TopGuardian,
            (_, p) if p >= 20 => Badge::RisingStar,
            _ => Badge::NewGuardian,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Badge::Champion => "Champion",
            Badge::SilverGuardian => "Silver Guardian",
            Badge::BronzeProtector => "Bronze Protector",
            Badge::EcoWarrior => "Eco Warrior",
            Badge::TopGuardian => "Top Guardian",
            Badge::RisingStar => "Rising Star",
            Badge::NewGuardian => "New Guardian",
        }
    }
}
