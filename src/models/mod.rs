// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod analytics;
pub mod profile;
pub mod report;
pub mod stats;

pub use profile::{LeaderboardEntry, Profile, Role};
pub use report::{NewReport, Report, ReportStatus};
pub use stats::ReportStats;

use serde::{Deserialize, Deserializer};

/// Deserialize a nullable column, mapping `null` to the type's default.
/// Pair with `#[serde(default)]` so a missing column is covered too.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
