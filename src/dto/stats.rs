//! Payloads exchanged with the stats REST API.

use serde::{Deserialize, Serialize};

use crate::{
    dto::{opt_string_or_number, string_or_number},
    state::stats::{PlayerStatTotals, StatKind, TeamStatTotals, floor_count},
};

/// Player as listed by `GET /games/{gameId}/players`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    /// Player id, matching the roster entry id.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Shirt number, if assigned.
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub jersey_number: Option<String>,
    /// Authoritative totals, when the server includes them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<PlayerStatCounts>,
}

/// Raw per-player counts as reported remotely; may be negative or missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerStatCounts {
    /// Attack kills.
    pub kills: i64,
    /// Blocks.
    pub blocks: i64,
    /// Service aces.
    pub aces: i64,
    /// Digs.
    pub digs: i64,
    /// Assists.
    pub assists: i64,
    /// Errors.
    pub errors: i64,
}

impl From<PlayerStatCounts> for PlayerStatTotals {
    fn from(value: PlayerStatCounts) -> Self {
        PlayerStatTotals::from_counts(
            floor_count(value.kills),
            floor_count(value.blocks),
            floor_count(value.aces),
            floor_count(value.digs),
            floor_count(value.assists),
            floor_count(value.errors),
        )
    }
}

/// Team stat record returned by `GET /games/{gameId}/team-stats` and its POST echo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamStatRecord {
    /// Record id assigned by the server.
    #[serde(deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    /// Game the record belongs to.
    #[serde(deserialize_with = "opt_string_or_number")]
    pub game_id: Option<String>,
    /// Points won by the team.
    pub total_points: i64,
    /// Team errors.
    pub errors: i64,
    /// Missed serves.
    pub missed_serves: i64,
    /// Service aces.
    pub aces: i64,
    /// Timeouts called.
    pub timeouts: i64,
    /// Server timestamp of the last update, as sent.
    pub timestamp: Option<String>,
}

impl From<&TeamStatRecord> for TeamStatTotals {
    fn from(value: &TeamStatRecord) -> Self {
        TeamStatTotals::from_counts(
            floor_count(value.total_points),
            floor_count(value.errors),
            floor_count(value.missed_serves),
            floor_count(value.aces),
            floor_count(value.timeouts),
        )
    }
}

/// Body of the stat recording endpoints: `{ "<statKind>": <delta> }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatIncrement(serde_json::Map<String, serde_json::Value>);

impl StatIncrement {
    /// Body carrying a single stat delta.
    pub fn new(kind: StatKind, delta: i64) -> Self {
        let mut body = serde_json::Map::new();
        body.insert(kind.key().to_string(), delta.into());
        Self(body)
    }
}

/// Body of `POST /games/{gameId}/score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    /// Score after the change.
    pub score: u32,
    /// Delta that produced it; zero for a direct set that kept the value.
    pub delta: i64,
}

/// One point of `GET /games/{gameId}/reports/player/{playerId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPoint {
    /// Point time, as sent by the server.
    pub timestamp: String,
    /// Performance value at that time.
    pub value: i64,
}
