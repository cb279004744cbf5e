//! Stat records: the closed set of stat kinds, per-entity running totals and the
//! event emitted for every applied change.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Whether a stat belongs to an individual player or to the team as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatScope {
    /// Stat tracked per roster entry.
    Player,
    /// Stat tracked once for the whole team.
    Team,
}

/// Every stat the scoreboard knows about.
///
/// `Aces` and `Errors` exist in both scopes; the player and team counters are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatKind {
    /// Attack that ends the rally in our favour (player).
    Kills,
    /// Successful block (player).
    Blocks,
    /// Serve that scores directly (player and team).
    Aces,
    /// Defensive dig (player).
    Digs,
    /// Set leading to a kill (player).
    Assists,
    /// Unforced error (player and team).
    Errors,
    /// Points scored (team).
    TotalPoints,
    /// Serves that failed to cross the net (team).
    MissedServes,
    /// Timeouts called (team).
    Timeouts,
}

/// Player-scoped kinds in display order.
pub const PLAYER_STAT_KINDS: [StatKind; 6] = [
    StatKind::Kills,
    StatKind::Blocks,
    StatKind::Aces,
    StatKind::Digs,
    StatKind::Assists,
    StatKind::Errors,
];

/// Team-scoped kinds in display order.
pub const TEAM_STAT_KINDS: [StatKind; 5] = [
    StatKind::TotalPoints,
    StatKind::Errors,
    StatKind::MissedServes,
    StatKind::Aces,
    StatKind::Timeouts,
];

impl StatKind {
    /// Wire key used by the REST API and the push feed.
    pub fn key(self) -> &'static str {
        match self {
            StatKind::Kills => "kills",
            StatKind::Blocks => "blocks",
            StatKind::Aces => "aces",
            StatKind::Digs => "digs",
            StatKind::Assists => "assists",
            StatKind::Errors => "errors",
            StatKind::TotalPoints => "totalPoints",
            StatKind::MissedServes => "missedServes",
            StatKind::Timeouts => "timeouts",
        }
    }

    /// Human readable column label.
    pub fn label(self) -> &'static str {
        match self {
            StatKind::Kills => "Kills",
            StatKind::Blocks => "Blocks",
            StatKind::Aces => "Aces",
            StatKind::Digs => "Digs",
            StatKind::Assists => "Assists",
            StatKind::Errors => "Errors",
            StatKind::TotalPoints => "Total Points",
            StatKind::MissedServes => "Missed Serves",
            StatKind::Timeouts => "Timeouts",
        }
    }

    /// Whether this kind is tracked for the given scope.
    pub fn allowed_in(self, scope: StatScope) -> bool {
        match scope {
            StatScope::Player => PLAYER_STAT_KINDS.contains(&self),
            StatScope::Team => TEAM_STAT_KINDS.contains(&self),
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Returned when a wire key does not name any stat kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stat kind `{0}`")]
pub struct UnknownStatKind(
    /// The unrecognised key.
    pub String,
);

impl FromStr for StatKind {
    type Err = UnknownStatKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PLAYER_STAT_KINDS
            .iter()
            .chain(TEAM_STAT_KINDS.iter())
            .copied()
            .find(|kind| kind.key() == value)
            .ok_or_else(|| UnknownStatKind(value.to_string()))
    }
}

/// Addresses one counter inside a session: a team stat, or a stat of one roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatTarget {
    /// Scope the counter lives in.
    pub scope: StatScope,
    /// Roster entry the counter belongs to; required for player scope only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    /// Counter to change.
    pub kind: StatKind,
}

impl StatTarget {
    /// Target a player-scoped counter.
    pub fn player(player_id: impl Into<String>, kind: StatKind) -> Self {
        Self {
            scope: StatScope::Player,
            player_id: Some(player_id.into()),
            kind,
        }
    }

    /// Target a team-scoped counter.
    pub fn team(kind: StatKind) -> Self {
        Self {
            scope: StatScope::Team,
            player_id: None,
            kind,
        }
    }
}

/// Add `delta` to `slot`, flooring the result at zero.
///
/// Returns the new value and the delta that was actually applied.
fn apply_floored(slot: &mut u32, delta: i64) -> (u32, i64) {
    let current = i64::from(*slot);
    let next = current.saturating_add(delta).clamp(0, i64::from(u32::MAX));
    *slot = next as u32;
    (*slot, next - current)
}

/// Convert a remotely reported count, which may be negative or oversized, into a counter value.
pub(crate) fn floor_count(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

/// Running per-player totals. Counts only change through floored deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatTotals {
    kills: u32,
    blocks: u32,
    aces: u32,
    digs: u32,
    assists: u32,
    errors: u32,
}

impl PlayerStatTotals {
    /// Build totals from counts reported by the remote source of truth.
    pub(crate) fn from_counts(
        kills: u32,
        blocks: u32,
        aces: u32,
        digs: u32,
        assists: u32,
        errors: u32,
    ) -> Self {
        Self {
            kills,
            blocks,
            aces,
            digs,
            assists,
            errors,
        }
    }

    /// Current count for `kind`, or `None` when the kind is not player-scoped.
    pub fn get(&self, kind: StatKind) -> Option<u32> {
        match kind {
            StatKind::Kills => Some(self.kills),
            StatKind::Blocks => Some(self.blocks),
            StatKind::Aces => Some(self.aces),
            StatKind::Digs => Some(self.digs),
            StatKind::Assists => Some(self.assists),
            StatKind::Errors => Some(self.errors),
            _ => None,
        }
    }

    /// Positive actions minus errors, floored at zero.
    pub fn performance(&self) -> u32 {
        let positive = i64::from(self.kills)
            + i64::from(self.blocks)
            + i64::from(self.aces)
            + i64::from(self.digs)
            + i64::from(self.assists);
        floor_count(positive - i64::from(self.errors))
    }

    pub(crate) fn apply(&mut self, kind: StatKind, delta: i64) -> Option<(u32, i64)> {
        let slot = match kind {
            StatKind::Kills => &mut self.kills,
            StatKind::Blocks => &mut self.blocks,
            StatKind::Aces => &mut self.aces,
            StatKind::Digs => &mut self.digs,
            StatKind::Assists => &mut self.assists,
            StatKind::Errors => &mut self.errors,
            _ => return None,
        };
        Some(apply_floored(slot, delta))
    }
}

/// Running team totals. Counts only change through floored deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStatTotals {
    total_points: u32,
    errors: u32,
    missed_serves: u32,
    aces: u32,
    timeouts: u32,
}

impl TeamStatTotals {
    /// Build totals from counts reported by the remote source of truth.
    pub(crate) fn from_counts(
        total_points: u32,
        errors: u32,
        missed_serves: u32,
        aces: u32,
        timeouts: u32,
    ) -> Self {
        Self {
            total_points,
            errors,
            missed_serves,
            aces,
            timeouts,
        }
    }

    /// Current count for `kind`, or `None` when the kind is not team-scoped.
    pub fn get(&self, kind: StatKind) -> Option<u32> {
        match kind {
            StatKind::TotalPoints => Some(self.total_points),
            StatKind::Errors => Some(self.errors),
            StatKind::MissedServes => Some(self.missed_serves),
            StatKind::Aces => Some(self.aces),
            StatKind::Timeouts => Some(self.timeouts),
            _ => None,
        }
    }

    pub(crate) fn apply(&mut self, kind: StatKind, delta: i64) -> Option<(u32, i64)> {
        let slot = match kind {
            StatKind::TotalPoints => &mut self.total_points,
            StatKind::Errors => &mut self.errors,
            StatKind::MissedServes => &mut self.missed_serves,
            StatKind::Aces => &mut self.aces,
            StatKind::Timeouts => &mut self.timeouts,
            _ => return None,
        };
        Some(apply_floored(slot, delta))
    }
}

/// Record of one applied stat change, mirrored to the remote recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatEvent {
    /// Session the change belongs to; doubles as the remote game id.
    pub game_id: Uuid,
    /// Scope of the changed counter.
    pub scope: StatScope,
    /// Present iff `scope` is [`StatScope::Player`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    /// Counter that changed.
    pub stat_kind: StatKind,
    /// Applied (post-clamp) delta, never zero.
    pub delta: i64,
    /// Counter value after the change.
    pub resulting_value: u32,
    /// When the change was applied locally.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Record of one applied score change, mirrored to the remote recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEvent {
    /// Session the change belongs to; doubles as the remote game id.
    pub game_id: Uuid,
    /// Applied (post-clamp) delta, never zero.
    pub delta: i64,
    /// Score after the change.
    pub resulting_score: u32,
    /// When the change was applied locally.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
