//! Game session entity: roster, totals, score and completion.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::stats::{PlayerStatTotals, TeamStatTotals};

/// Identifier of a game session. Also used as the remote game id.
pub type SessionId = Uuid;

/// How stats are tracked for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Per-player stats for every roster entry.
    Player,
    /// A single set of team stats, no roster.
    Team,
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Accepting stat and score changes.
    Active,
    /// Frozen; only readable.
    Completed,
}

/// Selector used when listing sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionFilter {
    /// Only sessions still in progress.
    Active,
    /// Only finished sessions.
    Completed,
    /// Everything.
    #[default]
    All,
}

impl SessionFilter {
    /// Whether a session with `status` passes this filter.
    pub fn matches(self, status: SessionStatus) -> bool {
        match self {
            SessionFilter::Active => status == SessionStatus::Active,
            SessionFilter::Completed => status == SessionStatus::Completed,
            SessionFilter::All => true,
        }
    }
}

/// One player on a session roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Identifier unique within the session.
    pub player_id: String,
    /// Name shown in the stats grid.
    pub display_name: String,
    /// Optional shirt number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jersey_number: Option<String>,
}

/// Data captured when a session is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSnapshot {
    /// When the session was finished.
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    /// Score at the moment of finishing.
    pub final_score: u32,
}

/// One scored game with its roster, score and running stat totals.
///
/// Fields are only reachable through accessors; every change goes through the
/// [`SessionStore`](crate::state::store::SessionStore) command set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    id: SessionId,
    name: String,
    mode: GameMode,
    status: SessionStatus,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    roster: Vec<RosterEntry>,
    score: u32,
    player_totals: IndexMap<String, PlayerStatTotals>,
    team_totals: TeamStatTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_snapshot: Option<FinalSnapshot>,
}

impl GameSession {
    /// Build a fresh active session. Team-mode sessions never carry a roster.
    pub(crate) fn new(name: String, mode: GameMode, roster: Vec<RosterEntry>) -> Self {
        let roster = match mode {
            GameMode::Player => roster,
            GameMode::Team => Vec::new(),
        };
        let player_totals = roster
            .iter()
            .map(|entry| (entry.player_id.clone(), PlayerStatTotals::default()))
            .collect();

        Self {
            id: Uuid::new_v4(),
            name,
            mode,
            status: SessionStatus::Active,
            created_at: OffsetDateTime::now_utc(),
            roster,
            score: 0,
            player_totals,
            team_totals: TeamStatTotals::default(),
            final_snapshot: None,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tracking mode.
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Whether the session still accepts changes.
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Roster in creation order; empty for team-mode sessions.
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    /// Look up a roster entry by id.
    pub fn roster_entry(&self, player_id: &str) -> Option<&RosterEntry> {
        self.roster.iter().find(|entry| entry.player_id == player_id)
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Totals for one roster entry.
    pub fn player_totals(&self, player_id: &str) -> Option<&PlayerStatTotals> {
        self.player_totals.get(player_id)
    }

    /// Totals for every roster entry, in roster order.
    pub fn all_player_totals(&self) -> &IndexMap<String, PlayerStatTotals> {
        &self.player_totals
    }

    /// Team totals.
    pub fn team_totals(&self) -> &TeamStatTotals {
        &self.team_totals
    }

    /// Present once the session is completed.
    pub fn final_snapshot(&self) -> Option<&FinalSnapshot> {
        self.final_snapshot.as_ref()
    }

    pub(crate) fn player_totals_mut(&mut self, player_id: &str) -> Option<&mut PlayerStatTotals> {
        self.player_totals.get_mut(player_id)
    }

    pub(crate) fn team_totals_mut(&mut self) -> &mut TeamStatTotals {
        &mut self.team_totals
    }

    pub(crate) fn set_score(&mut self, score: u32) {
        self.score = score;
    }

    /// Freeze the session and stamp the final snapshot.
    pub(crate) fn complete(&mut self, completed_at: OffsetDateTime) -> FinalSnapshot {
        let snapshot = FinalSnapshot {
            completed_at,
            final_score: self.score,
        };
        self.status = SessionStatus::Completed;
        self.final_snapshot = Some(snapshot);
        snapshot
    }
}

/// Build roster entries from raw names, skipping blanks and assigning positional ids.
pub(crate) fn roster_from_names(names: &[String]) -> Vec<RosterEntry> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .enumerate()
        .map(|(index, name)| RosterEntry {
            player_id: format!("player-{}", index + 1),
            display_name: name.to_string(),
            jersey_number: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_skips_blank_names() {
        let names = vec!["Ann".to_string(), "   ".to_string(), " Bo ".to_string()];
        let roster = roster_from_names(&names);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].player_id, "player-1");
        assert_eq!(roster[1].player_id, "player-2");
        assert_eq!(roster[1].display_name, "Bo");
    }

    #[test]
    fn team_mode_drops_roster() {
        let roster = roster_from_names(&["Ann".to_string()]);
        let session = GameSession::new("Scrimmage".into(), GameMode::Team, roster);
        assert!(session.roster().is_empty());
        assert!(session.all_player_totals().is_empty());
    }

    #[test]
    fn complete_captures_score() {
        let mut session = GameSession::new("Final".into(), GameMode::Team, Vec::new());
        session.set_score(21);
        let snapshot = session.complete(OffsetDateTime::UNIX_EPOCH);
        assert_eq!(snapshot.final_score, 21);
        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.final_snapshot(), Some(&snapshot));
    }
}
