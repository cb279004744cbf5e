//! The session store: single registry of game sessions, mutated only through
//! [`StoreCommand`] so the session invariants hold from the outside.

use indexmap::IndexMap;
use time::OffsetDateTime;

use crate::{
    error::ScoreError,
    state::{
        session::{FinalSnapshot, GameMode, GameSession, SessionFilter, SessionId, roster_from_names},
        stats::{PlayerStatTotals, StatScope, StatTarget, TeamStatTotals},
    },
};

/// Closed set of commands the store accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    /// Register a new session and make it current.
    CreateSession {
        /// Display name; must not be blank.
        name: String,
        /// Tracking mode.
        mode: GameMode,
        /// Raw player names; blanks are skipped, ignored entirely in team mode.
        roster: Vec<String>,
    },
    /// Move the current-session pointer.
    SelectSession {
        /// Session to select.
        session_id: SessionId,
    },
    /// Add a (non-zero) delta to one counter, flooring at zero.
    ApplyStatDelta {
        /// Session to change.
        session_id: SessionId,
        /// Counter to change.
        target: StatTarget,
        /// Requested delta.
        delta: i64,
    },
    /// Add a (non-zero) delta to the score, flooring at zero.
    ApplyScoreDelta {
        /// Session to change.
        session_id: SessionId,
        /// Requested delta.
        delta: i64,
    },
    /// Replace the score outright.
    SetScore {
        /// Session to change.
        session_id: SessionId,
        /// New score; must not be negative.
        score: i64,
    },
    /// Overwrite player totals with values from the remote source of truth.
    ReplacePlayerTotals {
        /// Session to change.
        session_id: SessionId,
        /// Totals keyed by player id; ids not on the roster are skipped.
        totals: Vec<(String, PlayerStatTotals)>,
    },
    /// Overwrite team totals with values from the remote source of truth.
    ReplaceTeamTotals {
        /// Session to change.
        session_id: SessionId,
        /// New totals.
        totals: TeamStatTotals,
    },
    /// Transition an active session to completed, exactly once.
    FinishSession {
        /// Session to finish.
        session_id: SessionId,
    },
}

/// Description of the change a successful command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A session was created and selected.
    SessionCreated {
        /// New session id.
        session_id: SessionId,
    },
    /// The current-session pointer moved.
    SessionSelected {
        /// Selected session id.
        session_id: SessionId,
    },
    /// A counter changed (possibly by zero when clamped).
    StatChanged {
        /// Session that changed.
        session_id: SessionId,
        /// Counter that was addressed.
        target: StatTarget,
        /// Delta actually applied after flooring.
        applied: i64,
        /// Counter value after the command.
        value: u32,
    },
    /// The score changed (possibly by zero when clamped).
    ScoreChanged {
        /// Session that changed.
        session_id: SessionId,
        /// Delta actually applied after flooring.
        applied: i64,
        /// Score after the command.
        score: u32,
    },
    /// Totals of one scope were overwritten from the remote.
    TotalsReplaced {
        /// Session that changed.
        session_id: SessionId,
        /// Scope that was overwritten.
        scope: StatScope,
        /// Number of entities whose totals were replaced.
        replaced: usize,
        /// Player ids present remotely but absent from the roster.
        skipped: Vec<String>,
    },
    /// The session was completed.
    SessionFinished {
        /// Finished session id.
        session_id: SessionId,
        /// Captured final data.
        snapshot: FinalSnapshot,
    },
}

/// In-memory registry of sessions plus the current-session pointer.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: IndexMap<SessionId, GameSession>,
    current: Option<SessionId>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session.
    pub fn get(&self, session_id: SessionId) -> Option<&GameSession> {
        self.sessions.get(&session_id)
    }

    /// Currently selected session, if any.
    pub fn current(&self) -> Option<&GameSession> {
        self.current.and_then(|id| self.sessions.get(&id))
    }

    /// Sessions matching `filter`, in insertion order.
    pub fn list(&self, filter: SessionFilter) -> Vec<&GameSession> {
        self.sessions
            .values()
            .filter(|session| filter.matches(session.status()))
            .collect()
    }

    /// Number of sessions ever created in this store.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session was created yet.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Apply one command atomically, returning what changed.
    pub fn dispatch(&mut self, command: StoreCommand) -> Result<StoreEvent, ScoreError> {
        match command {
            StoreCommand::CreateSession { name, mode, roster } => {
                self.create_session(name, mode, roster)
            }
            StoreCommand::SelectSession { session_id } => {
                self.active_session_mut(session_id)?;
                self.current = Some(session_id);
                Ok(StoreEvent::SessionSelected { session_id })
            }
            StoreCommand::ApplyStatDelta {
                session_id,
                target,
                delta,
            } => self.apply_stat_delta(session_id, target, delta),
            StoreCommand::ApplyScoreDelta { session_id, delta } => {
                let session = self.active_session_mut(session_id)?;
                if delta == 0 {
                    return Err(ScoreError::Validation("score delta must not be zero".into()));
                }
                let current = i64::from(session.score());
                let next = crate::state::stats::floor_count(current.saturating_add(delta));
                session.set_score(next);
                Ok(StoreEvent::ScoreChanged {
                    session_id,
                    applied: i64::from(next) - current,
                    score: next,
                })
            }
            StoreCommand::SetScore { session_id, score } => {
                let session = self.active_session_mut(session_id)?;
                let Ok(next) = u32::try_from(score) else {
                    return Err(ScoreError::Validation(format!(
                        "score must be a non-negative integer (got {score})"
                    )));
                };
                let applied = i64::from(next) - i64::from(session.score());
                session.set_score(next);
                Ok(StoreEvent::ScoreChanged {
                    session_id,
                    applied,
                    score: next,
                })
            }
            StoreCommand::ReplacePlayerTotals { session_id, totals } => {
                let session = self.active_session_mut(session_id)?;
                if session.mode() == GameMode::Team {
                    return Err(ScoreError::Validation(
                        "team-mode sessions do not track player totals".into(),
                    ));
                }
                let mut replaced = 0;
                let mut skipped = Vec::new();
                for (player_id, incoming) in totals {
                    match session.player_totals_mut(&player_id) {
                        Some(slot) => {
                            *slot = incoming;
                            replaced += 1;
                        }
                        None => skipped.push(player_id),
                    }
                }
                Ok(StoreEvent::TotalsReplaced {
                    session_id,
                    scope: StatScope::Player,
                    replaced,
                    skipped,
                })
            }
            StoreCommand::ReplaceTeamTotals { session_id, totals } => {
                let session = self.active_session_mut(session_id)?;
                *session.team_totals_mut() = totals;
                Ok(StoreEvent::TotalsReplaced {
                    session_id,
                    scope: StatScope::Team,
                    replaced: 1,
                    skipped: Vec::new(),
                })
            }
            StoreCommand::FinishSession { session_id } => {
                let Some(session) = self.sessions.get_mut(&session_id) else {
                    return Err(ScoreError::InvalidState(format!(
                        "cannot finish unknown session `{session_id}`"
                    )));
                };
                if !session.is_active() {
                    return Err(ScoreError::InvalidState(format!(
                        "session `{session_id}` is already completed"
                    )));
                }
                let snapshot = session.complete(OffsetDateTime::now_utc());
                if self.current == Some(session_id) {
                    self.current = None;
                }
                Ok(StoreEvent::SessionFinished {
                    session_id,
                    snapshot,
                })
            }
        }
    }

    fn create_session(
        &mut self,
        name: String,
        mode: GameMode,
        roster: Vec<String>,
    ) -> Result<StoreEvent, ScoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ScoreError::Validation(
                "session name must not be empty".into(),
            ));
        }

        let roster = match mode {
            GameMode::Player => {
                let entries = roster_from_names(&roster);
                if entries.is_empty() {
                    return Err(ScoreError::Validation(
                        "a player-mode session requires at least one player".into(),
                    ));
                }
                entries
            }
            GameMode::Team => Vec::new(),
        };

        let session = GameSession::new(name.to_string(), mode, roster);
        let session_id = session.id();
        self.sessions.insert(session_id, session);
        self.current = Some(session_id);
        Ok(StoreEvent::SessionCreated { session_id })
    }

    fn apply_stat_delta(
        &mut self,
        session_id: SessionId,
        target: StatTarget,
        delta: i64,
    ) -> Result<StoreEvent, ScoreError> {
        let session = self.active_session_mut(session_id)?;

        if delta == 0 {
            return Err(ScoreError::Validation("stat delta must not be zero".into()));
        }
        if !target.kind.allowed_in(target.scope) {
            return Err(ScoreError::Validation(format!(
                "`{}` is not a {:?}-scoped stat",
                target.kind, target.scope
            )));
        }

        let applied = match (target.scope, target.player_id.as_deref()) {
            (StatScope::Player, Some(player_id)) => {
                if session.mode() != GameMode::Player {
                    return Err(ScoreError::Validation(
                        "player stats require a player-mode session".into(),
                    ));
                }
                session
                    .player_totals_mut(player_id)
                    .ok_or_else(|| {
                        ScoreError::Validation(format!("player `{player_id}` is not on the roster"))
                    })?
                    .apply(target.kind, delta)
            }
            (StatScope::Player, None) => {
                return Err(ScoreError::Validation(
                    "player stats require a player id".into(),
                ));
            }
            (StatScope::Team, None) => session.team_totals_mut().apply(target.kind, delta),
            (StatScope::Team, Some(_)) => {
                return Err(ScoreError::Validation(
                    "team stats must not carry a player id".into(),
                ));
            }
        };

        let Some((value, applied)) = applied else {
            return Err(ScoreError::Validation(format!(
                "`{}` cannot be tracked in this scope",
                target.kind
            )));
        };

        Ok(StoreEvent::StatChanged {
            session_id,
            target,
            applied,
            value,
        })
    }

    /// Resolve a session that may still be mutated.
    fn active_session_mut(&mut self, session_id: SessionId) -> Result<&mut GameSession, ScoreError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| ScoreError::NotFound(format!("session `{session_id}` not found")))?;
        if !session.is_active() {
            return Err(ScoreError::InvalidState(format!(
                "session `{session_id}` is completed"
            )));
        }
        Ok(session)
    }

    /// Convenience wrapper around [`StoreCommand::CreateSession`] returning the new id.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        mode: GameMode,
        roster: &[&str],
    ) -> Result<SessionId, ScoreError> {
        match self.dispatch(StoreCommand::CreateSession {
            name: name.into(),
            mode,
            roster: roster.iter().map(|name| name.to_string()).collect(),
        })? {
            StoreEvent::SessionCreated { session_id } => Ok(session_id),
            other => Err(ScoreError::InvalidState(format!(
                "unexpected store event {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        session::SessionStatus,
        stats::{PLAYER_STAT_KINDS, StatKind},
    };

    fn player_session(store: &mut SessionStore) -> SessionId {
        store
            .create("League night", GameMode::Player, &["Ann", "Bo"])
            .unwrap()
    }

    fn adjust(
        store: &mut SessionStore,
        session_id: SessionId,
        target: StatTarget,
        delta: i64,
    ) -> Result<StoreEvent, ScoreError> {
        store.dispatch(StoreCommand::ApplyStatDelta {
            session_id,
            target,
            delta,
        })
    }

    #[test]
    fn create_selects_new_session() {
        let mut store = SessionStore::new();
        let id = player_session(&mut store);
        assert_eq!(store.current().map(GameSession::id), Some(id));
        let session = store.get(id).unwrap();
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.score(), 0);
        assert_eq!(session.roster().len(), 2);
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut store = SessionStore::new();
        let err = store.create("   ", GameMode::Team, &[]).unwrap_err();
        assert!(matches!(err, ScoreError::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn all_blank_roster_is_rejected_in_player_mode() {
        let mut store = SessionStore::new();
        let err = store
            .create("Pickup", GameMode::Player, &["", "  "])
            .unwrap_err();
        assert!(matches!(err, ScoreError::Validation(_)));
    }

    #[test]
    fn team_mode_ignores_roster_input() {
        let mut store = SessionStore::new();
        let id = store.create("Pickup", GameMode::Team, &["Ann", "Bo"]).unwrap();
        let session = store.get(id).unwrap();
        assert!(session.roster().is_empty());
        assert!(session.all_player_totals().is_empty());
    }

    #[test]
    fn select_unknown_session_is_not_found() {
        let mut store = SessionStore::new();
        let err = store
            .dispatch(StoreCommand::SelectSession {
                session_id: SessionId::new_v4(),
            })
            .unwrap_err();
        assert!(matches!(err, ScoreError::NotFound(_)));
    }

    #[test]
    fn select_completed_session_is_rejected() {
        let mut store = SessionStore::new();
        let id = store.create("Cup", GameMode::Team, &[]).unwrap();
        store
            .dispatch(StoreCommand::FinishSession { session_id: id })
            .unwrap();

        let err = store
            .dispatch(StoreCommand::SelectSession { session_id: id })
            .unwrap_err();
        assert!(matches!(err, ScoreError::InvalidState(_)));
        assert!(store.current().is_none());
    }

    #[test]
    fn oversized_deltas_saturate() {
        let mut store = SessionStore::new();
        let id = store.create("Cup", GameMode::Team, &[]).unwrap();
        adjust(&mut store, id, StatTarget::team(StatKind::Aces), 1).unwrap();
        let event = adjust(&mut store, id, StatTarget::team(StatKind::Aces), i64::MAX).unwrap();
        assert!(matches!(event, StoreEvent::StatChanged { value: u32::MAX, .. }));

        store
            .dispatch(StoreCommand::ApplyScoreDelta {
                session_id: id,
                delta: 3,
            })
            .unwrap();
        let event = store
            .dispatch(StoreCommand::ApplyScoreDelta {
                session_id: id,
                delta: i64::MAX,
            })
            .unwrap();
        assert_eq!(
            event,
            StoreEvent::ScoreChanged {
                session_id: id,
                applied: i64::from(u32::MAX) - 3,
                score: u32::MAX,
            }
        );
        let event = store
            .dispatch(StoreCommand::ApplyScoreDelta {
                session_id: id,
                delta: i64::MIN,
            })
            .unwrap();
        assert!(matches!(event, StoreEvent::ScoreChanged { score: 0, .. }));
    }

    #[test]
    fn player_increments_and_clamped_decrements() {
        let mut store = SessionStore::new();
        let id = player_session(&mut store);

        for _ in 0..3 {
            adjust(&mut store, id, StatTarget::player("player-1", StatKind::Kills), 1).unwrap();
        }
        for _ in 0..4 {
            let event =
                adjust(&mut store, id, StatTarget::player("player-2", StatKind::Errors), -1)
                    .unwrap();
            assert!(matches!(
                event,
                StoreEvent::StatChanged {
                    applied: 0,
                    value: 0,
                    ..
                }
            ));
        }

        let session = store.get(id).unwrap();
        assert_eq!(
            session.player_totals("player-1").unwrap().get(StatKind::Kills),
            Some(3)
        );
        assert_eq!(
            session.player_totals("player-2").unwrap().get(StatKind::Errors),
            Some(0)
        );
    }

    #[test]
    fn player_and_team_aces_are_independent() {
        let mut store = SessionStore::new();
        let id = player_session(&mut store);
        adjust(&mut store, id, StatTarget::player("player-1", StatKind::Aces), 1).unwrap();
        adjust(&mut store, id, StatTarget::team(StatKind::Aces), 2).unwrap();

        let session = store.get(id).unwrap();
        assert_eq!(
            session.player_totals("player-1").unwrap().get(StatKind::Aces),
            Some(1)
        );
        assert_eq!(session.team_totals().get(StatKind::Aces), Some(2));
    }

    #[test]
    fn invalid_targets_are_validation_errors() {
        let mut store = SessionStore::new();
        let id = player_session(&mut store);

        let cases = [
            StatTarget::player("player-9", StatKind::Kills),
            StatTarget::player("player-1", StatKind::Timeouts),
            StatTarget::team(StatKind::Digs),
            StatTarget {
                scope: StatScope::Player,
                player_id: None,
                kind: StatKind::Kills,
            },
            StatTarget {
                scope: StatScope::Team,
                player_id: Some("player-1".into()),
                kind: StatKind::Aces,
            },
        ];
        for target in cases {
            let err = adjust(&mut store, id, target.clone(), 1).unwrap_err();
            assert!(
                matches!(err, ScoreError::Validation(_)),
                "expected validation error for {target:?}, got {err:?}"
            );
        }

        let team_id = store.create("Team", GameMode::Team, &[]).unwrap();
        let err = adjust(
            &mut store,
            team_id,
            StatTarget::player("player-1", StatKind::Kills),
            1,
        )
        .unwrap_err();
        assert!(matches!(err, ScoreError::Validation(_)));
    }

    #[test]
    fn set_score_rejects_negative_values() {
        let mut store = SessionStore::new();
        let id = player_session(&mut store);
        let err = store
            .dispatch(StoreCommand::SetScore {
                session_id: id,
                score: -1,
            })
            .unwrap_err();
        assert!(matches!(err, ScoreError::Validation(_)));

        store
            .dispatch(StoreCommand::SetScore {
                session_id: id,
                score: 12,
            })
            .unwrap();
        assert_eq!(store.get(id).unwrap().score(), 12);
    }

    #[test]
    fn finish_is_not_idempotent() {
        let mut store = SessionStore::new();
        let id = store.create("Final", GameMode::Team, &[]).unwrap();
        store
            .dispatch(StoreCommand::SetScore {
                session_id: id,
                score: 25,
            })
            .unwrap();

        let event = store
            .dispatch(StoreCommand::FinishSession { session_id: id })
            .unwrap();
        let StoreEvent::SessionFinished { snapshot, .. } = event else {
            panic!("expected SessionFinished, got {event:?}");
        };
        assert_eq!(snapshot.final_score, 25);
        assert!(store.current().is_none());

        let err = store
            .dispatch(StoreCommand::FinishSession { session_id: id })
            .unwrap_err();
        assert!(matches!(err, ScoreError::InvalidState(_)));

        let err = store
            .dispatch(StoreCommand::FinishSession {
                session_id: SessionId::new_v4(),
            })
            .unwrap_err();
        assert!(matches!(err, ScoreError::InvalidState(_)));
    }

    #[test]
    fn completed_sessions_are_frozen() {
        let mut store = SessionStore::new();
        let id = player_session(&mut store);
        adjust(&mut store, id, StatTarget::player("player-1", StatKind::Digs), 2).unwrap();
        store
            .dispatch(StoreCommand::FinishSession { session_id: id })
            .unwrap();

        let commands = [
            StoreCommand::ApplyStatDelta {
                session_id: id,
                target: StatTarget::player("player-1", StatKind::Digs),
                delta: 1,
            },
            StoreCommand::ApplyScoreDelta {
                session_id: id,
                delta: 1,
            },
            StoreCommand::SetScore {
                session_id: id,
                score: -4,
            },
            StoreCommand::ReplaceTeamTotals {
                session_id: id,
                totals: TeamStatTotals::default(),
            },
        ];
        for command in commands {
            let err = store.dispatch(command).unwrap_err();
            assert!(matches!(err, ScoreError::InvalidState(_)));
        }

        let totals = store.get(id).unwrap().player_totals("player-1").unwrap();
        for kind in PLAYER_STAT_KINDS {
            let expected = if kind == StatKind::Digs { 2 } else { 0 };
            assert_eq!(totals.get(kind), Some(expected));
        }
    }

    #[test]
    fn replace_player_totals_skips_unknown_players() {
        let mut store = SessionStore::new();
        let id = player_session(&mut store);
        let remote = PlayerStatTotals::from_counts(4, 0, 1, 0, 0, 0);

        let event = store
            .dispatch(StoreCommand::ReplacePlayerTotals {
                session_id: id,
                totals: vec![("player-2".into(), remote), ("17".into(), remote)],
            })
            .unwrap();
        assert_eq!(
            event,
            StoreEvent::TotalsReplaced {
                session_id: id,
                scope: StatScope::Player,
                replaced: 1,
                skipped: vec!["17".into()],
            }
        );
        assert_eq!(store.get(id).unwrap().player_totals("player-2"), Some(&remote));
    }

    #[test]
    fn list_preserves_insertion_order_and_filters() {
        let mut store = SessionStore::new();
        let first = store.create("First", GameMode::Team, &[]).unwrap();
        let second = store.create("Second", GameMode::Team, &[]).unwrap();
        let third = store.create("Third", GameMode::Team, &[]).unwrap();
        store
            .dispatch(StoreCommand::FinishSession { session_id: second })
            .unwrap();

        let ids = |filter| {
            store
                .list(filter)
                .into_iter()
                .map(GameSession::id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(SessionFilter::All), vec![first, second, third]);
        assert_eq!(ids(SessionFilter::Active), vec![first, third]);
        assert_eq!(ids(SessionFilter::Completed), vec![second]);
    }
}
