//! Session lifecycle operations on the shared store.

use tracing::info;

use crate::{
    error::ScoreError,
    services::{
        live_update,
        mutation_service::{self, MutationOutcome},
    },
    state::{
        SharedState,
        session::{FinalSnapshot, GameMode, GameSession, SessionFilter, SessionId},
        stats::ScoreEvent,
        store::{StoreCommand, StoreEvent},
    },
};

/// Create a session from raw roster names and make it current.
pub async fn create_session(
    state: &SharedState,
    name: impl Into<String>,
    mode: GameMode,
    roster: Vec<String>,
) -> Result<SessionId, ScoreError> {
    match state
        .dispatch(StoreCommand::CreateSession {
            name: name.into(),
            mode,
            roster,
        })
        .await?
    {
        StoreEvent::SessionCreated { session_id } => {
            info!(%session_id, ?mode, "session created");
            Ok(session_id)
        }
        other => Err(ScoreError::InvalidState(format!(
            "unexpected store event {other:?}"
        ))),
    }
}

/// Move the current-session pointer.
pub async fn select_session(state: &SharedState, session_id: SessionId) -> Result<(), ScoreError> {
    state
        .dispatch(StoreCommand::SelectSession { session_id })
        .await?;
    Ok(())
}

/// Replace the score outright, mirroring the change like any other score mutation.
pub async fn set_score(
    state: &SharedState,
    session_id: SessionId,
    score: i64,
) -> Result<MutationOutcome<ScoreEvent>, ScoreError> {
    let event = state
        .dispatch(StoreCommand::SetScore { session_id, score })
        .await?;
    mutation_service::mirror_score_change(state, session_id, event).await
}

/// Complete a session exactly once and stop following it.
pub async fn finish_session(
    state: &SharedState,
    session_id: SessionId,
) -> Result<FinalSnapshot, ScoreError> {
    let snapshot = match state
        .dispatch(StoreCommand::FinishSession { session_id })
        .await?
    {
        StoreEvent::SessionFinished { snapshot, .. } => snapshot,
        other => {
            return Err(ScoreError::InvalidState(format!(
                "unexpected store event {other:?}"
            )));
        }
    };

    live_update::unfollow(state, session_id).await;
    info!(%session_id, final_score = snapshot.final_score, "session finished");
    Ok(snapshot)
}

/// Copies of the sessions matching `filter`, in creation order.
pub async fn list_sessions(state: &SharedState, filter: SessionFilter) -> Vec<GameSession> {
    state
        .read_store(|store| store.list(filter).into_iter().cloned().collect())
        .await
}

/// Copy of the current session, if any.
pub async fn current_session(state: &SharedState) -> Option<GameSession> {
    state.read_store(|store| store.current().cloned()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::session::SessionStatus,
        testing::test_state,
    };

    #[tokio::test]
    async fn finish_twice_fails_and_captures_score() {
        let (state, api, _feed) = test_state();
        let id = create_session(&state, "Cup final", GameMode::Team, vec!["ignored".into()])
            .await
            .unwrap();
        let outcome = set_score(&state, id, 21).await.unwrap();
        assert_eq!(outcome.value, 21);
        assert_eq!(api.scores.lock().unwrap()[0].delta, 21);

        let snapshot = finish_session(&state, id).await.unwrap();
        assert_eq!(snapshot.final_score, 21);

        let err = finish_session(&state, id).await.unwrap_err();
        assert!(matches!(err, ScoreError::InvalidState(_)));

        let sessions = list_sessions(&state, SessionFilter::Completed).await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status(), SessionStatus::Completed);
        assert!(sessions[0].roster().is_empty());
        assert!(current_session(&state).await.is_none());
    }

    #[tokio::test]
    async fn negative_score_is_rejected() {
        let (state, _api, _feed) = test_state();
        let id = create_session(&state, "Warmup", GameMode::Player, vec!["Ann".into()])
            .await
            .unwrap();
        let err = set_score(&state, id, -3).await.unwrap_err();
        assert!(matches!(err, ScoreError::Validation(_)));
    }

    #[tokio::test]
    async fn select_switches_current_and_publishes() {
        let (state, _api, _feed) = test_state();
        let first = create_session(&state, "A", GameMode::Team, vec![]).await.unwrap();
        let _second = create_session(&state, "B", GameMode::Team, vec![]).await.unwrap();

        let mut events = state.events().subscribe();
        select_session(&state, first).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::SessionSelected { session_id: first }
        );
        assert_eq!(current_session(&state).await.map(|s| s.id()), Some(first));

        let err = select_session(&state, SessionId::new_v4()).await.unwrap_err();
        assert!(matches!(err, ScoreError::NotFound(_)));
    }
}
