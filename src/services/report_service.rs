use crate::{
    dto::stats::ReportPoint,
    error::ScoreError,
    state::{SharedState, session::SessionId},
};

/// Ordered performance series of one player, as computed remotely.
pub async fn player_report(
    state: &SharedState,
    session_id: SessionId,
    player_id: &str,
) -> Result<Vec<ReportPoint>, ScoreError> {
    let player_id = player_id.trim();
    if player_id.is_empty() {
        return Err(ScoreError::Validation("player id must not be empty".into()));
    }
    let points = state
        .api()
        .player_report(session_id.to_string(), player_id.to_string())
        .await?;
    Ok(points)
}

/// Current performance of every roster entry of a session, from the local totals.
pub async fn performance_summary(
    state: &SharedState,
    session_id: SessionId,
) -> Result<Vec<(String, u32)>, ScoreError> {
    state
        .read_store(|store| {
            let session = store
                .get(session_id)
                .ok_or_else(|| ScoreError::NotFound(format!("session `{session_id}` not found")))?;
            Ok(session
                .all_player_totals()
                .iter()
                .map(|(player_id, totals)| (player_id.clone(), totals.performance()))
                .collect())
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::{
            mutation_service::{self, Direction},
            session_service,
        },
        state::{
            session::GameMode,
            stats::{StatKind, StatTarget},
        },
        testing::test_state,
    };

    #[tokio::test]
    async fn performance_subtracts_errors() {
        let (state, _api, _feed) = test_state();
        let id = session_service::create_session(
            &state,
            "League",
            GameMode::Player,
            vec!["Ann".into(), "Bo".into()],
        )
        .await
        .unwrap();

        mutation_service::record(&state, id, StatTarget::player("player-1", StatKind::Kills), 3)
            .await
            .unwrap();
        mutation_service::adjust(
            &state,
            id,
            StatTarget::player("player-1", StatKind::Errors),
            Direction::Increment,
        )
        .await
        .unwrap();
        mutation_service::adjust(
            &state,
            id,
            StatTarget::player("player-2", StatKind::Errors),
            Direction::Increment,
        )
        .await
        .unwrap();

        let summary = performance_summary(&state, id).await.unwrap();
        assert_eq!(
            summary,
            vec![("player-1".to_string(), 2), ("player-2".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn report_is_fetched_remotely() {
        let (state, api, _feed) = test_state();
        *api.report.lock().unwrap() = vec![ReportPoint {
            timestamp: "2025-07-24T18:03:11".into(),
            value: 4,
        }];

        let points = player_report(&state, SessionId::new_v4(), "player-1")
            .await
            .unwrap();
        assert_eq!(points.len(), 1);
        assert!(matches!(
            player_report(&state, SessionId::new_v4(), " ").await,
            Err(ScoreError::Validation(_))
        ));
    }
}
