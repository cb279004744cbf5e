//! Stat and score mutations: validated locally through the session store, applied
//! immediately, then mirrored to the remote recorder on a best-effort basis.

use futures::future::BoxFuture;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{
    dao::remote::{RemoteError, RemoteResult},
    error::ScoreError,
    state::{
        SharedState,
        session::SessionId,
        stats::{ScoreEvent, StatEvent, StatTarget},
        store::{StoreCommand, StoreEvent},
    },
};

/// Direction of a single-step adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// +1
    Increment,
    /// -1
    Decrement,
}

impl Direction {
    /// Signed delta of one step.
    pub fn delta(self) -> i64 {
        match self {
            Direction::Increment => 1,
            Direction::Decrement => -1,
        }
    }
}

/// Result of an applied mutation.
///
/// The local value is always kept; a failed remote mirror only shows up as `warning`.
#[derive(Debug)]
pub struct MutationOutcome<E> {
    /// Counter (or score) value after the mutation.
    pub value: u32,
    /// Event sent to the recorder; `None` when the change was clamped to nothing.
    pub event: Option<E>,
    /// Remote failure raised while mirroring, if any.
    pub warning: Option<RemoteError>,
}

impl<E> MutationOutcome<E> {
    fn local_only(value: u32) -> Self {
        Self {
            value,
            event: None,
            warning: None,
        }
    }
}

/// Add one step to a player or team counter.
pub async fn adjust(
    state: &SharedState,
    session_id: SessionId,
    target: StatTarget,
    direction: Direction,
) -> Result<MutationOutcome<StatEvent>, ScoreError> {
    apply_stat(state, session_id, target, direction.delta()).await
}

/// Add `amount` occurrences of a stat at once. `amount` must be at least one.
pub async fn record(
    state: &SharedState,
    session_id: SessionId,
    target: StatTarget,
    amount: u32,
) -> Result<MutationOutcome<StatEvent>, ScoreError> {
    apply_stat(state, session_id, target, i64::from(amount)).await
}

/// Add one step to the score.
pub async fn adjust_score(
    state: &SharedState,
    session_id: SessionId,
    direction: Direction,
) -> Result<MutationOutcome<ScoreEvent>, ScoreError> {
    let event = state
        .dispatch(StoreCommand::ApplyScoreDelta {
            session_id,
            delta: direction.delta(),
        })
        .await?;
    mirror_score_change(state, session_id, event).await
}

async fn apply_stat(
    state: &SharedState,
    session_id: SessionId,
    target: StatTarget,
    delta: i64,
) -> Result<MutationOutcome<StatEvent>, ScoreError> {
    let event = state
        .dispatch(StoreCommand::ApplyStatDelta {
            session_id,
            target,
            delta,
        })
        .await?;

    let (target, applied, value) = match event {
        StoreEvent::StatChanged {
            target,
            applied,
            value,
            ..
        } => (target, applied, value),
        other => return Err(unexpected(other)),
    };

    if applied == 0 {
        debug!(%session_id, stat = %target.kind, "stat already at zero; nothing to record");
        return Ok(MutationOutcome::local_only(value));
    }

    let stat_event = StatEvent {
        game_id: session_id,
        scope: target.scope,
        player_id: target.player_id,
        stat_kind: target.kind,
        delta: applied,
        resulting_value: value,
        timestamp: OffsetDateTime::now_utc(),
    };
    let call = state.api().record_stat(stat_event.clone());
    let warning = mirror(state, "stat", call).await;

    Ok(MutationOutcome {
        value,
        event: Some(stat_event),
        warning,
    })
}

/// Mirror a `ScoreChanged` store event to the recorder.
pub(crate) async fn mirror_score_change(
    state: &SharedState,
    session_id: SessionId,
    event: StoreEvent,
) -> Result<MutationOutcome<ScoreEvent>, ScoreError> {
    let (applied, score) = match event {
        StoreEvent::ScoreChanged { applied, score, .. } => (applied, score),
        other => return Err(unexpected(other)),
    };

    if applied == 0 {
        debug!(%session_id, score, "score unchanged; nothing to record");
        return Ok(MutationOutcome::local_only(score));
    }

    let score_event = ScoreEvent {
        game_id: session_id,
        delta: applied,
        resulting_score: score,
        timestamp: OffsetDateTime::now_utc(),
    };
    let call = state.api().record_score(score_event.clone());
    let warning = mirror(state, "score", call).await;

    Ok(MutationOutcome {
        value: score,
        event: Some(score_event),
        warning,
    })
}

async fn mirror(
    state: &SharedState,
    what: &str,
    call: BoxFuture<'static, RemoteResult<()>>,
) -> Option<RemoteError> {
    match call.await {
        Ok(()) => None,
        Err(err) => {
            warn!(error = %err, "failed to record {what} remotely; keeping local value");
            state
                .raise_notice(format!("Could not save {what}: {err}"))
                .await;
            Some(err)
        }
    }
}

fn unexpected(event: StoreEvent) -> ScoreError {
    ScoreError::InvalidState(format!("unexpected store event {event:?}"))
}
