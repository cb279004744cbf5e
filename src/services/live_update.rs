//! Live update bridge: follows the push feed of one session and folds its
//! notifications into the store by re-reading the remote totals.
//!
//! Notifications carry no usable data, so every one of them triggers a full re-fetch of
//! the affected scope. Local optimistic mutations and these refreshes are not merged:
//! whichever write reaches the store last wins.

use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    dto::feed::FeedMessageKind,
    error::ScoreError,
    feed::{FeedError, FeedSubscription, topic_for},
    state::{
        AppState, SharedState,
        session::{GameMode, SessionId},
        stats::{PlayerStatTotals, TeamStatTotals},
        store::{StoreCommand, StoreEvent},
    },
};

/// Connection state of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected; a reconnect may be pending.
    Disconnected,
    /// Subscribing to the session topic.
    Connecting,
    /// Subscribed and caught up with the remote totals.
    Connected,
}

/// Owner side of a running bridge. Dropping it cancels the bridge.
pub struct BridgeHandle {
    session_id: SessionId,
    shutdown: watch::Sender<bool>,
    connection: watch::Receiver<ConnectionState>,
    degraded: watch::Receiver<bool>,
    task: Option<JoinHandle<()>>,
}

impl BridgeHandle {
    /// Session this bridge follows.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn connection_watcher(&self) -> watch::Receiver<ConnectionState> {
        self.connection.clone()
    }

    /// Whether repeated connection failures put the bridge in degraded mode.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.clone()
    }

    /// Cancel the bridge and wait until its subscription is torn down.
    pub async fn stop(mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(session_id = %self.session_id, error = %err, "live update bridge task failed");
            }
        }
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

/// Start following `session_id`. Returns `false` when a bridge already follows it.
pub async fn follow(state: &SharedState, session_id: SessionId) -> Result<bool, ScoreError> {
    ensure_followable(state, session_id).await?;

    match state.bridges().entry(session_id) {
        Entry::Occupied(_) => {
            debug!(%session_id, "session already followed");
            Ok(false)
        }
        Entry::Vacant(slot) => {
            slot.insert(spawn_bridge(state, session_id));
            info!(%session_id, "live update bridge started");
            Ok(true)
        }
    }
}

/// Stop following `session_id`. Returns whether a bridge was running.
pub async fn unfollow(state: &SharedState, session_id: SessionId) -> bool {
    let Some((_, handle)) = state.bridges().remove(&session_id) else {
        return false;
    };
    handle.stop().await;
    info!(%session_id, "live update bridge stopped");
    true
}

/// Move the live subscription from `from` to `to`, tearing the old one down first.
pub async fn switch_to(
    state: &SharedState,
    from: Option<SessionId>,
    to: SessionId,
) -> Result<bool, ScoreError> {
    ensure_followable(state, to).await?;
    if let Some(previous) = from.filter(|previous| *previous != to) {
        unfollow(state, previous).await;
    }
    follow(state, to).await
}

async fn ensure_followable(state: &SharedState, session_id: SessionId) -> Result<(), ScoreError> {
    match state
        .read_store(|store| store.get(session_id).map(|session| session.is_active()))
        .await
    {
        None => Err(ScoreError::NotFound(format!(
            "session `{session_id}` not found"
        ))),
        Some(false) => Err(ScoreError::InvalidState(format!(
            "session `{session_id}` is completed; nothing to follow"
        ))),
        Some(true) => Ok(()),
    }
}

/// Overwrite the player totals of `session_id` with the remote ones.
///
/// Returns `None` when the refresh does not apply (team mode, completed session).
pub async fn refresh_player_totals(
    state: &SharedState,
    session_id: SessionId,
) -> Result<Option<StoreEvent>, ScoreError> {
    let Some(mode) = refresh_target(state, session_id).await? else {
        return Ok(None);
    };
    if mode == GameMode::Team {
        debug!(%session_id, "team-mode session ignores player refresh");
        return Ok(None);
    }

    let players = state.api().fetch_players(session_id.to_string()).await?;
    let totals = players
        .into_iter()
        .filter_map(|player| {
            player
                .stats
                .map(|stats| (player.id, PlayerStatTotals::from(stats)))
        })
        .collect();

    apply_refresh(
        state,
        session_id,
        StoreCommand::ReplacePlayerTotals { session_id, totals },
    )
    .await
}

/// Overwrite the team totals of `session_id` with the remote ones.
pub async fn refresh_team_totals(
    state: &SharedState,
    session_id: SessionId,
) -> Result<Option<StoreEvent>, ScoreError> {
    if refresh_target(state, session_id).await?.is_none() {
        return Ok(None);
    }

    let record = state.api().fetch_team_stats(session_id.to_string()).await?;
    apply_refresh(
        state,
        session_id,
        StoreCommand::ReplaceTeamTotals {
            session_id,
            totals: TeamStatTotals::from(&record),
        },
    )
    .await
}

async fn refresh_target(
    state: &SharedState,
    session_id: SessionId,
) -> Result<Option<GameMode>, ScoreError> {
    match state
        .read_store(|store| {
            store
                .get(session_id)
                .map(|session| (session.mode(), session.is_active()))
        })
        .await
    {
        None => Err(ScoreError::NotFound(format!(
            "session `{session_id}` not found"
        ))),
        Some((_, false)) => {
            info!(%session_id, "dropping refresh for completed session");
            Ok(None)
        }
        Some((mode, true)) => Ok(Some(mode)),
    }
}

async fn apply_refresh(
    state: &SharedState,
    session_id: SessionId,
    command: StoreCommand,
) -> Result<Option<StoreEvent>, ScoreError> {
    match state.dispatch(command).await {
        Ok(event) => {
            if let StoreEvent::TotalsReplaced {
                scope,
                replaced,
                skipped,
                ..
            } = &event
            {
                debug!(%session_id, ?scope, replaced, ?skipped, "totals refreshed from remote");
            }
            Ok(Some(event))
        }
        // Finished while the fetch was in flight.
        Err(ScoreError::InvalidState(reason)) => {
            info!(%session_id, %reason, "dropping refresh for completed session");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn spawn_bridge(state: &SharedState, session_id: SessionId) -> BridgeHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (connection_tx, connection_rx) = watch::channel(ConnectionState::Disconnected);
    let (degraded_tx, degraded_rx) = watch::channel(false);

    let task = tokio::spawn(run_bridge(
        Arc::downgrade(state),
        session_id,
        shutdown_rx,
        connection_tx,
        degraded_tx,
    ));

    BridgeHandle {
        session_id,
        shutdown: shutdown_tx,
        connection: connection_rx,
        degraded: degraded_rx,
        task: Some(task),
    }
}

enum FeedEnd {
    Shutdown,
    Lost(FeedError),
}

async fn run_bridge(
    state: Weak<AppState>,
    session_id: SessionId,
    mut shutdown: watch::Receiver<bool>,
    connection: watch::Sender<ConnectionState>,
    degraded: watch::Sender<bool>,
) {
    let topic = topic_for(session_id);
    let mut failures: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }
        let Some((feed, reconnect_delay, degraded_after)) = state.upgrade().map(|app| {
            (
                app.feed().clone(),
                app.config().reconnect_delay,
                app.config().degraded_after_failures,
            )
        }) else {
            break;
        };

        connection.send_replace(ConnectionState::Connecting);
        debug!(%session_id, %topic, "subscribing to push feed");
        let attempt = tokio::select! {
            attempt = feed.subscribe(topic.clone()) => attempt,
            _ = shutdown.changed() => break,
        };

        match attempt {
            Ok(mut subscription) => {
                failures = 0;
                if degraded.send_replace(false) {
                    info!(%session_id, "live updates restored");
                }
                if let Some(app) = state.upgrade() {
                    resync(&app, session_id).await;
                }
                connection.send_replace(ConnectionState::Connected);
                info!(%session_id, %topic, "following live updates");

                let end = pump(&state, session_id, subscription.as_mut(), &mut shutdown).await;
                subscription.close().await;
                connection.send_replace(ConnectionState::Disconnected);
                match end {
                    FeedEnd::Shutdown => break,
                    FeedEnd::Lost(err) => {
                        warn!(%session_id, error = %err, "push feed lost; reconnecting");
                    }
                }
            }
            Err(err) => {
                failures = failures.saturating_add(1);
                connection.send_replace(ConnectionState::Disconnected);
                warn!(%session_id, attempt = failures, error = %err, "push feed connection failed");
                if failures >= degraded_after && !degraded.send_replace(true) {
                    warn!(%session_id, failures, "live updates degraded");
                }
            }
        }

        tokio::select! {
            _ = sleep(reconnect_delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    connection.send_replace(ConnectionState::Disconnected);
    debug!(%session_id, "live update bridge exited");
}

async fn pump(
    state: &Weak<AppState>,
    session_id: SessionId,
    subscription: &mut dyn FeedSubscription,
    shutdown: &mut watch::Receiver<bool>,
) -> FeedEnd {
    loop {
        let next = tokio::select! {
            next = subscription.next_message() => next,
            _ = shutdown.changed() => return FeedEnd::Shutdown,
        };
        let message = match next {
            Ok(message) => message,
            Err(err) => return FeedEnd::Lost(err),
        };
        let Some(app) = state.upgrade() else {
            return FeedEnd::Shutdown;
        };

        let refreshed = match message.kind {
            FeedMessageKind::PlayerStatUpdate => refresh_player_totals(&app, session_id).await,
            FeedMessageKind::TeamStatUpdate => refresh_team_totals(&app, session_id).await,
            FeedMessageKind::Unknown => {
                debug!(%session_id, "ignoring unknown notification");
                continue;
            }
        };
        if let Err(err) = refreshed {
            warn!(%session_id, kind = ?message.kind, error = %err, "failed to refresh totals");
        }
    }
}

// Catch up on whatever changed while disconnected.
async fn resync(state: &SharedState, session_id: SessionId) {
    if let Err(err) = refresh_player_totals(state, session_id).await {
        warn!(%session_id, error = %err, "player totals resync failed");
    }
    if let Err(err) = refresh_team_totals(state, session_id).await {
        warn!(%session_id, error = %err, "team totals resync failed");
    }
}
