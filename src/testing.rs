//! In-process doubles for the remote collaborators, shared by the unit tests.

use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::sync::{Notify, mpsc};

use crate::{
    config::ClientConfig,
    dao::{
        credentials::MemoryCredentialStore,
        remote::{RemoteError, RemoteResult},
        stats_api::StatsApi,
    },
    dto::{
        auth::{LoginRequest, LoginResponse},
        feed::FeedMessage,
        stats::{PlayerRecord, ReportPoint, TeamStatRecord},
    },
    feed::{FeedError, FeedSubscription, PushFeed},
    state::{
        AppState, Collaborators, SharedState,
        stats::{ScoreEvent, StatEvent},
    },
};

fn offline() -> RemoteError {
    RemoteError::unavailable("stats service offline", io::Error::other("connection refused"))
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub(crate) stats: Mutex<Vec<StatEvent>>,
    pub(crate) scores: Mutex<Vec<ScoreEvent>>,
    pub(crate) players: Mutex<Vec<PlayerRecord>>,
    pub(crate) team: Mutex<TeamStatRecord>,
    pub(crate) report: Mutex<Vec<ReportPoint>>,
    pub(crate) login: Mutex<Option<LoginResponse>>,
    pub(crate) token: Mutex<Option<String>>,
    pub(crate) fail_writes: AtomicBool,
    pub(crate) fail_reads: AtomicBool,
    pub(crate) fetches: AtomicUsize,
    /// When set, `record_stat` stays pending until the gate is notified.
    pub(crate) stat_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeApi {
    fn write<T: Clone>(&self, log: &Mutex<Vec<T>>, item: T) -> RemoteResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(offline());
        }
        log.lock().unwrap().push(item);
        Ok(())
    }

    fn read<T: Clone>(&self, slot: &Mutex<T>) -> RemoteResult<T> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(slot.lock().unwrap().clone())
    }
}

impl StatsApi for FakeApi {
    fn record_stat(&self, event: StatEvent) -> BoxFuture<'static, RemoteResult<()>> {
        let result = self.write(&self.stats, event);
        match self.stat_gate.lock().unwrap().clone() {
            Some(gate) => Box::pin(async move {
                gate.notified().await;
                result
            }),
            None => Box::pin(std::future::ready(result)),
        }
    }

    fn record_score(&self, event: ScoreEvent) -> BoxFuture<'static, RemoteResult<()>> {
        Box::pin(std::future::ready(self.write(&self.scores, event)))
    }

    fn fetch_players(&self, _game_id: String) -> BoxFuture<'static, RemoteResult<Vec<PlayerRecord>>> {
        Box::pin(std::future::ready(self.read(&self.players)))
    }

    fn fetch_team_stats(&self, _game_id: String) -> BoxFuture<'static, RemoteResult<TeamStatRecord>> {
        Box::pin(std::future::ready(self.read(&self.team)))
    }

    fn player_report(
        &self,
        _game_id: String,
        _player_id: String,
    ) -> BoxFuture<'static, RemoteResult<Vec<ReportPoint>>> {
        Box::pin(std::future::ready(self.read(&self.report)))
    }

    fn login(&self, _request: LoginRequest) -> BoxFuture<'static, RemoteResult<LoginResponse>> {
        let response = self.login.lock().unwrap().clone();
        Box::pin(std::future::ready(response.ok_or(RemoteError::Unauthorized)))
    }

    fn set_bearer_token(&self, token: Option<String>) -> BoxFuture<'static, ()> {
        *self.token.lock().unwrap() = token;
        Box::pin(std::future::ready(()))
    }
}

type Inbox = mpsc::UnboundedSender<Result<FeedMessage, FeedError>>;

/// Feed whose subscriptions are fed by the test through [`FakeFeed::publish`].
#[derive(Default)]
pub(crate) struct FakeFeed {
    pub(crate) failing_connects: AtomicUsize,
    pub(crate) topics: Mutex<Vec<String>>,
    pub(crate) closed: Arc<AtomicUsize>,
    inboxes: Mutex<Vec<Inbox>>,
}

impl FakeFeed {
    /// Deliver to the most recent subscription. Returns false when it is gone.
    pub(crate) fn publish(&self, message: Result<FeedMessage, FeedError>) -> bool {
        self.inboxes
            .lock()
            .unwrap()
            .last()
            .is_some_and(|inbox| inbox.send(message).is_ok())
    }

    pub(crate) fn subscribe_count(&self) -> usize {
        self.topics.lock().unwrap().len()
    }
}

impl PushFeed for FakeFeed {
    fn subscribe(
        &self,
        topic: String,
    ) -> BoxFuture<'static, Result<Box<dyn FeedSubscription>, FeedError>> {
        let fail = self
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        self.topics.lock().unwrap().push(topic);
        let result = if fail {
            Err(FeedError::Handshake("broker refused".into()))
        } else {
            let (tx, rx) = mpsc::unbounded_channel();
            self.inboxes.lock().unwrap().push(tx);
            Ok(Box::new(FakeSubscription {
                rx,
                closed: self.closed.clone(),
            }) as Box<dyn FeedSubscription>)
        };
        Box::pin(std::future::ready(result))
    }
}

struct FakeSubscription {
    rx: mpsc::UnboundedReceiver<Result<FeedMessage, FeedError>>,
    closed: Arc<AtomicUsize>,
}

impl FeedSubscription for FakeSubscription {
    fn next_message(&mut self) -> BoxFuture<'_, Result<FeedMessage, FeedError>> {
        Box::pin(async move { self.rx.recv().await.unwrap_or(Err(FeedError::Closed)) })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::ready(()))
    }
}

pub(crate) fn test_config() -> ClientConfig {
    ClientConfig {
        reconnect_delay: Duration::from_millis(500),
        degraded_after_failures: 2,
        notice_ttl: Duration::from_secs(3),
        ..ClientConfig::default()
    }
}

pub(crate) fn test_state() -> (SharedState, Arc<FakeApi>, Arc<FakeFeed>) {
    let api = Arc::new(FakeApi::default());
    let feed = Arc::new(FakeFeed::default());
    let state = AppState::new(
        test_config(),
        Collaborators {
            api: api.clone(),
            feed: feed.clone(),
            credentials: Arc::new(MemoryCredentialStore::new()),
        },
    );
    (state, api, feed)
}
