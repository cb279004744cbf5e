/// Broadcast hub for store changes.
pub mod events;
/// Transient user notices.
pub mod notices;
/// Game session entity.
pub mod session;
/// Stat kinds, totals and change events.
pub mod stats;
/// Command-driven session registry.
pub mod store;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::{
    config::ClientConfig,
    dao::{credentials::CredentialStore, stats_api::StatsApi},
    dto::auth::AuthUser,
    error::ScoreError,
    feed::PushFeed,
    services::live_update::BridgeHandle,
    state::{
        notices::{Notice, NoticeBoard},
        session::SessionId,
        store::{SessionStore, StoreCommand, StoreEvent},
    },
};

pub use self::events::EventHub;

/// Cheaply clonable handle to the application state.
pub type SharedState = Arc<AppState>;

const EVENT_CAPACITY: usize = 64;

/// Remote and durable collaborators the application state is wired to.
#[derive(Clone)]
pub struct Collaborators {
    /// Remote stats service.
    pub api: Arc<dyn StatsApi>,
    /// Push notification feed.
    pub feed: Arc<dyn PushFeed>,
    /// Durable storage for the auth token and user.
    pub credentials: Arc<dyn CredentialStore>,
}

/// Process-wide client state: the session store, its change hub, user notices and the
/// live bridges following sessions.
pub struct AppState {
    config: ClientConfig,
    store: RwLock<SessionStore>,
    events: EventHub,
    notices: Mutex<NoticeBoard>,
    bridges: DashMap<SessionId, BridgeHandle>,
    collaborators: Collaborators,
    auth: RwLock<Option<AuthUser>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: ClientConfig, collaborators: Collaborators) -> SharedState {
        Arc::new(Self {
            notices: Mutex::new(NoticeBoard::new(config.notice_ttl)),
            config,
            store: RwLock::new(SessionStore::new()),
            events: EventHub::new(EVENT_CAPACITY),
            bridges: DashMap::new(),
            collaborators,
            auth: RwLock::new(None),
        })
    }

    /// Build the state with the HTTP stats client, the STOMP push feed and the file
    /// credential store described by `config`.
    #[cfg(all(feature = "rest-client", feature = "stomp-feed"))]
    pub fn from_config(
        config: ClientConfig,
    ) -> Result<SharedState, crate::dao::rest::error::RestError> {
        use crate::{
            dao::{credentials::FileCredentialStore, rest::RestStatsClient},
            feed::stomp_feed::StompFeed,
        };

        let api = RestStatsClient::new(&config.api_base_url, config.request_timeout)?;
        let collaborators = Collaborators {
            api: Arc::new(api),
            feed: Arc::new(StompFeed::from_config(&config)),
            credentials: Arc::new(FileCredentialStore::new(config.credentials_path.clone())),
        };
        Ok(Self::new(config, collaborators))
    }

    /// Runtime configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Apply one command to the session store and publish the resulting event.
    pub async fn dispatch(&self, command: StoreCommand) -> Result<StoreEvent, ScoreError> {
        let event = {
            let mut store = self.store.write().await;
            store.dispatch(command)?
        };
        self.events.broadcast(event.clone());
        Ok(event)
    }

    /// Run `read` against a consistent view of the session store.
    pub async fn read_store<R>(&self, read: impl FnOnce(&SessionStore) -> R) -> R {
        let store = self.store.read().await;
        read(&store)
    }

    /// Hub publishing every store change.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Raise a transient notice and return its id.
    pub async fn raise_notice(&self, message: impl Into<String>) -> u64 {
        self.notices.lock().await.push(message)
    }

    /// Dismiss a notice before it expires.
    pub async fn dismiss_notice(&self, id: u64) -> bool {
        self.notices.lock().await.dismiss(id)
    }

    /// Notices that are still visible.
    pub async fn notices(&self) -> Vec<Notice> {
        self.notices.lock().await.active()
    }

    /// Remote stats service.
    pub fn api(&self) -> &Arc<dyn StatsApi> {
        &self.collaborators.api
    }

    /// Push notification feed.
    pub fn feed(&self) -> &Arc<dyn PushFeed> {
        &self.collaborators.feed
    }

    /// Durable credential storage.
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.collaborators.credentials
    }

    /// Registry of live bridges keyed by the session they follow.
    pub fn bridges(&self) -> &DashMap<SessionId, BridgeHandle> {
        &self.bridges
    }

    /// Signed-in user, if any.
    pub async fn current_user(&self) -> Option<AuthUser> {
        self.auth.read().await.clone()
    }

    pub(crate) async fn set_current_user(&self, user: Option<AuthUser>) {
        *self.auth.write().await = user;
    }

    /// Cancel every live bridge.
    pub async fn shutdown(&self) {
        let followed: Vec<SessionId> = self.bridges.iter().map(|entry| *entry.key()).collect();
        for session_id in followed {
            if let Some((_, handle)) = self.bridges.remove(&session_id) {
                handle.stop().await;
            }
        }
        info!("application state shut down");
    }
}
