use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    dao::{remote::RemoteResult, stats_api::StatsApi},
    dto::{
        auth::{LoginRequest, LoginResponse},
        stats::{PlayerRecord, ReportPoint, ScoreUpdate, StatIncrement, TeamStatRecord},
    },
    state::stats::{ScoreEvent, StatEvent, StatScope},
};

use super::error::{RestError, RestResult};

/// [`StatsApi`] implementation speaking JSON over HTTP.
#[derive(Clone)]
pub struct RestStatsClient {
    client: Client,
    base_url: Arc<str>,
    token: Arc<RwLock<Option<String>>>,
}

impl RestStatsClient {
    /// Build a client for the API rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> RestResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| RestError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::<str>::from(base_url.trim_end_matches('/')),
            token: Arc::new(RwLock::new(None)),
        })
    }

    async fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.client.request(method, url);
        match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T>(&self, path: &str) -> RestResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, path)
            .await
            .send()
            .await
            .map_err(|source| RestError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        decode(path, response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> RestResult<T>
    where
        B: ?Sized + Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, path)
            .await
            .json(body)
            .send()
            .await
            .map_err(|source| RestError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        decode(path, response).await
    }

    /// POST whose echo is not needed; only the status is checked.
    async fn post_discard<B>(&self, path: &str, body: &B) -> RestResult<()>
    where
        B: ?Sized + Serialize,
    {
        let response = self
            .request(Method::POST, path)
            .await
            .json(body)
            .send()
            .await
            .map_err(|source| RestError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RestError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            })
        }
    }
}

async fn decode<T>(path: &str, response: reqwest::Response) -> RestResult<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            debug!(path, "request rejected as unauthenticated");
        }
        return Err(RestError::RequestStatus {
            path: path.to_string(),
            status,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|source| RestError::DecodeResponse {
            path: path.to_string(),
            source,
        })
}

fn player_stats_path(game_id: &str, player_id: &str) -> String {
    format!("games/{game_id}/players/{player_id}/stats")
}

fn team_stats_path(game_id: &str) -> String {
    format!("games/{game_id}/team-stats")
}

impl StatsApi for RestStatsClient {
    fn record_stat(&self, event: StatEvent) -> BoxFuture<'static, RemoteResult<()>> {
        let client = self.clone();
        Box::pin(async move {
            let game_id = event.game_id.to_string();
            let body = StatIncrement::new(event.stat_kind, event.delta);
            let path = match (event.scope, event.player_id.as_deref()) {
                (StatScope::Player, Some(player_id)) => player_stats_path(&game_id, player_id),
                _ => team_stats_path(&game_id),
            };
            client.post_discard(&path, &body).await.map_err(Into::into)
        })
    }

    fn record_score(&self, event: ScoreEvent) -> BoxFuture<'static, RemoteResult<()>> {
        let client = self.clone();
        Box::pin(async move {
            let path = format!("games/{}/score", event.game_id);
            let body = ScoreUpdate {
                score: event.resulting_score,
                delta: event.delta,
            };
            client.post_discard(&path, &body).await.map_err(Into::into)
        })
    }

    fn fetch_players(&self, game_id: String) -> BoxFuture<'static, RemoteResult<Vec<PlayerRecord>>> {
        let client = self.clone();
        Box::pin(async move {
            let path = format!("games/{game_id}/players");
            client.get_json(&path).await.map_err(Into::into)
        })
    }

    fn fetch_team_stats(&self, game_id: String) -> BoxFuture<'static, RemoteResult<TeamStatRecord>> {
        let client = self.clone();
        Box::pin(async move {
            client
                .get_json(&team_stats_path(&game_id))
                .await
                .map_err(Into::into)
        })
    }

    fn player_report(
        &self,
        game_id: String,
        player_id: String,
    ) -> BoxFuture<'static, RemoteResult<Vec<ReportPoint>>> {
        let client = self.clone();
        Box::pin(async move {
            let path = format!("games/{game_id}/reports/player/{player_id}");
            client.get_json(&path).await.map_err(Into::into)
        })
    }

    fn login(&self, request: LoginRequest) -> BoxFuture<'static, RemoteResult<LoginResponse>> {
        let client = self.clone();
        Box::pin(async move {
            client
                .post_json("auth/login", &request)
                .await
                .map_err(Into::into)
        })
    }

    fn set_bearer_token(&self, token: Option<String>) -> BoxFuture<'static, ()> {
        let slot = self.token.clone();
        Box::pin(async move {
            *slot.write().await = token;
        })
    }
}
