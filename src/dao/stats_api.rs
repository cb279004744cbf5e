use futures::future::BoxFuture;

use crate::{
    dao::remote::RemoteResult,
    dto::{
        auth::{LoginRequest, LoginResponse},
        stats::{PlayerRecord, ReportPoint, TeamStatRecord},
    },
    state::stats::{ScoreEvent, StatEvent},
};

/// Abstraction over the remote stats service: the recorder local changes are mirrored to
/// and the source of truth the live bridge re-reads after a notification.
pub trait StatsApi: Send + Sync {
    /// Mirror one applied stat change.
    fn record_stat(&self, event: StatEvent) -> BoxFuture<'static, RemoteResult<()>>;
    /// Mirror one applied score change.
    fn record_score(&self, event: ScoreEvent) -> BoxFuture<'static, RemoteResult<()>>;
    /// Players of a game, with their totals when the server provides them.
    fn fetch_players(&self, game_id: String) -> BoxFuture<'static, RemoteResult<Vec<PlayerRecord>>>;
    /// Team stats of a game.
    fn fetch_team_stats(&self, game_id: String) -> BoxFuture<'static, RemoteResult<TeamStatRecord>>;
    /// Ordered performance series for one player.
    fn player_report(
        &self,
        game_id: String,
        player_id: String,
    ) -> BoxFuture<'static, RemoteResult<Vec<ReportPoint>>>;
    /// Exchange credentials for a token.
    fn login(&self, request: LoginRequest) -> BoxFuture<'static, RemoteResult<LoginResponse>>;
    /// Attach (or with `None`, remove) the bearer token sent with every later call.
    fn set_bearer_token(&self, token: Option<String>) -> BoxFuture<'static, ()>;
}
