/// Persisted auth token and user.
pub mod credentials;
/// Transport-independent error type of remote collaborators.
pub mod remote;
/// HTTP implementation of [`stats_api::StatsApi`].
#[cfg(feature = "rest-client")]
pub mod rest;
/// Contract of the remote stats service.
pub mod stats_api;
