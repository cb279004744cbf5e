mod client;
/// Failures of the HTTP stats client.
pub mod error;

pub use client::RestStatsClient;
