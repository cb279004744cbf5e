//! Volleyball scorekeeping core: the session store, the stat mutation engine and the live
//! update bridge, together with the REST, push feed and credential collaborators they use.

pub mod config;
/// Remote stats service and durable credential storage.
pub mod dao;
/// Wire payloads of the stats API and the push feed.
pub mod dto;
/// Service-level error taxonomy.
pub mod error;
/// Push notification feed.
pub mod feed;
/// Operations combining the session store with the remote collaborators.
pub mod services;
/// Session store and shared application state.
pub mod state;
/// Tracing subscriber setup.
pub mod telemetry;

#[cfg(test)]
mod testing;
