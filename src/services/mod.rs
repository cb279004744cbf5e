/// Sign-in, sign-out and restoring a persisted sign-in.
pub mod auth_service;
/// Push feed bridge keeping followed sessions in sync with the remote totals.
pub mod live_update;
/// Optimistic stat and score mutations mirrored to the remote recorder.
pub mod mutation_service;
/// Player reports and performance figures.
pub mod report_service;
/// Session creation, selection, scoring and completion.
pub mod session_service;
