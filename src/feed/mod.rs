//! Push notification feed: the topic-per-game channel the live bridge listens on.

use std::{error::Error, time::Duration};

use futures::future::BoxFuture;
use thiserror::Error;

use crate::{dto::feed::FeedMessage, state::session::SessionId};

/// STOMP 1.2 frame codec.
pub mod stomp;
/// STOMP over WebSocket implementation of [`PushFeed`].
#[cfg(feature = "stomp-feed")]
pub mod stomp_feed;

/// Failures of a push feed connection.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The transport connection could not be opened.
    #[error("failed to connect to push feed at `{url}`")]
    Connect {
        /// Feed endpoint.
        url: String,
        /// Transport failure behind it.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The broker did not complete the session handshake.
    #[error("push feed handshake failed: {0}")]
    Handshake(String),
    /// The broker reported an error frame.
    #[error("push feed broker error: {message}")]
    Broker {
        /// `message` header of the ERROR frame, or its body.
        message: String,
    },
    /// A frame could not be decoded.
    #[error("push feed protocol violation: {0}")]
    Protocol(String),
    /// The transport failed after the handshake.
    #[error("push feed transport failure")]
    Transport {
        /// Transport failure behind it.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Nothing was heard from the broker for longer than allowed.
    #[error("push feed silent for more than {0:?}")]
    HeartbeatTimeout(Duration),
    /// The connection was closed.
    #[error("push feed closed")]
    Closed,
}

/// Source of per-topic push subscriptions.
pub trait PushFeed: Send + Sync {
    /// Connect and subscribe to `topic`.
    fn subscribe(
        &self,
        topic: String,
    ) -> BoxFuture<'static, Result<Box<dyn FeedSubscription>, FeedError>>;
}

/// One live subscription; dropped or closed when the bridge stops following.
pub trait FeedSubscription: Send {
    /// Wait for the next notification. Any error ends the subscription.
    fn next_message(&mut self) -> BoxFuture<'_, Result<FeedMessage, FeedError>>;
    /// Unsubscribe and release the connection.
    fn close(self: Box<Self>) -> BoxFuture<'static, ()>;
}

/// Topic carrying the notifications of one game.
pub fn topic_for(game_id: SessionId) -> String {
    format!("/topic/games/{game_id}")
}
