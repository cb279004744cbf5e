use std::{collections::VecDeque, time::Duration};

use futures::{SinkExt, StreamExt, future::BoxFuture};
use tokio::{
    net::TcpStream,
    time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until, timeout},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message, client::IntoClientRequest},
};
use tracing::{debug, info, warn};

use crate::{
    config::ClientConfig,
    dto::feed::FeedMessage,
    feed::{
        FeedError, FeedSubscription, PushFeed,
        stomp::{HeartBeat, StompFrame, parse_frames},
    },
};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const SUBSCRIPTION_ID: &str = "sub-0";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`PushFeed`] speaking STOMP 1.2 over a WebSocket, one connection per subscription.
#[derive(Debug, Clone)]
pub struct StompFeed {
    url: String,
    heartbeat: Duration,
}

impl StompFeed {
    /// Feed connecting to `url`, requesting `heartbeat` in both directions.
    pub fn new(url: impl Into<String>, heartbeat: Duration) -> Self {
        Self {
            url: url.into(),
            heartbeat,
        }
    }

    /// Feed configured from the client settings.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.push_url.clone(), config.heartbeat)
    }
}

impl PushFeed for StompFeed {
    fn subscribe(
        &self,
        topic: String,
    ) -> BoxFuture<'static, Result<Box<dyn FeedSubscription>, FeedError>> {
        let feed = self.clone();
        Box::pin(async move {
            let subscription = StompSubscription::open(&feed.url, topic, feed.heartbeat).await?;
            Ok(Box::new(subscription) as Box<dyn FeedSubscription>)
        })
    }
}

struct StompSubscription {
    ws: WsStream,
    topic: String,
    frames: VecDeque<StompFrame>,
    outgoing: Option<Interval>,
    incoming: Option<Duration>,
    last_heard: Instant,
}

enum Step {
    Inbound(Option<Result<Message, tungstenite::Error>>),
    Heartbeat,
    Silent(Duration),
}

impl StompSubscription {
    async fn open(url: &str, topic: String, heartbeat: Duration) -> Result<Self, FeedError> {
        let connect_err = |source: tungstenite::Error| FeedError::Connect {
            url: url.to_string(),
            source: Box::new(source),
        };
        let request = url.into_client_request().map_err(connect_err)?;
        let host = request.uri().host().unwrap_or("localhost").to_string();
        let (ws, _response) = connect_async(request).await.map_err(connect_err)?;

        let mut subscription = Self {
            ws,
            topic,
            frames: VecDeque::new(),
            outgoing: None,
            incoming: None,
            last_heard: Instant::now(),
        };

        let beat = heartbeat.as_millis().to_string();
        subscription
            .send_frame(
                StompFrame::new("CONNECT")
                    .with_header("accept-version", "1.2")
                    .with_header("host", host)
                    .with_header("heart-beat", format!("{beat},{beat}")),
            )
            .await?;

        let connected = match timeout(HANDSHAKE_TIMEOUT, subscription.next_frame()).await {
            Ok(frame) => frame?,
            Err(_) => {
                return Err(FeedError::Handshake(
                    "no CONNECTED frame before timeout".into(),
                ));
            }
        };
        match connected.command.as_str() {
            "CONNECTED" => {}
            "ERROR" => return Err(broker_error(&connected)),
            other => {
                return Err(FeedError::Handshake(format!(
                    "expected CONNECTED, got {other}"
                )));
            }
        }

        let negotiated = HeartBeat::negotiate(heartbeat, connected.header("heart-beat"));
        subscription.incoming = negotiated.incoming;
        subscription.outgoing = negotiated.outgoing.map(|every| {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let destination = subscription.topic.clone();
        subscription
            .send_frame(
                StompFrame::new("SUBSCRIBE")
                    .with_header("id", SUBSCRIPTION_ID)
                    .with_header("destination", destination)
                    .with_header("ack", "auto"),
            )
            .await?;

        info!(topic = %subscription.topic, heartbeat = ?negotiated, "push feed subscribed");
        Ok(subscription)
    }

    async fn send_frame(&mut self, frame: StompFrame) -> Result<(), FeedError> {
        self.ws
            .send(Message::text(frame.encode()))
            .await
            .map_err(transport_error)
    }

    /// Next complete frame, sending heart-beats and watching for silence meanwhile.
    async fn next_frame(&mut self) -> Result<StompFrame, FeedError> {
        loop {
            if let Some(frame) = self.frames.pop_front() {
                return Ok(frame);
            }

            let silence_limit = self.incoming.map(|every| every * 2);
            let deadline = silence_limit.map(|limit| self.last_heard + limit);
            let step = tokio::select! {
                inbound = self.ws.next() => Step::Inbound(inbound),
                _ = tick(&mut self.outgoing) => Step::Heartbeat,
                _ = until(deadline) => Step::Silent(silence_limit.unwrap_or_default()),
            };

            match step {
                Step::Inbound(None) => return Err(FeedError::Closed),
                Step::Inbound(Some(Err(err))) => return Err(transport_error(err)),
                Step::Inbound(Some(Ok(message))) => {
                    self.last_heard = Instant::now();
                    match message {
                        Message::Text(text) => self.frames.extend(parse_frames(text.as_str())?),
                        Message::Binary(bytes) => {
                            let text = String::from_utf8_lossy(&bytes);
                            self.frames.extend(parse_frames(&text)?);
                        }
                        Message::Close(_) => return Err(FeedError::Closed),
                        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                    }
                }
                Step::Heartbeat => {
                    self.ws
                        .send(Message::text("\n"))
                        .await
                        .map_err(transport_error)?;
                }
                Step::Silent(limit) => return Err(FeedError::HeartbeatTimeout(limit)),
            }
        }
    }

    async fn receive(&mut self) -> Result<FeedMessage, FeedError> {
        loop {
            let frame = self.next_frame().await?;
            match frame.command.as_str() {
                "MESSAGE" => match FeedMessage::from_json_str(&frame.body) {
                    Ok(message) => return Ok(message),
                    Err(err) => {
                        warn!(topic = %self.topic, error = %err, "ignoring undecodable notification");
                    }
                },
                "ERROR" => return Err(broker_error(&frame)),
                other => debug!(command = other, "ignoring push feed frame"),
            }
        }
    }

    async fn shutdown(mut self) {
        let unsubscribe = StompFrame::new("UNSUBSCRIBE").with_header("id", SUBSCRIPTION_ID);
        let disconnect = StompFrame::new("DISCONNECT");
        for frame in [unsubscribe, disconnect] {
            if let Err(err) = self.send_frame(frame).await {
                debug!(error = %err, "push feed teardown frame not delivered");
                break;
            }
        }
        if let Err(err) = self.ws.close(None).await {
            debug!(error = %err, "push feed socket close failed");
        }
        info!(topic = %self.topic, "push feed unsubscribed");
    }
}

impl FeedSubscription for StompSubscription {
    fn next_message(&mut self) -> BoxFuture<'_, Result<FeedMessage, FeedError>> {
        Box::pin(self.receive())
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin((*self).shutdown())
    }
}

fn broker_error(frame: &StompFrame) -> FeedError {
    let message = frame
        .header("message")
        .map(str::to_string)
        .unwrap_or_else(|| frame.body.clone());
    FeedError::Broker { message }
}

fn transport_error(err: tungstenite::Error) -> FeedError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            FeedError::Closed
        }
        other => FeedError::Transport {
            source: Box::new(other),
        },
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
