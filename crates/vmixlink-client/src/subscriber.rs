//! Live change subscription over WebSocket
//!
//! The subscriber keeps one connection open, sends `{"type":"ping"}` on a
//! fixed interval and reconnects with [`ReconnectPolicy`] backoff whenever the
//! connection drops or a ping goes unanswered for a full interval. A
//! successful connection resets the failure count. Every
//! `dataUpdate` that passes the optional profile filter is forwarded on an
//! mpsc channel; dropping the receiver stops the subscriber.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;
use vmixlink_store::{ClientMessage, Items, ServerMessage};

use crate::{
    config::ClientConfig,
    error::{ClientError, Result},
    reconnect::ReconnectPolicy,
};

/// Interval between heartbeat pings
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A change notification for one profile
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub profile_name: String,
    /// Changed keys; `Null` marks a removed key
    pub changes: Items,
}

/// Decoded frame the session acts on
enum Inbound {
    Update(ProfileUpdate),
    Pong,
}

/// Pong bookkeeping for one connection
#[derive(Debug, Default)]
struct Heartbeat {
    awaiting_pong: bool,
}

impl Heartbeat {
    /// Record a ping about to be sent; `false` if the previous one was never answered
    fn ping(&mut self) -> bool {
        if self.awaiting_pong {
            return false;
        }
        self.awaiting_pong = true;
        true
    }

    fn pong(&mut self) {
        self.awaiting_pong = false;
    }
}

enum SessionEnd {
    /// The connection dropped; reconnect
    Disconnected,
    /// The receiver is gone; stop
    Closed,
}

/// Reconnecting WebSocket subscriber
#[derive(Debug, Clone)]
pub struct Subscriber {
    url: Url,
    policy: ReconnectPolicy,
    ping_interval: Duration,
    profile: Option<String>,
    capacity: usize,
}

impl Subscriber {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            policy: ReconnectPolicy::default(),
            ping_interval: DEFAULT_PING_INTERVAL,
            profile: None,
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Subscriber for the server described by `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(config.websocket_url()?))
    }

    /// Only forward updates for `profile`
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Run in a background task
    ///
    /// The task ends with `Ok` once the receiver is dropped, or with
    /// [`ClientError::ReconnectLimitExceeded`] when the server stays away.
    pub fn spawn(self) -> (mpsc::Receiver<ProfileUpdate>, JoinHandle<Result<()>>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let handle = tokio::spawn(async move { self.run(tx).await });
        (rx, handle)
    }

    /// Connect, deliver updates and reconnect until the receiver is dropped
    pub async fn run(self, updates: mpsc::Sender<ProfileUpdate>) -> Result<()> {
        let mut failures = 0u32;

        loop {
            match connect_async(self.url.as_str()).await {
                Ok((socket, _)) => {
                    info!("Connected to {}", self.url);
                    failures = 0;
                    match self.session(socket, &updates).await {
                        SessionEnd::Closed => return Ok(()),
                        SessionEnd::Disconnected => warn!("Disconnected from {}", self.url),
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        "Connection to {} failed (attempt {}/{}): {}",
                        self.url, failures, self.policy.max_attempts, e
                    );
                    if !self.policy.should_retry(failures) {
                        return Err(ClientError::ReconnectLimitExceeded { attempts: failures });
                    }
                }
            }

            let delay = self.policy.delay(failures);
            debug!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = updates.closed() => return Ok(()),
            }
        }
    }

    async fn session(&self, socket: Socket, updates: &mpsc::Sender<ProfileUpdate>) -> SessionEnd {
        let (mut sink, mut stream) = socket.split();
        let mut heartbeat = tokio::time::interval(self.ping_interval);
        // The first tick completes immediately
        heartbeat.tick().await;
        let mut liveness = Heartbeat::default();

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if !liveness.ping() {
                        warn!("No pong from {} within {:?}", self.url, self.ping_interval);
                        return SessionEnd::Disconnected;
                    }
                    let ping = match serde_json::to_string(&ClientMessage::Ping) {
                        Ok(ping) => ping,
                        Err(e) => {
                            warn!("Failed to encode ping: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(ping)).await {
                        warn!("Failed to send ping: {}", e);
                        return SessionEnd::Disconnected;
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => match self.accept(&text) {
                        Some(Inbound::Update(update)) => {
                            if updates.send(update).await.is_err() {
                                return SessionEnd::Closed;
                            }
                        }
                        Some(Inbound::Pong) => liveness.pong(),
                        None => {}
                    },
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Disconnected,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        return SessionEnd::Disconnected;
                    }
                },
                _ = updates.closed() => {
                    let _ = sink.close().await;
                    return SessionEnd::Closed;
                }
            }
        }
    }

    /// Decode a text frame into an update worth forwarding or a pong
    fn accept(&self, text: &str) -> Option<Inbound> {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(ServerMessage::DataUpdate { profile_name, changes }) => {
                let wanted = self
                    .profile
                    .as_deref()
                    .map_or(true, |profile| profile == profile_name);
                wanted.then_some(Inbound::Update(ProfileUpdate { profile_name, changes }))
            }
            Ok(ServerMessage::Welcome { message }) => {
                info!("Server says: {}", message);
                None
            }
            Ok(ServerMessage::Pong) => {
                debug!("Received pong");
                Some(Inbound::Pong)
            }
            Err(e) => {
                warn!("Ignoring unparsable message: {}", e);
                None
            }
        }
    }
}
