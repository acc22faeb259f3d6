//! Realtime subscriber.
//!
//! [`RealtimeClient`] keeps at most one subscription task alive. The task
//! connects to the subscription endpoint, decodes frames, marks the matching
//! query families stale and republishes each event to local listeners. It
//! reconnects after a fixed delay whenever the stream fails or ends, and stops
//! for good when the server rejects the credential.
//!
//! The server does not replay events missed while a stream was down, so every
//! re-opened stream marks the whole cache stale before reading frames.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, trace, warn};

use tracker_core::logging::{
    COMPONENT_CACHE, COMPONENT_DECODER, COMPONENT_SUBSCRIPTION, SUBSYSTEM_CLIENT,
};

use crate::cache::QueryCache;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::query::{parse_frame, ClientEvent, ParsedFrame};
use crate::sse::SseDecoder;

/// Capacity of the local event fan-out.
const EVENT_CHANNEL_CAPACITY: usize = 256;

const CONNECT_TIMEOUT_SECS: u64 = 10;

pub struct RealtimeClient {
    config: ClientConfig,
    http: reqwest::Client,
    cache: Arc<QueryCache>,
    events: broadcast::Sender<ClientEvent>,
    task: Option<JoinHandle<()>>,
}

impl RealtimeClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_http_client(config, http))
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, ...).
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            http,
            cache: Arc::new(QueryCache::new()),
            events,
            task: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Replace the credential. Any running subscription is torn down first;
    /// a new one starts when `credential` is a non-empty token.
    ///
    /// Must be called from within a tokio runtime.
    pub fn set_credential(&mut self, credential: Option<String>) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Stopped realtime subscription");
        }

        let Some(token) = credential.filter(|t| !t.trim().is_empty()) else {
            return;
        };

        let subscription = Subscription {
            http: self.http.clone(),
            url: self.config.subscription_url(),
            token,
            retry_delay: self.config.retry_delay,
            max_frame_bytes: self.config.max_frame_bytes,
            cache: self.cache.clone(),
            events: self.events.clone(),
        };
        self.task = Some(tokio::spawn(subscription.run()));
    }

    /// Whether a subscription task is alive (connected or waiting to retry).
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Receive every event decoded from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Events as a stream. Events missed by a slow consumer are skipped.
    pub fn event_stream(&self) -> impl Stream<Item = ClientEvent> {
        BroadcastStream::new(self.events.subscribe()).filter_map(|event| async move {
            match event {
                Ok(event) => Some(event),
                Err(e) => {
                    debug!(error = %e, "Realtime event consumer lagged");
                    None
                }
            }
        })
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// State owned by one subscription task.
struct Subscription {
    http: reqwest::Client,
    url: String,
    token: String,
    retry_delay: Duration,
    max_frame_bytes: usize,
    cache: Arc<QueryCache>,
    events: broadcast::Sender<ClientEvent>,
}

impl Subscription {
    async fn run(self) {
        let mut attempt: u64 = 0;
        let mut opened = false;
        loop {
            attempt += 1;
            match self.connect_once(&mut opened).await {
                Ok(()) => debug!(attempt, "Realtime stream ended"),
                Err(e) if e.is_terminal() => {
                    warn!(
                        subsystem = SUBSYSTEM_CLIENT,
                        component = COMPONENT_SUBSCRIPTION,
                        error = %e,
                        "Realtime subscription stopped"
                    );
                    return;
                }
                Err(e) => warn!(
                    subsystem = SUBSYSTEM_CLIENT,
                    component = COMPONENT_SUBSCRIPTION,
                    attempt,
                    error = %e,
                    "Realtime connection failed"
                ),
            }
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// One connection attempt. `opened` records whether any earlier attempt
    /// of this subscription got a stream.
    async fn connect_once(&self, opened: &mut bool) -> Result<()> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("token", self.token.as_str())])
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::from_status(status));
        }
        info!(
            subsystem = SUBSYSTEM_CLIENT,
            component = COMPONENT_SUBSCRIPTION,
            url = %self.url,
            "Realtime stream open"
        );
        if *opened {
            let marked = self.cache.mark_all_stale();
            debug!(
                subsystem = SUBSYSTEM_CLIENT,
                component = COMPONENT_CACHE,
                marked,
                "Marked cache stale after reconnect"
            );
        }
        *opened = true;

        let mut decoder = SseDecoder::with_max_frame_bytes(self.max_frame_bytes);
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for data in decoder.push(&chunk) {
                self.handle(&data);
            }
        }
        Ok(())
    }

    fn handle(&self, data: &str) {
        match parse_frame(data) {
            None => debug!(
                subsystem = SUBSYSTEM_CLIENT,
                component = COMPONENT_DECODER,
                "Discarding malformed realtime frame"
            ),
            Some(ParsedFrame::Unknown(event_type)) => {
                debug!(event_type = %event_type, "Ignoring unknown realtime event")
            }
            Some(ParsedFrame::Event(event)) => {
                self.cache.invalidate(event.kind);
                trace!(event_type = event.kind.as_str(), "Realtime event");
                // No listeners is fine.
                let _ = self.events.send(event);
            }
        }
    }
}
