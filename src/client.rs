//! Streaming voice autosuggest WebSocket client.
//!
//! This module contains [`VoiceStream`], the client managing one streaming
//! session against the remote autosuggest endpoint. It owns:
//!
//! - the WebSocket connection lifecycle (one connection per `open()`)
//! - the one-shot `StartRecognition` negotiation
//! - audio frame forwarding with bounded-channel backpressure
//! - demultiplexing of inbound frames into [`VoiceEvent`]s
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ send()/AudioSink │────▶│ frame_tx (mpsc 32)│────▶│  Session Task    │
//! └──────────────────┘     └───────────────────┘     └────────┬─────────┘
//!                                                            │
//!                          ┌───────────────────┐             │
//!                          │  events (mpsc)    │◀────────────┘
//!                          └────────┬──────────┘
//!                                   │
//!                          ┌────────▼──────────┐
//!                          │  open() caller    │  single consumer
//!                          └───────────────────┘
//! ```
//!
//! The session task exclusively owns the socket; the caller only ever sees
//! the [`AudioSink`] handle delivered in [`VoiceEvent::Connected`] and the
//! event receiver returned by [`VoiceStream::open`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{AutosuggestOptions, VoiceConfig};
use crate::error::VoiceError;
use crate::messages::{InboundMessage, StartRecognition, Suggestion};

/// Bounded capacity of the audio frame channel. Frames queue here while the
/// socket applies backpressure; `send()` suspends once it fills up.
const FRAME_CHANNEL_CAPACITY: usize = 32;

/// Lifecycle state of a voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session has been opened yet, or the last one fully ended.
    #[default]
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Connected; audio frames are accepted.
    Active,
    /// A terminal event fired and the close handshake is in flight.
    Closing,
    /// The session ended; a new `open()` is allowed.
    Closed,
}

/// Event emitted by a voice session.
///
/// Delivered on the single-consumer channel returned by
/// [`VoiceStream::open`]. `Suggestions` and `Failed` are terminal: at most
/// one of them is emitted per session, and nothing follows it.
#[derive(Debug)]
pub enum VoiceEvent {
    /// Handshake completed and `StartRecognition` was sent; the sink accepts
    /// audio frames from now on.
    Connected(AudioSink),
    /// The recognition job finished with results. Terminal.
    Suggestions(Vec<Suggestion>),
    /// The session failed. Terminal.
    Failed(VoiceError),
}

/// Handle for streaming audio frames into an active session.
///
/// Cloneable and independent of the [`VoiceStream`] it came from, so a
/// producer task can own it outright. Sending fails with
/// [`VoiceError::NotConnected`] once the session leaves `Active`.
#[derive(Debug, Clone)]
pub struct AudioSink {
    frame_tx: mpsc::Sender<Bytes>,
    state: Arc<RwLock<SessionState>>,
}

impl AudioSink {
    /// Forward one binary audio frame.
    ///
    /// Suspends while the frame channel is full (transport backpressure).
    pub async fn send(&self, frame: impl Into<Bytes>) -> Result<(), VoiceError> {
        if *self.state.read().await != SessionState::Active {
            return Err(VoiceError::NotConnected);
        }

        self.frame_tx
            .send(frame.into())
            .await
            .map_err(|_| VoiceError::NotConnected)
    }
}

/// Streaming client for the voice autosuggest API.
///
/// Manages at most one session at a time; `open()` while a session is live
/// fails with [`VoiceError::SessionActive`] rather than silently replacing
/// state. A failed or finished session is terminal and never retried; the
/// caller decides whether to `open()` again.
pub struct VoiceStream {
    /// Client configuration, fixed across sessions
    config: VoiceConfig,
    /// Current session state
    state: Arc<RwLock<SessionState>>,
    /// Audio frame sender for the live session
    frame_tx: Option<mpsc::Sender<Bytes>>,
    /// Shutdown signal sender
    shutdown_tx: Option<oneshot::Sender<()>>,
    /// Session task handle
    connection_handle: Option<tokio::task::JoinHandle<()>>,
}

impl VoiceStream {
    /// Create a client. No connection is made until [`open`](Self::open).
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(SessionState::Idle)),
            frame_tx: None,
            shutdown_tx: None,
            connection_handle: None,
        }
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Build the session URL with query parameters.
    ///
    /// `focus` requires both coordinates and gates `n-focus-results`;
    /// `clip-to-circle` requires all three of lat/long/radius or is omitted
    /// entirely.
    pub(crate) fn build_socket_url(
        &self,
        options: &AutosuggestOptions,
    ) -> Result<String, VoiceError> {
        let mut url = Url::parse(&self.config.endpoint)
            .map_err(|e| VoiceError::InvalidConfig(format!("invalid endpoint URL: {e}")))?;

        {
            let mut query_pairs = url.query_pairs_mut();

            query_pairs.append_pair("key", &self.config.api_key);
            query_pairs.append_pair("voice-language", &options.language);
            query_pairs.append_pair("n-results", &options.n_results.to_string());

            if let Some((lat, long)) = options.focus {
                query_pairs.append_pair("focus", &format!("{lat},{long}"));
                if let Some(count) = options.n_focus_results {
                    query_pairs.append_pair("n-focus-results", &count.to_string());
                }
            }

            if let Some(country) = &options.clip_to_country {
                query_pairs.append_pair("clip-to-country", country);
            }

            if let Some((lat, long, radius)) = options.clip_to_circle {
                query_pairs.append_pair("clip-to-circle", &format!("{lat},{long},{radius}"));
            }
        }

        Ok(url.to_string())
    }

    /// Open a streaming session.
    ///
    /// Builds the request URL, spawns the session task and returns the
    /// event receiver. The outcome of the connect is delivered as the first
    /// event: [`VoiceEvent::Connected`] on success, [`VoiceEvent::Failed`]
    /// otherwise.
    pub async fn open(
        &mut self,
        options: &AutosuggestOptions,
    ) -> Result<mpsc::UnboundedReceiver<VoiceEvent>, VoiceError> {
        if self.config.api_key.is_empty() {
            return Err(VoiceError::InvalidConfig("API key is required".to_string()));
        }

        let ws_url = self.build_socket_url(options)?;
        let start_msg =
            serde_json::to_string(&StartRecognition::new(self.config.encoding, self.config.sample_rate))
                .map_err(|e| {
                    VoiceError::InvalidConfig(format!("failed to encode StartRecognition: {e}"))
                })?;

        {
            let mut state = self.state.write().await;
            if matches!(
                *state,
                SessionState::Connecting | SessionState::Active | SessionState::Closing
            ) {
                return Err(VoiceError::SessionActive);
            }
            *state = SessionState::Connecting;
        }

        let (frame_tx, frame_rx) = mpsc::channel::<Bytes>(FRAME_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<VoiceEvent>();

        let sink = AudioSink {
            frame_tx: frame_tx.clone(),
            state: self.state.clone(),
        };

        self.frame_tx = Some(frame_tx);
        self.shutdown_tx = Some(shutdown_tx);

        let state = self.state.clone();
        let connect_timeout = self.config.connect_timeout;
        let inactivity_timeout = self.config.inactivity_timeout;

        self.connection_handle = Some(tokio::spawn(run_session(
            ws_url,
            start_msg,
            sink,
            frame_rx,
            shutdown_rx,
            event_tx,
            state,
            connect_timeout,
            inactivity_timeout,
        )));

        Ok(event_rx)
    }

    /// Forward one binary audio frame over the active session.
    ///
    /// Fails with [`VoiceError::NotConnected`] while the session is not
    /// `Active` instead of silently dropping the frame. The client performs
    /// no buffering or resampling beyond the bounded frame channel; chunking
    /// and pacing are the caller's concern.
    pub async fn send(&self, frame: impl Into<Bytes>) -> Result<(), VoiceError> {
        if *self.state.read().await != SessionState::Active {
            return Err(VoiceError::NotConnected);
        }

        let frame_tx = self.frame_tx.as_ref().ok_or(VoiceError::NotConnected)?;
        frame_tx
            .send(frame.into())
            .await
            .map_err(|_| VoiceError::NotConnected)
    }

    /// Close the session gracefully.
    ///
    /// Signals the session task to send a close frame and waits for it to
    /// finish. No event is emitted for a caller-initiated close.
    pub async fn close(&mut self) -> Result<(), VoiceError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.connection_handle.take() {
            let _ = timeout(Duration::from_secs(5), handle).await;
        }

        self.frame_tx = None;

        info!("voice session closed");
        Ok(())
    }
}

impl Drop for VoiceStream {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

/// One session: connect, negotiate, pump frames until a terminal event.
///
/// Exclusively owns the socket. Emits at most one terminal event
/// (`Suggestions` or `Failed`) on `event_tx`; after that nothing else is
/// sent and the task winds down.
#[allow(clippy::too_many_arguments)]
async fn run_session(
    ws_url: String,
    start_msg: String,
    sink: AudioSink,
    mut frame_rx: mpsc::Receiver<Bytes>,
    mut shutdown_rx: oneshot::Receiver<()>,
    event_tx: mpsc::UnboundedSender<VoiceEvent>,
    state: Arc<RwLock<SessionState>>,
    connect_timeout: Duration,
    inactivity_timeout: Duration,
) {
    let connect_result = timeout(connect_timeout, connect_async(ws_url.as_str())).await;

    let (ws_stream, _response) = match connect_result {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!("failed to connect to voice endpoint: {e}");
            *state.write().await = SessionState::Closed;
            let _ = event_tx.send(VoiceEvent::Failed(VoiceError::ConnectionFailed(
                e.to_string(),
            )));
            return;
        }
        Err(_) => {
            error!("voice endpoint handshake timed out");
            *state.write().await = SessionState::Closed;
            let _ = event_tx.send(VoiceEvent::Failed(VoiceError::ConnectionFailed(
                "handshake timed out".to_string(),
            )));
            return;
        }
    };

    info!("connected to voice autosuggest endpoint");

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    // StartRecognition goes out exactly once, before any audio frame.
    if let Err(e) = ws_sink.send(Message::Text(start_msg.into())).await {
        error!("failed to send StartRecognition: {e}");
        *state.write().await = SessionState::Closed;
        let _ = event_tx.send(VoiceEvent::Failed(VoiceError::Network(format!(
            "failed to send StartRecognition: {e}"
        ))));
        return;
    }
    debug!("sent StartRecognition");

    *state.write().await = SessionState::Active;
    let _ = event_tx.send(VoiceEvent::Connected(sink));

    // Guards the at-most-once terminal event discipline.
    let mut terminal = false;

    let inactivity = sleep(inactivity_timeout);
    tokio::pin!(inactivity);

    loop {
        tokio::select! {
            // Outgoing audio frames
            Some(frame) = frame_rx.recv() => {
                let len = frame.len();
                if let Err(e) = ws_sink.send(Message::Binary(frame)).await {
                    error!("failed to send audio frame: {e}");
                    if !terminal {
                        terminal = true;
                        let _ = event_tx.send(VoiceEvent::Failed(VoiceError::Network(
                            format!("failed to send audio frame: {e}"),
                        )));
                    }
                    break;
                }
                debug!("sent {len} bytes of audio");
            }

            // Incoming frames
            message = ws_stream.next() => {
                inactivity.as_mut().reset(Instant::now() + inactivity_timeout);
                match message {
                    Some(Ok(Message::Text(text))) => {
                        debug!("received frame: {text}");
                        match InboundMessage::parse(&text) {
                            Ok(InboundMessage::RecognitionStarted) => {
                                // Redundant confirmation, Connected already fired.
                                debug!("recognition started");
                            }
                            Ok(InboundMessage::Suggestions(suggestions)) => {
                                info!("received {} suggestions", suggestions.len());
                                *state.write().await = SessionState::Closing;
                                if !terminal {
                                    terminal = true;
                                    let _ = event_tx.send(VoiceEvent::Suggestions(suggestions));
                                }
                                let frame = CloseFrame {
                                    code: CloseCode::Normal,
                                    reason: "job finished".into(),
                                };
                                if let Err(e) = ws_sink.send(Message::Close(Some(frame))).await {
                                    warn!("failed to send close frame: {e}");
                                }
                                break;
                            }
                            Ok(InboundMessage::ApiError { code, message }) => {
                                error!("voice api error ({code}): {message}");
                                *state.write().await = SessionState::Closing;
                                if !terminal {
                                    terminal = true;
                                    let _ = event_tx.send(VoiceEvent::Failed(VoiceError::Api {
                                        code,
                                        message,
                                    }));
                                }
                                let frame = CloseFrame {
                                    code: CloseCode::Protocol,
                                    reason: "job finished with errors".into(),
                                };
                                if let Err(e) = ws_sink.send(Message::Close(Some(frame))).await {
                                    warn!("failed to send close frame: {e}");
                                }
                                break;
                            }
                            Ok(InboundMessage::Unknown(raw)) => {
                                warn!("unrecognized frame: {raw}");
                            }
                            Err(e) => {
                                // Malformed frames never tear the session down.
                                warn!("failed to decode inbound frame: {e}");
                            }
                        }
                    }
                    Some(Ok(Message::Close(close_frame))) => {
                        info!("remote closed connection: {close_frame:?}");
                        if let Some(frame) = close_frame {
                            if frame.code != CloseCode::Normal {
                                if !terminal {
                                    terminal = true;
                                    let _ = event_tx.send(VoiceEvent::Failed(
                                        VoiceError::RemoteClosed {
                                            code: frame.code.into(),
                                            reason: frame.reason.to_string(),
                                        },
                                    ));
                                }
                                // Mirror the remote's signal back.
                                let _ = ws_sink.send(Message::Close(Some(frame))).await;
                            }
                        }
                        break;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!("unexpected binary frame ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // Pong is handled by the library.
                        debug!("received ping");
                    }
                    Some(Ok(Message::Pong(_))) => {
                        debug!("received pong");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("websocket error: {e}");
                        if !terminal {
                            terminal = true;
                            let _ = event_tx.send(VoiceEvent::Failed(VoiceError::Network(
                                e.to_string(),
                            )));
                        }
                        break;
                    }
                    None => {
                        info!("websocket stream ended");
                        if !terminal {
                            terminal = true;
                            let _ = event_tx.send(VoiceEvent::Failed(VoiceError::Network(
                                "connection closed unexpectedly".to_string(),
                            )));
                        }
                        break;
                    }
                }
            }

            // Caller-initiated close
            _ = &mut shutdown_rx => {
                info!("session closed by caller");
                let _ = ws_sink.send(Message::Close(None)).await;
                break;
            }

            // The remote may never respond at all
            () = &mut inactivity => {
                warn!("no inbound frame for {inactivity_timeout:?}, giving up");
                if !terminal {
                    let _ = event_tx.send(VoiceEvent::Failed(VoiceError::Network(
                        "inactivity timeout: no response from the remote".to_string(),
                    )));
                }
                let _ = ws_sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    *state.write().await = SessionState::Closed;
    info!("voice session ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ENDPOINT;

    fn client_with_key(key: &str) -> VoiceStream {
        VoiceStream::new(VoiceConfig::new(key, 16000))
    }

    #[test]
    fn test_default_url() {
        let client = client_with_key("W3W-KEY");
        let url = client
            .build_socket_url(&AutosuggestOptions::default())
            .unwrap();

        assert_eq!(
            url,
            format!("{DEFAULT_ENDPOINT}?key=W3W-KEY&voice-language=en&n-results=8")
        );
    }

    #[test]
    fn test_required_params_appear_exactly_once() {
        let client = client_with_key("W3W-KEY");
        let options = AutosuggestOptions::default()
            .with_focus(51.52, -0.195)
            .with_n_focus_results(3)
            .with_clip_to_country("GB")
            .with_clip_to_circle(51.5, -0.13, 10.0);
        let url = client.build_socket_url(&options).unwrap();

        assert_eq!(url.matches("key=").count(), 1);
        assert_eq!(url.matches("voice-language=").count(), 1);
    }

    #[test]
    fn test_focus_params() {
        let client = client_with_key("W3W-KEY");
        let options = AutosuggestOptions::default()
            .with_focus(51.52, -0.195)
            .with_n_focus_results(3);
        let url = client.build_socket_url(&options).unwrap();

        assert!(url.contains("focus=51.52%2C-0.195"));
        assert!(url.contains("n-focus-results=3"));
    }

    #[test]
    fn test_focus_count_requires_focus() {
        let client = client_with_key("W3W-KEY");
        let options = AutosuggestOptions::default().with_n_focus_results(3);
        let url = client.build_socket_url(&options).unwrap();

        assert!(!url.contains("focus"));
        assert!(!url.contains("n-focus-results"));
    }

    #[test]
    fn test_clipping_params() {
        let client = client_with_key("W3W-KEY");
        let options = AutosuggestOptions::default()
            .with_clip_to_country("GB")
            .with_clip_to_circle(51.5, -0.13, 10.0);
        let url = client.build_socket_url(&options).unwrap();

        assert!(url.contains("clip-to-country=GB"));
        assert!(url.contains("clip-to-circle=51.5%2C-0.13%2C10"));
    }

    #[tokio::test]
    async fn test_open_requires_api_key() {
        let mut client = client_with_key("");
        let result = client.open(&AutosuggestOptions::default()).await;

        match result {
            Err(VoiceError::InvalidConfig(msg)) => assert!(msg.contains("API key")),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_before_open_fails_loudly() {
        let client = client_with_key("W3W-KEY");
        let result = client.send(vec![0u8; 1024]).await;
        assert_eq!(result, Err(VoiceError::NotConnected));
    }

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        let client = client_with_key("W3W-KEY");
        assert_eq!(client.state().await, SessionState::Idle);
    }
}
