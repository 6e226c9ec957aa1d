//! Streaming client for the what3words voice autosuggest WebSocket API.
//!
//! The client opens a persistent duplex WebSocket connection, negotiates a
//! recognition session with a `StartRecognition` control message, forwards
//! caller-supplied raw audio frames, and demultiplexes inbound JSON frames
//! into typed [`VoiceEvent`]s on a single-consumer channel. A session ends
//! on the first terminal event (suggestions or failure); nothing is retried
//! internally.
//!
//! # Example
//!
//! ```rust,no_run
//! use voice_autosuggest::{AutosuggestOptions, VoiceConfig, VoiceEvent, VoiceStream};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VoiceConfig::new("your-api-key", 16000);
//!     let mut client = VoiceStream::new(config);
//!
//!     let options = AutosuggestOptions::default().with_focus(51.52, -0.195);
//!     let mut events = client.open(&options).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             VoiceEvent::Connected(sink) => {
//!                 // Stream microphone audio through the sink.
//!                 sink.send(vec![0u8; 4096]).await?;
//!             }
//!             VoiceEvent::Suggestions(suggestions) => {
//!                 for suggestion in suggestions {
//!                     println!("{} ({})", suggestion.words, suggestion.nearest_place);
//!                 }
//!                 break;
//!             }
//!             VoiceEvent::Failed(err) => {
//!                 eprintln!("session failed: {err}");
//!                 break;
//!             }
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod messages;

// Re-export commonly used items for convenience
pub use client::{AudioSink, SessionState, VoiceEvent, VoiceStream};
pub use config::{AudioEncoding, AutosuggestOptions, DEFAULT_ENDPOINT, VoiceConfig};
pub use error::VoiceError;
pub use messages::{InboundMessage, StartRecognition, Suggestion};
