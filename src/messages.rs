//! Wire message types for the voice autosuggest WebSocket API.
//!
//! - **Outgoing**: [`StartRecognition`], the one-shot control message sent
//!   immediately after the handshake.
//! - **Incoming**: JSON text frames sharing a common envelope
//!   (`message`, optional `code`, optional `id`), decoded into
//!   [`InboundMessage`] by peeking at the envelope first and then branching
//!   to the payload shape.

use serde::{Deserialize, Serialize};

use crate::config::AudioEncoding;

/// `message` value confirming the recognition job has started.
pub const RECOGNITION_STARTED: &str = "RecognitionStarted";
/// `message` value carrying the final suggestion list.
pub const SUGGESTIONS: &str = "Suggestions";

// =============================================================================
// Outgoing Messages (Client to Server)
// =============================================================================

/// Audio format block of the `StartRecognition` control message.
#[derive(Debug, Serialize)]
pub struct AudioFormat {
    /// Always `"raw"`; the API takes unframed sample buffers.
    #[serde(rename = "type")]
    pub format_type: &'static str,
    /// Wire name of the sample encoding.
    pub encoding: &'static str,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// Control message negotiating the audio format, sent exactly once per
/// session, immediately after the WebSocket handshake completes.
#[derive(Debug, Serialize)]
pub struct StartRecognition {
    /// Message type identifier (always `"StartRecognition"`)
    pub message: &'static str,
    /// Format of the audio frames that will follow.
    pub audio_format: AudioFormat,
}

impl StartRecognition {
    /// Create a `StartRecognition` message for the given audio format.
    pub fn new(encoding: AudioEncoding, sample_rate: u32) -> Self {
        Self {
            message: "StartRecognition",
            audio_format: AudioFormat {
                format_type: "raw",
                encoding: encoding.as_str(),
                sample_rate,
            },
        }
    }
}

// =============================================================================
// Incoming Messages (Server to Client)
// =============================================================================

/// A single autosuggest result.
///
/// Consumed once and discarded; carries no identity beyond its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// ISO country code of the suggested address.
    pub country: String,
    /// Name of the nearest place to the suggested address.
    #[serde(rename = "nearestPlace")]
    pub nearest_place: String,
    /// The three-word address itself.
    pub words: String,
    /// Distance from the focus point in km, 0 when no focus was given.
    #[serde(rename = "distanceToFocusKm", default)]
    pub distance_to_focus_km: i32,
    /// Rank within the result set.
    #[serde(default)]
    pub rank: i32,
    /// Two-letter language code of the suggestion.
    pub language: String,
}

/// Common envelope shared by every inbound text frame.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    id: Option<String>,
}

/// Payload of a `Suggestions` frame.
#[derive(Debug, Deserialize)]
struct SuggestionsPayload {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Recognition job confirmed. Redundant post-handshake confirmation,
    /// treated as idempotent by the client.
    RecognitionStarted,
    /// Final suggestion list; terminal for the session.
    Suggestions(Vec<Suggestion>),
    /// Error envelope (both `code` and `message` set); terminal.
    ApiError { code: String, message: String },
    /// Unrecognized frame, kept verbatim for logging. Non-fatal.
    Unknown(String),
}

impl InboundMessage {
    /// Parse an inbound text frame.
    ///
    /// The two recognized `message` values take precedence; any other frame
    /// carrying both `code` and `message` is an error envelope, and
    /// everything else is [`InboundMessage::Unknown`].
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;

        match envelope.message.as_deref() {
            Some(RECOGNITION_STARTED) => Ok(Self::RecognitionStarted),
            Some(SUGGESTIONS) => {
                let payload: SuggestionsPayload = serde_json::from_str(text)?;
                Ok(Self::Suggestions(payload.suggestions))
            }
            Some(message) if envelope.code.is_some() => Ok(Self::ApiError {
                code: envelope.code.unwrap_or_default(),
                message: message.to_string(),
            }),
            _ => Ok(Self::Unknown(text.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_recognition_shape() {
        let msg = StartRecognition::new(AudioEncoding::PcmS16Le, 16000);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["message"], "StartRecognition");
        assert_eq!(json["audio_format"]["type"], "raw");
        assert_eq!(json["audio_format"]["encoding"], "pcm_s16le");
        assert_eq!(json["audio_format"]["sample_rate"], 16000);
    }

    #[test]
    fn test_parse_recognition_started() {
        let msg = InboundMessage::parse(r#"{"message":"RecognitionStarted","id":"abc"}"#).unwrap();
        assert_eq!(msg, InboundMessage::RecognitionStarted);
    }

    #[test]
    fn test_parse_suggestions() {
        let text = r#"{
            "message": "Suggestions",
            "suggestions": [
                {
                    "country": "GB",
                    "nearestPlace": "Bayswater, London",
                    "words": "filled.count.soap",
                    "distanceToFocusKm": 1,
                    "rank": 1,
                    "language": "en"
                },
                {
                    "country": "GB",
                    "nearestPlace": "Wednesfield, Wolverhampton",
                    "words": "filled.count.soaped",
                    "rank": 2,
                    "language": "en"
                }
            ]
        }"#;

        let msg = InboundMessage::parse(text).unwrap();
        match msg {
            InboundMessage::Suggestions(suggestions) => {
                assert_eq!(suggestions.len(), 2);
                assert_eq!(suggestions[0].words, "filled.count.soap");
                assert_eq!(suggestions[0].distance_to_focus_km, 1);
                // distanceToFocusKm absent defaults to 0
                assert_eq!(suggestions[1].distance_to_focus_km, 0);
                assert_eq!(suggestions[1].rank, 2);
            }
            other => panic!("expected Suggestions, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_envelope() {
        let msg = InboundMessage::parse(r#"{"message":"BadKey","code":"BadKey"}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::ApiError {
                code: "BadKey".to_string(),
                message: "BadKey".to_string(),
            }
        );
    }

    #[test]
    fn test_recognized_messages_take_precedence_over_error_envelope() {
        // A recognized message value is never treated as an error, even
        // when the frame also carries a code.
        let msg =
            InboundMessage::parse(r#"{"message":"Suggestions","code":"W1","suggestions":[]}"#)
                .unwrap();
        assert_eq!(msg, InboundMessage::Suggestions(Vec::new()));
    }

    #[test]
    fn test_parse_unknown_frame() {
        let msg = InboundMessage::parse(r#"{"message":"SomethingNew"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::Unknown(_)));

        let msg = InboundMessage::parse(r#"{"id":"only-an-id"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::Unknown(_)));
    }

    #[test]
    fn test_parse_malformed_json_is_an_error() {
        assert!(InboundMessage::parse("not json at all").is_err());
        assert!(InboundMessage::parse(r#"{"message":"#).is_err());
    }

    #[test]
    fn test_suggestion_round_trip() {
        let original = vec![
            Suggestion {
                country: "GB".to_string(),
                nearest_place: "Bayswater, London".to_string(),
                words: "filled.count.soap".to_string(),
                distance_to_focus_km: 1,
                rank: 1,
                language: "en".to_string(),
            },
            Suggestion {
                country: "US".to_string(),
                nearest_place: "Brooklyn, New York".to_string(),
                words: "index.home.raft".to_string(),
                distance_to_focus_km: 5580,
                rank: 2,
                language: "en".to_string(),
            },
        ];

        let json = serde_json::to_string(&original).unwrap();
        // The documented wire names must appear in the serialized form.
        assert!(json.contains("nearestPlace"));
        assert!(json.contains("distanceToFocusKm"));

        let decoded: Vec<Suggestion> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
    }
}
