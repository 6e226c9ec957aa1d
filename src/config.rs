//! Configuration types for the voice autosuggest client.
//!
//! Two layers of configuration exist:
//!
//! - [`VoiceConfig`]: per-client settings (endpoint, API key, audio format,
//!   timeouts) that stay fixed across sessions
//! - [`AutosuggestOptions`]: per-session query options (language, result
//!   counts, focus and clipping) that become URL query parameters

use std::time::Duration;

/// Default voice autosuggest endpoint.
pub const DEFAULT_ENDPOINT: &str = "wss://voiceapi.what3words.com/v1/autosuggest";

/// Audio encodings accepted by the voice API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    /// 16-bit signed little-endian PCM
    #[default]
    PcmS16Le,
    /// 32-bit float little-endian PCM
    PcmF32Le,
    /// 8-bit mu-law
    Mulaw,
}

impl AudioEncoding {
    /// Convert to the wire identifier used in the `StartRecognition` message.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PcmS16Le => "pcm_s16le",
            Self::PcmF32Le => "pcm_f32le",
            Self::Mulaw => "mulaw",
        }
    }
}

/// Per-client configuration for [`VoiceStream`](crate::VoiceStream).
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// WebSocket endpoint of the autosuggest service.
    pub endpoint: String,
    /// API key, sent as the `key` query parameter.
    pub api_key: String,
    /// Sample rate of the audio that will be streamed, in Hz.
    pub sample_rate: u32,
    /// Encoding of the audio that will be streamed.
    pub encoding: AudioEncoding,
    /// How long to wait for the WebSocket handshake before giving up.
    pub connect_timeout: Duration,
    /// How long to wait without any inbound frame before the session is
    /// treated as dead. The remote may otherwise never respond.
    pub inactivity_timeout: Duration,
}

impl VoiceConfig {
    /// Create a configuration with default endpoint, encoding and timeouts.
    pub fn new(api_key: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            sample_rate,
            encoding: AudioEncoding::default(),
            connect_timeout: Duration::from_secs(10),
            inactivity_timeout: Duration::from_secs(60),
        }
    }

    /// Override the endpoint (useful for regional hosts and tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the audio encoding.
    pub fn with_encoding(mut self, encoding: AudioEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Override the handshake timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Override the inactivity timeout.
    pub fn with_inactivity_timeout(mut self, inactivity_timeout: Duration) -> Self {
        self.inactivity_timeout = inactivity_timeout;
        self
    }
}

/// Query options for one autosuggest session.
///
/// All options map directly to URL query parameters, see
/// [`VoiceStream::open`](crate::VoiceStream::open) for the full mapping.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AutosuggestOptions {
    /// Two-letter language code of the spoken input (`voice-language`).
    pub language: String,
    /// Maximum number of suggestions to return (`n-results`). The server
    /// truncates anything above 100; the client does not enforce this.
    pub n_results: u32,
    /// Focus point as `(lat, long)`; results are ranked toward it (`focus`).
    #[serde(default)]
    pub focus: Option<(f64, f64)>,
    /// Number of focused results within `n_results` (`n-focus-results`).
    /// Only meaningful when `focus` is set; ignored otherwise.
    #[serde(default)]
    pub n_focus_results: Option<u32>,
    /// ISO country code filter (`clip-to-country`).
    #[serde(default)]
    pub clip_to_country: Option<String>,
    /// Geographic clipping circle as `(lat, long, radius_km)`
    /// (`clip-to-circle`). All three components are required together.
    #[serde(default)]
    pub clip_to_circle: Option<(f64, f64, f64)>,
}

impl Default for AutosuggestOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            n_results: 8,
            focus: None,
            n_focus_results: None,
            clip_to_country: None,
            clip_to_circle: None,
        }
    }
}

impl AutosuggestOptions {
    /// Set the spoken language code.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the maximum number of results.
    pub fn with_n_results(mut self, n_results: u32) -> Self {
        self.n_results = n_results;
        self
    }

    /// Set the focus point.
    pub fn with_focus(mut self, lat: f64, long: f64) -> Self {
        self.focus = Some((lat, long));
        self
    }

    /// Set the number of focused results. Requires a focus point.
    pub fn with_n_focus_results(mut self, count: u32) -> Self {
        self.n_focus_results = Some(count);
        self
    }

    /// Restrict results to one country.
    pub fn with_clip_to_country(mut self, country: impl Into<String>) -> Self {
        self.clip_to_country = Some(country.into());
        self
    }

    /// Restrict results to a circle.
    pub fn with_clip_to_circle(mut self, lat: f64, long: f64, radius_km: f64) -> Self {
        self.clip_to_circle = Some((lat, long, radius_km));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_wire_names() {
        assert_eq!(AudioEncoding::PcmS16Le.as_str(), "pcm_s16le");
        assert_eq!(AudioEncoding::PcmF32Le.as_str(), "pcm_f32le");
        assert_eq!(AudioEncoding::Mulaw.as_str(), "mulaw");
        assert_eq!(AudioEncoding::default(), AudioEncoding::PcmS16Le);
    }

    #[test]
    fn test_config_defaults() {
        let config = VoiceConfig::new("test-key", 16000);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.encoding, AudioEncoding::PcmS16Le);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.inactivity_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_config_builder() {
        let config = VoiceConfig::new("test-key", 16000)
            .with_endpoint("ws://127.0.0.1:9000/v1/autosuggest")
            .with_encoding(AudioEncoding::Mulaw)
            .with_connect_timeout(Duration::from_millis(200))
            .with_inactivity_timeout(Duration::from_millis(500));

        assert_eq!(config.endpoint, "ws://127.0.0.1:9000/v1/autosuggest");
        assert_eq!(config.encoding, AudioEncoding::Mulaw);
        assert_eq!(config.connect_timeout, Duration::from_millis(200));
        assert_eq!(config.inactivity_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_options_defaults() {
        let options = AutosuggestOptions::default();
        assert_eq!(options.language, "en");
        assert_eq!(options.n_results, 8);
        assert!(options.focus.is_none());
        assert!(options.n_focus_results.is_none());
        assert!(options.clip_to_country.is_none());
        assert!(options.clip_to_circle.is_none());
    }

    #[test]
    fn test_options_builder() {
        let options = AutosuggestOptions::default()
            .with_language("de")
            .with_n_results(20)
            .with_focus(51.5, -0.13)
            .with_n_focus_results(5)
            .with_clip_to_country("GB")
            .with_clip_to_circle(51.5, -0.13, 10.0);

        assert_eq!(options.language, "de");
        assert_eq!(options.n_results, 20);
        assert_eq!(options.focus, Some((51.5, -0.13)));
        assert_eq!(options.n_focus_results, Some(5));
        assert_eq!(options.clip_to_country.as_deref(), Some("GB"));
        assert_eq!(options.clip_to_circle, Some((51.5, -0.13, 10.0)));
    }
}
