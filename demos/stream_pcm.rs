//! Streams a raw PCM file to the voice autosuggest API and prints the
//! returned three-word addresses.
//!
//! The producer loop stands in for a microphone: it reads fixed-size chunks
//! from the file and paces them in real time through the [`AudioSink`]
//! handed over in the `Connected` event, stopping as soon as the sink is
//! rejected (i.e. the session hit a terminal event).
//!
//! ```text
//! W3W_API_KEY=<key> cargo run --example stream_pcm -- recording.pcm [sample_rate]
//! ```

use std::time::Duration;

use anyhow::{Context, anyhow};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use voice_autosuggest::{AudioSink, AutosuggestOptions, VoiceConfig, VoiceEvent, VoiceStream};

/// Chunk size mirroring a typical microphone read buffer.
const CHUNK_SIZE: usize = 4096;

/// 16-bit mono PCM.
const BYTES_PER_SAMPLE: u64 = 2;

async fn stream_file(path: String, sample_rate: u32, sink: AudioSink) -> anyhow::Result<()> {
    let mut file = File::open(&path)
        .await
        .with_context(|| format!("failed to open {path}"))?;

    // Pace chunks at the rate the audio was recorded.
    let chunk_duration =
        Duration::from_secs_f64(CHUNK_SIZE as f64 / (BYTES_PER_SAMPLE * sample_rate as u64) as f64);
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            info!("end of file reached, waiting for the remote to respond");
            return Ok(());
        }

        if sink.send(buffer[..read].to_vec()).await.is_err() {
            // The session ended; stop producing.
            return Ok(());
        }

        tokio::time::sleep(chunk_duration).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| anyhow!("usage: stream_pcm <file.pcm> [sample_rate]"))?;
    let sample_rate: u32 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(16000);

    let api_key = std::env::var("W3W_API_KEY").context("W3W_API_KEY is not set")?;

    let mut client = VoiceStream::new(VoiceConfig::new(api_key, sample_rate));
    let options = AutosuggestOptions::default();
    let mut events = client.open(&options).await?;

    while let Some(event) = events.recv().await {
        match event {
            VoiceEvent::Connected(sink) => {
                info!("connected, streaming {path}");
                let path = path.clone();
                tokio::spawn(async move {
                    if let Err(e) = stream_file(path, sample_rate, sink).await {
                        warn!("producer stopped: {e}");
                    }
                });
            }
            VoiceEvent::Suggestions(suggestions) => {
                for suggestion in &suggestions {
                    println!(
                        "#{} {} ({}, {}) {} km",
                        suggestion.rank,
                        suggestion.words,
                        suggestion.nearest_place,
                        suggestion.country,
                        suggestion.distance_to_focus_km,
                    );
                }
                break;
            }
            VoiceEvent::Failed(err) => {
                return Err(anyhow!("session failed: {err}"));
            }
        }
    }

    client.close().await?;
    Ok(())
}
