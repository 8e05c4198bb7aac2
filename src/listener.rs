/*
 * @file listener.rs
 * @brief Utterance sources
 * @author Kevin Thomas
 * @date 2025
 *
 * MIT License
 *
 * Copyright (c) 2025 Kevin Thomas
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Utterance capture.
//!
//! A [`Listener`] produces one lower-cased utterance per call. Every failure
//! (no microphone, silence, transcription error) collapses to an empty
//! string so the command loop can simply move on.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Source of transcribed utterances.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Blocks until one utterance is captured; returns `""` when nothing usable was heard.
    async fn listen(&self) -> String;
}

/// Lower-cases and trims a raw transcription.
pub fn normalize_utterance(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Records from the microphone and transcribes each capture.
#[cfg(feature = "microphone")]
pub struct MicrophoneListener<T> {
    transcriber: T,
    record_duration: std::time::Duration,
}

#[cfg(feature = "microphone")]
impl<T: crate::ai::Transcriber> MicrophoneListener<T> {
    pub fn new(transcriber: T, record_duration: std::time::Duration) -> Self {
        Self {
            transcriber,
            record_duration,
        }
    }

    async fn capture_samples(&self) -> Option<Vec<i16>> {
        let duration = self.record_duration;
        match tokio::task::spawn_blocking(move || crate::audio::record_audio(duration)).await {
            Ok(Ok(samples)) => Some(samples),
            Ok(Err(err)) => {
                tracing::warn!("Microphone error: {:#}", err);
                None
            }
            Err(err) => {
                tracing::warn!("Recording task failed: {}", err);
                None
            }
        }
    }
}

#[cfg(feature = "microphone")]
#[async_trait]
impl<T: crate::ai::Transcriber> Listener for MicrophoneListener<T> {
    async fn listen(&self) -> String {
        println!("Listening...");
        let Some(samples) = self.capture_samples().await else {
            return String::new();
        };
        if !crate::audio::contains_speech(&samples) {
            tracing::debug!("Capture below silence threshold");
            return String::new();
        }
        let wav = match crate::audio::encode_wav(&samples) {
            Ok(wav) => wav,
            Err(err) => {
                tracing::warn!("WAV encode error: {:#}", err);
                return String::new();
            }
        };
        match self.transcriber.transcribe(wav).await {
            Ok(text) => {
                let utterance = normalize_utterance(&text);
                if utterance.is_empty() {
                    println!("Sorry, I did not understand that.");
                } else {
                    println!("You said: {}", utterance);
                }
                utterance
            }
            Err(err) => {
                tracing::warn!("Transcription error: {}", err);
                println!("Sorry, my speech service is down.");
                String::new()
            }
        }
    }
}

/// Reads utterances typed on standard input, one per line.
///
/// End of input is treated as the utterance `"exit"` so a piped script ends
/// the session instead of spinning on empty reads.
pub struct TypedListener {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TypedListener {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for TypedListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for TypedListener {
    async fn listen(&self) -> String {
        println!("Listening (type a command)...");
        let mut lines = self.lines.lock().await;
        typed_utterance(lines.next_line().await)
    }
}

/// Maps one read from standard input to an utterance.
///
/// # Returns
/// * The normalized line when one was read.
/// * `"exit"` at end of input.
/// * `""` when reading failed.
fn typed_utterance(read: std::io::Result<Option<String>>) -> String {
    match read {
        Ok(Some(line)) => normalize_utterance(&line),
        Ok(None) => "exit".to_string(),
        Err(err) => {
            tracing::warn!("Input error: {}", err);
            String::new()
        }
    }
}

/// Picks the utterance source for a session.
///
/// Falls back to keyboard input when `typed` is requested, when the binary
/// was built without microphone support, or when no transcription key is set.
pub fn default_listener(config: &crate::config::AppConfig, typed: bool) -> Box<dyn Listener> {
    if typed {
        return Box::new(TypedListener::new());
    }
    #[cfg(feature = "microphone")]
    {
        if config.openai_api_key.is_some() {
            let transcriber = crate::ai::OpenAiClient::new(config);
            return Box::new(MicrophoneListener::new(
                transcriber,
                config.record_duration(),
            ));
        }
        tracing::warn!("OPENAI_API_KEY is not set; reading commands from standard input");
    }
    #[cfg(not(feature = "microphone"))]
    {
        let _ = config;
        tracing::info!("Built without microphone support; reading commands from standard input");
    }
    Box::new(TypedListener::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utterances_are_lowercased_and_trimmed() {
        assert_eq!(normalize_utterance("  What Time Is It?\n"), "what time is it?");
        assert_eq!(normalize_utterance("   "), "");
    }

    #[test]
    fn end_of_typed_input_means_exit() {
        assert_eq!(typed_utterance(Ok(None)), "exit");
    }

    #[test]
    fn typed_line_is_normalized() {
        assert_eq!(typed_utterance(Ok(Some("  Check My Email ".to_string()))), "check my email");
    }

    #[test]
    fn read_error_yields_empty_utterance() {
        let err = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad utf-8");
        assert_eq!(typed_utterance(Err(err)), "");
    }
}
