/*
 * @file config.rs
 * @brief Runtime configuration
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

//! Runtime configuration loaded once at startup.
//!
//! Values come from an optional JSON file, then from the process environment
//! (including anything `.env` provided). The resulting [`AppConfig`] is never mutated afterwards.

use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

/// Default path of the JSON configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Strongly typed representation of `config.json` plus environment overrides.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// OpenWeatherMap API key.
    pub openweather_api_key: Option<String>,
    /// NewsAPI key.
    pub newsapi_key: Option<String>,
    /// Key for the OpenAI-compatible chat and transcription endpoints.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    /// Address placed in the `From` header of outgoing mail.
    pub sender_email: Option<String>,
    pub default_subject: String,
    /// Google OAuth client file (installed or web application format).
    pub gmail_credentials_path: PathBuf,
    /// Cached Gmail authorization token.
    pub gmail_token_path: PathBuf,
    /// Text-to-speech program; the platform default is used when unset.
    pub tts_command: Option<String>,
    pub news_query: String,
    pub record_seconds: u64,
    pub http_timeout_secs: u64,
    pub inbox_max_results: u32,
    /// Optional keyword rule table overriding the built-in intents.
    pub intents_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openweather_api_key: None,
            newsapi_key: None,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            transcription_model: "whisper-1".to_string(),
            sender_email: None,
            default_subject: "Voice Assistant Email".to_string(),
            gmail_credentials_path: PathBuf::from("credentials.json"),
            gmail_token_path: PathBuf::from("token.json"),
            tts_command: None,
            news_query: "world".to_string(),
            record_seconds: 5,
            http_timeout_secs: 5,
            inbox_max_results: 1,
            intents_path: PathBuf::from("intents.json"),
        }
    }
}

// API keys stay out of logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("openweather_api_key", &redacted(&self.openweather_api_key))
            .field("newsapi_key", &redacted(&self.newsapi_key))
            .field("openai_api_key", &redacted(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("chat_model", &self.chat_model)
            .field("transcription_model", &self.transcription_model)
            .field("sender_email", &self.sender_email)
            .field("default_subject", &self.default_subject)
            .field("gmail_credentials_path", &self.gmail_credentials_path)
            .field("gmail_token_path", &self.gmail_token_path)
            .field("tts_command", &self.tts_command)
            .field("news_query", &self.news_query)
            .field("record_seconds", &self.record_seconds)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("inbox_max_results", &self.inbox_max_results)
            .field("intents_path", &self.intents_path)
            .finish()
    }
}

fn redacted(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "<set>",
        None => "<unset>",
    }
}

impl AppConfig {
    /// Loads the configuration file at `path` and applies environment overrides.
    ///
    /// # Details
    /// A missing file silently yields the defaults. A file that cannot be read
    /// or parsed is reported and also falls back to the defaults, so a broken
    /// config never prevents the assistant from starting. Callers load `.env`
    /// beforehand so its values count as environment.
    pub fn load(path: &Path) -> Self {
        let mut config = load_config_file(path);
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).and_then(non_empty);

        if let Some(value) = read("OPENWEATHER_API_KEY") {
            self.openweather_api_key = Some(value);
        }
        if let Some(value) = read("NEWSAPI_KEY") {
            self.newsapi_key = Some(value);
        }
        if let Some(value) = read("OPENAI_API_KEY") {
            self.openai_api_key = Some(value);
        }
        if let Some(value) = read("OPENAI_BASE_URL") {
            self.openai_base_url = value;
        }
        if let Some(value) = read("CHAT_MODEL") {
            self.chat_model = value;
        }
        if let Some(value) = read("SENDER_EMAIL") {
            self.sender_email = Some(value);
        }
        if let Some(value) = read("DEFAULT_SUBJECT") {
            self.default_subject = value;
        }
        if let Some(value) = read("GMAIL_CREDENTIALS_FILE") {
            self.gmail_credentials_path = PathBuf::from(value);
        }
        if let Some(value) = read("GMAIL_TOKEN_FILE") {
            self.gmail_token_path = PathBuf::from(value);
        }
        if let Some(value) = read("TTS_COMMAND") {
            self.tts_command = Some(value);
        }
        if let Some(value) = read("NEWS_QUERY") {
            self.news_query = value;
        }
        self.normalize();
    }

    /// Timeout applied to the weather and news HTTP calls.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    /// Length of a single microphone capture.
    pub fn record_duration(&self) -> Duration {
        Duration::from_secs(self.record_seconds.max(1))
    }

    // Blank values in the file are treated the same as missing ones.
    fn normalize(&mut self) {
        for slot in [
            &mut self.openweather_api_key,
            &mut self.newsapi_key,
            &mut self.openai_api_key,
            &mut self.sender_email,
            &mut self.tts_command,
        ] {
            *slot = slot.take().and_then(non_empty);
        }
        self.openai_base_url = self.openai_base_url.trim_end_matches('/').to_string();
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn load_config_file(path: &Path) -> AppConfig {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Config parse error ({}): {}", path.display(), err);
                AppConfig::default()
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => AppConfig::default(),
        Err(err) => {
            tracing::warn!("Config load error ({}): {}", path.display(), err);
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.default_subject, "Voice Assistant Email");
        assert_eq!(config.news_query, "world");
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
        assert_eq!(config.record_duration(), Duration::from_secs(5));
        assert_eq!(config.inbox_max_results, 1);
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = AppConfig {
            newsapi_key: Some("from-file".to_string()),
            ..AppConfig::default()
        };
        config.apply_overrides(lookup_from(&[
            ("NEWSAPI_KEY", "from-env"),
            ("SENDER_EMAIL", "me@example.com"),
            ("GMAIL_TOKEN_FILE", "/tmp/token.json"),
        ]));
        assert_eq!(config.newsapi_key.as_deref(), Some("from-env"));
        assert_eq!(config.sender_email.as_deref(), Some("me@example.com"));
        assert_eq!(config.gmail_token_path, PathBuf::from("/tmp/token.json"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let mut config = AppConfig {
            openweather_api_key: Some("   ".to_string()),
            ..AppConfig::default()
        };
        config.apply_overrides(lookup_from(&[("OPENAI_API_KEY", "")]));
        assert!(config.openweather_api_key.is_none());
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup_from(&[("OPENAI_BASE_URL", "http://localhost:8080/v1/")]));
        assert_eq!(config.openai_base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"news_query": "technology", "inbox_max_results": 3}}"#).expect("write");
        let config = load_config_file(file.path());
        assert_eq!(config.news_query, "technology");
        assert_eq!(config.inbox_max_results, 3);
        assert_eq!(config.chat_model, "gpt-3.5-turbo");
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write");
        let config = load_config_file(file.path());
        assert_eq!(config.news_query, "world");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = load_config_file(Path::new("definitely/not/here.json"));
        assert_eq!(config.default_subject, "Voice Assistant Email");
    }

    #[test]
    fn debug_output_hides_keys() {
        let config = AppConfig {
            openai_api_key: Some("sk-secret".to_string()),
            ..AppConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<set>"));
    }
}
