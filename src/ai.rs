//! Chat completion and speech transcription.
//!
//! This module talks to an OpenAI-compatible API for answering free-form
//! questions and for turning recorded WAV audio into text.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::services::read_success_body;

/// Answers a single free-form prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model's reply to `prompt`.
    async fn ask(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Converts recorded speech into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribes a complete WAV file held in memory.
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String, ServiceError>;
}

/// Client for the chat-completion and transcription endpoints.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    chat_model: String,
    transcription_model: String,
}

/// Chat message structure for the completion API.
#[derive(Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAiClient {
    /// Creates a client from the loaded configuration.
    ///
    /// No timeout is applied: answers and transcriptions may take a while.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            chat_model: config.chat_model.clone(),
            transcription_model: config.transcription_model.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ServiceError> {
        self.api_key
            .as_deref()
            .ok_or(ServiceError::NotConfigured("OpenAI API key"))
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn ask(&self, prompt: &str) -> Result<String, ServiceError> {
        let api_key = self.api_key()?;
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let body = read_success_body("chat completion", response).await?;
        parse_chat_reply(&body)
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String, ServiceError> {
        let api_key = self.api_key()?;
        let file = Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")?;
        let form = Form::new()
            .part("file", file)
            .text("model", self.transcription_model.clone())
            .text("language", "en");
        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;
        let body = read_success_body("transcription", response).await?;
        let parsed: TranscriptionResponse = serde_json::from_str(&body)?;
        Ok(parsed.text.trim().to_string())
    }
}

fn parse_chat_reply(body: &str) -> Result<String, ServiceError> {
    let parsed: ChatResponse = serde_json::from_str(body)?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .ok_or_else(|| ServiceError::UnexpectedResponse("no choices in chat reply".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_reply_is_trimmed() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Rust is a language.\n"}}]}"#;
        assert_eq!(parse_chat_reply(body).expect("reply"), "Rust is a language.");
    }

    #[test]
    fn chat_reply_without_choices_is_an_error() {
        let err = parse_chat_reply(r#"{"choices":[]}"#).expect_err("no choices");
        assert!(matches!(err, ServiceError::UnexpectedResponse(_)));
    }

    #[test]
    fn malformed_chat_reply_is_an_error() {
        assert!(matches!(
            parse_chat_reply("<html>"),
            Err(ServiceError::Json(_))
        ));
    }

    #[tokio::test]
    async fn missing_key_is_reported_before_any_request() {
        let client = OpenAiClient::new(&AppConfig::default());
        let err = client.ask("hello").await.expect_err("no key");
        assert!(matches!(err, ServiceError::NotConfigured("OpenAI API key")));
        let err = client.transcribe(Vec::new()).await.expect_err("no key");
        assert!(matches!(err, ServiceError::NotConfigured(_)));
    }
}
