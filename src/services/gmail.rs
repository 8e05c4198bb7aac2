/*
 * @file gmail.rs
 * @brief Gmail client
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

//! Sending and reading mail through the Gmail REST API.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use super::oauth::{self, StoredToken};
use super::read_success_body;
use crate::config::AppConfig;
use crate::error::ServiceError;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Headline information about one inbox message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailSummary {
    pub sender: String,
    pub subject: String,
    pub snippet: String,
}

/// Mail provider operations used by the assistant.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a plain-text message and returns the provider's message id.
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, ServiceError>;

    /// Lists up to `max` of the newest inbox messages, newest first.
    async fn list_recent(&self, max: u32) -> Result<Vec<EmailSummary>, ServiceError>;
}

/// Gmail client authorized through the cached OAuth token.
pub struct GmailClient {
    client: reqwest::Client,
    api_base: String,
    sender: Option<String>,
    credentials_path: PathBuf,
    token_path: PathBuf,
    token: Mutex<Option<StoredToken>>,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Deserialize)]
struct MessageMetadata {
    #[serde(default)]
    snippet: String,
    payload: Option<MessagePayload>,
}

#[derive(Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Deserialize)]
struct Header {
    name: String,
    value: String,
}

impl GmailClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: GMAIL_API_BASE.to_string(),
            sender: config.sender_email.clone(),
            credentials_path: config.gmail_credentials_path.clone(),
            token_path: config.gmail_token_path.clone(),
            token: Mutex::new(None),
        }
    }

    /// Returns a usable access token, refreshing and persisting it when expired.
    async fn access_token(&self) -> Result<String, ServiceError> {
        let mut cached = self.token.lock().await;
        if cached.is_none() {
            *cached = oauth::load_token(&self.token_path)?;
        }
        let Some(token) = cached.as_ref() else {
            return Err(ServiceError::NotAuthorized(format!(
                "no Gmail token at {}; run `vocalis authorize` first",
                self.token_path.display()
            )));
        };
        if token.is_fresh(Utc::now()) {
            return Ok(token.access_token.clone());
        }
        tracing::info!("Refreshing Gmail access token");
        let secrets = oauth::load_client_secrets(&self.credentials_path)?;
        let refreshed = oauth::refresh_token(&self.client, &secrets, token).await?;
        if let Err(err) = oauth::save_token(&self.token_path, &refreshed) {
            tracing::warn!("Failed to persist refreshed token: {}", err);
        }
        let access = refreshed.access_token.clone();
        *cached = Some(refreshed);
        Ok(access)
    }

    async fn fetch_summary(&self, token: &str, id: &str) -> Result<EmailSummary, ServiceError> {
        let response = self
            .client
            .get(format!("{}/users/me/messages/{}", self.api_base, id))
            .bearer_auth(token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Subject"),
            ])
            .send()
            .await?;
        let body = read_success_body("gmail", response).await?;
        parse_summary(&body)
    }
}

#[async_trait]
impl Mailer for GmailClient {
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, ServiceError> {
        let token = self.access_token().await?;
        let message = build_message(self.sender.as_deref(), recipient, subject, body);
        let response = self
            .client
            .post(format!("{}/users/me/messages/send", self.api_base))
            .bearer_auth(&token)
            .json(&json!({ "raw": URL_SAFE.encode(message.as_bytes()) }))
            .send()
            .await?;
        let body = read_success_body("gmail", response).await?;
        let sent: SendResponse = serde_json::from_str(&body)?;
        tracing::info!(recipient, id = %sent.id, "Email sent");
        Ok(sent.id)
    }

    async fn list_recent(&self, max: u32) -> Result<Vec<EmailSummary>, ServiceError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{}/users/me/messages", self.api_base))
            .bearer_auth(&token)
            .query(&[("labelIds", "INBOX".to_string()), ("maxResults", max.max(1).to_string())])
            .send()
            .await?;
        let body = read_success_body("gmail", response).await?;
        let list: MessageList = serde_json::from_str(&body)?;
        let mut summaries = Vec::with_capacity(list.messages.len());
        for message in &list.messages {
            summaries.push(self.fetch_summary(&token, &message.id).await?);
        }
        Ok(summaries)
    }
}

/// Builds an RFC 5322 plain-text message.
fn build_message(sender: Option<&str>, recipient: &str, subject: &str, body: &str) -> String {
    let mut message = format!("To: {}\r\n", recipient);
    if let Some(sender) = sender {
        message.push_str(&format!("From: {}\r\n", sender));
    }
    message.push_str(&format!("Subject: {}\r\n", encode_header(subject)));
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n\r\n");
    message.push_str(body);
    message
}

// RFC 2047 encoded-word for non-ASCII header values.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

fn parse_summary(body: &str) -> Result<EmailSummary, ServiceError> {
    let metadata: MessageMetadata = serde_json::from_str(body)?;
    let headers = metadata.payload.map(|p| p.headers).unwrap_or_default();
    let header = |name: &str| {
        headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
    };
    Ok(EmailSummary {
        sender: header("From").unwrap_or_else(|| "Unknown Sender".to_string()),
        subject: header("Subject").unwrap_or_else(|| "No Subject".to_string()),
        snippet: metadata.snippet,
    })
}
