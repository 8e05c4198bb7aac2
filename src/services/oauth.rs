/*
 * @file oauth.rs
 * @brief Google OAuth token handling
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

//! Google OAuth credentials, token cache and the loopback authorization flow.
//!
//! The assistant never asks for consent during a voice session. A token is
//! obtained once with `vocalis authorize`, cached on disk, and refreshed
//! automatically when it expires.

use std::{fs, io::ErrorKind, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::browser::Browser;
use super::read_success_body;
use crate::error::ServiceError;

/// Scope needed to send mail and read the inbox.
pub const GMAIL_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// OAuth client registered in the Google Cloud console.
#[derive(Clone, Debug, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

// Google downloads the client file wrapped in either an "installed" or a "web" key.
#[derive(Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Access token persisted between runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

impl StoredToken {
    /// Returns `true` while the access token can still be used at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now,
            None => true,
        }
    }

    // A refresh response usually omits the refresh token; keep the one we had.
    fn from_response(
        response: TokenResponse,
        previous_refresh: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_at: response
                .expires_in
                .map(|secs| now + Duration::seconds(secs)),
        }
    }
}

/// Reads the OAuth client file.
pub fn load_client_secrets(path: &Path) -> Result<ClientSecrets, ServiceError> {
    let raw = fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ServiceError::NotAuthorized(format!(
            "OAuth client file {} not found",
            path.display()
        )),
        _ => ServiceError::Io(err),
    })?;
    let file: CredentialsFile = serde_json::from_str(&raw)?;
    file.installed.or(file.web).ok_or_else(|| {
        ServiceError::UnexpectedResponse(format!(
            "{} has neither an \"installed\" nor a \"web\" client",
            path.display()
        ))
    })
}

/// Loads the cached token, returning `None` when no token has been stored yet.
pub fn load_token(path: &Path) -> Result<Option<StoredToken>, ServiceError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Writes the token cache.
pub fn save_token(path: &Path, token: &StoredToken) -> Result<(), ServiceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(token)?;
    fs::write(path, json)?;
    Ok(())
}

/// Exchanges a refresh token for a new access token.
pub async fn refresh_token(
    client: &reqwest::Client,
    secrets: &ClientSecrets,
    token: &StoredToken,
) -> Result<StoredToken, ServiceError> {
    let refresh = token
        .refresh_token
        .as_deref()
        .ok_or_else(|| ServiceError::NotAuthorized("token expired and cannot be refreshed".to_string()))?;
    let response = client
        .post(&secrets.token_uri)
        .form(&[
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("refresh_token", refresh),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;
    let body = read_success_body("oauth token", response).await?;
    let parsed: TokenResponse = serde_json::from_str(&body)?;
    Ok(StoredToken::from_response(
        parsed,
        token.refresh_token.clone(),
        Utc::now(),
    ))
}

/// Runs the installed-app loopback flow and stores the resulting token.
///
/// # Details
/// Binds an ephemeral port on 127.0.0.1, opens the consent page, waits for
/// Google to redirect back with an authorization code and exchanges it.
///
/// # Errors
/// Fails when the client file is unusable, the user denies access, or the
/// code exchange is rejected.
pub async fn authorize(
    secrets_path: &Path,
    token_path: &Path,
    browser: &dyn Browser,
) -> Result<()> {
    let secrets = load_client_secrets(secrets_path)
        .with_context(|| format!("Failed to load {}", secrets_path.display()))?;
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind loopback listener")?;
    let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());
    let consent_url = consent_url(&secrets, &redirect_uri)?;

    println!("Open this URL to authorize Gmail access:\n{}", consent_url);
    if let Err(err) = browser.open(&consent_url).await {
        tracing::warn!("Could not open browser: {}", err);
    }

    let code = wait_for_code(&listener).await?;
    let client = reqwest::Client::new();
    let response = client
        .post(&secrets.token_uri)
        .form(&[
            ("code", code.as_str()),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .context("Failed to reach token endpoint")?;
    let body = read_success_body("oauth token", response).await?;
    let parsed: TokenResponse =
        serde_json::from_str(&body).context("Failed to parse token response")?;
    let token = StoredToken::from_response(parsed, None, Utc::now());
    save_token(token_path, &token)
        .with_context(|| format!("Failed to write {}", token_path.display()))?;
    tracing::info!("Stored Gmail token in {}", token_path.display());
    Ok(())
}

fn consent_url(secrets: &ClientSecrets, redirect_uri: &str) -> Result<String> {
    let mut url = Url::parse(&secrets.auth_uri)
        .with_context(|| format!("Invalid auth_uri {}", secrets.auth_uri))?;
    url.query_pairs_mut()
        .append_pair("client_id", &secrets.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", GMAIL_SCOPE)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");
    Ok(url.into())
}

async fn wait_for_code(listener: &TcpListener) -> Result<String> {
    loop {
        let (mut stream, _) = listener.accept().await.context("Failed to accept redirect")?;
        let mut buffer = vec![0_u8; 8192];
        let read = stream.read(&mut buffer).await?;
        let request = String::from_utf8_lossy(&buffer[..read]);
        let outcome = parse_redirect(&request);
        let page = match &outcome {
            Some(Ok(_)) => "Authorization complete. You can close this window.",
            Some(Err(_)) => "Authorization failed. Check the terminal for details.",
            None => "Waiting for authorization...",
        };
        let reply = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            page.len(),
            page
        );
        stream.write_all(reply.as_bytes()).await.ok();
        match outcome {
            Some(Ok(code)) => return Ok(code),
            Some(Err(reason)) => anyhow::bail!("Authorization was not granted: {}", reason),
            // Browsers also ask for /favicon.ico; keep waiting for the real redirect.
            None => continue,
        }
    }
}

/// Extracts the authorization code (or error) from the redirect request.
///
/// Returns `None` for requests that carry neither, such as favicon fetches.
fn parse_redirect(request: &str) -> Option<Result<String, String>> {
    let target = request.lines().next()?.split_whitespace().nth(1)?;
    let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
    let mut code = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }
    match (code, error) {
        (_, Some(error)) => Some(Err(error)),
        (Some(code), None) => Some(Ok(code)),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn secrets() -> ClientSecrets {
        ClientSecrets {
            client_id: "client-123".to_string(),
            client_secret: "shh".to_string(),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
        }
    }

    #[test]
    fn installed_client_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"installed": {{"client_id": "abc", "client_secret": "def", "redirect_uris": ["http://localhost"]}}}}"#
        )
        .expect("write");
        let secrets = load_client_secrets(file.path()).expect("secrets");
        assert_eq!(secrets.client_id, "abc");
        assert_eq!(secrets.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn web_client_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"web": {{"client_id": "w", "client_secret": "s", "token_uri": "https://example.test/token"}}}}"#
        )
        .expect("write");
        let secrets = load_client_secrets(file.path()).expect("secrets");
        assert_eq!(secrets.token_uri, "https://example.test/token");
    }

    #[test]
    fn missing_client_file_means_not_authorized() {
        let err = load_client_secrets(Path::new("no/credentials.json")).expect_err("missing");
        assert!(matches!(err, ServiceError::NotAuthorized(_)));
    }

    #[test]
    fn token_cache_survives_save_and_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("token.json");
        assert_eq!(load_token(&path).expect("load"), None);
        let token = StoredToken {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).single(),
        };
        save_token(&path, &token).expect("save");
        assert_eq!(load_token(&path).expect("load"), Some(token));
    }

    #[test]
    fn freshness_honours_margin() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).single().expect("time");
        let token = |expires_at| StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at,
        };
        assert!(token(None).is_fresh(now));
        assert!(token(Some(now + Duration::seconds(600))).is_fresh(now));
        assert!(!token(Some(now + Duration::seconds(30))).is_fresh(now));
        assert!(!token(Some(now - Duration::seconds(1))).is_fresh(now));
    }

    #[test]
    fn refresh_keeps_previous_refresh_token() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).single().expect("time");
        let response = TokenResponse {
            access_token: "new".to_string(),
            expires_in: Some(3600),
            refresh_token: None,
        };
        let token = StoredToken::from_response(response, Some("old-refresh".to_string()), now);
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(token.expires_at, Some(now + Duration::seconds(3600)));
    }

    #[test]
    fn consent_url_requests_offline_gmail_access() {
        let url = consent_url(&secrets(), "http://127.0.0.1:5555").expect("url");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A5555"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fgmail.modify"));
    }

    #[test]
    fn redirect_with_code_is_parsed() {
        let request = "GET /?code=4%2FabcDEF&scope=gmail HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n";
        assert_eq!(parse_redirect(request), Some(Ok("4/abcDEF".to_string())));
    }

    #[test]
    fn redirect_with_error_is_parsed() {
        let request = "GET /?error=access_denied HTTP/1.1\r\n\r\n";
        assert_eq!(parse_redirect(request), Some(Err("access_denied".to_string())));
    }

    #[test]
    fn unrelated_request_is_ignored() {
        assert_eq!(parse_redirect("GET /favicon.ico HTTP/1.1\r\n\r\n"), None);
        assert_eq!(parse_redirect(""), None);
    }
}
