/*
 * @file error.rs
 * @brief Service and speech error types
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

//! Error types shared by the collaborator clients.

use thiserror::Error;

/// Failure raised by an external service client (HTTP API, Gmail, browser).
///
/// # Details
/// The command loop never propagates these; each handler turns them into a
/// spoken apology and the loop keeps running.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required API key or account setting is missing from the configuration.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    /// No usable authorization token is available.
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    /// The request could not be sent or the response body could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("{service} returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },
    /// The service answered successfully but the payload was not usable.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure raised by the text-to-speech backend.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("cannot speak empty text")]
    EmptyText,
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_configured_names_the_feature() {
        let err = ServiceError::NotConfigured("News API key");
        assert_eq!(err.to_string(), "News API key is not configured");
    }

    #[test]
    fn api_error_includes_status_and_body() {
        let err = ServiceError::Api {
            service: "gmail",
            status: 401,
            body: "invalid credentials".to_string(),
        };
        assert_eq!(err.to_string(), "gmail returned 401: invalid credentials");
    }
}
