/*
 * @file browser.rs
 * @brief Browser launcher
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

//! Opening web pages in the user's browser.

use std::process::Stdio;

use async_trait::async_trait;
use reqwest::Url;
use tokio::process::Command;

use crate::error::ServiceError;

const SEARCH_BASE_URL: &str = "https://www.google.com/search";

/// Opens a URL; returns once the browser has been launched, not when the page loads.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self, url: &str) -> Result<(), ServiceError>;
}

/// Launches the platform URL opener (`open`, `explorer` or `xdg-open`).
#[derive(Default)]
pub struct SystemBrowser;

#[cfg(target_os = "macos")]
const OPENER: &str = "open";

#[cfg(target_os = "windows")]
const OPENER: &str = "explorer";

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENER: &str = "xdg-open";

#[async_trait]
impl Browser for SystemBrowser {
    async fn open(&self, url: &str) -> Result<(), ServiceError> {
        Command::new(OPENER)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        tracing::debug!(url, "Browser launched");
        Ok(())
    }
}

/// Builds a web-search URL for `query` with proper percent-encoding.
pub fn search_url(query: &str) -> String {
    let mut url = Url::parse(SEARCH_BASE_URL).expect("search base URL is valid");
    url.query_pairs_mut().append_pair("q", query);
    url.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_query() {
        assert_eq!(
            search_url("rust & tokio"),
            "https://www.google.com/search?q=rust+%26+tokio"
        );
    }

    #[test]
    fn search_url_keeps_plain_words() {
        assert_eq!(
            search_url("weather"),
            "https://www.google.com/search?q=weather"
        );
    }
}
