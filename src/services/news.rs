/*
 * @file news.rs
 * @brief NewsAPI client
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

//! Headline lookup through NewsAPI.

use async_trait::async_trait;
use serde::Deserialize;

use super::read_success_body;
use crate::config::AppConfig;
use crate::error::ServiceError;

const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";

/// Fetches recent headlines.
#[async_trait]
pub trait NewsService: Send + Sync {
    /// Returns headline titles, newest first.
    async fn fetch_news(&self, query: &str) -> Result<Vec<String>, ServiceError>;
}

/// NewsAPI `everything` endpoint client.
pub struct NewsApiClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct NewsPayload {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Deserialize)]
struct Article {
    title: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

impl NewsApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(super::USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            api_key: config.newsapi_key.clone(),
        })
    }
}

#[async_trait]
impl NewsService for NewsApiClient {
    async fn fetch_news(&self, query: &str) -> Result<Vec<String>, ServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ServiceError::NotConfigured("News API key"))?;
        let response = self
            .client
            .get(NEWSAPI_URL)
            .query(&[
                ("q", query),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("apiKey", api_key),
            ])
            .send()
            .await?;
        let body = read_success_body("news", response).await?;
        parse_headlines(&body)
    }
}

/// Keeps titles of articles that carry both a title and a publication date.
fn parse_headlines(body: &str) -> Result<Vec<String>, ServiceError> {
    let payload: NewsPayload = serde_json::from_str(body)?;
    Ok(payload
        .articles
        .into_iter()
        .filter(|article| article.published_at.is_some())
        .filter_map(|article| article.title)
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .collect())
}
