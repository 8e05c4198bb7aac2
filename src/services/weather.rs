/*
 * @file weather.rs
 * @brief OpenWeatherMap client
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

//! Current-weather lookup through OpenWeatherMap.

use async_trait::async_trait;
use serde::Deserialize;

use super::read_success_body;
use crate::config::AppConfig;
use crate::error::ServiceError;

const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Describes the current weather for a city.
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Returns a sentence ready to be spoken; failures are already phrased for the user.
    async fn fetch_weather(&self, city: &str) -> String;
}

/// OpenWeatherMap client using metric units.
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct WeatherPayload {
    name: Option<String>,
    #[serde(default)]
    weather: Vec<Condition>,
    main: Readings,
    sys: Option<CountryInfo>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct CountryInfo {
    country: Option<String>,
}

impl OpenWeatherClient {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(super::USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            api_key: config.openweather_api_key.clone(),
            endpoint: OPENWEATHER_URL.to_string(),
        })
    }

    async fn fetch_report(&self, api_key: &str, city: &str) -> Result<String, ServiceError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await?;
        let body = read_success_body("weather", response).await?;
        describe_weather(&body, city)
    }
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn fetch_weather(&self, city: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return "Weather API key not set.".to_string();
        };
        match self.fetch_report(api_key, city).await {
            Ok(description) => description,
            Err(err) => {
                tracing::warn!(city, "Weather lookup failed: {}", err);
                format!(
                    "Sorry, I couldn't fetch the weather for '{}'. Please check the city name and try again.",
                    city
                )
            }
        }
    }
}

/// Turns an OpenWeatherMap response into a spoken sentence.
fn describe_weather(body: &str, requested_city: &str) -> Result<String, ServiceError> {
    let payload: WeatherPayload = serde_json::from_str(body)?;
    let condition = payload
        .weather
        .first()
        .map(|c| c.description.as_str())
        .ok_or_else(|| ServiceError::UnexpectedResponse("weather conditions missing".to_string()))?;
    let city = payload
        .name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| requested_city.to_string());
    let place = match payload.sys.and_then(|sys| sys.country) {
        Some(country) if !country.is_empty() => format!("{}, {}", city, country),
        _ => city,
    };
    Ok(format!(
        "Current weather in {}: {}, {}°C.",
        place, condition, payload.main.temp
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: &str = r#"{
        "weather": [{"id": 500, "main": "Rain", "description": "light rain"}],
        "main": {"temp": 11.5, "humidity": 81},
        "sys": {"country": "GB"},
        "name": "London"
    }"#;

    #[test]
    fn describes_successful_lookup() {
        assert_eq!(
            describe_weather(LONDON, "london").expect("description"),
            "Current weather in London, GB: light rain, 11.5°C."
        );
    }

    #[test]
    fn falls_back_to_requested_city_name() {
        let body = r#"{"weather":[{"description":"clear sky"}],"main":{"temp":20.0}}"#;
        assert_eq!(
            describe_weather(body, "springfield").expect("description"),
            "Current weather in springfield: clear sky, 20°C."
        );
    }

    #[test]
    fn missing_conditions_is_an_error() {
        let body = r#"{"weather":[],"main":{"temp":3.0},"name":"Oslo"}"#;
        assert!(describe_weather(body, "oslo").is_err());
    }

    #[tokio::test]
    async fn missing_key_yields_fixed_message() {
        let client = OpenWeatherClient::new(&AppConfig::default()).expect("client");
        assert_eq!(client.fetch_weather("paris").await, "Weather API key not set.");
    }

    #[tokio::test]
    async fn unreachable_service_yields_apology() {
        let mut client = OpenWeatherClient::new(&AppConfig {
            openweather_api_key: Some("key".to_string()),
            ..AppConfig::default()
        })
        .expect("client");
        client.endpoint = "http://127.0.0.1:9/weather".to_string();
        let reply = client.fetch_weather("paris").await;
        assert!(reply.starts_with("Sorry, I couldn't fetch the weather for 'paris'"));
    }
}
