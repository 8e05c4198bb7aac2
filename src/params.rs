/*
 * @file params.rs
 * @brief Utterance parameter extraction
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

//! Parameter extraction from free-text utterances.

use std::fmt::Display;
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone};
use regex::Regex;

/// Prompt sent to the chat model when the user only asked for a joke.
pub const JOKE_PROMPT: &str = "Tell me a joke.";

static CITY_AFTER_WEATHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"weather(?: in)? ([a-zA-Z\s]+)").expect("weather city pattern is valid")
});

static CITY_AFTER_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"in ([a-zA-Z\s]+)").expect("city pattern is valid"));

// A request for a joke, optionally followed by a topic.
static JOKE_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:please )?(?:(?:tell|give) me |say |i want |i'd like )?(?:a |an |another |some )?(?:funny |good )?jokes?(?: (.*))?$",
    )
    .expect("joke request pattern is valid")
});

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("email pattern is valid"));

/// Extracts the city named in a weather request.
///
/// # Details
/// Tries `weather [in] <city>` first and then any `in <city>` phrase. The
/// captured group is trimmed; a blank capture counts as no city.
///
/// # Returns
/// * `Some(String)` - The city as spoken.
/// * `None` - The utterance does not name a city.
pub fn extract_city(utterance: &str) -> Option<String> {
    [&*CITY_AFTER_WEATHER, &*CITY_AFTER_IN]
        .into_iter()
        .find_map(|pattern| {
            pattern
                .captures(utterance)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|city| !city.is_empty())
        })
}

/// Turns a spoken address such as `"john at example dot com"` into `john@example.com`.
///
/// # Returns
/// * `Some(String)` - The normalized address when it has a `local@domain.tld` shape.
/// * `None` - The transcription does not look like an email address.
pub fn normalize_email_address(spoken: &str) -> Option<String> {
    let address = spoken
        .to_lowercase()
        .replace(" at ", "@")
        .replace(" dot ", ".")
        .replace(" underscore ", "_")
        .replace(' ', "");
    EMAIL_SHAPE.is_match(&address).then_some(address)
}

/// Builds the chat-model prompt for an "ask" utterance.
///
/// # Details
/// The `gpt` trigger word is removed. When what remains is a plain joke
/// request ("tell me a joke", "some jokes about cats") the canned
/// [`JOKE_PROMPT`] is used, with any trailing words kept as the topic. Any
/// other utterance that merely mentions a joke is passed through unchanged.
pub fn build_ask_prompt(utterance: &str) -> String {
    let text = collapse_whitespace(&utterance.replace("gpt", " "));
    let request = text.trim_end_matches(|c: char| c.is_ascii_punctuation());
    if let Some(caps) = JOKE_REQUEST.captures(request) {
        let topic = caps
            .get(1)
            .map(|m| m.as_str().trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation()))
            .unwrap_or_default();
        return if topic.is_empty() {
            JOKE_PROMPT.to_string()
        } else {
            format!("Tell me a joke {}.", topic)
        };
    }
    if text.is_empty() {
        JOKE_PROMPT.to_string()
    } else {
        text
    }
}

/// Extracts the query from a search utterance.
///
/// Returns `None` when nothing but the trigger word was said.
pub fn search_query(utterance: &str) -> Option<String> {
    let without_trigger = collapse_whitespace(&utterance.replace("search", " "));
    let query = without_trigger
        .strip_prefix("for")
        .filter(|rest| rest.is_empty() || rest.starts_with(' '))
        .unwrap_or(&without_trigger)
        .trim();
    (!query.is_empty()).then(|| query.to_string())
}

/// Formats a timestamp as e.g. `Current date and time is Monday, 19 October 2026, 09:05 AM`.
pub fn format_datetime<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "Current date and time is {}",
        now.format("%A, %d %B %Y, %I:%M %p")
    )
}

/// Time-of-day greeting spoken when the assistant starts.
pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good morning! How can I assist you today?",
        12..=17 => "Good afternoon! How can I assist you today?",
        _ => "Good evening! How can I assist you today?",
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Local, Utc};

    #[test]
    fn city_follows_weather_in() {
        assert_eq!(
            extract_city("what's the weather in new york"),
            Some("new york".to_string())
        );
    }

    #[test]
    fn city_follows_weather_directly() {
        assert_eq!(extract_city("weather london"), Some("london".to_string()));
    }

    #[test]
    fn city_found_by_looser_pattern() {
        assert_eq!(
            extract_city("what's the weather, in tokyo"),
            Some("tokyo".to_string())
        );
    }

    #[test]
    fn city_is_trimmed() {
        assert_eq!(extract_city("weather in  paris  "), Some("paris".to_string()));
    }

    #[test]
    fn no_city_when_absent() {
        assert_eq!(extract_city("what's the weather"), None);
        assert_eq!(extract_city("weather?"), None);
    }

    #[test]
    fn spoken_email_is_normalized() {
        assert_eq!(
            normalize_email_address("john at example dot com"),
            Some("john@example.com".to_string())
        );
        assert_eq!(
            normalize_email_address("Jane underscore doe at mail dot example dot org"),
            Some("jane_doe@mail.example.org".to_string())
        );
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        assert_eq!(normalize_email_address("john example dot com"), None);
        assert_eq!(normalize_email_address("john at example"), None);
        assert_eq!(normalize_email_address(""), None);
        assert_eq!(normalize_email_address("a at b at c dot com"), None);
    }

    #[test]
    fn joke_request_uses_canned_prompt() {
        assert_eq!(build_ask_prompt("tell me a joke"), JOKE_PROMPT);
        assert_eq!(build_ask_prompt("joke"), JOKE_PROMPT);
        assert_eq!(build_ask_prompt("gpt tell me a joke please"), "Tell me a joke please.");
    }

    #[test]
    fn joke_topic_is_kept() {
        assert_eq!(
            build_ask_prompt("tell me some jokes about cats"),
            "Tell me a joke about cats."
        );
    }

    #[test]
    fn question_about_a_joke_is_kept_verbatim() {
        assert_eq!(
            build_ask_prompt("gpt why is this joke funny"),
            "why is this joke funny"
        );
        assert_eq!(
            build_ask_prompt("gpt explain the joke about chickens crossing the road"),
            "explain the joke about chickens crossing the road"
        );
    }

    #[test]
    fn joke_request_tolerates_trailing_punctuation() {
        assert_eq!(build_ask_prompt("tell me a joke!"), JOKE_PROMPT);
        assert_eq!(build_ask_prompt("give me a funny joke about dogs."), "Tell me a joke about dogs.");
    }

    #[test]
    fn gpt_trigger_is_stripped() {
        assert_eq!(build_ask_prompt("gpt what is rust"), "what is rust");
        assert_eq!(build_ask_prompt("gpt"), JOKE_PROMPT);
    }

    #[test]
    fn search_query_strips_trigger() {
        assert_eq!(search_query("search rust traits"), Some("rust traits".to_string()));
        assert_eq!(search_query("search for cheap flights"), Some("cheap flights".to_string()));
        assert_eq!(search_query("search forests"), Some("forests".to_string()));
        assert_eq!(search_query("search"), None);
        assert_eq!(search_query("search for"), None);
    }

    #[test]
    fn datetime_uses_full_weekday_and_twelve_hour_clock() {
        let offset = FixedOffset::east_opt(0).expect("offset");
        let moment = offset
            .with_ymd_and_hms(2026, 10, 19, 21, 5, 0)
            .single()
            .expect("valid time");
        assert_eq!(
            format_datetime(&moment),
            "Current date and time is Monday, 19 October 2026, 09:05 PM"
        );
    }

    #[test]
    fn datetime_formats_any_timezone() {
        let pattern = Regex::new(
            r"^Current date and time is [A-Z][a-z]+day, \d{2} [A-Z][a-z]+ \d{4}, \d{2}:\d{2} (AM|PM)$",
        )
        .expect("pattern");
        assert!(pattern.is_match(&format_datetime(&Local::now())));
        assert!(pattern.is_match(&format_datetime(&Utc::now())));
    }

    #[test]
    fn greeting_depends_on_hour() {
        assert!(greeting(7).starts_with("Good morning"));
        assert!(greeting(12).starts_with("Good afternoon"));
        assert!(greeting(17).starts_with("Good afternoon"));
        assert!(greeting(18).starts_with("Good evening"));
    }
}
