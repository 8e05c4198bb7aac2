/*
 * @file assistant.rs
 * @brief Voice assistant command loop
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

//! Voice assistant orchestration module.
//!
//! Hosts the command loop: listen for one utterance, classify it against the
//! keyword rule table, run the matching handler, speak the result, repeat
//! until the user says goodbye.

use anyhow::Result;
use chrono::{Local, Timelike};

use crate::ai::{ChatModel, OpenAiClient};
use crate::commands::{self, Intent, IntentRules};
use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::listener::Listener;
use crate::params;
use crate::services::{
    search_url, Browser, GmailClient, Mailer, NewsApiClient, NewsService, OpenWeatherClient,
    SystemBrowser, WeatherService,
};
use crate::speech::{Speaker, SystemSpeaker};

/// Spoken once when the user ends the session.
pub const FAREWELL_MESSAGE: &str =
    "It was a pleasure assisting you. Wishing you a wonderful day ahead. Farewell!";
/// Spoken for utterances no rule matches.
pub const UNKNOWN_MESSAGE: &str = "Sorry, I can't help with that.";

const CITY_PROMPT: &str = "Which city do you want the weather for?";
const CITY_MISSING: &str = "Sorry, I need a city name to get the weather.";
const NEWS_EMPTY: &str = "Sorry, I couldn't find any up-to-date world news articles right now.";
const NEWS_FAILED: &str = "Sorry, I couldn't fetch the news right now. Please try again later.";
const RECIPIENT_PROMPT: &str = "Please say the receiver's email address.";
const RECIPIENT_INVALID: &str = "Receiver email not captured or invalid. Email not sent.";
const BODY_PROMPT: &str = "Please say the message you want to send.";
const BODY_MISSING: &str = "Message body not captured. Email not sent.";
const EMAIL_SENT: &str = "Email sent.";
const EMAIL_FAILED: &str = "Sorry, I couldn't send the email. Please try again.";
const INBOX_CHECKING: &str = "Checking your inbox.";
const INBOX_EMPTY: &str = "Your inbox is empty.";
const INBOX_FAILED: &str = "Sorry, I couldn't check your inbox.";
const ASK_FAILED: &str = "Sorry, I couldn't get an answer right now.";
const SEARCH_EMPTY: &str = "Please tell me what to search for.";
const SEARCH_FAILED: &str = "Sorry, I couldn't open the browser.";

/// Maximum number of headlines read out per request.
const MAX_HEADLINES: usize = 5;

/// External systems the command loop talks to.
pub struct Collaborators {
    pub listener: Box<dyn Listener>,
    pub speaker: Box<dyn Speaker>,
    pub weather: Box<dyn WeatherService>,
    pub news: Box<dyn NewsService>,
    pub mailer: Box<dyn Mailer>,
    pub chat: Box<dyn ChatModel>,
    pub browser: Box<dyn Browser>,
}

/// Runs the voice assistant with the production service clients until the user says goodbye.
///
/// # Arguments
/// * `config` - Configuration loaded at startup.
/// * `listener` - Source of utterances (microphone or keyboard).
///
/// # Errors
/// Returns an error only if an HTTP client cannot be constructed before the loop starts.
pub async fn run_voice_assistant(config: &AppConfig, listener: Box<dyn Listener>) -> Result<()> {
    let collaborators = Collaborators {
        listener,
        speaker: Box::new(SystemSpeaker::new(config.tts_command.as_deref())),
        weather: Box::new(OpenWeatherClient::new(config)?),
        news: Box::new(NewsApiClient::new(config)?),
        mailer: Box::new(GmailClient::new(config)),
        chat: Box::new(OpenAiClient::new(config)),
        browser: Box::new(SystemBrowser),
    };
    let rules = commands::load_rules(&config.intents_path);
    VoiceAssistant::new(config, rules, collaborators).run().await;
    Ok(())
}

/// The command loop and its per-intent handlers.
///
/// # Details
/// Holds no conversation state: every iteration starts from a fresh
/// utterance. Handler failures are spoken and logged, never propagated.
pub struct VoiceAssistant<'a> {
    config: &'a AppConfig,
    rules: IntentRules,
    services: Collaborators,
}

impl<'a> VoiceAssistant<'a> {
    pub fn new(config: &'a AppConfig, rules: IntentRules, services: Collaborators) -> Self {
        Self {
            config,
            rules,
            services,
        }
    }

    /// Greets the user, then runs the command loop.
    pub async fn run(&self) {
        self.say(params::greeting(Local::now().hour())).await;
        self.run_loop().await;
    }

    /// Processes utterances until an exit phrase is heard.
    pub async fn run_loop(&self) {
        while self.process_iteration().await {}
        tracing::info!("Session ended");
    }

    /// Listens once and dispatches the utterance.
    ///
    /// # Returns
    /// `false` once the user asked to exit, `true` otherwise.
    async fn process_iteration(&self) -> bool {
        let utterance = self.services.listener.listen().await;
        if utterance.is_empty() {
            return true;
        }
        self.handle_utterance(&utterance).await
    }

    /// Classifies `utterance` and runs the matching handler.
    ///
    /// # Returns
    /// `false` for the exit intent, `true` for everything else.
    pub async fn handle_utterance(&self, utterance: &str) -> bool {
        let intent = self.rules.classify(utterance);
        tracing::debug!(?intent, utterance, "Dispatching utterance");
        match intent {
            Intent::Weather => self.handle_weather(utterance).await,
            Intent::News => self.handle_news().await,
            Intent::EmailSend => self.handle_email_send().await,
            Intent::EmailCheck => self.handle_email_check().await,
            Intent::Ask => self.handle_ask(utterance).await,
            Intent::DateTime => self.respond(&params::format_datetime(&Local::now())).await,
            Intent::Search => self.handle_search(utterance).await,
            Intent::Exit => {
                self.respond(FAREWELL_MESSAGE).await;
                return false;
            }
            Intent::Unknown => self.say(UNKNOWN_MESSAGE).await,
        }
        true
    }

    /// Reports the current weather for the city named in `utterance`.
    ///
    /// # Details
    /// Falls back to [`Self::ask_for_city`] when no city can be extracted, so
    /// the weather service is only ever called with a non-empty city.
    ///
    /// # Arguments
    /// * `utterance` - The lower-cased weather request.
    async fn handle_weather(&self, utterance: &str) {
        let city = match params::extract_city(utterance) {
            Some(city) => city,
            None => self.ask_for_city().await,
        };
        let report = self.services.weather.fetch_weather(&city).await;
        self.respond(&report).await;
    }

    /// Prompts for a city until the user names one.
    ///
    /// # Returns
    /// * `String` - The trimmed, non-empty reply.
    async fn ask_for_city(&self) -> String {
        loop {
            self.say(CITY_PROMPT).await;
            let reply = self.services.listener.listen().await;
            let city = reply.trim();
            if !city.is_empty() {
                return city.to_string();
            }
            self.say(CITY_MISSING).await;
        }
    }

    /// Reads out up to five headlines for the configured news query.
    async fn handle_news(&self) {
        let reply = match self.services.news.fetch_news(&self.config.news_query).await {
            Ok(headlines) if headlines.is_empty() => NEWS_EMPTY.to_string(),
            Ok(headlines) => headlines
                .iter()
                .take(MAX_HEADLINES)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("; "),
            Err(err) => {
                tracing::warn!("News lookup failed: {}", err);
                failure_message(&err, NEWS_FAILED)
            }
        };
        self.respond(&reply).await;
    }

    /// Collects a recipient and a body by voice, then sends the message.
    ///
    /// # Details
    /// Each prompt is asked once. An invalid address or an empty body aborts
    /// the command without contacting the mail provider.
    async fn handle_email_send(&self) {
        self.say(RECIPIENT_PROMPT).await;
        let spoken_address = self.services.listener.listen().await;
        let Some(recipient) = params::normalize_email_address(&spoken_address) else {
            tracing::info!(spoken = %spoken_address, "Rejected recipient address");
            self.say(RECIPIENT_INVALID).await;
            return;
        };

        self.say(BODY_PROMPT).await;
        let body = self.services.listener.listen().await;
        if body.trim().is_empty() {
            self.say(BODY_MISSING).await;
            return;
        }

        let result = self
            .services
            .mailer
            .send_email(&recipient, &self.config.default_subject, &body)
            .await;
        match result {
            Ok(id) => {
                println!("Email sent to {}. Message ID: {}", recipient, id);
                self.say(EMAIL_SENT).await;
            }
            Err(err) => {
                tracing::warn!("Failed to send email: {}", err);
                self.respond(&failure_message(&err, EMAIL_FAILED)).await;
            }
        }
    }

    /// Lists the newest inbox messages and speaks the latest sender and subject.
    ///
    /// # Details
    /// Every listed message is printed; only the first is spoken.
    async fn handle_email_check(&self) {
        self.say(INBOX_CHECKING).await;
        let messages = match self
            .services
            .mailer
            .list_recent(self.config.inbox_max_results)
            .await
        {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!("Failed to check inbox: {}", err);
                self.respond(&failure_message(&err, INBOX_FAILED)).await;
                return;
            }
        };
        let Some(latest) = messages.first() else {
            self.respond(INBOX_EMPTY).await;
            return;
        };
        for message in &messages {
            println!(
                "\nFrom: {}\nSubject: {}\nSnippet: {}",
                message.sender, message.subject, message.snippet
            );
        }
        self.say(&format!(
            "Your latest email is from {} with subject: {}",
            latest.sender, latest.subject
        ))
        .await;
    }

    /// Forwards the question (or joke request) to the chat model and speaks the reply.
    ///
    /// # Arguments
    /// * `utterance` - The lower-cased request, trigger words included.
    async fn handle_ask(&self, utterance: &str) {
        let prompt = params::build_ask_prompt(utterance);
        let reply = match self.services.chat.ask(&prompt).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!("Chat request failed: {}", err);
                failure_message(&err, ASK_FAILED)
            }
        };
        self.respond(&reply).await;
    }

    /// Opens a web search for the words after "search".
    ///
    /// # Arguments
    /// * `utterance` - The lower-cased search request.
    async fn handle_search(&self, utterance: &str) {
        let Some(query) = params::search_query(utterance) else {
            self.say(SEARCH_EMPTY).await;
            return;
        };
        match self.services.browser.open(&search_url(&query)).await {
            Ok(()) => {
                self.respond(&format!("Here are the search results for {}.", query))
                    .await
            }
            Err(err) => {
                tracing::warn!("Failed to open browser: {}", err);
                self.respond(SEARCH_FAILED).await;
            }
        }
    }

    /// Prints `text` and speaks it.
    async fn respond(&self, text: &str) {
        println!("{}", text);
        self.say(text).await;
    }

    /// Speaks `text`; speech failures are logged and otherwise ignored.
    async fn say(&self, text: &str) {
        if let Err(err) = self.services.speaker.speak(text).await {
            tracing::warn!("TTS error: {}", err);
        }
    }
}

/// Phrases a collaborator failure for the user.
///
/// Missing configuration is named explicitly; anything else gets `fallback`.
fn failure_message(err: &ServiceError, fallback: &str) -> String {
    match err {
        ServiceError::NotConfigured(feature) => format!("{} is not configured.", feature),
        ServiceError::NotAuthorized(_) => {
            "I'm not authorized to use your mailbox yet. Please run the authorize command."
                .to_string()
        }
        _ => fallback.to_string(),
    }
}
