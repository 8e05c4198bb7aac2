/*
 * @file commands.rs
 * @brief Intent keyword rules
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

//! Intent rule table and keyword matching.
//!
//! Utterances are classified by walking an ordered list of keyword rules; the
//! first rule with a keyword appearing in the utterance as a whole word (or
//! its plural) wins.

use std::{fs, io::ErrorKind, path::Path};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

/// Purpose of a single utterance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Weather,
    News,
    EmailSend,
    EmailCheck,
    Ask,
    DateTime,
    Search,
    Exit,
    Unknown,
}

/// Keywords that trigger one intent.
#[derive(Clone, Debug, Deserialize)]
pub struct IntentRule {
    /// Intent selected when any keyword matches.
    pub intent: Intent,
    /// Lower-case words or phrases searched for in the utterance.
    pub keywords: Vec<String>,
    #[serde(skip)]
    matcher: Option<Regex>,
}

impl IntentRule {
    pub fn new(intent: Intent, keywords: Vec<String>) -> Self {
        let matcher = keyword_matcher(&keywords);
        Self {
            intent,
            keywords,
            matcher,
        }
    }

    /// Returns `true` when any keyword occurs in `text` on word boundaries.
    pub fn matches(&self, text: &str) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.is_match(text),
            None => keyword_matcher(&self.keywords).is_some_and(|m| m.is_match(text)),
        }
    }
}

// One alternation per rule; a trailing "s" still counts so "emails" and "jokes" match.
fn keyword_matcher(keywords: &[String]) -> Option<Regex> {
    if keywords.is_empty() {
        return None;
    }
    let alternation = keywords
        .iter()
        .map(|keyword| regex::escape(keyword))
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&format!(r"\b(?:{})s?\b", alternation)) {
        Ok(matcher) => Some(matcher),
        Err(err) => {
            tracing::warn!("Unusable intent keywords {:?}: {}", keywords, err);
            None
        }
    }
}

/// Ordered rule table; earlier rules take precedence.
///
/// # Details
/// Loaded from `intents.json` when present so phrases can be tuned without
/// rebuilding. Ordering is significant because several intents share words
/// (for example `"check email"` must be seen before the bare `"email"`).
#[derive(Clone, Debug, Deserialize)]
pub struct IntentRules {
    pub rules: Vec<IntentRule>,
}

impl Default for IntentRules {
    fn default() -> Self {
        default_rules()
    }
}

impl IntentRules {
    /// Finds the first rule whose keywords occur in `text`.
    ///
    /// # Arguments
    /// * `text` - The utterance in lowercase.
    ///
    /// # Returns
    /// * `Some(&IntentRule)` - The highest-priority matching rule.
    /// * `None` - No rule matched.
    pub fn find_rule(&self, text: &str) -> Option<&IntentRule> {
        self.rules.iter().find(|rule| rule.matches(text))
    }

    /// Classifies `text`, returning [`Intent::Unknown`] when nothing matches.
    pub fn classify(&self, text: &str) -> Intent {
        self.find_rule(text)
            .map(|rule| rule.intent)
            .unwrap_or(Intent::Unknown)
    }

    // Keywords are compared against lower-cased utterances, so store them the same way.
    fn normalized(self) -> Self {
        let rules = self
            .rules
            .into_iter()
            .map(|rule| {
                IntentRule::new(
                    rule.intent,
                    rule.keywords
                        .into_iter()
                        .map(|keyword| keyword.trim().to_lowercase())
                        .filter(|keyword| !keyword.is_empty())
                        .collect(),
                )
            })
            .filter(|rule| !rule.keywords.is_empty())
            .collect();
        Self { rules }
    }
}

/// Loads the rule table from `path`, falling back to [`default_rules`].
pub fn load_rules(path: &Path) -> IntentRules {
    match load_rules_from_file(path) {
        Ok(Some(rules)) if !rules.rules.is_empty() => rules,
        Ok(Some(_)) => {
            tracing::warn!("{} has no usable rules, using defaults", path.display());
            default_rules()
        }
        Ok(None) => default_rules(),
        Err(err) => {
            tracing::warn!("Failed to load {}: {:#}. Using default intents.", path.display(), err);
            default_rules()
        }
    }
}

fn load_rules_from_file(path: &Path) -> Result<Option<IntentRules>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {}", path.display()))
        }
    };
    let rules: IntentRules = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(rules.normalized()))
}

/// Built-in rule table used when no `intents.json` is available.
pub fn default_rules() -> IntentRules {
    let rule = |intent: Intent, keywords: &[&str]| {
        IntentRule::new(intent, keywords.iter().map(|k| k.to_string()).collect())
    };
    IntentRules {
        rules: vec![
            rule(Intent::Weather, &["weather"]),
            rule(Intent::News, &["news"]),
            rule(
                Intent::EmailCheck,
                &["check inbox", "check email", "check my email", "read email", "inbox"],
            ),
            rule(Intent::EmailSend, &["email"]),
            rule(Intent::Ask, &["gpt", "joke"]),
            rule(Intent::Search, &["search"]),
            rule(
                Intent::Exit,
                &[
                    "exit",
                    "quit",
                    "goodbye",
                    "farewell",
                    "take care",
                    "until next time",
                    "it was a pleasure",
                ],
            ),
            rule(Intent::DateTime, &["date", "time"]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn classifies_each_intent() {
        let rules = default_rules();
        let cases = [
            ("what's the weather in paris", Intent::Weather),
            ("read me the news", Intent::News),
            ("send an email", Intent::EmailSend),
            ("check my email", Intent::EmailCheck),
            ("anything in my inbox", Intent::EmailCheck),
            ("gpt what is rust", Intent::Ask),
            ("tell me a joke", Intent::Ask),
            ("what time is it", Intent::DateTime),
            ("what's the date today", Intent::DateTime),
            ("search rust tutorials", Intent::Search),
            ("exit", Intent::Exit),
            ("goodbye for now", Intent::Exit),
            ("flibbertigibbet", Intent::Unknown),
        ];
        for (text, expected) in cases {
            assert_eq!(rules.classify(text), expected, "utterance: {text}");
        }
    }

    #[test]
    fn earlier_rules_win() {
        let rules = default_rules();
        assert_eq!(rules.classify("email me the weather"), Intent::Weather);
        assert_eq!(rules.classify("check email"), Intent::EmailCheck);
        assert_eq!(rules.classify("search for a joke"), Intent::Ask);
    }

    #[test]
    fn farewell_phrase_beats_time_keyword() {
        let rules = default_rules();
        assert_eq!(rules.classify("until next time"), Intent::Exit);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        let rules = default_rules();
        assert_eq!(rules.classify("i am quite sure what time is it"), Intent::DateTime);
        assert_eq!(rules.classify("that is quite enough"), Intent::Unknown);
        assert_eq!(rules.classify("please update me"), Intent::Unknown);
        assert_eq!(rules.classify("tell me some jokes"), Intent::Ask);
        assert_eq!(rules.classify("any new emails"), Intent::EmailSend);
    }

    #[test]
    fn empty_text_is_unknown() {
        assert_eq!(default_rules().classify(""), Intent::Unknown);
    }

    #[test]
    fn custom_rules_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"rules": [
                {{"intent": "exit", "keywords": ["Stop Listening"]}},
                {{"intent": "date_time", "keywords": ["clock", "  "]}},
                {{"intent": "news", "keywords": []}}
            ]}}"#
        )
        .expect("write rules");
        let rules = load_rules(file.path());
        assert_eq!(rules.rules.len(), 2);
        assert_eq!(rules.classify("please stop listening"), Intent::Exit);
        assert_eq!(rules.classify("what does the clock say"), Intent::DateTime);
        assert_eq!(rules.classify("news"), Intent::Unknown);
    }

    #[test]
    fn invalid_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{ not json").expect("write rules");
        let rules = load_rules(file.path());
        assert_eq!(rules.rules.len(), default_rules().rules.len());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let rules = load_rules(Path::new("no/such/intents.json"));
        assert_eq!(rules.classify("weather"), Intent::Weather);
    }
}
