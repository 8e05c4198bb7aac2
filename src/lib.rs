/*
 * @file lib.rs
 * @brief Vocalis library root
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

//! Vocalis - a keyword-driven voice assistant.
//!
//! The library provides a hands-free command loop that:
//! - records the microphone and transcribes speech through an OpenAI-compatible API
//! - matches each utterance against an ordered keyword rule table
//! - answers weather, news, email, web search, date/time and free-form questions
//! - speaks every reply through the platform text-to-speech program
//!
//! # Example
//! ```no_run
//! use anyhow::Result;
//! use vocalis::{assistant, config::AppConfig, listener};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     dotenv::dotenv().ok();
//!     let config = AppConfig::load("config.json".as_ref());
//!     let listener = listener::default_listener(&config, false);
//!     assistant::run_voice_assistant(&config, listener).await
//! }
//! ```

pub mod ai;
pub mod assistant;
pub mod audio;
pub mod commands;
pub mod config;
pub mod error;
pub mod listener;
pub mod params;
pub mod services;
pub mod speech;
