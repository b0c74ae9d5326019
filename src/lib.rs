#![deny(missing_docs)]
//! TempCast bot library.
//!
//! Relays ThingSpeak temperature predictions to Telegram users, with charts
//! and optional LLM commentary.

/// Telegram transport: routing, handlers, dispatcher.
pub mod bot;
/// Configuration management.
pub mod config;
/// ThingSpeak feed fetching.
pub mod feeds;
/// LLM provider and context building.
pub mod llm;
/// Status, trend and chart formatting.
pub mod report;
/// Fetch-format-reply workflows.
pub mod responder;
/// Utility functions.
pub mod utils;
