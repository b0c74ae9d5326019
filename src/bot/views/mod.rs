//! View layer for bot UI components
//!
//! Contains keyboards and fixed texts for the Telegram UI.

/// Welcome text and forecast menu
pub mod menu;

pub use menu::*;
