/// Command and message handlers
pub mod handlers;
/// Sending replies through Telegram
pub mod messaging;
/// Keyword routing for plain text
pub mod router;
/// Dispatcher setup and entrypoint
pub mod runner;
/// View layer for UI components (keyboards, texts)
pub mod views;
