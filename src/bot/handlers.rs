use crate::bot::messaging::send_reply;
use crate::bot::router::{route_text, ForecastAction, Route, FORECAST_CALLBACK_PREFIX};
use crate::bot::views::{forecast_keyboard, FORECAST_MENU_TEXT, WELCOME_TEXT};
use crate::responder::{Reply, Responder};
use crate::utils::truncate_str;
use anyhow::Result;
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{ChatAction, ParseMode},
    utils::command::BotCommands,
};
use tracing::{info, warn};

// Helper function to get user name from Message
fn get_user_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return username.clone();
        }
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// List commands
    #[command(description = "Show this help.")]
    Help,
    /// Latest predictions
    #[command(description = "Latest predictions and anomaly flags.")]
    Status,
    /// Trend over recent history
    #[command(description = "Temperature trend over recent readings.")]
    Trend,
    /// Chart of recent history
    #[command(description = "Chart of recent predictions.")]
    Chart,
    /// Ask the LLM about the latest readings
    #[command(description = "Explain the latest readings (optionally ask a question).")]
    Explain(String),
    /// Show the forecast menu
    #[command(description = "Open the forecast menu.")]
    Forecast,
}

fn unknown_command_text() -> String {
    format!("🤷 Unknown command.\n\n{}", Command::descriptions())
}

async fn run_action(
    bot: &Bot,
    chat_id: ChatId,
    action: ForecastAction,
    responder: &Responder,
) -> Result<()> {
    let reply = match action {
        ForecastAction::Status => {
            bot.send_chat_action(chat_id, ChatAction::Typing).await?;
            responder.status().await
        }
        ForecastAction::Trend => {
            bot.send_chat_action(chat_id, ChatAction::Typing).await?;
            responder.trend().await
        }
        ForecastAction::Chart => {
            bot.send_chat_action(chat_id, ChatAction::UploadPhoto).await?;
            responder.chart().await
        }
        ForecastAction::Explain => {
            bot.send_chat_action(chat_id, ChatAction::Typing).await?;
            responder.explain("").await
        }
    };
    send_reply(bot, chat_id, reply).await
}

async fn send_forecast_menu(bot: &Bot, chat_id: ChatId) -> Result<()> {
    bot.send_message(chat_id, FORECAST_MENU_TEXT)
        .reply_markup(forecast_keyboard())
        .await?;
    Ok(())
}

/// Command handler
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    responder: Arc<Responder>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("User {user_id} ({}) sent command {cmd:?}.", get_user_name(&msg));

    let chat_id = msg.chat.id;
    match cmd {
        Command::Start => {
            bot.send_message(chat_id, WELCOME_TEXT)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Command::Help => {
            bot.send_message(chat_id, Command::descriptions().to_string())
                .await?;
        }
        Command::Status => run_action(&bot, chat_id, ForecastAction::Status, &responder).await?,
        Command::Trend => run_action(&bot, chat_id, ForecastAction::Trend, &responder).await?,
        Command::Chart => run_action(&bot, chat_id, ForecastAction::Chart, &responder).await?,
        Command::Explain(question) => {
            bot.send_chat_action(chat_id, ChatAction::Typing).await?;
            let reply = responder.explain(&question).await;
            send_reply(&bot, chat_id, reply).await?;
        }
        Command::Forecast => send_forecast_menu(&bot, chat_id).await?,
    }
    Ok(())
}

/// Text message handler: keyword routes first, then free-text chat
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_text(bot: Bot, msg: Message, responder: Arc<Responder>) -> Result<()> {
    let text = msg.text().unwrap_or("").to_string();
    let user_id = get_user_id_safe(&msg);
    let chat_id = msg.chat.id;

    info!(
        "Handling message from user {user_id} ({}). Text: '{}'",
        get_user_name(&msg),
        truncate_str(&text, 100)
    );

    match route_text(&text) {
        Route::Status => run_action(&bot, chat_id, ForecastAction::Status, &responder).await,
        Route::Trend => run_action(&bot, chat_id, ForecastAction::Trend, &responder).await,
        Route::Chart => run_action(&bot, chat_id, ForecastAction::Chart, &responder).await,
        Route::Forecast => send_forecast_menu(&bot, chat_id).await,
        Route::UnknownCommand => {
            bot.send_message(chat_id, unknown_command_text()).await?;
            Ok(())
        }
        Route::Chat(text) => {
            bot.send_chat_action(chat_id, ChatAction::Typing).await?;
            let reply = responder.chat(&text).await;
            send_reply(&bot, chat_id, reply).await
        }
    }
}

/// Forecast menu button handler
///
/// # Errors
///
/// Returns an error if the callback cannot be answered or the reply sent.
pub async fn handle_forecast_callback(
    bot: Bot,
    q: CallbackQuery,
    responder: Arc<Responder>,
) -> Result<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        warn!("Forecast callback without a message from user {}", q.from.id);
        return Ok(());
    };

    let data = q.data.as_deref().unwrap_or_default();
    match ForecastAction::from_callback_data(data) {
        Some(action) => {
            info!("User {} selected {action:?} from the forecast menu.", q.from.id);
            run_action(&bot, chat_id, action, &responder).await
        }
        None => {
            warn!("Unknown forecast callback payload: {data}");
            send_reply(&bot, chat_id, Reply::Text(FORECAST_MENU_TEXT.to_string())).await
        }
    }
}

/// Whether a callback payload belongs to the forecast menu
#[must_use]
pub fn is_forecast_callback(q: &CallbackQuery) -> bool {
    q.data
        .as_deref()
        .is_some_and(|d| d.starts_with(FORECAST_CALLBACK_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/status", "tempcast_bot").ok(), Some(Command::Status));
        assert_eq!(Command::parse("/chart", "tempcast_bot").ok(), Some(Command::Chart));
        assert_eq!(
            Command::parse("/explain why so hot?", "tempcast_bot").ok(),
            Some(Command::Explain("why so hot?".to_string()))
        );
        assert_eq!(
            Command::parse("/explain", "tempcast_bot").ok(),
            Some(Command::Explain(String::new()))
        );
        assert!(Command::parse("status", "tempcast_bot").is_err());
        assert!(Command::parse("/unknown", "tempcast_bot").is_err());
    }

    #[test]
    fn test_unknown_command_reply_lists_commands() {
        let text = unknown_command_text();
        assert!(text.starts_with("🤷 Unknown command."));
        assert!(text.contains("/status"));
    }

    #[test]
    fn test_help_lists_commands() {
        let help = Command::descriptions().to_string();
        for cmd in ["/start", "/status", "/trend", "/chart", "/explain", "/forecast"] {
            assert!(help.contains(cmd), "missing {cmd} in help");
        }
    }
}
