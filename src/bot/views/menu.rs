//! Welcome text and the forecast menu

use crate::bot::router::ForecastAction;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Greeting sent on `/start`
pub const WELCOME_TEXT: &str = "👋 <b>Welcome to TempCast Bot!</b>\n\n\
     Type <code>status</code>, <code>trend</code> or <code>chart</code>, \
     open the /forecast menu, or ask me anything 🤖";

/// Prompt shown above the forecast keyboard
pub const FORECAST_MENU_TEXT: &str = "🔮 What would you like to see?";

const fn button_label(action: ForecastAction) -> &'static str {
    match action {
        ForecastAction::Status => "🌡️ Status",
        ForecastAction::Trend => "📊 Trend",
        ForecastAction::Chart => "📈 Chart",
        ForecastAction::Explain => "🤖 Explain",
    }
}

/// Inline keyboard with one button per forecast action, two per row
#[must_use]
pub fn forecast_keyboard() -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = ForecastAction::ALL
        .chunks(2)
        .map(|row| {
            row.iter()
                .map(|&action| {
                    InlineKeyboardButton::callback(button_label(action), action.callback_data())
                })
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}
