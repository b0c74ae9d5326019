//! Sending [`Reply`] values through Telegram.

use crate::responder::Reply;
use crate::utils;
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, ParseMode};

/// Maximum message length for Telegram with safety margin.
/// Telegram's official limit is 4096.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Telegram's caption limit for photos
pub const TELEGRAM_CAPTION_LIMIT: usize = 1024;

/// Send a reply to a chat.
///
/// Plain text is split into several messages when it exceeds
/// [`TELEGRAM_MESSAGE_LIMIT`]. Photos are uploaded from memory.
///
/// # Errors
///
/// Returns an error if any Telegram request fails.
pub async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> Result<()> {
    match reply {
        Reply::Text(text) => {
            for part in utils::split_long_message(&text, TELEGRAM_MESSAGE_LIMIT) {
                bot.send_message(chat_id, part).await?;
            }
        }
        Reply::Html(html) => {
            bot.send_message(chat_id, html)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Reply::Photo { png, caption } => {
            bot.send_photo(chat_id, InputFile::memory(png).file_name("chart.png"))
                .caption(utils::truncate_str(caption, TELEGRAM_CAPTION_LIMIT))
                .await?;
        }
    }
    Ok(())
}
