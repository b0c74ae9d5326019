use crate::bot::handlers::{self, Command};
use crate::config::Settings;
use crate::feeds::{FeedError, ThingSpeakClient};
use crate::llm::OpenAiProvider;
use crate::responder::Responder;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

/// Build the responder and its collaborators from settings.
///
/// # Errors
///
/// Returns a `FeedError` if the ThingSpeak client cannot be created.
pub fn build_responder(settings: Arc<Settings>) -> Result<Responder, FeedError> {
    let source = ThingSpeakClient::new(&settings.thingspeak_base_url, settings.http_timeout())?;
    info!(
        "ThingSpeak client initialized ({}).",
        settings.thingspeak_base_url
    );

    if settings.openai_api_key.is_none() {
        error!("OPENAI_API_KEY is not set; LLM replies will fail.");
    }
    let llm = OpenAiProvider::new(
        settings.openai_api_key.clone(),
        settings.openai_api_base.clone(),
        settings.llm_max_tokens,
        settings.http_timeout(),
    );
    info!("LLM client initialized (model: {}).", settings.openai_model);

    Ok(Responder::new(Arc::new(source), Arc::new(llm), settings))
}

/// Run the Telegram bot until Ctrl-C.
pub async fn run_bot(settings: Arc<Settings>, responder: Arc<Responder>) {
    let bot = Bot::new(settings.telegram_token.clone());

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        error!("Failed to register bot commands: {e}");
    }

    let handler = setup_handler();

    info!("🤖 Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![responder])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .filter(|q: CallbackQuery| handlers::is_forecast_callback(&q))
                .endpoint(handle_forecast_callback),
        )
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some())
                        .endpoint(handle_text),
                ),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    responder: Arc<Responder>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_command(bot, msg, cmd, responder).await {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    responder: Arc<Responder>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_text(bot, msg, responder).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_forecast_callback(
    bot: Bot,
    q: CallbackQuery,
    responder: Arc<Responder>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_forecast_callback(bot, q, responder).await {
        error!("Forecast callback error: {}", e);
    }
    respond(())
}
