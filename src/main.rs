use anyhow::{Context, Result};
use flight_notify_bot::handler::*;
use flight_notify_bot::schedule::Poller;
use flight_notify_bot::sink::TelegramNotifier;
use flight_notify_bot::upstream::{
    FlightSource, Fr24Client, OpenSkyClient, FR24_BASE_URL, OPENSKY_BASE_URL,
};
use flight_notify_bot::{BotRuntime, Config, Provider};
use std::sync::Arc;
use teloxide::dispatching::update_listeners;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "flight_notify_bot=info".into()),
        )
        .init();
    info!("Bot initializing...");

    let config = Config::from_env().context("invalid configuration")?;

    let source: Arc<dyn FlightSource> = match config.provider {
        Provider::Flightradar24 => Arc::new(Fr24Client::new(
            config.fr24_token.clone().context("FR24_TOKEN is not set")?,
            FR24_BASE_URL,
            config.fetch_timeout,
            config.lookback,
        )?),
        Provider::OpenSky => Arc::new(OpenSkyClient::new(
            OPENSKY_BASE_URL,
            config.fetch_timeout,
            config.opensky_credentials.clone(),
        )?),
    };

    let bot = Bot::new(&config.bot_token).auto_send();

    let username = bot.get_me().await?.username().to_string();
    info!("Bot {} start running", username);
    prepare_bot(&bot).await;

    // setup bot runtime
    let runtime = BotRuntime::new(username, config.entities.clone());

    let notifier = Arc::new(TelegramNotifier::new(bot.clone(), ChatId(config.chat_id)));
    let poller = Poller::new(
        &runtime,
        source,
        notifier,
        config.poll_interval,
        config.fetch_timeout,
    );
    let poll_task = poller.spawn(runtime.subscribe_shut_sig());

    // setup handler
    let dproot = dptree::entry().branch(Update::filter_message().endpoint(message_handler));
    let listener = update_listeners::polling_default(bot.clone()).await;
    Dispatcher::builder(bot.clone(), dproot)
        .dependencies(dptree::deps![runtime.clone()])
        .build()
        .setup_ctrlc_handler()
        .dispatch_with_listener(listener, Arc::new(ConflictFilter))
        .await;

    runtime.shutdown();
    poll_task.await?;
    info!("Bot stopped");

    Ok(())
}
