use crate::format;
use crate::BotRuntime;
use anyhow::Result;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use teloxide::error_handlers::ErrorHandler;
use teloxide::payloads::{DeleteWebhookSetters, SendMessageSetters};
use teloxide::types::ParseMode;
use teloxide::{prelude::*, utils::command::BotCommands, ApiError, RequestError};

#[derive(BotCommands, Clone, Debug)]
#[command(rename = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "Display this text")]
    Help,
    #[command(description = "Start")]
    Start,
    #[command(description = "Show the last flight data sent for each aircraft")]
    Status,
}

pub async fn message_handler(msg: Message, bot: AutoSend<Bot>, rt: BotRuntime) -> Result<()> {
    if let Some(text) = msg.text() {
        command_handler(&msg, text, bot, &rt).await?;
    }

    Ok(())
}

async fn command_handler(msg: &Message, text: &str, bot: AutoSend<Bot>, rt: &BotRuntime) -> Result<()> {
    // plain chatter is not for us
    let command = match Command::parse(text, rt.username()) {
        Ok(command) => command,
        Err(_) => return Ok(()),
    };

    tracing::info!("Chat {} using command: {:?}", msg.chat.id.0, command);
    match command {
        Command::Help | Command::Start => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Status => {
            bot.send_message(msg.chat.id, status_reply(rt))
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }

    Ok(())
}

/// Render what the poll loop has sent so far. Never triggers a fetch.
pub fn status_reply(rt: &BotRuntime) -> String {
    format::status(rt.entities(), &rt.store.snapshot())
}

/// Publish the command list and forget updates queued while the bot was
/// down. Neither is fatal.
pub async fn prepare_bot(bot: &AutoSend<Bot>) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!("fail to register commands: {}", e);
    }
    if let Err(e) = bot.delete_webhook().drop_pending_updates(true).await {
        tracing::warn!("fail to drop pending updates: {}", e);
    }
}

/// Telegram's 409 Conflict: another process polling the same bot token, or
/// a webhook still set on it.
pub fn is_conflict(error: &RequestError) -> bool {
    matches!(
        error,
        RequestError::Api(ApiError::TerminatedByOtherGetUpdates | ApiError::CantGetUpdates)
    )
}

/// Update listener error handler that keeps running through getUpdates
/// conflicts.
pub struct ConflictFilter;

impl ErrorHandler<RequestError> for ConflictFilter {
    fn handle_error(self: Arc<Self>, error: RequestError) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            if is_conflict(&error) {
                tracing::warn!("Ignored conflict: {}", error);
            } else {
                tracing::error!("Update listener error: {}", error);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FlightSummary, Record};

    #[test]
    fn parses_status_command() {
        assert!(matches!(
            Command::parse("/status", "flight_bot"),
            Ok(Command::Status)
        ));
        assert!(matches!(
            Command::parse("/status@flight_bot", "flight_bot"),
            Ok(Command::Status)
        ));
        assert!(Command::parse("status please", "flight_bot").is_err());
    }

    #[test]
    fn status_reply_reads_store() {
        let rt = BotRuntime::new("flight_bot".into(), vec!["ZS-CJI".parse().unwrap()]);
        assert_eq!(status_reply(&rt), "⚠️ No flight data fetched yet.");

        rt.store.set(
            "ZS-CJI".parse().unwrap(),
            Record::Summary(FlightSummary {
                datetime_takeoff: Some("T1".into()),
                ..Default::default()
            }),
        );
        assert!(status_reply(&rt).contains("Take-off: T1"));
    }

    #[test]
    fn conflicts_are_recognized() {
        assert!(is_conflict(&RequestError::Api(
            ApiError::TerminatedByOtherGetUpdates
        )));
        assert!(is_conflict(&RequestError::Api(ApiError::CantGetUpdates)));
        assert!(!is_conflict(&RequestError::Api(ApiError::BotBlocked)));
    }
}
