use crate::format::{Link, Notification};
use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

/// Where formatted notifications go. `Ok` means the message was delivered.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// One URL button per row, `None` when there is nothing to attach.
pub fn keyboard(links: &[Link]) -> Option<InlineKeyboardMarkup> {
    if links.is_empty() {
        return None;
    }

    let rows = links
        .iter()
        .map(|l| vec![InlineKeyboardButton::url(l.label.clone(), l.url.clone())]);
    Some(InlineKeyboardMarkup::new(rows))
}

/// Sends every notification to a single chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: AutoSend<Bot>,
    chat: ChatId,
}

impl TelegramNotifier {
    pub fn new(bot: AutoSend<Bot>, chat: ChatId) -> Self {
        Self { bot, chat }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let mut req = self
            .bot
            .send_message(self.chat, notification.text.clone())
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(true);
        if let Some(kb) = keyboard(&notification.links) {
            req = req.reply_markup(kb);
        }

        req.await
            .with_context(|| format!("fail to send notification to chat {}", self.chat.0))?;
        Ok(())
    }
}
