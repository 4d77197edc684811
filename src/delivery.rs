//! Outbound message delivery.
//!
//! Single sends report failure as an outcome value rather than an error, and
//! `send_bulk` must keep processing recipients after any failure; partial
//! failure isolation is the defining property of the bulk path.
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::{info, warn};

use crate::model::{BulkOutcome, DeliveryOutcome, UsageRecord};
use crate::usage::UsageLog;

const SERVICE: &str = "telegram";
const OP_TEXT: &str = "send_message";
const OP_PHOTO: &str = "send_photo";

/// One unit of work for `send_bulk`.
#[derive(Debug, Clone)]
pub struct SendTask {
    pub chat_id: i64,
    pub text: String,
    pub image_url: Option<String>,
}

/// Seam for the messaging provider; tests substitute a scripted fake.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    async fn send_photo(&self, chat_id: i64, caption: &str, image_url: &str) -> Result<()>;
}

/// Telegram-backed sender.
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .context("telegram send_message failed")?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, caption: &str, image_url: &str) -> Result<()> {
        let url = Url::parse(image_url).context("invalid image url")?;
        self.bot
            .send_photo(ChatId(chat_id), InputFile::url(url))
            .caption(caption)
            .await
            .context("telegram send_photo failed")?;
        Ok(())
    }
}

pub struct DeliveryTransport {
    sender: Arc<dyn MessageSender>,
    usage: UsageLog,
}

impl DeliveryTransport {
    pub fn new(sender: Arc<dyn MessageSender>, usage: UsageLog) -> Self {
        Self { sender, usage }
    }

    pub async fn send(&self, chat_id: i64, text: &str) -> DeliveryOutcome {
        let res = self.sender.send_text(chat_id, text).await;
        self.report(OP_TEXT, chat_id, &res);
        match res {
            Ok(()) => DeliveryOutcome::ok(chat_id),
            Err(err) => DeliveryOutcome::failed(chat_id, format!("{err:#}")),
        }
    }

    pub async fn send_with_image(
        &self,
        chat_id: i64,
        text: &str,
        image_url: &str,
    ) -> DeliveryOutcome {
        let res = self.sender.send_photo(chat_id, text, image_url).await;
        self.report(OP_PHOTO, chat_id, &res);
        match res {
            Ok(()) => DeliveryOutcome::ok(chat_id),
            Err(err) => DeliveryOutcome::failed(chat_id, format!("{err:#}")),
        }
    }

    /// Send every task; one recipient's failure never stops the rest.
    pub async fn send_bulk(&self, tasks: Vec<SendTask>) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for task in tasks {
            let delivered = match task.image_url.as_deref() {
                Some(url) => self.send_with_image(task.chat_id, &task.text, url).await,
                None => self.send(task.chat_id, &task.text).await,
            };
            if delivered.success {
                outcome.delivered += 1;
            } else {
                outcome.failed += 1;
                let error = delivered.error.unwrap_or_else(|| "send failed".into());
                warn!(chat_id = task.chat_id, %error, "bulk send failure");
                outcome.failures.push((task.chat_id, error));
            }
        }
        info!(
            delivered = outcome.delivered,
            failed = outcome.failed,
            "bulk send finished"
        );
        outcome
    }

    fn report(&self, operation: &'static str, chat_id: i64, res: &Result<()>) {
        if let Err(err) = res {
            warn!(?err, chat_id, operation, "send failed");
        }
        self.usage.record_api(UsageRecord {
            service: SERVICE,
            operation,
            tokens: None,
            images: None,
            success: res.is_ok(),
            error: res.as_ref().err().map(|e| format!("{e:#}")),
        });
    }
}
