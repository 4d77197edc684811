use crate::db;
use crate::model::{Language, Tier};
use crate::scheduler::{DeliverNowError, Scheduler};
use crate::texts::{text, TextKey};
use anyhow::Result;
use sqlx::SqlitePool;
use teloxide::prelude::*;
use tracing::{info, instrument, warn};

/// Route one inbound Telegram message to the matching command. Replies are
/// localized to the subscriber's language; strangers get the default locale.
#[instrument(skip_all)]
pub async fn handle_update(
    bot: &Bot,
    pool: &SqlitePool,
    scheduler: &Scheduler,
    msg: &Message,
) -> Result<()> {
    let Some(raw) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;

    let mut parts = raw.trim().split_whitespace();
    let command = parts.next().unwrap_or_default();
    let arg = parts.next();

    let subscriber = db::get_subscriber(pool, chat_id).await?;
    let lang = subscriber
        .as_ref()
        .map(|s| s.language)
        .unwrap_or(Language::DEFAULT);

    match command {
        "/start" => {
            let reply = match &subscriber {
                Some(sub) if sub.active => text(TextKey::AlreadySubscribed, sub.language, &[]),
                Some(sub) => {
                    db::set_active(pool, chat_id, true).await?;
                    info!(chat_id, "subscriber reactivated");
                    text(TextKey::Subscribed, sub.language, &[])
                }
                None => {
                    let sub = db::get_or_create_subscriber(pool, chat_id).await?;
                    info!(chat_id, "subscriber created");
                    text(TextKey::Subscribed, sub.language, &[])
                }
            };
            bot.send_message(msg.chat.id, reply).await?;
        }
        "/stop" => {
            let reply = match &subscriber {
                Some(sub) if sub.active => {
                    db::set_active(pool, chat_id, false).await?;
                    info!(chat_id, "subscriber deactivated");
                    text(TextKey::Unsubscribed, sub.language, &[])
                }
                _ => text(TextKey::NotSubscribed, lang, &[]),
            };
            bot.send_message(msg.chat.id, reply).await?;
        }
        "/tier" => {
            let reply = match arg.and_then(Tier::parse) {
                Some(tier) if subscriber.is_some() => {
                    db::set_tier(pool, chat_id, tier).await?;
                    text(TextKey::TierSet, lang, &[("tier", tier.as_str())])
                }
                Some(_) => text(TextKey::NotSubscribed, lang, &[]),
                None => text(TextKey::UnknownTier, lang, &[]),
            };
            bot.send_message(msg.chat.id, reply).await?;
        }
        "/language" => {
            let reply = match arg.and_then(Language::parse) {
                Some(language) if subscriber.is_some() => {
                    db::set_language(pool, chat_id, language).await?;
                    text(
                        TextKey::LanguageSet,
                        language,
                        &[("language", language.as_str())],
                    )
                }
                Some(_) => text(TextKey::NotSubscribed, lang, &[]),
                None => text(TextKey::UnknownLanguage, lang, &[]),
            };
            bot.send_message(msg.chat.id, reply).await?;
        }
        "/prompt" => match scheduler.deliver_now(chat_id).await {
            Ok(outcome) if outcome.success => {}
            Ok(_) => {
                bot.send_message(msg.chat.id, text(TextKey::SendFailed, lang, &[]))
                    .await?;
            }
            Err(DeliverNowError::NotSubscribed) => {
                bot.send_message(msg.chat.id, text(TextKey::NotSubscribed, lang, &[]))
                    .await?;
            }
            Err(DeliverNowError::Internal(err)) => {
                warn!(?err, chat_id, "on-demand delivery failed");
                bot.send_message(msg.chat.id, text(TextKey::SendFailed, lang, &[]))
                    .await?;
            }
        },
        "/ping" => {
            bot.send_message(msg.chat.id, text(TextKey::Pong, lang, &[]))
                .await?;
        }
        _ => {
            bot.send_message(msg.chat.id, text(TextKey::Help, lang, &[]))
                .await?;
        }
    }

    Ok(())
}
