//! Batch and on-demand delivery orchestration.
use anyhow::Result;
use chrono::{Timelike, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::db;
use crate::delivery::{DeliveryTransport, SendTask};
use crate::generator::PromptGenerator;
use crate::model::{BatchReport, DeliveryOutcome, ProfileKey, Prompt};
use crate::usage::UsageLog;

#[derive(Debug, Error)]
pub enum DeliverNowError {
    /// Unknown chat id, or the subscriber opted out.
    #[error("not subscribed")]
    NotSubscribed,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct Scheduler {
    pool: SqlitePool,
    generator: PromptGenerator,
    transport: DeliveryTransport,
    usage: UsageLog,
}

impl Scheduler {
    pub fn new(
        pool: SqlitePool,
        generator: PromptGenerator,
        transport: DeliveryTransport,
        usage: UsageLog,
    ) -> Self {
        Self {
            pool,
            generator,
            transport,
            usage,
        }
    }

    /// One batch run: load, group, generate once per distinct (tier, language)
    /// pair, fan out delivery, reconcile timestamps, report. There is no
    /// whole-batch retry; a failed run is reported as-is and the next
    /// scheduled invocation starts fresh.
    #[instrument(skip_all)]
    pub async fn run_batch(&self) -> Result<BatchReport> {
        let started = Instant::now();

        let subscribers = db::list_active_subscribers(&self.pool).await?;
        if subscribers.is_empty() {
            info!("no active subscribers; empty run");
            let report = BatchReport::default();
            self.usage.record_batch(report.clone());
            return Ok(report);
        }

        // Generate exactly once per distinct pair. The generator cannot fail
        // by contract, so this loop cannot abort the run.
        let mut prompts: HashMap<ProfileKey, Prompt> = HashMap::new();
        for sub in &subscribers {
            let key = sub.profile();
            if !prompts.contains_key(&key) {
                let prompt = self.generator.produce(key.tier, key.language).await;
                prompts.insert(key, prompt);
            }
        }
        let distinct_prompts = prompts.len() as i64;
        info!(
            subscribers = subscribers.len(),
            distinct_prompts, "generated prompts for batch"
        );

        let tasks: Vec<SendTask> = subscribers
            .iter()
            .map(|sub| {
                let prompt = &prompts[&sub.profile()];
                SendTask {
                    chat_id: sub.chat_id,
                    text: prompt.text.clone(),
                    image_url: Some(prompt.image_url.clone()),
                }
            })
            .collect();
        let bulk = self.transport.send_bulk(tasks).await;

        // Reconcile: advance timestamps for everyone who was not reported as
        // failed. A failed update is per-recipient and never affects counts.
        for sub in &subscribers {
            if bulk.is_failure(sub.chat_id) {
                continue;
            }
            if let Err(err) = db::touch_last_delivery(&self.pool, sub.chat_id).await {
                warn!(?err, chat_id = sub.chat_id, "failed to advance last delivery");
            }
        }

        let report = BatchReport {
            total: subscribers.len() as i64,
            delivered: bulk.delivered as i64,
            failed: bulk.failed as i64,
            distinct_prompts,
            duration_ms: started.elapsed().as_millis() as i64,
        };
        info!(?report, "batch run completed");
        self.usage.record_batch(report.clone());
        Ok(report)
    }

    /// On-demand delivery for a single recipient. Rejects unknown or inactive
    /// subscribers before any generation or send work happens.
    #[instrument(skip_all)]
    pub async fn deliver_now(&self, chat_id: i64) -> Result<DeliveryOutcome, DeliverNowError> {
        let subscriber = db::get_subscriber(&self.pool, chat_id)
            .await
            .map_err(DeliverNowError::Internal)?;
        let Some(subscriber) = subscriber.filter(|s| s.active) else {
            return Err(DeliverNowError::NotSubscribed);
        };

        let prompt = self
            .generator
            .produce(subscriber.tier, subscriber.language)
            .await;
        let outcome = self
            .transport
            .send_with_image(chat_id, &prompt.text, &prompt.image_url)
            .await;

        if outcome.success {
            if let Err(err) = db::touch_last_delivery(&self.pool, chat_id).await {
                warn!(?err, chat_id, "failed to advance last delivery");
            }
        }
        Ok(outcome)
    }

    /// Fire `run_batch` once per day at the given UTC hour. Checks once a
    /// minute; a run error is logged and the loop keeps going.
    pub async fn run_daily(&self, delivery_hour_utc: u32) {
        let mut last_run_date = None;
        loop {
            let now = Utc::now();
            let due = now.hour() == delivery_hour_utc && last_run_date != Some(now.date_naive());
            if due {
                last_run_date = Some(now.date_naive());
                match self.run_batch().await {
                    Ok(report) => info!(?report, "scheduled batch finished"),
                    Err(err) => warn!(?err, "scheduled batch failed"),
                }
            }
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    }
}
