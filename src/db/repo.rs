use super::model::subscriber_from_row;
use crate::model::{BatchReport, Language, Subscriber, Tier, UsageRecord};
use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") {
        return url.to_string();
    }

    // In-memory URLs like sqlite::memory: or sqlite::memory:?cache=shared
    if url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);

    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };

    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = if let Some(rest) = path_part.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            format!("{}/{}", home.trim_end_matches('/'), rest)
        } else {
            path_part.to_string()
        }
    } else {
        path_part.to_string()
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Look up an existing subscriber by chat id or create a new active one with
/// default tier and language. Returns the subscriber either way.
#[instrument(skip_all)]
pub async fn get_or_create_subscriber(pool: &Pool, chat_id: i64) -> Result<Subscriber> {
    if let Some(existing) = get_subscriber(pool, chat_id).await? {
        return Ok(existing);
    }

    let row = sqlx::query(
        "INSERT INTO subscribers (chat_id, tier, language, active) VALUES (?, ?, ?, 1) \
         RETURNING id, chat_id, tier, language, active, last_delivery_at, created_at",
    )
    .bind(chat_id)
    .bind(Tier::Beginner.as_str())
    .bind(Language::DEFAULT.as_str())
    .fetch_one(pool)
    .await?;
    subscriber_from_row(&row)
}

#[instrument(skip_all)]
pub async fn get_subscriber(pool: &Pool, chat_id: i64) -> Result<Option<Subscriber>> {
    let row = sqlx::query(
        "SELECT id, chat_id, tier, language, active, last_delivery_at, created_at \
         FROM subscribers WHERE chat_id = ?",
    )
    .bind(chat_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(subscriber_from_row).transpose()
}

/// Snapshot of all active subscribers, for one batch run.
#[instrument(skip_all)]
pub async fn list_active_subscribers(pool: &Pool) -> Result<Vec<Subscriber>> {
    let rows = sqlx::query(
        "SELECT id, chat_id, tier, language, active, last_delivery_at, created_at \
         FROM subscribers WHERE active = 1 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    rows.iter().map(subscriber_from_row).collect()
}

#[instrument(skip_all)]
pub async fn set_tier(pool: &Pool, chat_id: i64, tier: Tier) -> Result<()> {
    sqlx::query("UPDATE subscribers SET tier = ? WHERE chat_id = ?")
        .bind(tier.as_str())
        .bind(chat_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn set_language(pool: &Pool, chat_id: i64, language: Language) -> Result<()> {
    sqlx::query("UPDATE subscribers SET language = ? WHERE chat_id = ?")
        .bind(language.as_str())
        .bind(chat_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Unsubscribe keeps the row; subscribers are deactivated, never erased.
#[instrument(skip_all)]
pub async fn set_active(pool: &Pool, chat_id: i64, active: bool) -> Result<()> {
    sqlx::query("UPDATE subscribers SET active = ? WHERE chat_id = ?")
        .bind(active as i64)
        .bind(chat_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Advance the last-delivery timestamp after a confirmed send.
#[instrument(skip_all)]
pub async fn touch_last_delivery(pool: &Pool, chat_id: i64) -> Result<()> {
    sqlx::query("UPDATE subscribers SET last_delivery_at = ? WHERE chat_id = ?")
        .bind(Utc::now())
        .bind(chat_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn insert_usage_record(pool: &Pool, record: &UsageRecord) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO usage_records (service, operation, tokens, images, success, error) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(record.service)
    .bind(record.operation)
    .bind(record.tokens)
    .bind(record.images)
    .bind(record.success as i64)
    .bind(record.error.as_deref())
    .fetch_one(pool)
    .await?;
    Ok(row.get::<i64, _>("id"))
}

#[instrument(skip_all)]
pub async fn insert_batch_report(pool: &Pool, report: &BatchReport) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO batch_reports (total, delivered, failed, distinct_prompts, duration_ms) \
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(report.total)
    .bind(report.delivered)
    .bind(report.failed)
    .bind(report.distinct_prompts)
    .bind(report.duration_ms)
    .fetch_one(pool)
    .await?;
    Ok(row.get::<i64, _>("id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[test]
    fn sqlite_url_passthrough() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            prepare_sqlite_url("postgres://host/db"),
            "postgres://host/db"
        );
    }

    #[tokio::test]
    async fn create_and_fetch_subscriber() {
        let pool = setup_pool().await;
        let created = get_or_create_subscriber(&pool, 42).await.unwrap();
        assert_eq!(created.chat_id, 42);
        assert_eq!(created.tier, Tier::Beginner);
        assert_eq!(created.language, Language::En);
        assert!(created.active);
        assert!(created.last_delivery_at.is_none());

        // Second call must not create a duplicate.
        let again = get_or_create_subscriber(&pool, 42).await.unwrap();
        assert_eq!(again.id, created.id);
    }

    #[tokio::test]
    async fn profile_updates_are_visible() {
        let pool = setup_pool().await;
        get_or_create_subscriber(&pool, 7).await.unwrap();
        set_tier(&pool, 7, Tier::Advanced).await.unwrap();
        set_language(&pool, 7, Language::Ro).await.unwrap();

        let sub = get_subscriber(&pool, 7).await.unwrap().unwrap();
        assert_eq!(sub.tier, Tier::Advanced);
        assert_eq!(sub.language, Language::Ro);
    }

    #[tokio::test]
    async fn deactivate_hides_from_active_list_but_keeps_row() {
        let pool = setup_pool().await;
        get_or_create_subscriber(&pool, 1).await.unwrap();
        get_or_create_subscriber(&pool, 2).await.unwrap();
        set_active(&pool, 1, false).await.unwrap();

        let active = list_active_subscribers(&pool).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].chat_id, 2);

        let kept = get_subscriber(&pool, 1).await.unwrap().unwrap();
        assert!(!kept.active);
    }

    #[tokio::test]
    async fn touch_advances_last_delivery() {
        let pool = setup_pool().await;
        get_or_create_subscriber(&pool, 5).await.unwrap();
        touch_last_delivery(&pool, 5).await.unwrap();
        let sub = get_subscriber(&pool, 5).await.unwrap().unwrap();
        assert!(sub.last_delivery_at.is_some());
    }

    #[tokio::test]
    async fn usage_and_report_rows_append() {
        let pool = setup_pool().await;
        let record = UsageRecord {
            service: "openai",
            operation: "chat.completion",
            tokens: Some(12),
            images: None,
            success: false,
            error: Some("provider error 500".into()),
        };
        insert_usage_record(&pool, &record).await.unwrap();
        insert_usage_record(&pool, &record).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usage_records")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let report = BatchReport {
            total: 5,
            delivered: 4,
            failed: 1,
            distinct_prompts: 2,
            duration_ms: 120,
        };
        insert_batch_report(&pool, &report).await.unwrap();
        let stored: i64 = sqlx::query_scalar("SELECT distinct_prompts FROM batch_reports LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, 2);
    }
}
