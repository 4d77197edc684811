use crate::model::{Language, Subscriber, Tier};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Map a `subscribers` row into the domain type. Tier and language are stored
/// as their string codes; an unknown code means the row predates the enum and
/// is a data error, not a user error.
pub fn subscriber_from_row(row: &SqliteRow) -> Result<Subscriber> {
    let tier_raw: String = row.get("tier");
    let language_raw: String = row.get("language");
    let tier =
        Tier::parse(&tier_raw).ok_or_else(|| anyhow!("unknown tier in database: {tier_raw}"))?;
    let language = Language::parse(&language_raw)
        .ok_or_else(|| anyhow!("unknown language in database: {language_raw}"))?;
    Ok(Subscriber {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        tier,
        language,
        active: row.get::<i64, _>("active") != 0,
        last_delivery_at: row.get::<Option<DateTime<Utc>>, _>("last_delivery_at"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}
