use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscriber proficiency level; drives prompt complexity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Tier {
    Beginner,
    Intermediate,
    Advanced,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Beginner, Tier::Intermediate, Tier::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Beginner => "beginner",
            Tier::Intermediate => "intermediate",
            Tier::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Tier> {
        match s {
            "beginner" => Some(Tier::Beginner),
            "intermediate" => Some(Tier::Intermediate),
            "advanced" => Some(Tier::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported delivery locale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Language {
    En,
    Ro,
}

impl Language {
    /// Locale used when a catalog key is missing for a subscriber's language.
    pub const DEFAULT: Language = Language::En;

    pub const ALL: [Language; 2] = [Language::En, Language::Ro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ro => "ro",
        }
    }

    pub fn parse(s: &str) -> Option<Language> {
        match s {
            "en" => Some(Language::En),
            "ro" => Some(Language::Ro),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite grouping key for generation dedup: one prompt is generated per
/// distinct key in a batch run, regardless of subscriber count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    pub tier: Tier,
    pub language: Language,
}

impl ProfileKey {
    pub fn new(tier: Tier, language: Language) -> Self {
        Self { tier, language }
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tier, self.language)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub chat_id: i64,
    pub tier: Tier,
    pub language: Language,
    pub active: bool,
    pub last_delivery_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn profile(&self) -> ProfileKey {
        ProfileKey::new(self.tier, self.language)
    }
}

/// A generated (or fallback) prompt. Immutable once produced; lives only for
/// the duration of the orchestration run that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub image_url: String,
    pub tier: Tier,
    pub language: Language,
}

/// Result of one send attempt to one recipient. Failures are values here,
/// never errors: the bulk path must keep going past them.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub chat_id: i64,
    pub success: bool,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn ok(chat_id: i64) -> Self {
        Self {
            chat_id,
            success: true,
            error: None,
        }
    }

    pub fn failed(chat_id: i64, error: impl Into<String>) -> Self {
        Self {
            chat_id,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregate result of a bulk send.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub delivered: usize,
    pub failed: usize,
    pub failures: Vec<(i64, String)>,
}

impl BulkOutcome {
    pub fn is_failure(&self, chat_id: i64) -> bool {
        self.failures.iter().any(|(id, _)| *id == chat_id)
    }
}

/// Write-once record of one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: i64,
    pub delivered: i64,
    pub failed: i64,
    pub distinct_prompts: i64,
    pub duration_ms: i64,
}

/// One external-API attempt, for the append-only usage log.
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub service: &'static str,
    pub operation: &'static str,
    pub tokens: Option<i64>,
    pub images: Option<i64>,
    pub success: bool,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_roundtrip() {
        for tier in Tier::ALL {
            assert_eq!(Tier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(Tier::parse("expert"), None);
    }

    #[test]
    fn language_roundtrip() {
        for lang in Language::ALL {
            assert_eq!(Language::parse(lang.as_str()), Some(lang));
        }
        assert_eq!(Language::parse("fr"), None);
    }

    #[test]
    fn profile_key_groups_by_value() {
        use std::collections::HashSet;
        let keys: HashSet<ProfileKey> = [
            ProfileKey::new(Tier::Advanced, Language::En),
            ProfileKey::new(Tier::Advanced, Language::En),
            ProfileKey::new(Tier::Beginner, Language::Ro),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys.len(), 2);
    }
}
