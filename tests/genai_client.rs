use musebot::config::OpenAi;
use musebot::genai::{GenAiClient, GenerationBackend};
use musebot::model::{Language, Tier};
use musebot::usage::{UsageEvent, UsageLog};
use reqwest::Url;
use std::time::{Duration, Instant};

fn test_config() -> OpenAi {
    OpenAi {
        api_key: "test-key".into(),
        text_model: "gpt-4o-mini".into(),
        image_model: "dall-e-3".into(),
        max_retries: 3,
        base_delay_ms: 20,
    }
}

/// Point the client at a port nothing listens on; every attempt fails fast
/// with a connection error, exercising the full retry schedule.
fn unreachable_client(usage: UsageLog) -> GenAiClient {
    let base_url = Url::parse("http://127.0.0.1:9/").unwrap();
    GenAiClient::with_base_url(&test_config(), usage, base_url)
}

#[tokio::test]
async fn text_generation_exhausts_retries_with_backoff() {
    let (usage, mut rx) = UsageLog::channel();
    let client = unreachable_client(usage);

    let started = Instant::now();
    let err = client
        .generate_text(Tier::Advanced, Language::En)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    // Final failure is surfaced, not swallowed.
    assert!(format!("{err:#}").contains("generation provider"));

    // Backoff delays of base, 2x base, 4x base between the four attempts.
    assert!(
        elapsed >= Duration::from_millis(20 + 40 + 80),
        "elapsed {elapsed:?} shorter than the backoff schedule"
    );

    // Every attempt lands in the usage log as a failure.
    let mut attempts = 0;
    while let Ok(event) = rx.try_recv() {
        let UsageEvent::Api(record) = event else {
            panic!("unexpected batch event");
        };
        assert_eq!(record.service, "openai");
        assert_eq!(record.operation, "chat.completion");
        assert!(!record.success);
        assert!(record.error.is_some());
        attempts += 1;
    }
    assert_eq!(attempts, 4);
}

#[tokio::test]
async fn image_generation_exhausts_retries() {
    let (usage, mut rx) = UsageLog::channel();
    let client = unreachable_client(usage);

    let err = client
        .generate_image("a quiet harbor at dawn", Tier::Beginner, Language::En)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("generation provider"));

    let mut attempts = 0;
    while let Ok(UsageEvent::Api(record)) = rx.try_recv() {
        assert_eq!(record.operation, "image.generation");
        assert!(!record.success);
        attempts += 1;
    }
    assert_eq!(attempts, 4);
}
