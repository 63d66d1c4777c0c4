use std::sync::{Arc, Mutex};
use std::time::Duration;

use contentstack_republish::contract::{
    BulkPublishRequest, EntriesPage, Entry, LocaleEntrySet, MockDeliveryApi, MockManagementApi,
};
use contentstack_republish::load_config::Settings;
use contentstack_republish::publish::{publish_all_entries, publish_entries, BATCH_SIZE};
use contentstack_republish::republish::{republish, Selection};
use contentstack_republish::retry::RetryPolicy;
use contentstack_republish::RepublishError;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, Registry};

/// Event fields captured by [`EventCollector`].
#[derive(Debug, Default, Clone)]
struct CollectedEvent {
    message: String,
    operation: Option<String>,
    attempt: Option<u64>,
    error: Option<String>,
}

impl Visit for CollectedEvent {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "attempt" {
            self.attempt = Some(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "attempt" {
            self.attempt = u64::try_from(value).ok();
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "operation" {
            self.operation = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "error" => self.error = Some(format!("{value:?}")),
            "operation" => self.operation = Some(format!("{value:?}")),
            _ => {}
        }
    }
}

/// Custom Layer to collect emitted events.
struct EventCollector {
    events: Arc<Mutex<Vec<CollectedEvent>>>,
}

impl<S: tracing::Subscriber> Layer<S> for EventCollector {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut collected = CollectedEvent::default();
        event.record(&mut collected);
        self.events.lock().unwrap().push(collected);
    }
}

fn entries(locale: &str, n: usize) -> Vec<Entry> {
    (0..n)
        .map(|i| Entry::new(format!("{locale}-{i}"), locale, 1))
        .collect()
}

fn remote_failure() -> RepublishError {
    RepublishError::Remote {
        status: 429,
        body: "too many requests".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn batch_failing_twice_logs_two_retries_and_one_success() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(EventCollector {
        events: events.clone(),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut api = MockManagementApi::new();
    let calls = Arc::new(Mutex::new(0u32));
    let counter = calls.clone();
    api.expect_bulk_publish().times(3).returning(move |_| {
        let mut n = counter.lock().unwrap();
        *n += 1;
        if *n < 3 {
            Err(remote_failure())
        } else {
            Ok(serde_json::json!({"notice": "ok"}))
        }
    });

    let started = tokio::time::Instant::now();
    let report = publish_entries(
        &api,
        &RetryPolicy::default(),
        &entries("es", 4),
        "es",
        "stage",
        "articles",
        BATCH_SIZE,
    )
    .await
    .expect("third attempt succeeds");

    assert_eq!(started.elapsed(), Duration::from_secs(15));
    assert_eq!(report.batches.len(), 1);
    assert_eq!(report.batches[0].attempts, 3);

    let events = events.lock().unwrap();
    let retries: Vec<&CollectedEvent> = events
        .iter()
        .filter(|e| e.message.contains("Retrying operation"))
        .collect();
    let successes = events
        .iter()
        .filter(|e| e.message.contains("Successfully published batch"))
        .count();
    assert_eq!(retries.len(), 2, "events: {events:?}");
    assert_eq!(successes, 1, "events: {events:?}");

    let attempts: Vec<Option<u64>> = retries.iter().map(|e| e.attempt).collect();
    assert_eq!(attempts, vec![Some(1), Some(2)], "events: {events:?}");
    for retry in &retries {
        let error = retry.error.as_deref().unwrap_or_default();
        assert!(error.contains("HTTP 429"), "retry without triggering error: {retry:?}");
        assert!(error.contains("too many requests"), "retry without error body: {retry:?}");
        let operation = retry.operation.as_deref().unwrap_or_default();
        assert!(operation.contains("bulk publish es/stage batch 0"), "got: {retry:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn exhausted_batch_aborts_before_next_locale() {
    let mut set = LocaleEntrySet::new();
    set.insert("en-us", entries("en-us", 12));
    set.insert("ru-ru", entries("ru-ru", 3));

    let mut api = MockManagementApi::new();
    // en-us batch 0 succeeds, batch 1 fails on every attempt.
    api.expect_bulk_publish()
        .withf(|r| r.locales == vec!["en-us".to_string()] && r.entries.len() == 10)
        .times(1)
        .returning(|_| Ok(serde_json::json!({})));
    api.expect_bulk_publish()
        .withf(|r| r.locales == vec!["en-us".to_string()] && r.entries.len() == 2)
        .times(6)
        .returning(|_| Err(remote_failure()));
    api.expect_bulk_publish()
        .withf(|r| r.locales == vec!["ru-ru".to_string()])
        .never();

    let err = publish_all_entries(
        &api,
        &RetryPolicy::default(),
        set,
        "prod",
        "articles",
        BATCH_SIZE,
    )
    .await
    .unwrap_err();

    match err {
        RepublishError::Publish { locale, batch, .. } => {
            assert_eq!(locale, "en-us");
            assert_eq!(batch, 1);
        }
        other => panic!("expected Publish error, got {other:?}"),
    }
}

fn page_for(locale: &str, n: usize) -> EntriesPage {
    EntriesPage {
        entries: entries(locale, n),
        count: Some(n as u64),
    }
}

#[tokio::test]
async fn entries_are_published_only_under_their_own_locale() {
    let settings = Settings {
        locales: vec!["en-us".into(), "es".into()],
        ..Settings::default()
    };
    let selection = Selection {
        environment: "stage".into(),
        content_type: "courses".into(),
    };

    let mut delivery = MockDeliveryApi::new();
    delivery
        .expect_fetch_page()
        .times(2)
        .returning(|q| Ok(page_for(&q.locale, if q.locale == "es" { 23 } else { 5 })));

    let published: Arc<Mutex<Vec<BulkPublishRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = published.clone();
    let mut management = MockManagementApi::new();
    management.expect_bulk_publish().returning(move |r| {
        sink.lock().unwrap().push(r.clone());
        Ok(serde_json::json!({}))
    });

    let report = republish(&settings, &selection, &delivery, &management)
        .await
        .expect("run should succeed");

    assert_eq!(report.total_entries(), 28);
    let locales: Vec<&str> = report.locales.iter().map(|l| l.locale.as_str()).collect();
    assert_eq!(locales, vec!["en-us", "es"]);

    let published = published.lock().unwrap();
    let sizes: Vec<usize> = published.iter().map(|r| r.entries.len()).collect();
    assert_eq!(sizes, vec![5, 10, 10, 3]);
    for request in published.iter() {
        assert_eq!(request.locales.len(), 1);
        assert_eq!(request.environments, vec!["stage".to_string()]);
        assert!(!request.publish_with_reference);
        let locale = &request.locales[0];
        for reference in &request.entries {
            assert_eq!(&reference.locale, locale);
            assert!(reference.uid.starts_with(locale.as_str()));
            assert_eq!(reference.content_type, "courses");
        }
    }
}

#[tokio::test]
async fn fetch_failure_publishes_nothing() {
    let settings = Settings::default();
    let selection = Selection {
        environment: "prod".into(),
        content_type: "articles".into(),
    };

    let mut delivery = MockDeliveryApi::new();
    delivery
        .expect_fetch_page()
        .withf(|q| q.locale == "en-us")
        .returning(|q| Ok(page_for(&q.locale, 1)));
    delivery
        .expect_fetch_page()
        .withf(|q| q.locale == "ru-ru")
        .times(1)
        .returning(|_| {
            Err(RepublishError::Remote {
                status: 500,
                body: "internal".into(),
            })
        });

    let mut management = MockManagementApi::new();
    management.expect_bulk_publish().never();

    let err = republish(&settings, &selection, &delivery, &management)
        .await
        .unwrap_err();
    assert!(matches!(err, RepublishError::Remote { status: 500, .. }));
}

#[tokio::test]
async fn run_with_prompts_then_republishes_selected_target() {
    use contentstack_republish::cli::run_with;
    use contentstack_republish::prompt::LinePrompter;

    let settings = Settings {
        locales: vec!["uk-ua".into()],
        ..Settings::default()
    };
    let mut prompter = LinePrompter::new(std::io::Cursor::new("prod\n2\n"), Vec::new());

    let mut delivery = MockDeliveryApi::new();
    delivery
        .expect_fetch_page()
        .withf(|q| q.environment == "prod" && q.content_type == "courses")
        .times(1)
        .returning(|q| Ok(page_for(&q.locale, 2)));

    let mut management = MockManagementApi::new();
    management
        .expect_bulk_publish()
        .withf(|r| {
            r.environments == vec!["prod".to_string()]
                && r.entries.iter().all(|e| e.content_type == "courses")
        })
        .times(1)
        .returning(|_| Ok(serde_json::json!({})));

    let report = run_with(&settings, &mut prompter, &delivery, &management)
        .await
        .expect("run should succeed");
    assert_eq!(report.environment, "prod");
    assert_eq!(report.content_type, "courses");
    assert_eq!(report.total_entries(), 2);
}
