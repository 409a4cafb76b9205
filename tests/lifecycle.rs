use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use contextual_reminders::{
    ChatLine, Clock, Config, ContextualReminders, HostError, MigrationOutcome, Messenger, Reminder,
    ReminderRequest, ReminderStore,
};

struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    fn advance(&self, by: Duration) {
        *self.0.lock() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

#[derive(Default)]
struct Inbox(Mutex<Vec<String>>);

#[async_trait]
impl Messenger for Inbox {
    async fn deliver(&self, reminder: &Reminder, text: &str) -> Result<(), HostError> {
        self.0.lock().push(format!("{}: {}", reminder.owner, text));
        Ok(())
    }
}

const TEN_DAYS: i64 = 864_000;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn config(dir: &tempfile::TempDir, pastebin_url: Option<String>) -> Config {
    Config {
        persistence_dir: dir.path().to_path_buf(),
        basename: "testbot".into(),
        context_capture_min_duration: TEN_DAYS as f64,
        pastebin_url,
        ..Config::default()
    }
}

fn request(seconds: i64) -> ReminderRequest {
    ReminderRequest {
        owner: "ferris".into(),
        target: "#rust".into(),
        context_channel: "#rust".into(),
        duration: Duration::seconds(seconds),
        message: "review the release notes".into(),
    }
}

fn chat(plugin: &ContextualReminders, now: DateTime<Utc>) {
    for n in 0..3 {
        plugin.observe(ChatLine::new("#rust", "crab", format!("message {n}"), now));
    }
}

#[tokio::test]
async fn long_reminder_gets_context_link_and_fires() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "full_url": "https://paste.example/?ctx" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let clock = FixedClock::at(start());
    let plugin = ContextualReminders::new(config(&dir, Some(server.uri())))
        .unwrap()
        .with_clock(clock.clone());
    chat(&plugin, start());

    let reminder = plugin.create_reminder(request(TEN_DAYS + 1)).await.unwrap();
    assert_eq!(reminder.context_url.as_deref(), Some("https://paste.example/?ctx"));
    assert_eq!(reminder.due_at - reminder.created_at, Duration::seconds(TEN_DAYS + 1));

    // Persisted before create_reminder returned.
    let on_disk = ReminderStore::load(plugin.config().persistence_file()).unwrap();
    assert_eq!(on_disk.pending(), &[reminder.clone()]);

    let inbox = Arc::new(Inbox::default());
    let scheduler = plugin.scheduler(inbox.clone());

    assert_eq!(scheduler.tick(clock.now()).await.unwrap().delivered, 0);

    clock.advance(Duration::seconds(TEN_DAYS + 1));
    assert_eq!(scheduler.tick(clock.now()).await.unwrap().delivered, 1);
    assert_eq!(
        inbox.0.lock().as_slice(),
        ["ferris: review the release notes (More at https://paste.example/?ctx)"]
    );
    assert!(plugin.store().lock().is_empty());
}

#[tokio::test]
async fn short_reminder_skips_capture() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "full_url": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let plugin = ContextualReminders::new(config(&dir, Some(server.uri())))
        .unwrap()
        .with_clock(FixedClock::at(start()));
    chat(&plugin, start());

    let reminder = plugin.create_reminder(request(TEN_DAYS - 1)).await.unwrap();
    assert!(reminder.context_url.is_none());
}

#[tokio::test]
async fn no_endpoint_means_no_context_url() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = ContextualReminders::new(config(&dir, None))
        .unwrap()
        .with_clock(FixedClock::at(start()));
    chat(&plugin, start());

    let reminder = plugin.create_reminder(request(TEN_DAYS * 3)).await.unwrap();
    assert!(reminder.context_url.is_none());
    assert_eq!(plugin.store().lock().len(), 1);
}

#[tokio::test]
async fn failed_upload_still_persists_reminder() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = ContextualReminders::new(config(&dir, Some(server.uri())))
        .unwrap()
        .with_clock(FixedClock::at(start()));
    chat(&plugin, start());

    let reminder = plugin.create_reminder(request(TEN_DAYS * 2)).await.unwrap();
    assert!(reminder.context_url.is_none());

    let on_disk = ReminderStore::load(plugin.config().persistence_file()).unwrap();
    assert_eq!(on_disk.len(), 1);
}

#[tokio::test]
async fn negative_duration_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = ContextualReminders::new(config(&dir, None)).unwrap();

    let err = plugin.create_reminder(request(-5)).await.unwrap_err();
    assert!(matches!(err, contextual_reminders::Error::InvalidReminder { .. }));
    assert!(plugin.store().lock().is_empty());
}

#[tokio::test]
async fn out_of_range_duration_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = ContextualReminders::new(config(&dir, None))
        .unwrap()
        .with_clock(FixedClock::at(start()));

    let mut huge = request(0);
    huge.duration = Duration::days(999_999_999);

    let err = plugin.create_reminder(huge).await.unwrap_err();
    assert!(matches!(err, contextual_reminders::Error::DurationOutOfRange { .. }));
    assert!(plugin.store().lock().is_empty());
}

#[tokio::test]
async fn unwritable_store_surfaces_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = ContextualReminders::new(config(&dir, None))
        .unwrap()
        .with_clock(FixedClock::at(start()));

    // A directory where the reminders file belongs makes every write fail.
    let path = plugin.config().persistence_file();
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("occupant"), "x").unwrap();

    let err = plugin.create_reminder(request(60)).await.unwrap_err();
    assert!(matches!(err, contextual_reminders::Error::Persistence(_)));
    assert!(plugin.store().lock().is_empty());
}

#[tokio::test]
async fn empty_context_channel_is_not_uploaded() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "full_url": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let plugin = ContextualReminders::new(config(&dir, Some(server.uri())))
        .unwrap()
        .with_clock(FixedClock::at(start()));

    let reminder = plugin.create_reminder(request(TEN_DAYS * 2)).await.unwrap();
    assert!(reminder.context_url.is_none());
    assert_eq!(plugin.store().lock().len(), 1);
}

#[tokio::test]
async fn unreachable_paste_service_still_persists_reminder() {
    let dir = tempfile::tempdir().unwrap();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let plugin = ContextualReminders::new(config(&dir, Some(endpoint)))
        .unwrap()
        .with_clock(FixedClock::at(start()));
    chat(&plugin, start());

    let reminder = plugin.create_reminder(request(TEN_DAYS * 2)).await.unwrap();
    assert!(reminder.context_url.is_none());

    let on_disk = ReminderStore::load(plugin.config().persistence_file()).unwrap();
    assert_eq!(on_disk.len(), 1);
}

#[tokio::test]
async fn startup_migration_runs_once() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, None);
    std::fs::write(
        cfg.legacy_reminders_file(),
        "1717243200\t#rust\talice\tlegacy one\n1717246800\talice\talice\tlegacy two\n",
    )
    .unwrap();

    let plugin = ContextualReminders::new(cfg.clone())
        .unwrap()
        .with_clock(FixedClock::at(start()));
    assert_eq!(plugin.migrate().await.unwrap(), [MigrationOutcome::Migrated(2)]);

    // A restart must not duplicate anything.
    let restarted = ContextualReminders::new(cfg).unwrap();
    assert_eq!(restarted.migrate().await.unwrap(), [MigrationOutcome::AlreadyMigrated]);
    assert_eq!(restarted.store().lock().len(), 2);
}

#[test]
fn invalid_config_fails_at_construction() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir, None);
    cfg.context_capture_max_duration = 1.0;

    let err = ContextualReminders::new(cfg).err().unwrap();
    assert!(matches!(err, contextual_reminders::Error::Configuration(_)));
}
