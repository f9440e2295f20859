//! Integration tests for the run lifecycle: subscribe, run, rerun, reset,
//! redirect, remove.
//!
//! Each test gets its own temporary config file, an in-memory state
//! database, and a wiremock server standing in for the feed host. Runs use
//! `Delivery::Record` so nothing is mailed.

use std::path::PathBuf;

use feedmail::app::{App, Delivery, FeedOutcome};
use feedmail::config::Config;
use feedmail::storage::Database;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TWO_ITEMS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example</title>
    <link>https://example.com/</link>
    <item><guid>urn:b</guid><title>Second</title><description>two</description></item>
    <item><guid>urn:a</guid><title>First</title><description>one</description></item>
</channel></rss>"#;

struct Harness {
    app: App,
    db: Database,
    config_path: PathBuf,
    dir: PathBuf,
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

async fn harness(config_toml: &str) -> Harness {
    let dir = std::env::temp_dir().join(format!("feedmail-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let config_path = dir.join("config.toml");
    std::fs::write(&config_path, config_toml).unwrap();

    let config = Config::load(&config_path).unwrap();
    let db = Database::open(":memory:").await.unwrap();
    let app = App::new(config, config_path.clone(), db.clone()).unwrap();
    Harness {
        app,
        db,
        config_path,
        dir,
    }
}

async fn serve(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(server)
        .await;
}

fn one_feed(server: &MockServer, route: &str) -> String {
    format!(
        r#"
[default]
to = "reader@example.com"

[feed.news]
url = "{}{}"
"#,
        server.uri(),
        route
    )
}

// ============================================================================
// Run Tests
// ============================================================================

#[tokio::test]
async fn test_first_run_records_every_entry() {
    let server = MockServer::start().await;
    serve(&server, "/feed", TWO_ITEMS).await;
    let mut h = harness(&one_feed(&server, "/feed")).await;

    let summary = h.app.run(&[], Delivery::Record).await.unwrap();

    assert_eq!(summary.failures(), 0);
    assert_eq!(summary.emitted(), 2);
    let state = h.db.load_state("news").await.unwrap();
    assert_eq!(state.seen.len(), 2);
}

#[tokio::test]
async fn test_second_run_sends_nothing() {
    let server = MockServer::start().await;
    serve(&server, "/feed", TWO_ITEMS).await;
    let mut h = harness(&one_feed(&server, "/feed")).await;

    h.app.run(&[], Delivery::Record).await.unwrap();
    let summary = h.app.run(&[], Delivery::Record).await.unwrap();

    assert_eq!(summary.emitted(), 0);
    match &summary.outcomes[0].1 {
        FeedOutcome::Done(report) => assert_eq!(report.skipped, 2),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_reset_makes_entries_new_again() {
    let server = MockServer::start().await;
    serve(&server, "/feed", TWO_ITEMS).await;
    let mut h = harness(&one_feed(&server, "/feed")).await;

    h.app.run(&[], Delivery::Record).await.unwrap();
    h.app.reset("news").await.unwrap();
    assert!(h.db.load_state("news").await.unwrap().seen.is_empty());

    let summary = h.app.run(&[], Delivery::Record).await.unwrap();
    assert_eq!(summary.emitted(), 2);
}

#[tokio::test]
async fn test_failing_feed_does_not_stop_others() {
    let server = MockServer::start().await;
    serve(&server, "/good", TWO_ITEMS).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = format!(
        r#"
[default]
to = "reader@example.com"

[feed.broken]
url = "{uri}/gone"

[feed.good]
url = "{uri}/good"
"#,
        uri = server.uri()
    );
    let mut h = harness(&config).await;

    let summary = h.app.run(&[], Delivery::Record).await.unwrap();

    assert_eq!(summary.failures(), 1);
    assert_eq!(summary.emitted(), 2);
    assert_eq!(summary.outcomes[0].0, "broken");
    assert!(matches!(summary.outcomes[0].1, FeedOutcome::Failed(_)));
}

#[tokio::test]
async fn test_inactive_feed_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TWO_ITEMS))
        .expect(0)
        .mount(&server)
        .await;

    let config = format!(
        r#"
[default]
to = "reader@example.com"

[feed.news]
url = "{}/feed"
active = false
"#,
        server.uri()
    );
    let mut h = harness(&config).await;

    let summary = h.app.run(&[], Delivery::Record).await.unwrap();
    assert!(matches!(summary.outcomes[0].1, FeedOutcome::Inactive));
    assert_eq!(summary.failures(), 0);
}

#[tokio::test]
async fn test_missing_recipient_fails_feed() {
    let server = MockServer::start().await;
    serve(&server, "/feed", TWO_ITEMS).await;
    let config = format!("[feed.news]\nurl = \"{}/feed\"\n", server.uri());
    let mut h = harness(&config).await;

    let summary = h.app.run(&[], Delivery::Record).await.unwrap();
    assert_eq!(summary.failures(), 1);
    assert!(h.db.list_states().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_feed_name_fails() {
    let server = MockServer::start().await;
    serve(&server, "/feed", TWO_ITEMS).await;
    let mut h = harness(&one_feed(&server, "/feed")).await;

    let summary = h
        .app
        .run(&["missing".to_string()], Delivery::Record)
        .await
        .unwrap();
    assert_eq!(summary.failures(), 1);
}

#[tokio::test]
async fn test_permanent_redirect_is_saved_to_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/new", server.uri())),
        )
        .mount(&server)
        .await;
    serve(&server, "/new", TWO_ITEMS).await;
    let mut h = harness(&one_feed(&server, "/old")).await;

    let summary = h.app.run(&[], Delivery::Record).await.unwrap();
    assert_eq!(summary.emitted(), 2);

    let reloaded = Config::load(&h.config_path).unwrap();
    assert_eq!(
        reloaded.feed("news").unwrap().url,
        format!("{}/new", server.uri())
    );
}

#[tokio::test]
async fn test_redirect_to_dead_url_fails_and_keeps_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/gone", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let mut h = harness(&one_feed(&server, "/old")).await;

    let summary = h.app.run(&[], Delivery::Record).await.unwrap();
    assert_eq!(summary.failures(), 1);

    let reloaded = Config::load(&h.config_path).unwrap();
    assert_eq!(
        reloaded.feed("news").unwrap().url,
        format!("{}/old", server.uri())
    );
}

// ============================================================================
// Subscription Tests
// ============================================================================

#[tokio::test]
async fn test_add_persists_subscription() {
    let mut h = harness("[default]\nto = \"reader@example.com\"\n").await;

    let feed = h
        .app
        .add("blog", "https://example.com/feed.xml", Some("other@example.com"))
        .unwrap();
    assert_eq!(feed.options.to, "other@example.com");

    let reloaded = Config::load(&h.config_path).unwrap();
    let names: Vec<&str> = reloaded.feed_names().collect();
    assert_eq!(names, vec!["blog"]);
    assert_eq!(
        reloaded.feed("blog").unwrap().url,
        "https://example.com/feed.xml"
    );
}

#[tokio::test]
async fn test_add_rejects_duplicates_and_bad_names() {
    let mut h = harness("").await;
    h.app.add("blog", "https://example.com/a", None).unwrap();

    assert!(h.app.add("blog", "https://example.com/b", None).is_err());
    assert!(h.app.add("bad name", "https://example.com/c", None).is_err());
    assert!(h.app.add("ftp", "ftp://example.com/feed", None).is_err());
    assert_eq!(h.app.feeds().unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_forgets_state() {
    let server = MockServer::start().await;
    serve(&server, "/feed", TWO_ITEMS).await;
    let mut h = harness(&one_feed(&server, "/feed")).await;
    h.app.run(&[], Delivery::Record).await.unwrap();
    assert_eq!(h.db.list_states().await.unwrap().len(), 1);

    h.app.remove("news").await.unwrap();

    assert!(h.db.list_states().await.unwrap().is_empty());
    assert!(h.app.feeds().unwrap().is_empty());
    assert!(h.app.remove("news").await.is_err());
}
