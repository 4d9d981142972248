//! Integration tests for the crawl engine
//!
//! The engine tests drive the orchestrator with scripted page sources so
//! failures, panics and shutdowns happen exactly where the test wants them.
//! The HTTP tests use wiremock to run the full fetch/parse/store cycle.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use sumi_sweep::config::{
    Config, EngineConfig, FetchConfig, OutputConfig, PacingConfig, UserAgentConfig,
};
use sumi_sweep::crawler::{crawl, EngineSettings, ExitReason, Orchestrator, TerminationSignal};
use sumi_sweep::frontier::{FrontierSnapshot, ProgressStore};
use sumi_sweep::output::{MemorySink, Sink, SqliteSink};
use sumi_sweep::source::{
    build_http_client, fetch_page, HttpPageSource, Page, PageRecord, PageSource,
};
use sumi_sweep::SweepError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, thiserror::Error)]
#[error("scripted failure for {0}")]
struct ScriptError(String);

/// Behavior shared by every worker's source in one test
#[derive(Clone, Default)]
struct Script {
    claims: Arc<Mutex<HashMap<String, u32>>>,
    failures_left: Arc<Mutex<HashMap<String, u32>>>,
    links: Arc<HashMap<String, Vec<String>>>,
    panic_on: Option<String>,
    stop_after_first: Option<Arc<TerminationSignal>>,
    started: Arc<AtomicBool>,
}

impl Script {
    fn with_links(links: Vec<(&str, Vec<&str>)>) -> Self {
        let links = links
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.into_iter().map(String::from).collect()))
            .collect();
        Self {
            links: Arc::new(links),
            ..Self::default()
        }
    }

    fn fail(self, url: &str, times: u32) -> Self {
        self.failures_left
            .lock()
            .unwrap()
            .insert(url.to_string(), times);
        self
    }

    fn claims(&self, url: &str) -> u32 {
        self.claims.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

struct ScriptedSource {
    script: Script,
}

impl PageSource for ScriptedSource {
    type Record = String;
    type Error = ScriptError;

    fn fetch_and_parse(&mut self, url: &str) -> Result<Page<String>, ScriptError> {
        *self
            .script
            .claims
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;

        if let Some(signal) = &self.script.stop_after_first {
            if !self.script.started.swap(true, Ordering::SeqCst) {
                signal.trigger();
            }
        }

        if self.script.panic_on.as_deref() == Some(url) {
            panic!("source crashed on {}", url);
        }

        if let Some(left) = self.script.failures_left.lock().unwrap().get_mut(url) {
            if *left > 0 {
                *left -= 1;
                return Err(ScriptError(url.to_string()));
            }
        }

        let links = self.script.links.get(url).cloned().unwrap_or_default();
        Ok(Page::new(vec![url.to_string()], links))
    }
}

fn orchestrator(
    dir: &TempDir,
    workers: usize,
    seeds: &[&str],
    sink: &Arc<MemorySink<String>>,
) -> Orchestrator<String> {
    Orchestrator::new(
        EngineSettings::new(workers),
        ProgressStore::new(dir.path()),
        seeds,
        sink.clone() as Arc<dyn Sink<String>>,
    )
    .expect("Failed to create orchestrator")
}

fn as_set(items: &[String]) -> BTreeSet<String> {
    items.iter().cloned().collect()
}

fn set_of(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_failed_page_is_retried_and_links_followed() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let script = Script::with_links(vec![("B", vec!["C"])]).fail("A", 1);

    let orch = orchestrator(&dir, 2, &["A", "B"], &sink);
    let source_script = script.clone();
    let report = orch
        .run(move |_| ScriptedSource {
            script: source_script.clone(),
        })
        .expect("Run failed");

    assert_eq!(report.completed, 3);
    assert_eq!(report.pending, 0);
    assert_eq!(report.failures(), 1);
    assert_eq!(script.claims("A"), 2);
    assert_eq!(script.claims("B"), 1);
    assert_eq!(script.claims("C"), 1);

    let saved = ProgressStore::new(dir.path()).load().unwrap();
    assert_eq!(as_set(&saved.completed), set_of(&["A", "B", "C"]));
    assert!(saved.pending.is_empty());

    let mut records = sink.records();
    records.sort();
    assert_eq!(records, vec!["A", "B", "C"]);
}

#[test]
fn test_retry_accounting() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let script = Script::default().fail("X", 3);

    let source_script = script.clone();
    let report = orchestrator(&dir, 1, &["X"], &sink)
        .run(move |_| ScriptedSource {
            script: source_script.clone(),
        })
        .unwrap();

    // K failures mean K + 1 claims and exactly one commit
    assert_eq!(script.claims("X"), 4);
    assert_eq!(report.failures(), 3);
    assert_eq!(report.processed(), 1);
    assert_eq!(sink.records(), vec!["X"]);
}

#[test]
fn test_no_double_completion_with_duplicate_links() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let script = Script::with_links(vec![
        ("S1", vec!["T", "U"]),
        ("S2", vec!["T", "U"]),
        ("S3", vec!["T", "S1"]),
    ]);

    let source_script = script.clone();
    orchestrator(&dir, 3, &["S1", "S2", "S3"], &sink)
        .run(move |_| ScriptedSource {
            script: source_script.clone(),
        })
        .unwrap();

    for url in ["S1", "S2", "S3", "T", "U"] {
        assert_eq!(script.claims(url), 1, "{} claimed more than once", url);
    }
    assert_eq!(sink.records().len(), 5);
}

#[test]
fn test_seed_idempotence_across_runs() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());

    let first = orchestrator(&dir, 2, &["A", "B"], &sink);
    assert_eq!(first.seeded(), 2);
    first
        .run(|_| ScriptedSource {
            script: Script::default(),
        })
        .unwrap();

    let second = orchestrator(&dir, 2, &["A", "B"], &sink);
    assert_eq!(second.seeded(), 0);
    let report = second
        .run(|_| ScriptedSource {
            script: Script::default(),
        })
        .unwrap();

    assert_eq!(report.processed(), 0);
    assert_eq!(report.completed, 2);
    assert_eq!(sink.records().len(), 2);
}

#[test]
fn test_resume_keeps_saved_queue_order() {
    let dir = TempDir::new().unwrap();
    let store = ProgressStore::new(dir.path());
    store
        .save(&FrontierSnapshot {
            pending: vec!["B".to_string()],
            completed: vec!["A".to_string()],
        })
        .unwrap();

    let sink = Arc::new(MemorySink::new());
    let orch = orchestrator(&dir, 1, &["A", "B", "C"], &sink);

    assert_eq!(orch.seeded(), 1);
    assert_eq!(orch.frontier().snapshot().pending, vec!["B", "C"]);

    orch.run(|_| ScriptedSource {
        script: Script::default(),
    })
    .unwrap();

    // One worker processes in queue order
    assert_eq!(sink.records(), vec!["B", "C"]);
}

#[test]
fn test_cooperative_shutdown_loses_nothing() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let seeds = ["P1", "P2", "P3", "P4", "P5", "P6", "P7", "P8", "P9", "P10"];

    let orch = orchestrator(&dir, 2, &seeds, &sink);
    let script = Script {
        stop_after_first: Some(orch.signal()),
        ..Script::default()
    };

    let source_script = script.clone();
    let report = orch
        .run(move |_| ScriptedSource {
            script: source_script.clone(),
        })
        .unwrap();

    assert!(report.interrupted());
    assert!(report
        .workers
        .iter()
        .all(|w| w.exit == ExitReason::Terminated));

    // Each worker finishes at most the page it was on
    let saved = ProgressStore::new(dir.path()).load().unwrap();
    assert!(!saved.completed.is_empty());
    assert!(saved.completed.len() <= 2);

    let mut all = as_set(&saved.pending);
    all.extend(saved.completed.iter().cloned());
    assert_eq!(all, set_of(&seeds));
    assert_eq!(saved.pending.len() + saved.completed.len(), seeds.len());
}

#[test]
fn test_panicking_worker_keeps_its_url() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let script = Script {
        panic_on: Some("P".to_string()),
        ..Script::default()
    };

    let source_script = script.clone();
    let result = orchestrator(&dir, 2, &["P", "Q", "R"], &sink).run(move |_| ScriptedSource {
        script: source_script.clone(),
    });

    match result {
        Err(SweepError::Worker { name, message }) => {
            assert!(name.starts_with("Crawler-"));
            assert!(message.contains("source crashed on P"));
        }
        other => panic!("expected worker error, got {:?}", other),
    }

    // The state was still saved, with the crashed URL first in line
    let saved = ProgressStore::new(dir.path()).load().unwrap();
    assert_eq!(saved.pending.first().map(String::as_str), Some("P"));
    assert!(!saved.completed.contains(&"P".to_string()));

    let mut all = as_set(&saved.pending);
    all.extend(saved.completed.iter().cloned());
    assert_eq!(all, set_of(&["P", "Q", "R"]));
}

#[test]
fn test_factory_panic_is_reported() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());

    let result = orchestrator(&dir, 1, &["A"], &sink).run(|_| -> ScriptedSource {
        panic!("no browser available");
    });

    assert!(matches!(result, Err(SweepError::Worker { .. })));
    let saved = ProgressStore::new(dir.path()).load().unwrap();
    assert_eq!(saved.pending, vec!["A"]);
}

/// Creates a test configuration against a mock server
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    Config {
        engine: EngineConfig {
            workers: 2,
            progress_dir: dir.path().join("progress"),
            name_format: "TestBot-{}".to_string(),
            seeds: vec![format!("{}/", base_url)],
            max_consecutive_failures: Some(3),
            max_priority_retries: None,
        },
        pacing: PacingConfig {
            mean_seconds: 0.0,
            std_seconds: 0.0,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        fetch: FetchConfig {
            request_timeout_secs: 5,
            same_site_only: true,
        },
        output: OutputConfig {
            database_path: dir
                .path()
                .join("records.db")
                .to_string_lossy()
                .into_owned(),
        },
    }
}

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body.to_string(), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_mounted_pages_are_served_as_html() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        "<html><head><title>Served</title></head><body></body></html>",
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let client = build_http_client(&config.user_agent, &config.fetch).unwrap();

    let fetched = fetch_page(&client, &format!("{}/", server.uri()))
        .await
        .expect("HTML page was rejected");
    assert!(fetched.content_type.starts_with("text/html"));
    assert!(fetched.body.contains("<title>Served</title>"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_http_source_extracts_records_and_same_site_links() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(
        &server,
        "/",
        r#"<html><head><title>Home</title>
        <meta name="description" content="The front page"></head><body>
        <img src="/logo.png">
        <a href="/a">A</a>
        <a href="/broken">Broken</a>
        <a href="https://elsewhere.example/x">External</a>
        <a href="/">Self</a>
        </body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/a",
        "<html><head><title>Page A</title></head><body></body></html>",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);
    let client = build_http_client(&config.user_agent, &config.fetch).unwrap();
    let sink = Arc::new(MemorySink::<PageRecord>::new());

    let mut settings = EngineSettings::new(1);
    settings.max_consecutive_failures = Some(2);

    let orch = Orchestrator::new(
        settings,
        ProgressStore::new(&config.engine.progress_dir),
        &config.engine.seeds,
        sink.clone() as Arc<dyn Sink<PageRecord>>,
    )
    .unwrap();

    let runtime = tokio::runtime::Handle::current();
    let report = tokio::task::spawn_blocking(move || {
        orch.run(move |identity| {
            HttpPageSource::new(identity.name.clone(), client.clone(), runtime.clone(), true)
        })
    })
    .await
    .expect("Orchestrator task panicked")
    .expect("Run failed");

    // The broken page keeps failing until the worker gives up on it
    assert_eq!(report.workers[0].exit, ExitReason::FailureLimit);
    assert_eq!(report.pending, 1);

    let saved = ProgressStore::new(&config.engine.progress_dir).load().unwrap();
    assert_eq!(saved.pending, vec![format!("{}/broken", base_url)]);
    assert_eq!(
        as_set(&saved.completed),
        [format!("{}/", base_url), format!("{}/a", base_url)]
            .into_iter()
            .collect::<BTreeSet<String>>()
    );

    let records = sink.records();
    assert_eq!(records.len(), 2);

    let home = records
        .iter()
        .find(|r| r.url == format!("{}/", base_url))
        .expect("Home page record missing");
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert_eq!(home.description.as_deref(), Some("The front page"));
    assert_eq!(home.images, vec![format!("{}/logo.png", base_url)]);
    assert_eq!(home.status_code, 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_crawl_stores_records_and_resumes() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body>
        <a href="/one">One</a><a href="/two">Two</a>
        </body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/one",
        r#"<html><head><title>One</title></head><body><a href="/two">Two</a></body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/two",
        "<html><head><title>Two</title></head><body></body></html>",
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);
    let db_path = dir.path().join("records.db");

    let report = crawl(config.clone(), false).await.expect("Crawl failed");
    assert_eq!(report.processed(), 3);
    assert_eq!(report.pending, 0);
    assert_eq!(SqliteSink::new(&db_path).unwrap().count_records().unwrap(), 3);

    // Everything is in history, so a second run has nothing to do
    let report = crawl(config.clone(), false).await.expect("Resume failed");
    assert_eq!(report.processed(), 0);
    assert_eq!(report.completed, 3);

    // A fresh run starts over and appends to the same database
    let report = crawl(config, true).await.expect("Fresh crawl failed");
    assert_eq!(report.processed(), 3);
    assert_eq!(SqliteSink::new(&db_path).unwrap().count_records().unwrap(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_seed_spelling_matches_self_link() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(
        &server,
        "/page",
        r#"<html><head><title>Self</title></head><body>
        <a href="/page?b=2&amp;a=1">Again</a>
        <a href="/page?a=1&amp;b=2#top">Sorted</a>
        </body></html>"#,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.engine.workers = 1;
    config.engine.seeds = vec![format!("{}/page?b=2&a=1", base_url)];

    let report = crawl(config.clone(), false).await.expect("Crawl failed");

    assert_eq!(report.processed(), 1);
    assert_eq!(report.pending, 0);

    let saved = ProgressStore::new(&config.engine.progress_dir).load().unwrap();
    assert_eq!(saved.completed, vec![format!("{}/page?a=1&b=2", base_url)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_non_html_content_is_a_failure() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("{}", "application/json"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.engine.workers = 1;
    config.engine.max_consecutive_failures = Some(1);

    let report = crawl(config, false).await.expect("Crawl failed");

    assert_eq!(report.failures(), 1);
    assert_eq!(report.completed, 0);
    assert_eq!(report.pending, 1);
}
