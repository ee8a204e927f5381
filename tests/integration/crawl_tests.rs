//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full fetch/process/advance cycle end-to-end, writing to real files
//! in temporary directories.

use pagechain::config::{ClientErrorPolicy, Config, FootnotePlacement};
use pagechain::crawler::{
    Coordinator, CrawlOptions, CrawlParts, HttpTransport, RecordingSleeper, Sleeper, Transport,
};
use pagechain::output::{FileDocument, StopReason};
use pagechain::state::{CrawlPhase, CrawlState};
use pagechain::storage::{load_progress, JsonProgressStore};
use pagechain::PagechainError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOOK: &str = "/book/index.php";

/// Builds a page in the site's layout, with optional footnotes and next link
fn page_html(kalash: u32, vishram: u32, prose: &str, next: Option<&str>, footnotes: &[&str]) -> String {
    let refs: String = (1..=footnotes.len())
        .map(|n| format!(" Note<sup><a href=\"#fn{n}\" id=\"r{n}\">{n}</a></sup>."))
        .collect();
    let notes: String = footnotes
        .iter()
        .enumerate()
        .map(|(i, text)| format!("<li id=\"fn{}\">{}</li>", i + 1, text))
        .collect();
    let container = if footnotes.is_empty() {
        String::new()
    } else {
        format!("<div id=\"footnotes\"><ol>{notes}</ol></div>")
    };
    let next = next
        .map(|href| format!("<a class=\"nav_right\" href=\"{href}\">Next</a>"))
        .unwrap_or_default();

    format!(
        r#"<html><head><title>Book</title></head><body>
<div id="content">
<h2>Kalash {kalash} / Vishram {vishram}</h2>
<p>{prose}{refs}</p>
<p>The assembly listened in silence while the discourse continued late into the evening.</p>
{next}
</div>
{container}
</body></html>"#
    )
}

fn next_href(kalash: u32, vishram: u32) -> String {
    format!("index.php?kalash={kalash}&vishram={vishram}")
}

async fn mount_page(server: &MockServer, kalash: u32, vishram: u32, status: u16, body: String, expect: u64) {
    Mock::given(method("GET"))
        .and(path(BOOK))
        .and(query_param("kalash", kalash.to_string()))
        .and(query_param("vishram", vishram.to_string()))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .expect(expect)
        .mount(server)
        .await;
}

fn seed(server: &MockServer) -> String {
    format!("{}{}?kalash=1&vishram=1", server.uri(), BOOK)
}

/// Creates a test configuration writing into `dir`
fn create_test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.user_agent.crawler_name = "TestBot".to_string();
    config.fetch.max_attempts = 3;
    config.fetch.initial_backoff_ms = 10;
    config.fetch.backoff_multiplier = 2.0;
    config.fetch.timeout_secs = 5;
    config.crawl.page_delay_ms = 0;
    config.crawl.respect_robots = false;
    config.output.path = dir.join("book.md").display().to_string();
    config
}

/// Builds a coordinator over real HTTP and files, with a recording sleeper
fn coordinator(config: Config, seed: &str, sleeper: Arc<RecordingSleeper>) -> Coordinator {
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::from_config(&config).expect("Failed to build transport"));
    let sleeper: Arc<dyn Sleeper> = sleeper;
    let output = Path::new(&config.output.path).to_path_buf();
    let parts = CrawlParts {
        transport,
        sleeper,
        sink: Box::new(FileDocument::create(&output).expect("Failed to create output")),
        store: Box::new(JsonProgressStore::new(config.output.progress_path())),
    };
    let state = CrawlState::new(seed, &config.output.path, "test");
    Coordinator::with_parts(config, state, false, parts).expect("Failed to create coordinator")
}

fn read(path: &str) -> String {
    std::fs::read_to_string(path).expect("Failed to read output")
}

#[tokio::test]
async fn test_chain_stops_at_back_link() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, 1, 1, 200, page_html(1, 1, "Maharaj arrived at dawn.", Some(&next_href(1, 2)), &[]), 1).await;
    // Page 2 points back at page 1
    mount_page(&server, 1, 2, 200, page_html(1, 2, "The devotees gathered.", Some(&next_href(1, 1)), &[]), 1).await;
    mount_page(&server, 1, 3, 200, page_html(1, 3, "Never reached.", None, &[]), 0).await;

    let config = create_test_config(dir.path());
    let output = config.output.path.clone();
    let progress = config.output.progress_path();
    let mut coordinator = coordinator(config, &seed(&server), Arc::new(RecordingSleeper::new()));

    let report = coordinator.run().await.unwrap();
    assert_eq!(report.final_phase, CrawlPhase::Done);
    assert!(matches!(report.stop_reason, StopReason::AlreadyVisited(_)));
    assert_eq!(report.pages_written, 2);

    let text = read(&output);
    assert_eq!(text.matches("---\n\n## ").count(), 2);
    assert!(text.contains("## Kalash 1 / Vishram 1\n\nMaharaj arrived at dawn."));
    assert!(text.contains("## Kalash 1 / Vishram 2\n\nThe devotees gathered."));
    assert!(!text.contains("Never reached"));

    let state = load_progress(Path::new(&progress)).unwrap();
    assert_eq!(state.visited.len(), 2);
    assert_eq!(state.pages_written, 2);
    assert!(state.next_url.is_none());
    assert_eq!(state.phase, "done");
}

#[tokio::test]
async fn test_footnotes_per_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        1,
        1,
        200,
        page_html(1, 1, "Maharaj arrived at dawn.", None, &["A village in Saurashtra.", "Known as the Ghela river."]),
        1,
    )
    .await;

    let config = create_test_config(dir.path());
    let output = config.output.path.clone();
    let mut coordinator = coordinator(config, &seed(&server), Arc::new(RecordingSleeper::new()));

    let report = coordinator.run().await.unwrap();
    assert_eq!(report.stop_reason, StopReason::EndOfChain);
    assert_eq!(report.footnotes, 2);

    let text = read(&output);
    assert!(text.contains("Note[1]."));
    assert!(text.contains("Note[2]."));
    assert!(text.contains("## Footnotes\n\n[1] A village in Saurashtra.\n\n[2] Known as the Ghela river."));
    assert_eq!(text.matches("Saurashtra").count(), 1);
}

#[tokio::test]
async fn test_footnotes_at_end_of_document() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, 1, 1, 200, page_html(1, 1, "First page.", Some(&next_href(1, 2)), &["First note."]), 1).await;
    mount_page(&server, 1, 2, 200, page_html(1, 2, "Second page.", None, &["Second note."]), 1).await;

    let mut config = create_test_config(dir.path());
    config.output.footnotes_placement = FootnotePlacement::EndOfDocument;
    let output = config.output.path.clone();
    let mut coordinator = coordinator(config, &seed(&server), Arc::new(RecordingSleeper::new()));

    coordinator.run().await.unwrap();

    let text = read(&output);
    let (pages, notes) = text.split_once("## Footnotes").expect("missing footnotes section");
    assert!(!pages.contains("First note."));
    assert!(notes.contains("### Kalash 1 / Vishram 1\n\n[1] First note."));
    assert!(notes.contains("### Kalash 1 / Vishram 2\n\n[1] Second note."));
}

#[tokio::test]
async fn test_end_of_document_footnotes_across_resume() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, 1, 1, 200, page_html(1, 1, "First page.", Some(&next_href(1, 2)), &["First note."]), 1).await;
    mount_page(&server, 1, 2, 200, page_html(1, 2, "Second page.", None, &["Second note."]), 1).await;

    let mut config = create_test_config(dir.path());
    config.output.footnotes_placement = FootnotePlacement::EndOfDocument;
    config.crawl.max_pages = Some(1);
    let output = config.output.path.clone();
    let progress = config.output.progress_path();

    let first = Coordinator::new(config.clone(), &seed(&server), &CrawlOptions::default())
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.stop_reason, StopReason::PageCap(1));
    assert!(!read(&output).contains("## Footnotes"));
    assert_eq!(load_progress(Path::new(&progress)).unwrap().deferred_footnotes.len(), 1);

    config.crawl.max_pages = None;
    let options = CrawlOptions {
        resume: true,
        ignore_robots: false,
    };
    let second = Coordinator::new(config, &seed(&server), &options)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(second.stop_reason, StopReason::EndOfChain);

    let text = read(&output);
    assert_eq!(text.matches("## Footnotes").count(), 1);
    let (pages, notes) = text.split_once("## Footnotes").unwrap();
    assert!(pages.contains("## Kalash 1 / Vishram 2"));
    assert!(notes.contains("### Kalash 1 / Vishram 1\n\n[1] First note."));
    assert!(notes.contains("### Kalash 1 / Vishram 2\n\n[1] Second note."));
    assert!(load_progress(Path::new(&progress)).unwrap().deferred_footnotes.is_empty());
}

#[tokio::test]
async fn test_exhaustion_keeps_earlier_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, 1, 1, 200, page_html(1, 1, "Maharaj arrived at dawn.", Some(&next_href(1, 2)), &[]), 1).await;
    mount_page(&server, 1, 2, 503, "Service Unavailable".to_string(), 3).await;

    let config = create_test_config(dir.path());
    let output = config.output.path.clone();
    let progress = config.output.progress_path();
    let sleeper = Arc::new(RecordingSleeper::new());
    let mut coordinator = coordinator(config, &seed(&server), sleeper.clone());

    let report = coordinator.run().await.unwrap();
    assert_eq!(report.final_phase, CrawlPhase::Aborted);
    assert!(matches!(report.stop_reason, StopReason::FetchFailed(_)));
    assert_eq!(report.pages_written, 1);
    assert_eq!(report.fetch_attempts, 4);

    // Polite delay after page 1, then strictly increasing backoff
    assert_eq!(
        sleeper.delays(),
        vec![Duration::ZERO, Duration::from_millis(10), Duration::from_millis(20)]
    );

    let text = read(&output);
    assert_eq!(text.matches("---\n\n## ").count(), 1);
    assert!(text.contains("Maharaj arrived at dawn."));

    let state = load_progress(Path::new(&progress)).unwrap();
    assert_eq!(state.phase, "aborted");
    assert!(state.next_url.unwrap().ends_with("kalash=1&vishram=2"));
}

#[tokio::test]
async fn test_recovers_from_failure_signature() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // The first response looks like a page but carries a database error
    Mock::given(method("GET"))
        .and(path(BOOK))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<html><body><p>{}</p>Warning: mysqli_connect(): (HY000/1203): User has exceeded the max_user_connections resource</body></html>",
            "x".repeat(120)
        )))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, 1, 200, page_html(1, 1, "Maharaj arrived at dawn.", None, &[]), 1).await;

    let config = create_test_config(dir.path());
    let output = config.output.path.clone();
    let sleeper = Arc::new(RecordingSleeper::new());
    let mut coordinator = coordinator(config, &seed(&server), sleeper.clone());

    let report = coordinator.run().await.unwrap();
    assert!(report.succeeded());
    assert_eq!(report.fetch_attempts, 2);
    assert_eq!(report.retries(), 1);
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(10)]);

    let text = read(&output);
    assert!(!text.contains("max_user_connections"));
    assert!(text.contains("Maharaj arrived at dawn."));
}

#[tokio::test]
async fn test_client_error_abort_policy() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, 1, 1, 404, page_html(1, 1, "Missing page body.", None, &[]), 1).await;

    let mut config = create_test_config(dir.path());
    config.fetch.on_client_error = ClientErrorPolicy::Abort;
    let mut coordinator = coordinator(config, &seed(&server), Arc::new(RecordingSleeper::new()));

    let report = coordinator.run().await.unwrap();
    assert_eq!(report.final_phase, CrawlPhase::Aborted);
    assert_eq!(report.pages_written, 0);
}

#[tokio::test]
async fn test_client_error_keeps_body_by_default() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, 1, 1, 404, page_html(1, 1, "Missing page body.", None, &[]), 1).await;

    let config = create_test_config(dir.path());
    let output = config.output.path.clone();
    let mut coordinator = coordinator(config, &seed(&server), Arc::new(RecordingSleeper::new()));

    let report = coordinator.run().await.unwrap();
    assert!(report.succeeded());
    assert!(read(&output).contains("Missing page body."));
}

#[tokio::test]
async fn test_resume_appends_to_document() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, 1, 1, 200, page_html(1, 1, "Maharaj arrived at dawn.", Some(&next_href(1, 2)), &[]), 1).await;
    mount_page(&server, 1, 2, 200, page_html(1, 2, "The devotees gathered.", None, &[]), 1).await;

    let mut config = create_test_config(dir.path());
    config.crawl.max_pages = Some(1);
    let output = config.output.path.clone();

    let first = Coordinator::new(config.clone(), &seed(&server), &CrawlOptions::default())
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.stop_reason, StopReason::PageCap(1));

    config.crawl.max_pages = None;
    let options = CrawlOptions {
        resume: true,
        ignore_robots: false,
    };
    let mut resumed = Coordinator::new(config, &seed(&server), &options).unwrap();
    assert_eq!(resumed.state().visited.len(), 1);

    let second = resumed.run().await.unwrap();
    assert_eq!(second.stop_reason, StopReason::EndOfChain);
    assert_eq!(second.pages_written, 1);
    assert_eq!(second.total_pages, 2);

    let text = read(&output);
    let first_at = text.find("## Kalash 1 / Vishram 1").unwrap();
    let second_at = text.find("## Kalash 1 / Vishram 2").unwrap();
    assert!(first_at < second_at);
}

#[tokio::test]
async fn test_resume_without_record_fails() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let options = CrawlOptions {
        resume: true,
        ignore_robots: false,
    };

    let result = Coordinator::new(config, "https://example.org/book/index.php?kalash=1&vishram=1", &options);
    assert!(matches!(result, Err(PagechainError::Storage(_))));
}

#[tokio::test]
async fn test_robots_denied() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /book/\n"))
        .mount(&server)
        .await;
    mount_page(&server, 1, 1, 200, page_html(1, 1, "Forbidden.", None, &[]), 0).await;

    let mut config = create_test_config(dir.path());
    config.crawl.respect_robots = true;

    let err = Coordinator::new(config, &seed(&server), &CrawlOptions::default())
        .unwrap()
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, PagechainError::RobotsDenied { .. }));
}

#[tokio::test]
async fn test_ignore_robots() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, 1, 1, 200, page_html(1, 1, "Allowed anyway.", None, &[]), 1).await;

    let mut config = create_test_config(dir.path());
    config.crawl.respect_robots = true;
    let options = CrawlOptions {
        resume: false,
        ignore_robots: true,
    };

    let report = Coordinator::new(config, &seed(&server), &options)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert!(report.succeeded());
}

#[tokio::test]
async fn test_sends_accept_language() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(BOOK))
        .and(header_exists("accept-language"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_html(1, 1, "Negotiated page.", None, &[])))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(dir.path());
    let output = config.output.path.clone();
    let mut coordinator = coordinator(config, &seed(&server), Arc::new(RecordingSleeper::new()));

    let report = coordinator.run().await.unwrap();
    assert!(report.succeeded());
    assert!(read(&output).contains("Negotiated page."));
}
