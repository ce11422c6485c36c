//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small proceedings archive and run the
//! full crawl pass against it end-to-end.

use paper_harvest::config::{Config, RetryPolicyConfig};
use paper_harvest::crawler::run_crawl;
use paper_harvest::output::CSV_HEADER;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, output_dir: &Path, years: (i32, i32), attempts: u32) -> Config {
    let mut config = Config::default();
    config.crawler.base_url = base_url.to_string();
    config.crawler.output_dir = output_dir.to_path_buf();
    config.crawler.start_year = years.0;
    config.crawler.end_year = years.1;
    config.retry.page = RetryPolicyConfig::new(attempts, 1, 0, 0);
    config.retry.year = RetryPolicyConfig::new(attempts, 1, 0, 0);
    config
}

fn listing_html(year: i32, titles: &[&str]) -> String {
    let items: String = titles
        .iter()
        .enumerate()
        .map(|(index, title)| {
            format!(
                r#"<li><a href="/paper_files/paper/{}/hash/{}-Abstract.html">{}</a></li>"#,
                year, index, title
            )
        })
        .collect();
    format!(
        r#"<html><body><h2>Papers</h2><ul class="paper-list">{}</ul></body></html>"#,
        items
    )
}

fn paper_html(authors: &[&str], pdf_href: Option<&str>) -> String {
    let authors: String = authors.iter().map(|a| format!("<i>{}</i> ", a)).collect();
    let pdf = pdf_href
        .map(|href| format!(r#"<a href="{}">Paper</a>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><body><h4>Authors</h4><p>{}</p><div><a href="/bibtex">Bibtex</a> {}</div></body></html>"#,
        authors, pdf
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Reads the crawl CSV as (header line, rows) with rows sorted by title
fn read_rows(csv_path: &Path) -> (String, Vec<Vec<String>>) {
    let content = std::fs::read_to_string(csv_path).unwrap();
    let header = content.lines().next().unwrap_or_default().to_string();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());
    let mut rows: Vec<Vec<String>> = reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect();
    rows.sort_by(|a, b| a[1].cmp(&b[1]));
    (header, rows)
}

#[tokio::test]
async fn test_crawl_records_papers_and_pdfs() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/paper_files/paper/2020",
        listing_html(2020, &["Alpha Net", "Beta: A Survey"]),
    )
    .await;
    mount_html(
        &mock_server,
        "/paper_files/paper/2020/hash/0-Abstract.html",
        paper_html(
            &["Ada Lovelace", "Alan Turing"],
            Some("/paper_files/paper/2020/file/0-Paper.pdf"),
        ),
    )
    .await;
    mount_html(
        &mock_server,
        "/paper_files/paper/2020/hash/1-Abstract.html",
        paper_html(&["Grace Hopper"], None),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2020/file/0-Paper.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 alpha".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path(), (2020, 2020), 2);
    let summary = run_crawl(&config).await.expect("crawl should succeed");

    assert_eq!(summary.years_walked, 1);
    assert_eq!(summary.papers_found, 2);
    assert_eq!(summary.papers_recorded, 2);
    assert_eq!(summary.pdfs_saved, 1);
    assert_eq!(summary.pdfs_missing, 1);

    let (header, rows) = read_rows(&config.crawler.csv_path());
    assert_eq!(header, CSV_HEADER);
    assert_eq!(rows.len(), 2);

    let base = mock_server.uri();
    assert_eq!(
        rows[0],
        vec![
            "2020".to_string(),
            "Alpha Net".to_string(),
            "Ada Lovelace, Alan Turing".to_string(),
            format!("{}/paper_files/paper/2020/hash/0-Abstract.html", base),
            format!("{}/paper_files/paper/2020/file/0-Paper.pdf", base),
        ]
    );
    assert_eq!(rows[1][1], "Beta: A Survey");
    assert_eq!(rows[1][2], "Grace Hopper");
    assert_eq!(rows[1][4], "N/A");

    let year_dir = dir.path().join("2020");
    let saved = std::fs::read(year_dir.join("Alpha_Net.pdf")).unwrap();
    assert_eq!(saved, b"%PDF-1.4 alpha");
    assert_eq!(std::fs::read_dir(&year_dir).unwrap().count(), 1);
}

#[tokio::test]
async fn test_rows_are_fully_quoted() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/paper_files/paper/2021",
        listing_html(2021, &["Solo"]),
    )
    .await;
    mount_html(
        &mock_server,
        "/paper_files/paper/2021/hash/0-Abstract.html",
        paper_html(&["Only Author"], None),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), dir.path(), (2021, 2021), 1);
    run_crawl(&config).await.unwrap();

    let content = std::fs::read_to_string(config.crawler.csv_path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Year,Title,Authors,Paper Link,PDF Link");
    assert_eq!(
        lines[1],
        format!(
            r#""2021","Solo","Only Author","{}/paper_files/paper/2021/hash/0-Abstract.html","N/A""#,
            mock_server.uri()
        )
    );
}

#[tokio::test]
async fn test_slow_year_does_not_block_other_years() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Slower than the 1 second attempt timeout
    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2020"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_html(2020, &["Never Seen"]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    mount_html(
        &mock_server,
        "/paper_files/paper/2021",
        listing_html(2021, &["Fast Paper"]),
    )
    .await;
    mount_html(
        &mock_server,
        "/paper_files/paper/2021/hash/0-Abstract.html",
        paper_html(&["Quick Author"], None),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), dir.path(), (2020, 2021), 2);
    let summary = run_crawl(&config).await.unwrap();

    assert_eq!(summary.years_skipped, 1);
    assert_eq!(summary.skipped_years, vec![2020]);
    assert_eq!(summary.years_walked, 1);

    let (_, rows) = read_rows(&config.crawler.csv_path());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "2021");
    assert_eq!(rows[0][1], "Fast Paper");
}

#[tokio::test]
async fn test_year_without_papers_writes_no_rows() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/paper_files/paper/2019",
        "<html><body><ul class=\"paper-list\"></ul></body></html>".to_string(),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), dir.path(), (2019, 2019), 1);
    let summary = run_crawl(&config).await.unwrap();

    assert_eq!(summary.years_empty, 1);
    assert_eq!(summary.papers_found, 0);

    let (header, rows) = read_rows(&config.crawler.csv_path());
    assert_eq!(header, CSV_HEADER);
    assert!(rows.is_empty());
    assert!(dir.path().join("2019").is_dir());
}

#[tokio::test]
async fn test_missing_pdf_link_makes_no_download() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/paper_files/paper/2022",
        listing_html(2022, &["No Pdf Here"]),
    )
    .await;
    mount_html(
        &mock_server,
        "/paper_files/paper/2022/hash/0-Abstract.html",
        paper_html(&["Someone"], None),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2022/file/0-Paper.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path(), (2022, 2022), 1);
    let summary = run_crawl(&config).await.unwrap();

    assert_eq!(summary.pdfs_missing, 1);
    let (_, rows) = read_rows(&config.crawler.csv_path());
    assert_eq!(rows[0][4], "N/A");
    assert_eq!(
        std::fs::read_dir(dir.path().join("2022")).unwrap().count(),
        0
    );
}

#[tokio::test]
async fn test_failing_paper_page_uses_exact_retry_budget() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/paper_files/paper/2020",
        listing_html(2020, &["Broken", "Working"]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2020/hash/0-Abstract.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_html(
        &mock_server,
        "/paper_files/paper/2020/hash/1-Abstract.html",
        paper_html(&["Fine Author"], None),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), dir.path(), (2020, 2020), 3);
    let summary = run_crawl(&config).await.unwrap();

    assert_eq!(summary.papers_found, 2);
    assert_eq!(summary.papers_skipped, 1);
    assert_eq!(summary.papers_recorded, 1);

    let (_, rows) = read_rows(&config.crawler.csv_path());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], "Working");
}

#[tokio::test]
async fn test_failed_pdf_download_still_records_row() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/paper_files/paper/2020",
        listing_html(2020, &["Gone Pdf"]),
    )
    .await;
    mount_html(
        &mock_server,
        "/paper_files/paper/2020/hash/0-Abstract.html",
        paper_html(&["Author"], Some("/paper_files/paper/2020/file/0-Paper.pdf")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2020/file/0-Paper.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path(), (2020, 2020), 2);
    let summary = run_crawl(&config).await.unwrap();

    assert_eq!(summary.papers_recorded, 1);
    assert_eq!(summary.pdfs_skipped, 1);

    let (_, rows) = read_rows(&config.crawler.csv_path());
    assert_eq!(
        rows[0][4],
        format!("{}/paper_files/paper/2020/file/0-Paper.pdf", mock_server.uri())
    );
    assert!(!dir.path().join("2020").join("Gone_Pdf.pdf").exists());
}

#[tokio::test]
async fn test_many_concurrent_papers_produce_well_formed_rows() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let titles: Vec<String> = (0..40)
        .map(|i| format!("Paper {:02}, with &quot;quotes&quot;", i))
        .collect();
    let title_refs: Vec<&str> = titles.iter().map(String::as_str).collect();
    mount_html(
        &mock_server,
        "/paper_files/paper/2023",
        listing_html(2023, &title_refs),
    )
    .await;

    for i in 0..40 {
        mount_html(
            &mock_server,
            &format!("/paper_files/paper/2023/hash/{}-Abstract.html", i),
            paper_html(&["First, Author", "Second Author"], None),
        )
        .await;
    }

    let config = create_test_config(&mock_server.uri(), dir.path(), (2023, 2023), 1);
    let summary = run_crawl(&config).await.unwrap();
    assert_eq!(summary.papers_recorded, 40);

    let (_, rows) = read_rows(&config.crawler.csv_path());
    assert_eq!(rows.len(), 40);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.len(), 5);
        assert_eq!(row[1], format!("Paper {:02}, with \"quotes\"", i));
        assert_eq!(row[2], "First, Author, Second Author");
    }
}

#[tokio::test]
async fn test_concurrency_bound_still_records_every_paper() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/paper_files/paper/2020",
        listing_html(2020, &["One", "Two", "Three"]),
    )
    .await;
    for i in 0..3 {
        mount_html(
            &mock_server,
            &format!("/paper_files/paper/2020/hash/{}-Abstract.html", i),
            paper_html(&["Author"], None),
        )
        .await;
    }

    let mut config = create_test_config(&mock_server.uri(), dir.path(), (2020, 2020), 1);
    config.crawler.max_concurrent_papers = Some(1);
    let summary = run_crawl(&config).await.unwrap();

    assert_eq!(summary.papers_recorded, 3);
}

#[tokio::test]
async fn test_rerun_truncates_previous_output() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/paper_files/paper/2020",
        listing_html(2020, &["Repeat"]),
    )
    .await;
    mount_html(
        &mock_server,
        "/paper_files/paper/2020/hash/0-Abstract.html",
        paper_html(&["Author"], None),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), dir.path(), (2020, 2020), 1);
    run_crawl(&config).await.unwrap();
    run_crawl(&config).await.unwrap();

    let content = std::fs::read_to_string(config.crawler.csv_path()).unwrap();
    assert_eq!(content.matches(CSV_HEADER).count(), 1);
    let (_, rows) = read_rows(&config.crawler.csv_path());
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_unreachable_site_skips_every_year() {
    let dir = TempDir::new().unwrap();

    // Nothing listens on a port freed right after binding
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let base = format!("http://127.0.0.1:{}", port);

    let config = create_test_config(&base, dir.path(), (2019, 2020), 1);
    let summary = run_crawl(&config).await.unwrap();

    assert_eq!(summary.years_skipped, 2);
    assert_eq!(summary.skipped_years, vec![2019, 2020]);
    assert_eq!(summary.papers_found, 0);
    let (header, rows) = read_rows(&config.crawler.csv_path());
    assert_eq!(header, CSV_HEADER);
    assert!(rows.is_empty());
}
