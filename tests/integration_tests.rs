//! Integration tests using a mock HTTP server
//!
//! Tests the full end-to-end flow: ToC document → event reader → pipeline →
//! CSV tables, with file sizes resolved over HTTP HEAD.

use flate2::write::GzEncoder;
use flate2::Compression;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use toc_ingest::config::PipelineConfig;
use toc_ingest::engine::{PipelineBuilder, RunSummary};
use toc_ingest::enrich::{DisabledResolver, SizeResolver, DISABLED_REMARK};
use toc_ingest::event::{open_document, JsonEventReader};
use toc_ingest::http::{HttpClient, HttpClientConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

/// ToC document whose file locations point at `base`
fn acme_document(base: &str) -> String {
    format!(
        r#"{{
  "reporting_entity_name": "Acme",
  "reporting_entity_type": "health insurance issuer",
  "reporting_structure": [
    {{
      "reporting_plans": [
        {{"plan_name": "P1", "plan_id_type": "EIN", "plan_id": "11-1111111", "plan_market_type": "group"}}
      ],
      "in_network_files": [
        {{"description": "in-network file", "location": "{base}/a.json?fn=FileA"}},
        {{"description": "nested index", "location": "{base}/table_of_contents.json"}}
      ]
    }},
    {{
      "reporting_plans": [{{"plan_name": "P2"}}, {{"plan_name": "P3"}}],
      "in_network_files": []
    }},
    {{
      "reporting_plans": [{{"plan_name": "P4"}}, {{"plan_name": "P5"}}],
      "in_network_files": [{{"description": "missing", "location": "{base}/gone.json"}}]
    }}
  ],
  "version": "1.0.0"
}}"#
    )
}

fn config_for(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.output_dir = dir.to_path_buf();
    config.carrier = "anthem".into();
    config.batch = "2024-10".into();
    config.batch_size = 2;
    config.size_lookup.workers = 2;
    config.size_lookup.timeout_secs = 5;
    config
}

async fn run_file(
    config: &PipelineConfig,
    input: &Path,
    resolver: Arc<dyn SizeResolver>,
) -> RunSummary {
    let pipeline = PipelineBuilder::from_config(config, input.display().to_string())
        .unwrap()
        .resolver(resolver)
        .build()
        .unwrap();
    let reader = JsonEventReader::new(open_document(input).unwrap());
    pipeline.run(reader).await.into_result().unwrap()
}

/// CSV file as header-keyed maps
fn read_table(path: &Path) -> Vec<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    reader
        .records()
        .map(|r| {
            let record = r.unwrap();
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}

fn column(rows: &[HashMap<String, String>], name: &str) -> Vec<String> {
    rows.iter().map(|r| r[name].clone()).collect()
}

async fn size_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/a.json"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/table_of_contents.json"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 128]))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/gone.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

fn http_resolver() -> Arc<dyn SizeResolver> {
    Arc::new(
        HttpClient::with_config(HttpClientConfig::default().timeout(Duration::from_secs(5)))
            .unwrap(),
    )
}

// ============================================================================
// End-to-End Tests
// ============================================================================

#[tokio::test]
async fn test_end_to_end_three_tables() {
    let server = size_server().await;
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("anthem_index.json");
    std::fs::write(&input, acme_document(&server.uri())).unwrap();

    let config = config_for(dir.path());
    let summary = run_file(&config, &input, http_resolver()).await;

    assert_eq!(summary.records_processed, 3);
    assert_eq!(summary.lookups_resolved, 2);
    assert_eq!(summary.lookups_failed, 1);
    assert_eq!(summary.unknown_fields, 1);
    assert_eq!(summary.structural_violations, 0);

    // File listing: document order, record index follows the record count
    let meta = read_table(&dir.path().join("toc_metadata.csv"));
    assert_eq!(
        column(&meta, "toc_file_name"),
        vec!["FileA", "table_of_contents.json", "gone.json"]
    );
    assert_eq!(column(&meta, "toc_or_mrf_file"), vec!["MRF", "TOC", "MRF"]);
    assert_eq!(column(&meta, "reporting_structure_index"), vec!["1", "1", "3"]);
    assert_eq!(column(&meta, "re_name"), vec!["Acme", "Acme", "Acme"]);
    assert_eq!(meta[0]["carrier"], "anthem");
    assert_eq!(meta[0]["batch"], "2024-10");

    // File x plan listing: 1x2 for the first record, 2x1 for the third
    let mrf = read_table(&dir.path().join("toc_mrf_metadata.csv"));
    assert_eq!(column(&mrf, "plan_name"), vec!["P1", "P1", "P4", "P5"]);
    assert_eq!(
        column(&mrf, "in_network_file_name"),
        vec!["FileA", "table_of_contents.json", "gone.json", "gone.json"]
    );
    assert!(mrf.iter().all(|r| r["reporting_structure"] == "group"));
    assert!(mrf.iter().all(|r| r["toc_source_file_name"] == "anthem_index.json"));
    assert_eq!(mrf[0]["plan_id"], "11-1111111");

    // Sizes: one row per file, completion order
    let mut sizes: Vec<(String, String, String)> = read_table(&dir.path().join("toc_mrf_size_data.csv"))
        .into_iter()
        .map(|r| {
            (
                r["in_network_file_name"].clone(),
                r["in_network_file_size"].clone(),
                r["remarks"].clone(),
            )
        })
        .collect();
    sizes.sort();
    assert_eq!(sizes.len(), 3);
    assert_eq!(sizes[0], ("FileA".into(), "4096".into(), String::new()));
    assert_eq!(sizes[1].0, "gone.json");
    assert_eq!(sizes[1].1, "");
    assert!(sizes[1].2.starts_with("Error: HTTP 404"));
    assert_eq!(
        sizes[2],
        ("table_of_contents.json".into(), "128".into(), String::new())
    );
}

#[tokio::test]
async fn test_gzip_input_matches_plain_input() {
    let dir = TempDir::new().unwrap();
    let document = acme_document("https://example.invalid");

    let plain = dir.path().join("plain").join("index.json");
    std::fs::create_dir_all(plain.parent().unwrap()).unwrap();
    std::fs::write(&plain, &document).unwrap();

    let gz = dir.path().join("gz").join("index.json.gz");
    std::fs::create_dir_all(gz.parent().unwrap()).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(document.as_bytes()).unwrap();
    std::fs::write(&gz, encoder.finish().unwrap()).unwrap();

    let plain_summary = run_file(
        &config_for(plain.parent().unwrap()),
        &plain,
        Arc::new(DisabledResolver),
    )
    .await;
    let gz_summary = run_file(
        &config_for(gz.parent().unwrap()),
        &gz,
        Arc::new(DisabledResolver),
    )
    .await;

    assert_eq!(plain_summary.records_processed, gz_summary.records_processed);
    // Switched-off lookups are not counted as errors
    assert_eq!(gz_summary.lookups_skipped, 3);
    assert_eq!(gz_summary.errors(), 0);
    for table in ["toc_metadata.csv", "toc_mrf_metadata.csv"] {
        let a = read_table(&plain.parent().unwrap().join(table));
        let b = read_table(&gz.parent().unwrap().join(table));
        assert_eq!(a.len(), b.len(), "{table}");
        assert_eq!(column(&a, file_column(table)), column(&b, file_column(table)));
    }

    let sizes = read_table(&gz.parent().unwrap().join("toc_mrf_size_data.csv"));
    assert!(sizes.iter().all(|r| r["remarks"] == DISABLED_REMARK));
}

/// Column naming the file in each table
fn file_column(table: &str) -> &'static str {
    if table == "toc_metadata.csv" {
        "toc_file_name"
    } else {
        "in_network_file_name"
    }
}

#[tokio::test]
async fn test_second_run_appends_without_second_header() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("index.json");
    std::fs::write(&input, acme_document("https://example.invalid")).unwrap();
    let config = config_for(dir.path());

    run_file(&config, &input, Arc::new(DisabledResolver)).await;
    run_file(&config, &input, Arc::new(DisabledResolver)).await;

    let raw = std::fs::read_to_string(dir.path().join("toc_metadata.csv")).unwrap();
    assert_eq!(raw.matches("carrier,dh_re_id").count(), 1);
    assert_eq!(read_table(&dir.path().join("toc_metadata.csv")).len(), 6);
}

#[tokio::test]
async fn test_truncated_document_reports_partial_summary() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("index.json");
    let full = acme_document("https://example.invalid");
    // Cut inside the third record
    let cut = full.find("\"P4\"").unwrap();
    std::fs::write(&input, &full[..cut]).unwrap();

    let pipeline = PipelineBuilder::from_config(&config_for(dir.path()), "index.json")
        .unwrap()
        .resolver(Arc::new(DisabledResolver))
        .build()
        .unwrap();
    let outcome = pipeline
        .run(JsonEventReader::new(open_document(&input).unwrap()))
        .await;

    assert!(outcome.error.is_some());
    assert_eq!(outcome.summary.records_processed, 2);
    assert!(outcome.summary.failure.is_some());
    // Rows of completed records were flushed at close
    assert_eq!(read_table(&dir.path().join("toc_metadata.csv")).len(), 2);
}

#[tokio::test]
async fn test_download_then_process() {
    let server = MockServer::start().await;
    let document = acme_document("https://example.invalid");
    Mock::given(method("GET"))
        .and(path("/2024-10-01_anthem_index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(document.clone().into_bytes()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = HttpClient::new().unwrap();
    let url = format!("{}/2024-10-01_anthem_index.json", server.uri());
    let (downloaded, bytes) = client.download(&url, dir.path().join("downloads")).await.unwrap();
    assert_eq!(bytes, document.len() as u64);

    let mut config = config_for(&dir.path().join("out"));
    config.source_url = Some(url.clone());
    let summary = run_file(&config, &downloaded, Arc::new(DisabledResolver)).await;
    assert_eq!(summary.records_processed, 3);

    let meta = read_table(&dir.path().join("out").join("toc_metadata.csv"));
    assert!(meta.iter().all(|r| r["toc_source_url"] == url));
}
