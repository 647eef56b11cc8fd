use async_trait::async_trait;
use chrono::NaiveDate;
use openaq_pipeline::error::{ProcessingError, Result};
use openaq_pipeline::fetchers::{
    ApiRequest, ApiResponse, OpenAqFetcher, RetryPolicy, Transport, TransportError,
};
use openaq_pipeline::models::{parse_timestamp, QueryWindow, Region};
use openaq_pipeline::processors::CleanProcessor;
use openaq_pipeline::readers::StoreReader;
use openaq_pipeline::utils::{raw_file_path, today_utc, STORE_FILE};
use openaq_pipeline::writers::{ParquetWriter, RawWriter};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

type Scripted = std::result::Result<ApiResponse, TransportError>;

/// In-memory API with the same script and request log as the crate's
/// unit-test transport. Once the script runs out it answers with an empty
/// `results` page.
#[derive(Default)]
struct FakeApi {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeApi {
    fn new() -> Self {
        Self::default()
    }

    fn then_body(self, status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(ApiResponse::new(status, body.as_bytes().to_vec())));
        self
    }

    fn then_results(self, results: &str) -> Self {
        self.then_body(200, &format!(r#"{{"results":{}}}"#, results))
    }

    fn then_status(self, status: u16) -> Self {
        self.then_body(status, "")
    }

    fn then_error(self, error: TransportError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Transport for FakeApi {
    async fn get(&self, request: &ApiRequest) -> Scripted {
        self.requests.lock().unwrap().push(request.clone());

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::new(StatusCode::OK, br#"{"results":[]}"#.to_vec())))
    }
}

/// Shared buffer that collects formatted log output
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn window() -> QueryWindow {
    QueryWindow::new(
        parse_timestamp("2025-09-01T00:00:00Z").unwrap(),
        parse_timestamp("2025-09-07T23:59:59Z").unwrap(),
        200,
    )
    .unwrap()
}

fn raw_line(sensor_id: u64, tag: &str, avg: f64, from: &str) -> String {
    format!(
        r#"{{"sensor_id": {}, "sensor_name": "Portland", "location_id": 2178, "state": "ME", "parameter": {{"name": "{}"}}, "summary": {{"avg": {}}}, "period": {{"datetimeFrom": {{"utc": "{}"}}}}}}"#,
        sensor_id, tag, avg, from
    )
}

fn write_raw(raw_dir: &Path, date: NaiveDate, lines: &[String]) {
    fs::create_dir_all(raw_dir).unwrap();
    fs::write(raw_file_path(raw_dir, date), lines.join("\n") + "\n").unwrap();
}

#[test]
fn test_clean_skips_malformed_line() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let raw_dir = temp_dir.path().join("raw");
    let clean_dir = temp_dir.path().join("clean");
    let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();

    write_raw(
        &raw_dir,
        date,
        &[
            raw_line(1, "pm25", 12.3, "2025-09-01T00:00:00Z"),
            "{\"sensor_id\": 2, \"parameter\": ".to_string(),
        ],
    );

    let summary = CleanProcessor::new(&raw_dir, &clean_dir)
        .with_max_workers(2)
        .process(date)?;

    assert_eq!(summary.raw_lines, 2);
    assert_eq!(summary.malformed_lines, 1);
    assert_eq!(summary.cleaned_rows, 1);
    assert_eq!(summary.store_rows, Some(1));

    let store = StoreReader::new().read_store(&clean_dir.join(STORE_FILE))?;
    assert_eq!(store.records.len(), 1);

    let row = &store.records[0];
    assert_eq!(row.sensor_id, 1);
    assert_eq!(row.sensor_tag, "pm25");
    assert_eq!(row.avg_value, 12.3);
    assert_eq!(row.state.as_deref(), Some("ME"));
    assert_eq!(row.datetime_from, parse_timestamp("2025-09-01T00:00:00Z").unwrap());

    assert!(clean_dir.join("cleaned_data_2025-09-01.csv").exists());

    Ok(())
}

#[test]
fn test_clean_logs_one_warning_per_malformed_line() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let raw_dir = temp_dir.path().join("raw");
    let clean_dir = temp_dir.path().join("clean");
    let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();

    write_raw(
        &raw_dir,
        date,
        &[
            raw_line(1, "pm25", 12.3, "2025-09-01T00:00:00Z"),
            "{\"sensor_id\": 2, \"parameter\": ".to_string(),
            raw_line(3, "o3", 0.03, "2025-09-01T00:00:00Z"),
        ],
    );

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    let summary = tracing::subscriber::with_default(subscriber, || {
        CleanProcessor::new(&raw_dir, &clean_dir)
            .with_max_workers(2)
            .process(date)
    })?;

    assert_eq!(summary.malformed_lines, 1);
    assert_eq!(summary.cleaned_rows, 2);

    let output = logs.contents();
    assert_eq!(output.matches("Malformed JSON line").count(), 1);
    let warning = output
        .lines()
        .find(|line| line.contains("Malformed JSON line"))
        .unwrap();
    assert!(warning.contains("WARN"));
    assert!(warning.contains("line=2"));
    assert!(warning.contains("2025-09-01.jsonl"));

    Ok(())
}

#[test]
fn test_second_run_overrides_overlapping_key() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let raw_dir = temp_dir.path().join("raw");
    let clean_dir = temp_dir.path().join("clean");
    let day_one = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
    let day_two = NaiveDate::from_ymd_opt(2025, 9, 2).unwrap();

    write_raw(
        &raw_dir,
        day_one,
        &[
            raw_line(1, "pm25", 10.0, "2025-09-01T00:00:00Z"),
            raw_line(2, "o3", 0.02, "2025-09-01T00:00:00Z"),
        ],
    );
    write_raw(&raw_dir, day_two, &[raw_line(1, "pm25", 42.0, "2025-09-01T00:00:00Z")]);

    let processor = CleanProcessor::new(&raw_dir, &clean_dir).with_max_workers(1);
    processor.process(day_one)?;
    let second = processor.process(day_two)?;

    assert_eq!(second.store_rows, Some(2));

    let store = StoreReader::new().read_store(&processor.store_path())?;
    let sensor_one: Vec<_> = store.records.iter().filter(|r| r.sensor_id == 1).collect();
    assert_eq!(sensor_one.len(), 1);
    assert_eq!(sensor_one[0].avg_value, 42.0);

    // Re-processing the same day changes nothing
    processor.process(day_two)?;
    let again = StoreReader::new().read_store(&processor.store_path())?;
    assert_eq!(again.records, store.records);

    Ok(())
}

#[test]
fn test_missing_raw_file_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let processor = CleanProcessor::new(temp_dir.path().join("raw"), temp_dir.path().join("clean"));

    let result = processor.process(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
    assert!(matches!(result, Err(ProcessingError::MissingInputFile(_))));
}

#[tokio::test]
async fn test_fetch_then_clean() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let raw_dir = temp_dir.path().join("raw");
    let clean_dir = temp_dir.path().join("clean");

    let api = FakeApi::new()
        .then_results(
            r#"[{"id": 2178, "name": "Portland", "sensors": [
                {"id": 11, "parameter": {"name": "pm25"}},
                {"id": 12, "parameter": {"name": "pm10"}}
            ]}]"#,
        )
        .then_results("[]")
        // sensor 11: server error, abandoned
        .then_status(503)
        // sensor 12: one day, then end of data
        .then_results(
            r#"[{"parameter": {"name": "pm10"}, "summary": {"avg": 7.5},
                "period": {"datetimeFrom": {"utc": "2025-09-03T00:00:00Z"},
                           "datetimeTo": {"utc": "2025-09-04T00:00:00Z"}}}]"#,
        )
        .then_results("[]");
    let fetcher = OpenAqFetcher::new(api, "https://api.test")
        .with_policy(RetryPolicy::immediate())
        .with_parameters(vec!["pm10".to_string(), "pm25".to_string()]);

    let window = window();
    let region = Region::new("me", "-71.1,43.0,-66.9,47.5")?;
    let writer = RawWriter::new(&raw_dir);

    let date = today_utc();
    let fetch = fetcher.run(&[region], &window, &writer, None).await?;

    assert_eq!(fetch.sensors_discovered, 2);
    assert_eq!(fetch.sensors_abandoned, 1);
    assert_eq!(fetch.sensors_completed, 1);
    assert_eq!(fetch.records_written, 1);
    assert_eq!(
        fetcher.transport().urls(),
        vec![
            "https://api.test/v3/locations",
            "https://api.test/v3/locations",
            "https://api.test/v3/sensors/11/days",
            "https://api.test/v3/sensors/12/days",
            "https://api.test/v3/sensors/12/days",
        ]
    );
    assert_eq!(fetcher.transport().requests()[3].param("page"), Some("1"));
    assert_eq!(fetcher.transport().requests()[4].param("page"), Some("2"));

    let clean = CleanProcessor::new(&raw_dir, &clean_dir).process(date)?;
    assert_eq!(clean.cleaned_rows, 1);

    let store = StoreReader::new().read_store(&clean_dir.join(STORE_FILE))?;
    assert_eq!(store.records.len(), 1);
    assert_eq!(store.records[0].sensor_id, 12);
    assert_eq!(store.records[0].state.as_deref(), Some("ME"));
    assert_eq!(store.records[0].location_id, Some(2178));

    let parquet_path = temp_dir.path().join("store.parquet");
    let parquet = ParquetWriter::new();
    parquet.write_records(&store.records, &parquet_path)?;
    assert_eq!(parquet.get_file_info(&parquet_path)?.total_rows, 1);

    Ok(())
}

#[tokio::test]
async fn test_empty_location_listing_makes_no_sensor_calls() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let api = FakeApi::new().then_results("[]");
    let fetcher = OpenAqFetcher::new(api, "https://api.test").with_policy(RetryPolicy::immediate());

    let window = QueryWindow::new(
        parse_timestamp("2025-09-01T00:00:00Z").unwrap(),
        parse_timestamp("2025-09-02T00:00:00Z").unwrap(),
        50,
    )?;
    let summary = fetcher
        .run(
            &[Region::new("US", "us")?],
            &window,
            &RawWriter::new(temp_dir.path()),
            None,
        )
        .await?;

    assert_eq!(summary.sensors_discovered, 0);
    assert_eq!(fetcher.transport().urls(), vec!["https://api.test/v3/locations".to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_sensor_abandoned_after_network_failures_does_not_stop_the_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let raw_dir = temp_dir.path().join("raw");

    let mut api = FakeApi::new()
        .then_results(
            r#"[{"id": 2178, "name": "Portland", "sensors": [
                {"id": 11, "parameter": {"name": "pm25"}},
                {"id": 12, "parameter": {"name": "pm25"}}
            ]}]"#,
        )
        .then_results("[]");
    // sensor 11: the first attempt and all five retries fail
    for _ in 0..6 {
        api = api.then_error(TransportError::Connect("connection refused".to_string()));
    }
    // sensor 12
    let api = api
        .then_results(
            r#"[{"parameter": {"name": "pm25"}, "summary": {"avg": 9.1},
                "period": {"datetimeFrom": {"utc": "2025-09-02T00:00:00Z"}}}]"#,
        )
        .then_results("[]");

    let fetcher = OpenAqFetcher::new(api, "https://api.test")
        .with_policy(RetryPolicy::immediate())
        .with_parameters(vec!["pm25".to_string()]);
    let writer = RawWriter::new(&raw_dir);

    let summary = fetcher
        .run(&[Region::new("ME", "-71.1,43.0,-66.9,47.5")?], &window(), &writer, None)
        .await?;

    assert_eq!(summary.sensors_discovered, 2);
    assert_eq!(summary.sensors_abandoned, 1);
    assert_eq!(summary.sensors_completed, 1);
    assert_eq!(summary.retries, 5);
    assert_eq!(summary.records_written, 1);
    assert_eq!(summary.http_calls, 10);

    let urls = fetcher.transport().urls();
    let sensor_11_calls = urls.iter().filter(|u| u.ends_with("/sensors/11/days")).count();
    assert_eq!(sensor_11_calls, 6);
    assert_eq!(urls[8], "https://api.test/v3/sensors/12/days");

    let content = fs::read_to_string(writer.today_path())?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    let record: serde_json::Value = serde_json::from_str(lines[0])?;
    assert_eq!(record["sensor_id"], 12);

    Ok(())
}
