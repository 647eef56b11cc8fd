use crate::error::Result;
use crate::fetchers::paginator::{PageStats, PageWalker, WalkEnd};
use crate::fetchers::retry::RetryPolicy;
use crate::fetchers::transport::{ApiRequest, Transport};
use crate::models::{QueryWindow, Region, SensorDescriptor};
use crate::utils::constants::{LOCATIONS_PATH, SENSORS_PATH, SENSOR_DAYS_SUFFIX};
use crate::utils::progress::ProgressReporter;
use crate::writers::RawWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Sensors found for one region, plus how the locations walk went
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub sensors: Vec<SensorDescriptor>,
    pub locations: usize,
    pub filtered_out: usize,
    pub stats: PageStats,
    pub end: Option<WalkEnd>,
}

/// Outcome of walking one sensor's daily measurements
#[derive(Debug, Clone, PartialEq)]
pub struct SensorFetch {
    pub records_written: usize,
    pub stats: PageStats,
    pub end: Option<WalkEnd>,
}

impl SensorFetch {
    pub fn is_abandoned(&self) -> bool {
        matches!(self.end, Some(WalkEnd::Abandoned(_)))
    }
}

/// Counts surfaced at the end of the fetch stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub raw_file: Option<PathBuf>,
    pub regions: usize,
    pub regions_abandoned: usize,
    pub sensors_discovered: usize,
    pub sensors_completed: usize,
    pub sensors_abandoned: usize,
    pub sensors_without_data: usize,
    pub pages: usize,
    pub records_written: usize,
    pub http_calls: usize,
    pub retries: usize,
    pub rate_limited: usize,
}

impl FetchSummary {
    fn absorb(&mut self, stats: PageStats) {
        self.pages += stats.pages;
        self.http_calls += stats.calls;
        self.retries += stats.retries;
        self.rate_limited += stats.rate_limited;
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Fetch Stage Report ===\n");
        if let Some(path) = &self.raw_file {
            summary.push_str(&format!("Raw file: {}\n", path.display()));
        }
        summary.push_str(&format!(
            "Regions: {} ({} abandoned)\n",
            self.regions, self.regions_abandoned
        ));
        summary.push_str(&format!("Sensors discovered: {}\n", self.sensors_discovered));
        summary.push_str(&format!("  Completed: {}\n", self.sensors_completed));
        summary.push_str(&format!("  Without data: {}\n", self.sensors_without_data));
        summary.push_str(&format!("  Abandoned: {}\n", self.sensors_abandoned));
        summary.push_str(&format!("Pages: {}\n", self.pages));
        summary.push_str(&format!("Raw records written: {}\n", self.records_written));
        summary.push_str(&format!(
            "HTTP calls: {} (retries: {}, rate limited: {})\n",
            self.http_calls, self.retries, self.rate_limited
        ));

        summary
    }
}

/// Walks the OpenAQ locations and sensor-days endpoints and appends every
/// measurement page to the raw store
pub struct OpenAqFetcher<T: Transport> {
    transport: T,
    base_url: String,
    policy: RetryPolicy,
    parameters: Vec<String>,
}

impl<T: Transport> OpenAqFetcher<T> {
    pub fn new(transport: T, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
            parameters: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Only keep sensors measuring one of these pollutants; empty keeps all
    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn locations_url(&self) -> String {
        format!("{}{}", self.base_url, LOCATIONS_PATH)
    }

    fn sensor_days_url(&self, sensor_id: u64) -> String {
        format!(
            "{}{}/{}/{}",
            self.base_url, SENSORS_PATH, sensor_id, SENSOR_DAYS_SUFFIX
        )
    }

    pub async fn discover_sensors(&self, region: &Region, window: &QueryWindow) -> Discovery {
        let (key, value) = region.filter.query_param();
        let request = ApiRequest::new(self.locations_url()).with_param(key, value);
        let mut walker = PageWalker::new(&self.transport, request, window.page_size, self.policy)
            .with_label(format!("region {}", region.tag));

        let mut sensors = Vec::new();
        let mut locations = 0;
        let mut filtered_out = 0;

        while let Some(batch) = walker.next_batch().await {
            locations += batch.len();
            for location in &batch {
                for sensor in SensorDescriptor::from_location(location, &region.tag) {
                    if sensor.measures_any(&self.parameters) {
                        sensors.push(sensor);
                    } else {
                        filtered_out += 1;
                    }
                }
            }
            info!(region = %region.tag, locations = batch.len(), "Fetched locations page");
        }

        let (stats, end) = walker.into_parts();
        info!(
            region = %region.tag,
            filter = %region.filter,
            locations,
            sensors = sensors.len(),
            skipped_parameters = filtered_out,
            "Finished sensor discovery"
        );

        Discovery {
            sensors,
            locations,
            filtered_out,
            stats,
            end,
        }
    }

    /// Page through one sensor's daily aggregates, appending each page to
    /// `raw_path` as soon as it arrives. Raw-store I/O failures are fatal.
    pub async fn fetch_sensor(
        &self,
        sensor: &SensorDescriptor,
        window: &QueryWindow,
        writer: &RawWriter,
        raw_path: &Path,
    ) -> Result<SensorFetch> {
        let request =
            ApiRequest::new(self.sensor_days_url(sensor.sensor_id)).with_params(window.date_params());
        let mut walker = PageWalker::new(&self.transport, request, window.page_size, self.policy)
            .with_label(format!("sensor {}", sensor.sensor_id));

        let mut records_written = 0;
        while let Some(mut batch) = walker.next_batch().await {
            for record in batch.iter_mut() {
                sensor.enrich(record);
            }
            records_written += writer.append_batch(raw_path, &batch)?;
            info!(
                sensor_id = sensor.sensor_id,
                records = batch.len(),
                file = %raw_path.display(),
                "Saved measurements"
            );
        }

        let (stats, end) = walker.into_parts();
        Ok(SensorFetch {
            records_written,
            stats,
            end,
        })
    }

    /// Discover sensors for every region, then fetch each sensor in turn.
    /// Abandoned regions and sensors are skipped, never fatal.
    pub async fn run(
        &self,
        regions: &[Region],
        window: &QueryWindow,
        writer: &RawWriter,
        progress: Option<&ProgressReporter>,
    ) -> Result<FetchSummary> {
        let raw_path = writer.today_path();
        let mut summary = FetchSummary {
            raw_file: Some(raw_path.clone()),
            ..FetchSummary::default()
        };

        let mut sensors = Vec::new();
        for region in regions {
            if let Some(progress) = progress {
                progress.set_message(&format!("Discovering sensors in {}", region.tag));
            }

            let discovery = self.discover_sensors(region, window).await;
            summary.regions += 1;
            summary.absorb(discovery.stats);
            if matches!(discovery.end, Some(WalkEnd::Abandoned(_))) {
                summary.regions_abandoned += 1;
                warn!(
                    region = %region.tag,
                    kept = discovery.sensors.len(),
                    "Location listing abandoned, continuing with sensors found so far"
                );
            }
            sensors.extend(discovery.sensors);
        }

        summary.sensors_discovered = sensors.len();
        info!(sensors = sensors.len(), regions = regions.len(), "Fetching sensor measurements");

        if let Some(progress) = progress {
            progress.start_sensors(sensors.len() as u64);
        }

        for sensor in &sensors {
            if let Some(progress) = progress {
                progress.set_message(&format!("Sensor {} ({})", sensor.sensor_id, sensor.state));
            }

            let fetch = self.fetch_sensor(sensor, window, writer, &raw_path).await?;
            summary.absorb(fetch.stats);
            summary.records_written += fetch.records_written;

            if fetch.is_abandoned() {
                summary.sensors_abandoned += 1;
            } else if fetch.records_written == 0 {
                summary.sensors_without_data += 1;
            } else {
                summary.sensors_completed += 1;
            }

            if let Some(progress) = progress {
                progress.increment(1);
            }
        }

        info!(
            completed = summary.sensors_completed,
            abandoned = summary.sensors_abandoned,
            without_data = summary.sensors_without_data,
            pages = summary.pages,
            records = summary.records_written,
            "Fetch finished"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::testing::ScriptedTransport;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    fn window() -> QueryWindow {
        let ts = |s: &str| DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc);
        QueryWindow::new(ts("2025-09-01T00:00:00Z"), ts("2025-09-07T23:59:59Z"), 200).unwrap()
    }

    fn maine() -> Region {
        Region::new("ME", "-71.1,43.0,-66.9,47.5").unwrap()
    }

    fn fetcher(transport: ScriptedTransport) -> OpenAqFetcher<ScriptedTransport> {
        OpenAqFetcher::new(transport, "https://api.test/")
            .with_policy(RetryPolicy::immediate())
            .with_parameters(vec!["pm25".to_string(), "o3".to_string()])
    }

    const LOCATIONS: &str = r#"[{
        "id": 2178,
        "name": "Portland",
        "sensors": [
            {"id": 11, "parameter": {"name": "pm25"}},
            {"id": 12, "parameter": {"name": "o3"}},
            {"id": 13, "parameter": {"name": "temperature"}}
        ]
    }]"#;

    const DAY: &str = r#"[{
        "value": 12.3,
        "parameter": {"name": "o3", "units": "ppm"},
        "period": {
            "datetimeFrom": {"utc": "2025-09-01T00:00:00Z"},
            "datetimeTo": {"utc": "2025-09-02T00:00:00Z"}
        },
        "summary": {"avg": 0.031}
    }]"#;

    #[tokio::test]
    async fn test_empty_locations_page_fetches_nothing() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let writer = RawWriter::new(temp_dir.path().join("raw"));
        let fetcher = fetcher(ScriptedTransport::new().then_results("[]"));

        let summary = fetcher.run(&[maine()], &window(), &writer, None).await?;

        assert_eq!(summary.sensors_discovered, 0);
        assert_eq!(summary.http_calls, 1);
        assert_eq!(fetcher.transport().requests().len(), 1);
        assert!(!writer.today_path().exists());

        Ok(())
    }

    #[tokio::test]
    async fn test_discovery_filters_parameters() {
        let fetcher = fetcher(ScriptedTransport::new().then_results(LOCATIONS).then_results("[]"));

        let discovery = fetcher.discover_sensors(&maine(), &window()).await;

        let ids: Vec<u64> = discovery.sensors.iter().map(|s| s.sensor_id).collect();
        assert_eq!(ids, vec![11, 12]);
        assert_eq!(discovery.filtered_out, 1);
        assert_eq!(discovery.locations, 1);
        assert_eq!(discovery.end, Some(WalkEnd::Exhausted));

        let requests = fetcher.transport().requests();
        assert_eq!(requests[0].url, "https://api.test/v3/locations");
        assert_eq!(requests[0].param("bbox"), Some("-71.1,43,-66.9,47.5"));
        assert_eq!(requests[0].param("date_from"), None);
        assert_eq!(requests[1].param("page"), Some("2"));
    }

    #[tokio::test]
    async fn test_abandoned_sensor_does_not_stop_the_run() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let writer = RawWriter::new(temp_dir.path().join("raw"));
        let transport = ScriptedTransport::new()
            .then_results(LOCATIONS)
            .then_results("[]")
            .then_status(500) // sensor 11
            .then_results(DAY) // sensor 12, page 1
            .then_results("[]");
        let fetcher = fetcher(transport);

        let summary = fetcher.run(&[maine()], &window(), &writer, None).await?;

        assert_eq!(summary.sensors_discovered, 2);
        assert_eq!(summary.sensors_abandoned, 1);
        assert_eq!(summary.sensors_completed, 1);
        assert_eq!(summary.records_written, 1);
        assert_eq!(summary.http_calls, 5);

        let requests = fetcher.transport().requests();
        assert_eq!(requests[3].url, "https://api.test/v3/sensors/12/days");
        assert_eq!(requests[3].param("date_from"), Some("2025-09-01T00:00:00Z"));
        assert_eq!(requests[3].param("date_to"), Some("2025-09-07T23:59:59Z"));

        let content = fs::read_to_string(writer.today_path())?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);

        let record: Value = serde_json::from_str(lines[0])?;
        assert_eq!(record["sensor_id"], 12);
        assert_eq!(record["sensor_name"], "Portland");
        assert_eq!(record["location_id"], 2178);
        assert_eq!(record["state"], "ME");

        Ok(())
    }

    #[tokio::test]
    async fn test_sensor_not_found_counts_as_no_data() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let writer = RawWriter::new(temp_dir.path().join("raw"));
        let transport = ScriptedTransport::new()
            .then_results(r#"[{"id": 1, "name": "Bangor", "sensors": [{"id": 21, "parameter": {"name": "pm25"}}]}]"#)
            .then_results("[]")
            .then_status(404);
        let fetcher = fetcher(transport);

        let summary = fetcher.run(&[maine()], &window(), &writer, None).await?;

        assert_eq!(summary.sensors_without_data, 1);
        assert_eq!(summary.sensors_abandoned, 0);
        assert_eq!(summary.records_written, 0);

        Ok(())
    }
}
