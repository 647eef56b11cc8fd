use std::time::Duration;

/// OpenAQ API
pub const DEFAULT_API_BASE_URL: &str = "https://api.openaq.org";
pub const LOCATIONS_PATH: &str = "/v3/locations";
pub const SENSORS_PATH: &str = "/v3/sensors";
pub const SENSOR_DAYS_SUFFIX: &str = "days";
pub const API_KEY_HEADER: &str = "x-api-key"; // lowercase, HeaderName::from_static rejects uppercase
pub const ENV_PREFIX: &str = "OPENAQ";

/// Retry and throttling
pub const MAX_RETRIES: u32 = 5;
pub const WAIT_TIME: Duration = Duration::from_secs(2);
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(10);
pub const INTER_REQUEST_DELAY: Duration = Duration::from_secs(1);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Directory and file names
pub const DEFAULT_DATA_DIR: &str = "data";
pub const RAW_DIR: &str = "raw";
pub const CLEAN_DIR: &str = "clean";
pub const RAW_FILE_EXTENSION: &str = "jsonl";
pub const STORE_FILE: &str = "data_store.csv";
pub const CLEANED_FILE_PREFIX: &str = "cleaned_data_";
pub const CONFIG_FILE_STEM: &str = "openaq-pipeline";

/// Query defaults
pub const DEFAULT_DATE_FROM: &str = "2025-09-01T00:00:00Z";
pub const DEFAULT_DATE_TO: &str = "2025-09-07T23:59:59Z";
pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const MIN_PAGE_SIZE: u32 = 1;
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_PARAMETERS: [&str; 4] = ["pm25", "pm10", "no2", "o3"];
pub const DEFAULT_REGION: &str = "ME";
pub const DEFAULT_REGION_BBOX: &str = "-71.1,43.0,-66.9,47.5";

/// Store columns, in file order
pub const STORE_COLUMNS: [&str; 8] = [
    "sensor_id",
    "sensor_name",
    "location_id",
    "state",
    "sensor_tag",
    "avg_value",
    "datetime_from",
    "datetime_to",
];

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
