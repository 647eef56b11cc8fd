use crate::error::{ProcessingError, Result};
use crate::models::{parse_timestamp, QueryWindow, Region};
use crate::utils::constants::{
    CLEAN_DIR, CONFIG_FILE_STEM, DEFAULT_API_BASE_URL, DEFAULT_DATA_DIR, DEFAULT_DATE_FROM,
    DEFAULT_DATE_TO, DEFAULT_PAGE_SIZE, DEFAULT_PARAMETERS, DEFAULT_REGION, DEFAULT_REGION_BBOX,
    ENV_PREFIX, RAW_DIR, STORE_FILE,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use validator::Validate;

const LOG_FILE: &str = "fetch.log";

/// Values given on the command line; each one beats every other layer
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub data_dir: Option<PathBuf>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page_size: Option<u32>,
}

/// Immutable run configuration, resolved once at startup
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[validate(length(min = 1))]
    pub api_base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    pub data_dir: PathBuf,

    pub date_from: String,
    pub date_to: String,

    #[validate(range(min = 1, max = 1000))]
    pub page_size: u32,

    #[serde(default)]
    pub parameters: Vec<String>,

    /// Region tag -> bbox (`min_lon,min_lat,max_lon,max_lat`) or country code
    #[serde(default)]
    pub regions: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            date_from: DEFAULT_DATE_FROM.to_string(),
            date_to: DEFAULT_DATE_TO.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            parameters: DEFAULT_PARAMETERS.iter().map(|p| p.to_string()).collect(),
            regions: default_regions(),
        }
    }
}

fn default_regions() -> BTreeMap<String, String> {
    BTreeMap::from([(DEFAULT_REGION.to_string(), DEFAULT_REGION_BBOX.to_string())])
}

impl Settings {
    /// Layer built-in defaults, the optional config file, `OPENAQ_*`
    /// environment variables and command-line overrides, lowest first.
    ///
    /// Without `config_path` an `openaq-pipeline.{toml,yaml,json}` in the
    /// working directory is picked up if present.
    pub fn load(config_path: Option<&Path>, overrides: &SettingsOverrides) -> Result<Self> {
        let file = match config_path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(CONFIG_FILE_STEM).required(false),
        };

        let config = Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("data_dir", DEFAULT_DATA_DIR)?
            .set_default("date_from", DEFAULT_DATE_FROM)?
            .set_default("date_to", DEFAULT_DATE_TO)?
            .set_default("page_size", i64::from(DEFAULT_PAGE_SIZE))?
            .set_default(
                "parameters",
                DEFAULT_PARAMETERS
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>(),
            )?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("parameters"),
            )
            .set_override_option(
                "data_dir",
                overrides
                    .data_dir
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("date_from", overrides.date_from.clone())?
            .set_override_option("date_to", overrides.date_to.clone())?
            .set_override_option("page_size", overrides.page_size.map(i64::from))?
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        if settings.regions.is_empty() {
            settings.regions = default_regions();
        }
        settings.validate()?;

        Ok(settings)
    }

    /// The key must be present and non-blank before any request goes out
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ProcessingError::MissingCredential),
        }
    }

    pub fn window(&self) -> Result<QueryWindow> {
        let date_from = parse_timestamp(&self.date_from).ok_or_else(|| {
            ProcessingError::Config(format!("Invalid start date '{}'", self.date_from))
        })?;
        let date_to = parse_timestamp(&self.date_to).ok_or_else(|| {
            ProcessingError::Config(format!("Invalid end date '{}'", self.date_to))
        })?;

        QueryWindow::new(date_from, date_to, self.page_size)
    }

    pub fn regions(&self) -> Result<Vec<Region>> {
        if self.regions.is_empty() {
            return Err(ProcessingError::Config("No regions configured".to_string()));
        }

        self.regions
            .iter()
            .map(|(tag, filter)| Region::new(tag, filter))
            .collect()
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join(RAW_DIR)
    }

    pub fn clean_dir(&self) -> PathBuf {
        self.data_dir.join(CLEAN_DIR)
    }

    pub fn store_path(&self) -> PathBuf {
        self.clean_dir().join(STORE_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }
}
