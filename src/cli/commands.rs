use crate::analyzers::StoreAnalyzer;
use crate::cli::args::{Cli, Commands, WindowArgs};
use crate::error::Result;
use crate::fetchers::{FetchSummary, HttpTransport, OpenAqFetcher};
use crate::processors::{CleanProcessor, CleanSummary};
use crate::readers::StoreReader;
use crate::settings::{Settings, SettingsOverrides};
use crate::utils::constants::REQUEST_TIMEOUT;
use crate::utils::filename::{default_parquet_path, today_utc};
use crate::utils::logging::init_logging;
use crate::utils::progress::ProgressReporter;
use crate::writers::{ParquetWriter, RawWriter};
use chrono::NaiveDate;
use tracing::{info, warn};

pub async fn run(cli: Cli) -> Result<()> {
    let window = match &cli.command {
        Commands::Fetch { window } | Commands::Run { window, .. } => window.clone(),
        _ => WindowArgs::default(),
    };
    let overrides = SettingsOverrides {
        data_dir: cli.data_dir.clone(),
        date_from: window.start,
        date_to: window.end,
        page_size: window.limit,
    };
    let settings = Settings::load(cli.config.as_deref(), &overrides)?;

    let log_file = match (&cli.log_file, &cli.command) {
        (Some(path), _) => Some(path.clone()),
        (None, Commands::Fetch { .. } | Commands::Run { .. }) => Some(settings.log_path()),
        (None, _) => None,
    };
    init_logging(cli.verbose, log_file.as_deref())?;

    match cli.command {
        Commands::Fetch { .. } => {
            fetch_stage(&settings, cli.quiet).await?;
        }

        Commands::Clean { date, max_workers } => {
            clean_stage(&settings, date.unwrap_or_else(today_utc), max_workers)?;
        }

        Commands::Run { max_workers, .. } => {
            let date = today_utc();
            fetch_stage(&settings, cli.quiet).await?;
            clean_stage(&settings, date, max_workers)?;
            println!("Pipeline complete!");
        }

        Commands::Info { file, sample } => {
            let path = file.unwrap_or_else(|| settings.store_path());
            println!("Analyzing store: {}", path.display());

            let stats = StoreAnalyzer::new().analyze_store(&path)?;
            println!("\n{}", stats.detailed_summary());

            if sample > 0 {
                let snapshot = StoreReader::new().read_store(&path)?;
                println!("\nSample Records (showing {} records):", sample.min(snapshot.records.len()));
                for (i, record) in snapshot.records.iter().take(sample).enumerate() {
                    println!(
                        "{}. sensor {} ({}, {}) {} on {}: avg={:.3}",
                        i + 1,
                        record.sensor_id,
                        record.sensor_name.as_deref().unwrap_or("unnamed"),
                        record.state.as_deref().unwrap_or("-"),
                        record.sensor_tag,
                        record.datetime_from.date_naive(),
                        record.avg_value
                    );
                }
            }
        }

        Commands::Export {
            output_file,
            compression,
        } => {
            let store_path = settings.store_path();
            let output_file =
                output_file.unwrap_or_else(|| default_parquet_path(&settings.clean_dir(), today_utc()));

            let snapshot = StoreReader::new().read_store(&store_path)?;
            if snapshot.records.is_empty() {
                warn!(store = %store_path.display(), "Store is empty, nothing to export");
                println!("No records to write");
                return Ok(());
            }

            println!(
                "Writing {} records to Parquet file...",
                snapshot.records.len()
            );
            let writer = ParquetWriter::new().with_compression(&compression)?;
            writer.write_records(&snapshot.records, &output_file)?;

            let file_info = writer.get_file_info(&output_file)?;
            println!("\n{}", file_info.summary());
            println!("Export complete: {}", output_file.display());
        }
    }

    Ok(())
}

async fn fetch_stage(settings: &Settings, quiet: bool) -> Result<FetchSummary> {
    let api_key = settings.require_api_key()?;
    let window = settings.window()?;
    let regions = settings.regions()?;

    info!(
        from = %window.date_from,
        to = %window.date_to,
        limit = window.page_size,
        regions = regions.len(),
        "Starting fetch"
    );

    let transport = HttpTransport::new(api_key, REQUEST_TIMEOUT)?;
    let fetcher = OpenAqFetcher::new(transport, &settings.api_base_url)
        .with_parameters(settings.parameters.clone());
    let writer = RawWriter::new(settings.raw_dir());

    let progress = ProgressReporter::new_spinner("Discovering sensors...", quiet);
    let summary = fetcher.run(&regions, &window, &writer, Some(&progress)).await?;
    progress.finish_with_message(&format!(
        "Fetched {} records from {} sensors",
        summary.records_written, summary.sensors_completed
    ));

    println!("\n{}", summary.summary());
    Ok(summary)
}

fn clean_stage(settings: &Settings, date: NaiveDate, max_workers: usize) -> Result<CleanSummary> {
    info!(%date, workers = max_workers, "Starting clean");

    let summary = CleanProcessor::new(settings.raw_dir(), settings.clean_dir())
        .with_max_workers(max_workers)
        .process(date)?;

    println!("\n{}", summary.summary());
    Ok(summary)
}
