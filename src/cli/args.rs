use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "openaq-pipeline")]
#[command(about = "Rate-limited OpenAQ air-quality fetcher and deduplicating store builder")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide the progress bar")]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        help = "Log file path [default: {data_dir}/fetch.log for fetch and run]"
    )]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Config file [default: ./openaq-pipeline.toml if present]")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Root directory for raw and clean data")]
    pub data_dir: Option<PathBuf>,
}

/// Query window flags shared by `fetch` and `run`
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    #[arg(long, help = "Start of the date range (ISO-8601, UTC)")]
    pub start: Option<String>,

    #[arg(long, help = "End of the date range (ISO-8601, UTC)")]
    pub end: Option<String>,

    #[arg(long, help = "Records per page (1-1000)")]
    pub limit: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch daily sensor aggregates into today's raw JSONL file
    Fetch {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Normalise a raw file and merge it into the persisted store
    Clean {
        #[arg(long, help = "Raw file date to process (YYYY-MM-DD) [default: today, UTC]")]
        date: Option<NaiveDate>,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },

    /// Fetch, then clean today's raw file
    Run {
        #[command(flatten)]
        window: WindowArgs,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },

    /// Display statistics about the persisted store
    Info {
        #[arg(short, long, help = "Store CSV [default: {data_dir}/clean/data_store.csv]")]
        file: Option<PathBuf>,

        #[arg(short, long, default_value = "5")]
        sample: usize,
    },

    /// Export the persisted store to Parquet
    Export {
        #[arg(
            short,
            long,
            help = "Output Parquet file path [default: {data_dir}/clean/openaq-store-{YYMMDD}.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(long, default_value = "snappy")]
        compression: String,
    },
}
