use clap::Parser;
use openaq_pipeline::cli::{run, Cli};
use openaq_pipeline::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
