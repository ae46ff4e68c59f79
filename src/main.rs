use anyhow::Result;
use clap::Parser;
use rankx_research::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = cli::Args::parse();
    let config = args.load_config()?;
    logging::init(config.verbose);

    args.execute(config).await
}
