use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use sms_processor::completion::CompletionClient;
use sms_processor::config;
use sms_processor::pipeline;
use sms_processor::store::StoreClient;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Process every unprocessed message once and exit"
)]
struct Args {
    /// Optional YAML config file; environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(args.config.as_deref())?;

    let store = StoreClient::from_config(&cfg)?;
    let completer = CompletionClient::from_config(&cfg)?;
    info!(
        table = %cfg.store.table,
        model = %cfg.completion.model,
        variant = %cfg.processor.variant,
        "starting run"
    );

    let mut stdout = std::io::stdout();
    pipeline::run(&store, &completer, cfg.processor.variant, &mut stdout).await?;
    Ok(())
}
