use anyhow::Context;
use clap::Parser;
use fin_server::{AppState, run_server};
use fin_utils::{AppConfig, init_tracing};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "fin-server", version, about = "Financial assistant REST API")]
struct Cli {
    /// Address to bind, overrides FIN_BIND_ADDR
    #[arg(long)]
    bind: Option<String>,

    /// SQLite URL for the journal, overrides FIN_DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("loading configuration")?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    config.validate().context("validating configuration")?;
    init_tracing(config.log_format);

    info!(
        provider = ?config.llm_provider,
        model = %config.llm_model,
        database = %config.database_url,
        "Starting fin-server"
    );
    let state = AppState::from_config(&config).await?;
    run_server(state, &config.bind_addr).await
}
