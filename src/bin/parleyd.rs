use clap::Parser;
use parley::config::Config;
use parley::daemon;
use parley::error::Result;

#[derive(Parser, Debug)]
#[command(name = "parleyd")]
#[command(about = "Parley web chat server for a local Ollama model")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("PARLEY_GIT_SHA")))]
struct Cli {
    #[arg(long, env = "PARLEY_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "PARLEY_PORT", default_value_t = 5000)]
    port: u16,

    /// JSON config file; missing sections fall back to defaults.
    #[arg(long, env = "PARLEY_CONFIG")]
    config: Option<String>,

    #[arg(long = "ollama-url", env = "OLLAMA_URL")]
    ollama_url: Option<String>,

    #[arg(long, env = "OLLAMA_MODEL")]
    model: Option<String>,

    #[arg(long, env = "PARLEY_ARCHIVE_DIR")]
    archive_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    parley::logging::init_tracing("parleyd");
    if let Ok(path) = &dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::convention_defaults(),
    }
    .with_overrides(cli.ollama_url, cli.model, cli.archive_dir)?;

    daemon::run_with_shutdown(&cli.host, cli.port, config, async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown requested"),
            Err(err) => {
                tracing::warn!("Ctrl-C handler unavailable: {err}");
                futures::future::pending::<()>().await;
            }
        }
    })
    .await
}
