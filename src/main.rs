//! Command-line entry point.
//!
//! Loads the given URLs with the configured engine and prints one JSON
//! document per line on stdout. Settings come from flags, the environment
//! or a `.env` file.

use std::io::Write;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use log::info;

use safe_web_loader::config::{LogFormat, LogLevel};
use safe_web_loader::initialization::{init_crypto_provider, init_logger_with};
use safe_web_loader::{LoaderFactory, LoaderOptions, Settings};

#[derive(Debug, Parser)]
#[command(name = "safe_web_loader", version, about)]
struct Cli {
    /// URLs to load, in order
    #[arg(required = true)]
    urls: Vec<String>,

    /// Fetch engine (`safe_web` or `playwright`); unknown names use `safe_web`
    #[arg(long, env = "RAG_WEB_LOADER_ENGINE", default_value = "safe_web")]
    engine: String,

    /// Allow URLs resolving to private addresses
    #[arg(long, env = "ENABLE_RAG_LOCAL_WEB_FETCH")]
    allow_local: bool,

    /// WebSocket endpoint of a remote browser
    #[arg(long, env = "PLAYWRIGHT_WS_URI")]
    remote_browser: Option<String>,

    /// Maximum requests per second
    #[arg(long, env = "RAG_WEB_LOADER_REQUESTS_PER_SECOND", default_value_t = 2.0)]
    requests_per_second: f64,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Use proxy settings from the environment
    #[arg(long)]
    trust_env: bool,

    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    #[arg(long, value_enum, default_value = "plain")]
    log_format: LogFormat,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            enable_local_web_fetch: self.allow_local,
            web_loader_engine: self.engine.clone(),
            remote_browser_endpoint: self.remote_browser.clone().filter(|s| !s.is_empty()),
            requests_per_second: self.requests_per_second,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;
    init_crypto_provider();

    let factory = LoaderFactory::new(cli.settings());
    let options = LoaderOptions {
        verify_ssl: !cli.insecure,
        requests_per_second: Some(cli.requests_per_second),
        trust_env: cli.trust_env,
    };
    let loader = factory
        .aget_loader(cli.urls.clone(), options)
        .await
        .context("URL validation failed")?;
    info!(
        "Loading {} of {} URL(s) with engine '{}'",
        loader.urls().len(),
        cli.urls.len(),
        loader.engine()
    );

    let mut stdout = std::io::stdout().lock();
    let mut documents = loader.alazy_load();
    while let Some(result) = documents.next().await {
        match result {
            Ok(doc) => {
                let line = serde_json::to_string(&doc).context("Failed to encode document")?;
                writeln!(stdout, "{line}").context("Failed to write to stdout")?;
            }
            Err(e) => {
                eprintln!("safe_web_loader error: {e}");
                process::exit(1);
            }
        }
    }

    loader.stats().log_summary();
    Ok(())
}
