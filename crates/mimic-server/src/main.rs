use anyhow::Context;
use clap::{Parser, ValueEnum};
use mimic_server::config::{Config, ConfigOverrides};
use mimic_server::{AppState, EmulatorServer};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Mimic - scripted OpenAI-compatible API emulator
#[derive(Parser, Debug)]
#[command(name = "mimic")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log requests and expose /_emulator/state
    #[arg(long, env = "DEBUG")]
    debug: bool,

    /// Delay between streamed events in milliseconds
    #[arg(long, env = "STREAM_DELAY_MS")]
    stream_delay_ms: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, env = "LOG_FORMAT", default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            debug: self.debug.then_some(true),
            stream_delay_ms: self.stream_delay_ms,
        }
    }
}

fn init_tracing(format: LogFormat, debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Could not install SIGTERM handler: {}", e),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    }
    .with_overrides(args.overrides())?;

    init_tracing(args.log_format, config.debug);

    let addr = config.listen.socket_addr()?;
    let server = EmulatorServer::bind(addr, AppState::from_config(&config)).await?;
    server.run_until(shutdown_signal()).await?;

    info!("Server exited");
    Ok(())
}
