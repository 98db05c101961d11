mod config;

use clap::Parser;
use config::ParrotConfig;
use parrot_audio::{DeliveryPipeline, EngineLoader, SpeechGenerator, TextToSpeechTool};
use parrot_core::{Dispatcher, HttpServer, ParrotError, StdioServer, ToolRegistry};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// Text-to-speech MCP server
#[derive(Parser, Debug)]
#[command(name = "parrot", version, about)]
struct Cli {
    /// Serve over HTTP/SSE instead of stdio
    #[arg(long, visible_alias = "http")]
    sse: bool,

    /// HTTP port [default: 3000]
    #[arg(long)]
    port: Option<u16>,

    /// HTTP bind address [default: 127.0.0.1]
    #[arg(long)]
    host: Option<String>,

    /// TOML config file [default: $PARROT_CONFIG or ./parrot.toml]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
            let _ = e.print();
            return code;
        }
    };

    // Logs go to stderr; stdout belongs to the stdio protocol
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,parrot_core=info,parrot_audio=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(target: "parrot", error = %e, "Failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "parrot", error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ParrotError> {
    let mut cfg = ParrotConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        cfg.http.port = port;
    }
    if let Some(host) = cli.host {
        cfg.http.host = host;
    }

    let dispatcher = Arc::new(build_dispatcher(&cfg)?);

    if cli.sse {
        HttpServer::new(cfg.http, dispatcher).serve().await
    } else {
        StdioServer::new(dispatcher).serve().await
    }
}

/// Wire generator, delivery pipeline and the tool into a dispatcher
fn build_dispatcher(cfg: &ParrotConfig) -> Result<Dispatcher, ParrotError> {
    // The engine is probed lazily on the first call, not at startup
    let generator = Arc::new(SpeechGenerator::new(Arc::new(EngineLoader::new(
        cfg.speech.engine.clone(),
    ))));

    let pipeline = DeliveryPipeline::from_config(&cfg.delivery)
        .map_err(|e| ParrotError::ConfigError(e.to_string()))?;
    info!(target: "parrot", backends = ?pipeline.backend_names(), "Audio delivery ready");

    let tool = TextToSpeechTool::new(generator, Arc::new(pipeline))
        .with_defaults(cfg.speech.default_voice.clone(), cfg.speech.default_speed);

    let registry = ToolRegistry::new();
    registry.register(Arc::new(tool));
    Ok(Dispatcher::new(registry))
}
