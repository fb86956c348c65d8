use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voice_relay::audio::DEFAULT_SAMPLE_RATE;
use voice_relay::client::{ConsoleSpeech, TurnResult, WavFileOutput};
use voice_relay::config::DEFAULT_CONFIG_PATH;
use voice_relay::{create_router, AppState, AudioFile, ChatController, Config, RelayClient};

/// Relay chat turns to a realtime voice model
#[derive(Parser, Debug)]
#[command(name = "voice-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (extension optional)
    #[arg(short = 'c', long = "config", global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the relay HTTP server
    Serve {
        /// Override the bind address
        #[arg(long)]
        bind: Option<String>,

        /// Override the port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Chat with a running relay from the terminal
    Chat {
        /// Relay origin
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,

        /// Directory reply audio is written to
        #[arg(long, default_value = "replies")]
        out: PathBuf,

        /// Deflate recorded audio before sending
        #[arg(long)]
        compress: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Both TLS clients need a process-wide provider; ignore if already set
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { bind, port } => serve(&cli.config, bind, port).await,
        Command::Chat { url, out, compress } => chat(&url, out, compress).await,
    }
}

async fn serve(config_path: &str, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let mut cfg = Config::load(config_path)?;
    if let Some(bind) = bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = port {
        cfg.service.http.port = port;
    }

    let settings = cfg.relay_settings()?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Upstream: {} (model {})", settings.url, settings.model);
    info!("Turn timeout: {:?}", settings.turn_timeout);

    let router = create_router(AppState::new(settings));

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server error")
}

async fn chat(url: &str, out: PathBuf, compress: bool) -> Result<()> {
    let transport = RelayClient::new(url)?;
    let output = WavFileOutput::new(out)?;
    let mut controller =
        ChatController::new(transport, output, ConsoleSpeech).with_compression(compress);

    println!("Connected to {}. Type a message, /wav <file> to send a recording, /quit to exit.", url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();

        let result = if line == "/quit" {
            break;
        } else if let Some(path) = line.strip_prefix("/wav ") {
            let samples = match AudioFile::open(path.trim())
                .and_then(|audio| audio.to_mono(DEFAULT_SAMPLE_RATE))
            {
                Ok(samples) => samples,
                Err(e) => {
                    warn!("{:#}", e);
                    continue;
                }
            };
            controller.start_recording()?;
            controller.push_samples(&samples);
            controller.stop_recording().await?
        } else {
            controller.send_text(line).await?
        };

        if result == TurnResult::Skipped {
            continue;
        }
        if let Some(reply) = controller.transcript().last() {
            println!("assistant: {}", reply.content);
        }
    }

    Ok(())
}
