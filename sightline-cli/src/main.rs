use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sightline_client::{Detector, OnDeviceDetector, RemoteDetector};
use sightline_core::FrameMeta;
use sightline_core::utils::now_ms;
use sightline_server::{InferenceMode, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sightline", version, about = "Signaling relay and detection server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay, inference and metrics endpoints.
    Serve {
        #[arg(long, env = "SIGHTLINE_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,

        /// Reported by `GET /`: where clients should run detection.
        #[arg(long, env = "MODE", default_value = "wasm")]
        mode: InferenceMode,

        /// Comma-separated allowed origins; empty allows any.
        #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
        cors_origins: Vec<String>,

        #[arg(long, default_value_t = 10_000)]
        metrics_capacity: usize,
    },

    /// Run detection on one image file and print the result as JSON.
    Detect {
        #[arg(value_name = "IMAGE")]
        path: PathBuf,

        /// Server to send the frame to instead of detecting locally.
        #[arg(long)]
        remote: Option<String>,

        #[arg(long, default_value_t = 80)]
        jpeg_quality: u8,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve {
            bind,
            mode,
            cors_origins,
            metrics_capacity,
        } => {
            let config = ServerConfig {
                bind,
                mode,
                cors_origins: cors_origins
                    .into_iter()
                    .filter(|o| !o.trim().is_empty())
                    .collect(),
                metrics_capacity,
                ..Default::default()
            };
            info!(
                "Starting sightline on {} (mode: {}, cors: {:?})",
                config.bind, config.mode, config.cors_origins
            );
            sightline_server::serve(config)
                .await
                .context("Server stopped with an error")?;
        }

        Commands::Detect {
            path,
            remote,
            jpeg_quality,
        } => {
            let frame = image::open(&path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            let detector: Arc<dyn Detector> = match remote {
                Some(url) => Arc::new(RemoteDetector::new(&url, jpeg_quality)?),
                None => Arc::new(OnDeviceDetector::default()),
            };
            debug!("Decoded {} as {}x{}", path.display(), frame.width(), frame.height());

            println!(
                "{} {} with {}",
                "Detecting".cyan().bold(),
                path.display(),
                detector.name()
            );
            let inference = detector
                .infer(Arc::new(frame), FrameMeta::new(1, now_ms()))
                .await?;

            println!(
                "{} {} detections in {} ms",
                "Done:".green().bold(),
                inference.result.detections.len(),
                inference.result.inference_ts - inference.result.recv_ts
            );
            println!("{}", serde_json::to_string_pretty(&inference.result)?);
        }
    }

    Ok(())
}
