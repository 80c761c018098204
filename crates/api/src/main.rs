//! Drowsiness Monitor - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, settings::Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_logging(&settings.logging)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Camera probe via {} ({})", settings.camera.ffmpeg_program, settings.camera.input_format);

    run_server(settings).await
}
