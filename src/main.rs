use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use sketch_agent::{
    GeminiClient, ImageReference, PipelineRouter, RouteOutcome,
    config::AppConfig,
    orchestrator::{PipelineModels, process_image},
    server::run_server,
    util::LocalTimer,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = AppConfig::load()?;
    let client = GeminiClient::from_config(&config.gemini)?;
    let router = Arc::new(PipelineRouter::new(
        client,
        PipelineModels::from(&config.gemini),
    ));

    match env::args_os().nth(1) {
        Some(path) => run_once(&router, Path::new(&path)).await,
        None => run_server(config.server.bind_addr, router).await,
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_timer(LocalTimer)
        .init();

    info!("tracing initialized");
}

/// Processes a single canvas export from disk.
async fn run_once(router: &PipelineRouter<GeminiClient>, path: &Path) -> anyhow::Result<()> {
    let image = ImageReference::load_path(path)
        .await
        .with_context(|| format!("读取画布图片 {:?} 失败", path))?;

    match process_image(router, &image).await? {
        RouteOutcome::Answer { text } => println!("{text}"),
        RouteOutcome::ImprovedImage { image } => {
            let output = improved_path(path, image.file_extension());
            tokio::fs::write(&output, image.decode().await?)
                .await
                .with_context(|| format!("写入优化后的图片 {:?} 失败", output))?;
            println!("{}", output.display());
        }
    }

    Ok(())
}

fn improved_path(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "canvas".to_string());
    input.with_file_name(format!("{stem}.improved.{extension}"))
}
