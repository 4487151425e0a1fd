mod app;

use anyhow::{Context, Result, anyhow};
use app::UiApp;
use eframe::NativeOptions;
use wastemon_core::ClientConfig;

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(e) = run() {
        tracing::error!("{e:#}");
        eprintln!("Application stopped with error: {e:#}");
    }
}

fn run() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("wastemon-worker")
        .build()
        .context("cannot start the async runtime")?;

    let config_path = app::config_path();
    let config = match &config_path {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("cannot load settings from {}", path.display()))?,
        None => ClientConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;
    tracing::info!("Classifying against {}", config.classify_endpoint());

    let options = NativeOptions::default();
    eframe::run_native(
        "Wastemon",
        options,
        Box::new(move |cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            let app: Box<dyn eframe::App> = Box::new(UiApp::new(
                cc.egui_ctx.clone(),
                runtime,
                config,
                config_path,
            )?);
            Ok(app)
        }),
    )
    .map_err(|e| anyhow!("{e}"))
}
