mod queue_panel;
mod settings;

use anyhow::Result;
use directories_next::ProjectDirs;
use eframe::{App, Frame, egui};
use std::path::PathBuf;
use tokio::runtime::Runtime;
use wastemon_core::{
    ClientConfig, HttpClassifier, ImageFile, QueueEvent, QueueManager, RoundId, RoundSummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Panel {
    Queue,
    Settings,
}

pub(crate) struct UiApp {
    // Dropped before the runtime so outstanding work is cancelled first.
    manager: QueueManager<HttpClassifier>,
    _runtime: Runtime,
    config: ClientConfig,
    config_path: Option<PathBuf>,
    panel: Panel,
    status: String,
    /// Round started from the Classify button; reports from older rounds are ignored.
    latest_round: Option<RoundId>,
    recursive_scan: bool,
    pending_api_url: String,
    pending_max_concurrent: usize,
    pending_timeout_secs: u64,
    app_version: &'static str,
}

/// Location of `config.toml` in the platform config directory.
pub(crate) fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "Wastemon", "Wastemon")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl UiApp {
    pub(crate) fn new(
        ctx: egui::Context,
        runtime: Runtime,
        config: ClientConfig,
        config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let classifier = HttpClassifier::new(&config)?;
        let manager = QueueManager::new(
            classifier,
            config.max_concurrent_requests,
            runtime.handle().clone(),
        )
        .with_notifier(move || ctx.request_repaint());
        Ok(Self {
            manager,
            _runtime: runtime,
            pending_api_url: config.api_url.clone(),
            pending_max_concurrent: config.max_concurrent_requests,
            pending_timeout_secs: config.request_timeout_secs.unwrap_or(0),
            config,
            config_path,
            panel: Panel::Queue,
            status: String::new(),
            latest_round: None,
            recursive_scan: false,
            app_version: env!("WASTEMON_VERSION"),
        })
    }

    fn on_event(&mut self, event: QueueEvent) {
        match event {
            QueueEvent::BatchAdded { ids, dropped } => {
                self.status = if dropped > 0 {
                    format!("Added {} image(s), {dropped} could not be read", ids.len())
                } else {
                    format!("Added {} image(s)", ids.len())
                };
            }
            QueueEvent::ClassificationFailed { error, .. } => {
                self.status = format!("Classification failed: {error}");
            }
            QueueEvent::RoundFinished { round, summary } => {
                if self.latest_round != Some(round) {
                    return;
                }
                self.latest_round = None;
                if let Some(status) = round_status(&summary) {
                    self.status = status;
                }
            }
            QueueEvent::Classified { .. } | QueueEvent::Discarded { .. } => {}
        }
    }

    /// Drops are unfiltered: whatever the user lets go of is queued.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if dropped.is_empty() {
            return;
        }
        ctx.input_mut(|i| i.raw.dropped_files.clear());

        let mut files = Vec::with_capacity(dropped.len());
        for file in dropped {
            if let Some(path) = file.path {
                match ImageFile::from_path(&path) {
                    Ok(f) => files.push(f),
                    Err(e) => tracing::warn!("Ignoring dropped file: {e:#}"),
                }
            } else if let Some(bytes) = file.bytes {
                files.push(ImageFile::from_bytes(file.name, bytes).with_mime(file.mime));
            }
        }
        self.manager.add_files(files);
    }

    fn paint_drop_overlay(&self, ctx: &egui::Context) {
        if ctx.input(|i| i.raw.hovered_files.is_empty()) {
            return;
        }
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("drop-overlay"),
        ));
        let screen = ctx.screen_rect();
        painter.rect_filled(
            screen,
            0.0,
            egui::Color32::from_rgba_unmultiplied(102, 74, 0, 204),
        );
        painter.text(
            screen.center(),
            egui::Align2::CENTER_CENTER,
            "Drop image here",
            egui::FontId::proportional(36.0),
            egui::Color32::WHITE,
        );
    }
}

/// Status line for a finished round, or `None` when every request was cancelled.
fn round_status(summary: &RoundSummary) -> Option<String> {
    match (summary.classified, summary.failed) {
        (0, 0) => None,
        (classified, 0) => Some(format!("Classified {classified} image(s)")),
        (classified, failed) => Some(format!("Classified {classified} image(s), {failed} failed")),
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        for event in self.manager.poll() {
            self.on_event(event);
        }
        self.handle_dropped_files(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.panel, Panel::Queue, "Upload");
                ui.selectable_value(&mut self.panel, Panel::Settings, "Settings");
                if !self.status.is_empty() {
                    ui.separator();
                    ui.label(&self.status);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.panel {
            Panel::Queue => self.render_queue_panel(ui),
            Panel::Settings => self.render_settings_panel(ui),
        });

        self.paint_drop_overlay(ctx);
    }
}
