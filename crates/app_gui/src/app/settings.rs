//! Settings panel rendering for the classifier endpoint and request limits.

use super::{Panel, UiApp};
use anyhow::Result;
use eframe::egui;
use wastemon_core::{ClientConfig, HttpClassifier};

impl UiApp {
    /// Renders the settings screen. Changes apply from the next classification round.
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Classifier URL");
            ui.text_edit_singleline(&mut self.pending_api_url);
        });
        ui.label(format!(
            "Images are posted to {}/classify",
            self.pending_api_url.trim().trim_end_matches('/')
        ));
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Parallel requests");
            ui.add(
                egui::DragValue::new(&mut self.pending_max_concurrent)
                    .range(1..=32)
                    .speed(1),
            );
        });
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Request timeout");
            ui.add(
                egui::DragValue::new(&mut self.pending_timeout_secs)
                    .range(0..=600)
                    .speed(1)
                    .suffix(" s"),
            );
            ui.label("(0 waits indefinitely)");
        });

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui.button("Apply").clicked() {
                self.status = match self.apply_settings() {
                    Ok(()) => {
                        self.panel = Panel::Queue;
                        "Settings applied.".to_string()
                    }
                    Err(e) => format!("Settings not applied: {e:#}"),
                };
            }
            if ui.button("Revert").clicked() {
                self.pending_api_url = self.config.api_url.clone();
                self.pending_max_concurrent = self.config.max_concurrent_requests;
                self.pending_timeout_secs = self.config.request_timeout_secs.unwrap_or(0);
            }
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("About");
        ui.label(format!("App version: {}", self.app_version));
        match &self.config_path {
            Some(path) => ui.label(format!("Settings file: {}", path.display())),
            None => ui.label("Settings are not saved: no config directory available."),
        };
    }

    fn apply_settings(&mut self) -> Result<()> {
        let config = ClientConfig {
            api_url: self.pending_api_url.trim().to_string(),
            max_concurrent_requests: self.pending_max_concurrent,
            request_timeout_secs: Some(self.pending_timeout_secs).filter(|secs| *secs > 0),
        };
        config.validate()?;
        let classifier = HttpClassifier::new(&config)?;
        if let Some(path) = &self.config_path {
            config.save(path)?;
        }
        self.manager
            .reconfigure(classifier, config.max_concurrent_requests);
        tracing::info!("Classifying against {}", config.classify_endpoint());
        self.config = config;
        Ok(())
    }
}
