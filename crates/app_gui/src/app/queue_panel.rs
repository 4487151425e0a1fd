//! Upload panel: intake buttons, the queue list and the classify action.

use super::UiApp;
use eframe::egui::{self, Align, Color32, Layout, RichText};
use rfd::FileDialog;
use wastemon_core::{
    ACCEPTED_EXTENSIONS, Category, ImageFile, ImageStatus, QueuedImage, ScanOptions, export_csv,
    format_size, scan_folder,
};

const THUMB_SIZE: f32 = 56.0;
const ORGANIC_GREEN: Color32 = Color32::from_rgb(0x00, 0xd7, 0x48);
const RECYCLE_BLUE: Color32 = Color32::from_rgb(0x38, 0xbd, 0xf8);
const PLACEHOLDER_GRAY: Color32 = Color32::from_gray(0xdd);

impl UiApp {
    pub(super) fn render_queue_panel(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("Wastemon");
            ui.label("Drop photos of waste anywhere, or pick them below. PNG, JPG, WEBP or HEIC.");
        });
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Choose images...").clicked() {
                self.pick_images();
            }
            if ui.button("Add folder...").clicked() {
                self.pick_folder();
            }
            ui.checkbox(&mut self.recursive_scan, "Include subfolders");
        });

        ui.separator();
        let absent = self.manager.queue().is_absent();
        ui.horizontal(|ui| {
            ui.label(RichText::new("Files in queue").strong().size(18.0));
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                let remove_all = egui::Button::new(RichText::new("Remove all").color(Color32::RED));
                if ui.add_enabled(!absent, remove_all).clicked() {
                    self.manager.clear_all();
                    self.latest_round = None;
                    self.status = "Queue cleared".to_string();
                }
            });
        });

        if absent {
            ui.add_space(40.0);
            ui.vertical_centered(|ui| {
                ui.label(
                    RichText::new("No file selected")
                        .size(18.0)
                        .color(PLACEHOLDER_GRAY),
                );
            });
            return;
        }

        let mut remove = None;
        let list_height = (ui.available_height() - 48.0).max(80.0);
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .max_height(list_height)
            .show(ui, |ui| {
                for (index, entry) in self.manager.queue().entries().iter().enumerate() {
                    if render_row(ui, entry) {
                        remove = Some(index);
                    }
                    ui.add_space(4.0);
                }
            });
        if let Some(index) = remove {
            match self.manager.remove_at(index) {
                Ok(removed) => {
                    ui.ctx().forget_image(&preview_uri(&removed));
                    self.status = format!("Removed {}", removed.name());
                }
                Err(e) => self.status = e.to_string(),
            }
        }

        ui.separator();
        ui.horizontal(|ui| {
            let classify =
                egui::Button::new(RichText::new("Classify").strong().color(Color32::WHITE))
                    .fill(ORGANIC_GREEN);
            // Pressing again while busy restarts the round and resubmits every entry.
            if ui.add(classify).clicked() {
                match self.manager.classify_all() {
                    Ok(round) => {
                        self.latest_round = Some(round);
                        self.status = format!(
                            "Classifying {} image(s)...",
                            self.manager.queue().len()
                        );
                    }
                    Err(e) => self.status = e.to_string(),
                }
            }
            if self.manager.is_classifying() {
                ui.add(egui::Spinner::new());
            }
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if ui.button("Export CSV").clicked() {
                    self.export_results();
                }
            });
        });
    }

    fn pick_images(&mut self) {
        let Some(paths) = FileDialog::new()
            .add_filter("Images", &ACCEPTED_EXTENSIONS[..])
            .pick_files()
        else {
            return;
        };
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match ImageFile::from_path(&path) {
                Ok(file) if file.is_accepted_image() => files.push(file),
                Ok(file) => {
                    tracing::warn!("Skipping {}: unsupported type {}", file.name, file.mime)
                }
                Err(e) => tracing::warn!("Skipping {}: {e:#}", path.display()),
            }
        }
        self.manager.add_files(files);
    }

    fn pick_folder(&mut self) {
        let Some(dir) = FileDialog::new().set_directory(".").pick_folder() else {
            return;
        };
        let opts = ScanOptions {
            recursive: self.recursive_scan,
        };
        match scan_folder(&dir, opts) {
            Ok(files) if files.is_empty() => {
                self.status = format!("No images found in {}", dir.display());
            }
            Ok(files) => self.manager.add_files(files),
            Err(e) => self.status = format!("Error scanning folder: {e:#}"),
        }
    }

    fn export_results(&mut self) {
        let Some(path) = FileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name("wastemon.csv")
            .save_file()
        else {
            return;
        };
        self.status = match export_csv(self.manager.queue().entries(), &path) {
            Ok(()) => format!("CSV exported: {}", path.display()),
            Err(e) => format!("Error exporting: {e:#}"),
        };
    }
}

fn preview_uri(entry: &QueuedImage) -> String {
    format!("bytes://wastemon/{}/{}", entry.id().as_u64(), entry.name())
}

/// Draws one queue row. Returns true when the user asked to remove it.
fn render_row(ui: &mut egui::Ui, entry: &QueuedImage) -> bool {
    let mut remove = false;
    ui.horizontal(|ui| {
        let size = egui::vec2(THUMB_SIZE, THUMB_SIZE);
        if entry.mime().starts_with("image/") {
            let bytes = egui::load::Bytes::Shared(entry.source().shared());
            ui.add(egui::Image::from_bytes(preview_uri(entry), bytes).fit_to_exact_size(size));
        } else {
            let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
            ui.painter().rect_filled(rect, 4.0, Color32::from_gray(40));
        }

        ui.vertical(|ui| {
            ui.label(RichText::new(entry.name()).strong());
            ui.label(format_size(entry.size_bytes()));
        });

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui.small_button("✕").on_hover_text("Remove").clicked() {
                remove = true;
            }
            match entry.status() {
                ImageStatus::Ready => {
                    ui.label(RichText::new("Ready").color(Color32::GRAY));
                }
                ImageStatus::Processing => {
                    ui.label("Processing");
                    ui.add(egui::Spinner::new());
                }
                ImageStatus::Done(category) => {
                    let text = RichText::new(category.as_str())
                        .strong()
                        .color(category_color(category));
                    ui.label(text);
                }
            }
        });
    });
    remove
}

fn category_color(category: &Category) -> Color32 {
    match category {
        Category::Organic => ORGANIC_GREEN,
        Category::Recycle => RECYCLE_BLUE,
        Category::Other(_) => Color32::LIGHT_GRAY,
    }
}
