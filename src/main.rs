//! Particle Backdrop RS - application shell
//! Hosts the particle engine in an eframe window: settings surface, resize
//! and pointer sources, and the throttled auto-tune notification.

use std::time::Instant;

use eframe::egui;
use particle_backdrop::config::{
    AppConfig, COUNT_RANGE, CURSOR_INTERACTION_RANGE, CURSOR_RANGE_RANGE, DISTANCE_RANGE,
    MAX_CONNECTIONS_RANGE, SIZE_RANGE, SPEED_RANGE,
};
use particle_backdrop::particles::ParticleEngine;
use particle_backdrop::perf::EffectiveConfig;

struct ParticleBackdropApp {
    config: AppConfig,
    engine: ParticleEngine,
    /// Settings snapshot the engine was last initialized from; compared each
    /// frame to detect reinit triggers.
    applied: AppConfig,

    last_update: Instant,
    last_dt: f32,

    // UI state
    show_settings: bool,
    selected_preset: usize,
    /// One notification is allowed per initialization.
    notice_pending: bool,
    tune_notice: Option<String>,
}

impl ParticleBackdropApp {
    fn new() -> Self {
        let config = AppConfig::default();
        Self {
            applied: config.clone(),
            config,
            engine: ParticleEngine::new(0.0, 0.0),
            last_update: Instant::now(),
            last_dt: 1.0 / 60.0,
            show_settings: false,
            selected_preset: 0,
            notice_pending: true,
            tune_notice: None,
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("⚙ Settings").clicked() {
                    self.show_settings = !self.show_settings;
                }
                ui.separator();
                let fps = 1.0 / self.last_dt.max(0.001);
                ui.label(format!("FPS: {:.0}", fps));

                let initial = EffectiveConfig::from_settings(
                    &self.applied.particles,
                    &self.applied.connections,
                );
                if self.engine.effective != initial {
                    ui.separator();
                    ui.label(format!(
                        "Performance mode: {} particles / {:.0} px / {} links",
                        self.engine.effective.particle_count,
                        self.engine.effective.connection_distance,
                        self.engine.effective.max_connections,
                    ));
                }
            });
        });
    }

    fn render_settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        egui::Window::new("Settings")
            .open(&mut open)
            .default_width(300.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_settings(ui);
                });
            });
        self.show_settings = open;
    }

    fn render_settings(&mut self, ui: &mut egui::Ui) {
        // Preset selector
        ui.horizontal(|ui| {
            ui.label("Preset:");
            let preset_names = AppConfig::preset_names();
            egui::ComboBox::from_id_source("preset_combo")
                .selected_text(
                    preset_names
                        .get(self.selected_preset)
                        .copied()
                        .unwrap_or("Default"),
                )
                .show_ui(ui, |ui| {
                    for (i, name) in preset_names.iter().enumerate() {
                        if ui.selectable_value(&mut self.selected_preset, i, *name).changed() {
                            self.config.apply_preset(name);
                        }
                    }
                });
        });

        ui.separator();
        ui.heading("Particles");

        ui.checkbox(&mut self.config.particles.enabled, "Enable Particles");
        ui.checkbox(
            &mut self.config.particles.safe_mode,
            "Safe Mode (auto-tune on low FPS)",
        );

        ui.add_space(8.0);
        ui.label("Count");
        ui.add(egui::Slider::new(
            &mut self.config.particles.count,
            COUNT_RANGE.0..=COUNT_RANGE.1,
        ));

        ui.label("Speed");
        ui.add(egui::Slider::new(
            &mut self.config.particles.speed,
            SPEED_RANGE.0..=SPEED_RANGE.1,
        ));

        ui.label("Min Size");
        ui.add(egui::Slider::new(
            &mut self.config.particles.min_size,
            SIZE_RANGE.0..=SIZE_RANGE.1,
        ));

        ui.label("Max Size");
        ui.add(egui::Slider::new(
            &mut self.config.particles.max_size,
            SIZE_RANGE.0..=SIZE_RANGE.1,
        ));

        ui.label("Cursor Range");
        ui.add(egui::Slider::new(
            &mut self.config.particles.cursor_range,
            CURSOR_RANGE_RANGE.0..=CURSOR_RANGE_RANGE.1,
        ));

        ui.label("Cursor Interaction (negative attracts)");
        ui.add(egui::Slider::new(
            &mut self.config.particles.cursor_interaction,
            CURSOR_INTERACTION_RANGE.0..=CURSOR_INTERACTION_RANGE.1,
        ));

        ui.add_space(4.0);
        ui.checkbox(&mut self.config.particles.dynamic_hue, "Dynamic Hue");
        if !self.config.particles.dynamic_hue {
            ui.horizontal(|ui| {
                ui.label("Particle Color");
                ui.color_edit_button_srgb(&mut self.config.particles.color);
            });
            ui.horizontal(|ui| {
                ui.label("Line Color");
                ui.color_edit_button_srgb(&mut self.config.connections.color);
            });
        }

        ui.separator();
        ui.heading("Connections");

        ui.checkbox(&mut self.config.connections.enabled, "Draw Connections");
        ui.checkbox(&mut self.config.connections.curved, "Curved Lines");

        ui.label("Distance");
        ui.add(egui::Slider::new(
            &mut self.config.connections.max_distance,
            DISTANCE_RANGE.0..=DISTANCE_RANGE.1,
        ));

        ui.label("Max Connections");
        ui.add(egui::Slider::new(
            &mut self.config.connections.max_connections,
            MAX_CONNECTIONS_RANGE.0..=MAX_CONNECTIONS_RANGE.1,
        ));

        ui.label("Opacity");
        ui.add(egui::Slider::new(
            &mut self.config.connections.opacity,
            0.0..=1.0,
        ));

        ui.label("Thickness");
        ui.add(egui::Slider::new(
            &mut self.config.connections.thickness,
            0.5..=3.0,
        ));

        ui.separator();
        ui.heading("Background");
        ui.horizontal(|ui| {
            ui.label("Color");
            ui.color_edit_button_srgb(&mut self.config.background.color);
        });

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("💾 Save Config").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("json", &["json"])
                    .save_file()
                {
                    if let Err(e) = self.config.save(&path.to_string_lossy()) {
                        eprintln!("Error saving config: {}", e);
                    }
                }
            }
            if ui.button("📂 Load Config").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("json", &["json"])
                    .pick_file()
                {
                    match AppConfig::load(&path.to_string_lossy()) {
                        Ok(config) => self.config = config,
                        Err(e) => eprintln!("Error loading config: {}", e),
                    }
                }
            }
        });
    }

    fn render_canvas(&mut self, ctx: &egui::Context, dt: f32) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let (rect, _) = ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());

                // Surface not laid out yet: skip this tick, retry next frame.
                if rect.width() < 1.0 || rect.height() < 1.0 {
                    return;
                }

                // Reinitialize on resize, tunable-setting change, or safe-mode
                // toggle. Full teardown/rebuild, not an incremental adjustment.
                let size_changed = (self.engine.width - rect.width()).abs() > 0.5
                    || (self.engine.height - rect.height()).abs() > 0.5;
                let settings_changed = self.config.particles != self.applied.particles
                    || self.config.connections != self.applied.connections;
                if size_changed || settings_changed {
                    self.engine.width = rect.width();
                    self.engine.height = rect.height();
                    self.engine
                        .reinitialize(&self.config.particles, &self.config.connections);
                    self.applied = self.config.clone();
                    self.notice_pending = true;
                    self.tune_notice = None;
                }

                // Latest pointer position in canvas coordinates.
                let pointer = ctx
                    .input(|i| i.pointer.hover_pos())
                    .map(|pos| pos - rect.min);

                if let Some(event) = self.engine.update(&self.config.particles, pointer, dt) {
                    if self.notice_pending {
                        self.notice_pending = false;
                        self.tune_notice = Some(format!(
                            "Reduced to {} particles / {:.0} px links to keep things smooth ({:.0} fps)",
                            event.effective.particle_count,
                            event.effective.connection_distance,
                            event.avg_fps,
                        ));
                    }
                }

                let painter = ui.painter_at(rect);

                // Full clear every frame
                let bg = self.config.background.color;
                painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(bg[0], bg[1], bg[2]));

                self.engine
                    .render(&painter, rect, &self.config.particles, &self.config.connections);
            });
    }

    fn render_tune_notice(&mut self, ctx: &egui::Context) {
        if let Some(notice) = self.tune_notice.clone() {
            egui::Area::new(egui::Id::new("tune_notice"))
                .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -16.0))
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(notice);
                        if ui.button("Dismiss").clicked() {
                            self.tune_notice = None;
                        }
                    });
                });
        }
    }
}

impl eframe::App for ParticleBackdropApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f32();
        self.last_update = now;
        self.last_dt = dt;

        self.render_top_bar(ctx);
        self.render_settings_window(ctx);
        self.render_canvas(ctx, dt);
        self.render_tune_notice(ctx);

        // Continuous animation
        ctx.request_repaint();
    }
}

fn main() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("Particle Backdrop RS")
            .with_min_inner_size([640.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Particle Backdrop RS",
        options,
        Box::new(|_cc| Box::new(ParticleBackdropApp::new())),
    )
}
