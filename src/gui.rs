//! Native GUI explorer using egui
//!
//! Grammar, color and animation controls on the left; the canvas takes
//! wheel zoom, drag pan, tap-to-iterate and two-finger pinch.

use eframe::egui;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use crate::animation::{StopReason, Tick};
use crate::color::{ColorMode, PositionAxis, Rgb};
use crate::config::Config;
use crate::export;
use crate::render::{Renderer, TransformStack};
use crate::state::{CustomGrammar, Explorer, ExplorerError};
use crate::viewport::Point;

/// Run the native GUI explorer
pub fn run_viewer(config: Config, output_dir: PathBuf) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("L-System Explorer"),
        ..Default::default()
    };

    eframe::run_native(
        "L-System Explorer",
        options,
        Box::new(|cc| Ok(Box::new(ExplorerApp::new(cc, config, output_dir)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

fn to_color32(c: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(c.r, c.g, c.b)
}

/// [`Renderer`] that paints line segments into the canvas rect
struct EguiRenderer<'a> {
    painter: &'a egui::Painter,
    rect: egui::Rect,
    stack: TransformStack,
    stroke: egui::Color32,
    stroke_width: f64,
}

impl<'a> EguiRenderer<'a> {
    fn new(painter: &'a egui::Painter, rect: egui::Rect) -> Self {
        Self {
            painter,
            rect,
            stack: TransformStack::default(),
            stroke: egui::Color32::BLACK,
            stroke_width: 1.0,
        }
    }

    fn to_screen(&self, x: f64, y: f64) -> egui::Pos2 {
        let (sx, sy) = self.stack.apply(x, y);
        self.rect.min + egui::vec2(sx as f32, sy as f32)
    }
}

impl Renderer for EguiRenderer<'_> {
    fn background(&mut self, color: Rgb) {
        self.painter.rect_filled(self.rect, 0.0, to_color32(color));
    }

    fn reset_transform(&mut self) {
        self.stack.reset();
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.stack.translate(dx, dy);
    }

    fn rotate(&mut self, radians: f64) {
        self.stack.rotate(radians);
    }

    fn scale(&mut self, factor: f64) {
        self.stack.scale(factor);
    }

    fn push_transform(&mut self) {
        self.stack.push();
    }

    fn pop_transform(&mut self) {
        self.stack.pop();
    }

    fn draw_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        let width = (self.stroke_width * self.stack.current().scale_factor()).max(0.5) as f32;
        let points = [self.to_screen(x0, y0), self.to_screen(x1, y1)];
        self.painter.line_segment(points, egui::Stroke::new(width, self.stroke));
    }

    fn set_stroke_color(&mut self, color: Rgb) {
        self.stroke = to_color32(color);
    }

    fn set_stroke_width(&mut self, px: f64) {
        self.stroke_width = px;
    }
}

/// Pointer state sampled once per frame
struct PointerInput {
    scroll: f32,
    pressed: bool,
    down: bool,
    released: bool,
    moved: bool,
    pos: Option<egui::Pos2>,
}

/// Pinch transition produced by a touch event
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pinch {
    Start(Point, Point),
    Move(Point, Point),
    End(Option<Point>),
}

/// Fingers currently down, ordered by touch id so the same pair is used every frame
#[derive(Default)]
struct Touches {
    fingers: BTreeMap<u64, Point>,
}

impl Touches {
    fn len(&self) -> usize {
        self.fingers.len()
    }

    fn pair(&self) -> Option<(Point, Point)> {
        let mut fingers = self.fingers.values().copied();
        Some((fingers.next()?, fingers.next()?))
    }

    fn update(&mut self, id: u64, phase: egui::TouchPhase, p: Point) -> Option<Pinch> {
        match phase {
            egui::TouchPhase::Start | egui::TouchPhase::Move => {
                let started = phase == egui::TouchPhase::Start;
                self.fingers.insert(id, p);
                let (a, b) = self.pair()?;
                if started && self.len() == 2 {
                    Some(Pinch::Start(a, b))
                } else if !started {
                    Some(Pinch::Move(a, b))
                } else {
                    None
                }
            }
            egui::TouchPhase::End | egui::TouchPhase::Cancel => {
                let was_pinch = self.len() >= 2;
                self.fingers.remove(&id);
                if was_pinch && self.len() < 2 {
                    Some(Pinch::End(self.fingers.values().next().copied()))
                } else {
                    None
                }
            }
        }
    }
}

struct ExplorerApp {
    explorer: Explorer,
    editor: CustomGrammar,
    output_dir: PathBuf,
    export_name: String,
    coolors_url: String,
    status: Option<String>,
    touches: Touches,
}

impl ExplorerApp {
    fn new(cc: &eframe::CreationContext<'_>, config: Config, output_dir: PathBuf) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let mut explorer = Explorer::new(&config, 900.0, 800.0);
        let first = explorer.presets().first().map(|p| p.key.clone());
        if let Some(key) = first {
            if let Err(e) = explorer.load_preset(&key) {
                warn!("Failed to load initial preset '{}': {}", key, e);
            }
        }
        let editor = explorer
            .system()
            .map(|s| CustomGrammar::from_spec(s.spec()))
            .unwrap_or_else(|| CustomGrammar {
                axiom: "F".to_string(),
                rules: String::new(),
                angle: 90.0,
                length: 10.0,
                start_angle: 0.0,
            });

        Self {
            explorer,
            editor,
            output_dir,
            export_name: "fractal".to_string(),
            coolors_url: String::new(),
            status: None,
            touches: Touches::default(),
        }
    }

    /// Surface an error in the status line; clear it on success
    fn report<T>(&mut self, result: Result<T, ExplorerError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.status = None;
                Some(value)
            }
            Err(e) => {
                warn!("{}", e);
                self.status = Some(e.to_string());
                None
            }
        }
    }

    fn load_preset(&mut self, key: &str) {
        let result = self.explorer.load_preset(key);
        if self.report(result).is_some() {
            if let Some(system) = self.explorer.system() {
                self.editor = CustomGrammar::from_spec(system.spec());
            }
        }
    }

    fn grammar_controls(&mut self, ui: &mut egui::Ui) {
        let current = self.explorer.preset_key().unwrap_or_default().to_string();
        let current_name = self
            .explorer
            .presets()
            .get(&current)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Custom".to_string());
        let mut selected = current.clone();
        ui.horizontal(|ui| {
            ui.label("Preset:");
            egui::ComboBox::from_id_salt("preset")
                .selected_text(current_name)
                .show_ui(ui, |ui| {
                    for preset in self.explorer.presets().iter() {
                        ui.selectable_value(&mut selected, preset.key.clone(), &preset.name);
                    }
                });
        });
        if selected != current {
            self.load_preset(&selected);
        }

        ui.label("Axiom:");
        ui.text_edit_singleline(&mut self.editor.axiom);
        ui.label("Rules (symbol=expansion):");
        ui.add(egui::TextEdit::multiline(&mut self.editor.rules).desired_rows(4).code_editor());
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut self.editor.angle).speed(0.5).prefix("Angle: ").suffix("°"));
            ui.add(
                egui::DragValue::new(&mut self.editor.length)
                    .speed(0.1)
                    .range(0.1..=200.0)
                    .prefix("Length: "),
            );
        });
        ui.add(egui::DragValue::new(&mut self.editor.start_angle).speed(1.0).prefix("Start angle: ").suffix("°"));
        if ui.button("Apply").clicked() {
            let custom = self.editor.clone();
            let result = self.explorer.apply_custom(&custom);
            self.report(result);
        }
    }

    fn iteration_controls(&mut self, ui: &mut egui::Ui) {
        let mut next = false;
        let mut reset = false;
        ui.horizontal(|ui| {
            next = ui.button("Next ▶").clicked();
            reset = ui.button("Reset").clicked();
            if ui.button("Reset view").clicked() {
                self.explorer.reset_view();
            }
        });
        if next {
            let result = self.explorer.next_iteration();
            self.report(result);
        }
        if reset {
            let result = self.explorer.reset_system();
            self.report(result);
        }

        if let Some(system) = self.explorer.system() {
            let len = system.sentence_len();
            ui.label(format!(
                "Iteration: {} · {} char{}",
                system.iteration(),
                export::group_thousands(len),
                if len == 1 { "" } else { "s" }
            ));
        }

        ui.add_space(4.0);
        let label = if self.explorer.is_animating() { "⏸ Pause" } else { "▶ Auto" };
        if ui.button(label).clicked() {
            match self.explorer.toggle_animation(Instant::now()) {
                Ok(Some(reason)) => info!(?reason, "Auto-iteration stopped"),
                Ok(None) => {}
                Err(e) => self.status = Some(e.to_string()),
            }
        }
        ui.add(egui::Slider::new(&mut self.explorer.animation.delay_ms, 50..=2000).text("Delay (ms)"));
        ui.add(egui::Slider::new(&mut self.explorer.animation.max_steps, 1..=10).text("Max steps"));
    }

    fn color_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Color mode:");
            egui::ComboBox::from_id_salt("color_mode")
                .selected_text(self.explorer.color_mode.as_str())
                .show_ui(ui, |ui| {
                    for mode in ColorMode::ALL {
                        ui.selectable_value(&mut self.explorer.color_mode, mode, mode.as_str());
                    }
                });
        });
        if self.explorer.color_mode == ColorMode::Position {
            ui.horizontal(|ui| {
                ui.label("Axis:");
                egui::ComboBox::from_id_salt("position_axis")
                    .selected_text(self.explorer.position_axis.as_str())
                    .show_ui(ui, |ui| {
                        for axis in PositionAxis::ALL {
                            ui.selectable_value(&mut self.explorer.position_axis, axis, axis.as_str());
                        }
                    });
            });
        }

        ui.horizontal(|ui| {
            ui.label("Palette:");
            for i in 0..self.explorer.palette.len() {
                let c = self.explorer.palette.get(i);
                let mut rgb = [c.r, c.g, c.b];
                if ui.color_edit_button_srgb(&mut rgb).changed() {
                    self.explorer.set_palette_color(i, Rgb::new(rgb[0], rgb[1], rgb[2]));
                }
            }
        });
        ui.horizontal(|ui| {
            ui.label("Background:");
            let c = self.explorer.background;
            let mut rgb = [c.r, c.g, c.b];
            if ui.color_edit_button_srgb(&mut rgb).changed() {
                self.explorer.background = Rgb::new(rgb[0], rgb[1], rgb[2]);
            }
        });

        let mut import = false;
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.coolors_url).hint_text("coolors.co URL"));
            import = ui.button("Import").clicked();
        });
        if import {
            let url = self.coolors_url.clone();
            let result = self.explorer.import_coolors(&url);
            self.report(result);
        }

        if self.explorer.color_mode == ColorMode::PerSymbol {
            let symbols: Vec<(char, usize)> = self.explorer.symbols().iter().collect();
            let mut changes = Vec::new();
            for (symbol, index) in symbols {
                let mut chosen = index;
                ui.horizontal(|ui| {
                    ui.colored_label(to_color32(self.explorer.palette.get(index)), "●");
                    ui.label(symbol.to_string());
                    egui::ComboBox::from_id_salt(("symbol", symbol))
                        .selected_text(format!("{}", index + 1))
                        .show_ui(ui, |ui| {
                            for i in 0..self.explorer.palette.len() {
                                ui.selectable_value(&mut chosen, i, format!("{} {}", i + 1, self.explorer.palette.get(i)));
                            }
                        });
                });
                if chosen != index {
                    changes.push((symbol, chosen));
                }
            }
            for (symbol, index) in changes {
                self.explorer.set_symbol_color(symbol, index);
            }
        }

        ui.add(egui::Slider::new(&mut self.explorer.stroke_width, 0.5..=10.0).text("Stroke"));
    }

    fn export_controls(&mut self, ui: &mut egui::Ui) {
        let mut clicked = false;
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.export_name);
            clicked = ui.button("Export PNG").clicked();
        });
        if clicked && !self.export_name.trim().is_empty() {
            match export::write_export(&self.output_dir, self.export_name.trim(), &self.explorer) {
                Ok((png, _)) => self.status = Some(format!("Saved {}", png.display())),
                Err(e) => {
                    warn!("Export failed: {}", e);
                    self.status = Some(format!("Export failed: {}", e));
                }
            }
        }
    }

    /// Two-finger pinch from raw touch events
    fn handle_touches(&mut self, ctx: &egui::Context, rect: egui::Rect) {
        let events: Vec<(egui::TouchId, egui::TouchPhase, egui::Pos2)> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|e| match e {
                    egui::Event::Touch { id, phase, pos, .. } => Some((*id, *phase, *pos)),
                    _ => None,
                })
                .collect()
        });

        for (id, phase, pos) in events {
            let p = Point::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64);
            match self.touches.update(id.0, phase, p) {
                Some(Pinch::Start(a, b)) => self.explorer.viewport.pinch_start(a, b),
                Some(Pinch::Move(a, b)) => self.explorer.viewport.pinch_move(a, b),
                Some(Pinch::End(remaining)) => self.explorer.viewport.pinch_end(remaining),
                None => {}
            }
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        self.explorer.viewport.resize(rect.width() as f64, rect.height() as f64);
        let to_canvas = |pos: egui::Pos2| Point::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64);

        self.handle_touches(ui.ctx(), rect);
        let pinching = self.touches.len() >= 2;

        let input = ui.ctx().input(|i| PointerInput {
            scroll: i.raw_scroll_delta.y,
            pressed: i.pointer.primary_pressed(),
            down: i.pointer.primary_down(),
            released: i.pointer.primary_released(),
            moved: i.pointer.delta() != egui::Vec2::ZERO,
            pos: i.pointer.interact_pos(),
        });

        if let Some(pos) = input.pos {
            if input.scroll != 0.0 && rect.contains(pos) {
                self.explorer.viewport.wheel(to_canvas(pos), input.scroll as f64);
            }
            if input.pressed && rect.contains(pos) {
                self.explorer.pointer_pressed(to_canvas(pos));
            } else if input.down && input.moved && !pinching {
                self.explorer.pointer_moved(to_canvas(pos));
            }
        }
        if input.released && self.explorer.viewport.is_dragging() {
            let result = self.explorer.pointer_released();
            self.report(result);
        }

        if !ui.ctx().wants_keyboard_input() {
            let (space, r, home) = ui.ctx().input(|i| {
                (
                    i.key_pressed(egui::Key::Space),
                    i.key_pressed(egui::Key::R),
                    i.key_pressed(egui::Key::Home),
                )
            });
            if space {
                let result = self.explorer.next_iteration();
                self.report(result);
            }
            if r {
                let result = self.explorer.reset_system();
                self.report(result);
            }
            if home {
                self.explorer.reset_view();
            }
        }

        let mut renderer = EguiRenderer::new(&painter, rect);
        self.explorer.redraw(&mut renderer);
    }
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        if let Tick::Finished(reason) = self.explorer.tick(now) {
            info!(?reason, "Auto-iteration finished");
            if reason == StopReason::Refused {
                self.status = Some("Auto-iteration stopped: sentence too long".to_string());
            }
        }
        if let Some(wait) = self.explorer.scheduler().time_until_due(now) {
            ctx.request_repaint_after(wait);
        }

        egui::SidePanel::left("controls_panel").min_width(280.0).show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("L-System");
                ui.separator();
                self.grammar_controls(ui);
                ui.separator();
                self.iteration_controls(ui);
                ui.separator();
                ui.heading("Colors");
                self.color_controls(ui);
                ui.separator();
                ui.heading("Export");
                self.export_controls(ui);
                if let Some(status) = &self.status {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, status);
                }
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.canvas(ui));
    }
}
