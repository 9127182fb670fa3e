//! Explorer State - Single Source of Truth (SSOT)
//!
//! Owns the loaded System together with the viewport, color settings and
//! animation scheduler. Every front end (GUI, CLI render) drives the
//! fractal through this struct.

use std::time::Instant;
use thiserror::Error;

use crate::animation::{AnimationSettings, Scheduler, StopReason, Tick};
use crate::color::{ColorError, ColorMode, ColorSource, Palette, PositionAxis, Rgb, SymbolColorMap};
use crate::config::{Config, Limits};
use crate::lsystem::{parse_rules, GrammarSpec, GrowthError, OriginFraction, PresetTable, SpecError, System};
use crate::render::{self, Renderer};
use crate::viewport::{PanRelease, Point, Viewport};

#[derive(Error, Debug, PartialEq)]
pub enum ExplorerError {
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
    #[error("No L-system loaded")]
    NoSystem,
    #[error(transparent)]
    InvalidSpec(#[from] SpecError),
    #[error(transparent)]
    Growth(#[from] GrowthError),
    #[error(transparent)]
    Color(#[from] ColorError),
}

/// Grammar fields edited by hand
#[derive(Debug, Clone, PartialEq)]
pub struct CustomGrammar {
    pub axiom: String,
    /// `symbol=expansion` lines
    pub rules: String,
    pub angle: f64,
    pub length: f64,
    pub start_angle: f64,
}

impl CustomGrammar {
    /// Editor contents for an existing spec
    pub fn from_spec(spec: &GrammarSpec) -> Self {
        Self {
            axiom: spec.axiom.clone(),
            rules: spec.rules_text(),
            angle: spec.angle,
            length: spec.length,
            start_angle: spec.start_angle,
        }
    }
}

/// Explorer state shared by every front end
pub struct Explorer {
    presets: PresetTable,
    preset_key: Option<String>,
    system: Option<System>,
    symbols: SymbolColorMap,
    scheduler: Scheduler,
    limits: Limits,
    pub viewport: Viewport,
    pub palette: Palette,
    pub background: Rgb,
    pub color_mode: ColorMode,
    pub position_axis: PositionAxis,
    pub stroke_width: f64,
    pub animation: AnimationSettings,
}

impl Explorer {
    /// Create explorer state from config; no system is loaded yet
    pub fn new(config: &Config, canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            presets: config.preset_table(),
            preset_key: None,
            system: None,
            symbols: SymbolColorMap::default(),
            scheduler: Scheduler::new(),
            limits: config.limits,
            viewport: Viewport::new(canvas_width, canvas_height),
            palette: config.palette.clone(),
            background: config.background,
            color_mode: config.color_mode,
            position_axis: config.position_axis,
            stroke_width: config.stroke_width,
            animation: config.animation,
        }
    }

    pub fn presets(&self) -> &PresetTable {
        &self.presets
    }

    /// Key of the preset the current system was seeded from
    pub fn preset_key(&self) -> Option<&str> {
        self.preset_key.as_deref()
    }

    pub fn system(&self) -> Option<&System> {
        self.system.as_ref()
    }

    pub fn symbols(&self) -> &SymbolColorMap {
        &self.symbols
    }

    pub fn is_animating(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Seed a fresh system from a preset and reset the view
    pub fn load_preset(&mut self, key: &str) -> Result<(), ExplorerError> {
        let preset = self
            .presets
            .get(key)
            .ok_or_else(|| ExplorerError::UnknownPreset(key.to_string()))?;
        tracing::info!(key = %preset.key, name = %preset.name, "Loading preset");

        let system = System::new(preset.spec.clone());
        self.scheduler.stop();
        self.preset_key = Some(preset.key.clone());
        self.system = Some(system);
        self.viewport.reset();
        self.refresh_symbols();
        Ok(())
    }

    /// Replace the system with a hand-edited grammar.
    ///
    /// The origin comes from the selected preset. Like a preset load this
    /// resets the view.
    pub fn apply_custom(&mut self, custom: &CustomGrammar) -> Result<(), ExplorerError> {
        let origin = self.custom_origin();
        let spec = GrammarSpec {
            axiom: custom.axiom.trim().to_string(),
            rules: parse_rules(&custom.rules),
            angle: custom.angle,
            length: custom.length,
            start_angle: custom.start_angle,
            origin,
        };
        spec.validate()?;
        tracing::info!(axiom = %spec.axiom, rules = spec.rules.len(), "Applying custom grammar");

        self.scheduler.stop();
        self.system = Some(System::new(spec));
        self.viewport.reset();
        self.refresh_symbols();
        Ok(())
    }

    /// Origin the next custom grammar will use
    pub fn custom_origin(&self) -> OriginFraction {
        self.preset_key
            .as_deref()
            .and_then(|key| self.presets.get(key))
            .map(|p| p.spec.origin)
            .unwrap_or_default()
    }

    /// One guarded grammar step
    pub fn next_iteration(&mut self) -> Result<(), ExplorerError> {
        let system = self.system.as_mut().ok_or(ExplorerError::NoSystem)?;
        system.try_generate(self.limits.manual_ceiling)?;
        Ok(())
    }

    /// Back to the axiom; an active run is cancelled with it
    pub fn reset_system(&mut self) -> Result<(), ExplorerError> {
        let system = self.system.as_mut().ok_or(ExplorerError::NoSystem)?;
        self.scheduler.stop();
        system.reset();
        Ok(())
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    /// Start or stop auto-iteration
    pub fn toggle_animation(&mut self, now: Instant) -> Result<Option<StopReason>, ExplorerError> {
        let system = self.system.as_ref().ok_or(ExplorerError::NoSystem)?;
        Ok(self
            .scheduler
            .toggle(system, &self.animation, self.limits.animation_ceiling, now))
    }

    /// Drive the scheduler from the host's frame or timer callback
    pub fn tick(&mut self, now: Instant) -> Tick {
        let Some(system) = self.system.as_mut() else {
            self.scheduler.stop();
            return Tick::Idle;
        };
        self.scheduler.poll(
            system,
            &self.animation,
            self.limits.manual_ceiling,
            self.limits.animation_ceiling,
            now,
        )
    }

    pub fn pointer_pressed(&mut self, pointer: Point) {
        self.viewport.pan_start(pointer);
    }

    pub fn pointer_moved(&mut self, pointer: Point) {
        self.viewport.pan_move(pointer);
    }

    /// Finish a pan; a tap advances the grammar one step
    pub fn pointer_released(&mut self) -> Result<PanRelease, ExplorerError> {
        let release = self.viewport.pan_end();
        if release == PanRelease::Tap && self.system.is_some() {
            self.next_iteration()?;
        }
        Ok(release)
    }

    pub fn set_palette_color(&mut self, index: usize, color: Rgb) {
        self.palette.set(index, color);
    }

    /// Overwrite the leading palette entries from a Coolors URL
    pub fn import_coolors(&mut self, url: &str) -> Result<usize, ExplorerError> {
        let count = self.palette.import_coolors(url)?;
        tracing::info!(count, "Imported Coolors palette");
        Ok(count)
    }

    /// Point `symbol` at palette entry `index`; out-of-range indices are ignored
    pub fn set_symbol_color(&mut self, symbol: char, index: usize) {
        if index < self.palette.len() {
            self.symbols.set(symbol, index);
        }
    }

    pub fn color_source(&self) -> ColorSource<'_> {
        ColorSource {
            mode: self.color_mode,
            axis: self.position_axis,
            palette: &self.palette,
            symbols: &self.symbols,
            bounds: None,
        }
    }

    /// Draw the current frame; does nothing when no system is loaded
    pub fn redraw<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        let Some(system) = self.system.as_ref() else {
            return;
        };
        render::draw_frame(
            renderer,
            system,
            &self.viewport,
            &self.color_source(),
            self.background,
            self.stroke_width,
        );
    }

    fn refresh_symbols(&mut self) {
        if let Some(system) = self.system.as_ref() {
            self.symbols.refresh(system.alphabet(), self.palette.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::RecordingRenderer;
    use std::time::Duration;

    fn explorer() -> Explorer {
        Explorer::new(&Config::default(), 400.0, 400.0)
    }

    fn koch_custom() -> CustomGrammar {
        CustomGrammar {
            axiom: " F ".to_string(),
            rules: "F=F+F--F+F\nnot a rule".to_string(),
            angle: 60.0,
            length: 5.0,
            start_angle: 0.0,
        }
    }

    #[test]
    fn test_redraw_without_system_is_noop() {
        let ex = explorer();
        let mut rec = RecordingRenderer::default();
        ex.redraw(&mut rec);
        assert!(rec.calls.is_empty());
    }

    #[test]
    fn test_unknown_preset() {
        let mut ex = explorer();
        assert_eq!(
            ex.load_preset("nope"),
            Err(ExplorerError::UnknownPreset("nope".to_string()))
        );
        assert!(ex.system().is_none());
        assert_eq!(ex.next_iteration(), Err(ExplorerError::NoSystem));
    }

    #[test]
    fn test_load_preset_resets_view_and_symbols() {
        let mut ex = explorer();
        ex.viewport.zoom(Point::new(10.0, 10.0), 3.0);
        ex.load_preset("koch").unwrap();

        assert_eq!(ex.viewport.scale(), 1.0);
        assert_eq!(ex.preset_key(), Some("koch"));
        assert_eq!(ex.system().unwrap().sentence(), "F");
        assert_eq!(ex.symbols().get('F'), Some(0));
    }

    #[test]
    fn test_apply_custom_keeps_origin() {
        let mut ex = explorer();
        ex.load_preset("tree").unwrap();
        let origin = ex.system().unwrap().spec().origin;
        ex.viewport.zoom(Point::new(10.0, 10.0), 2.0);

        ex.apply_custom(&koch_custom()).unwrap();
        let spec = ex.system().unwrap().spec();
        assert_eq!(spec.axiom, "F");
        assert_eq!(spec.rules.len(), 1);
        assert_eq!(spec.origin, origin);
        assert_eq!(ex.viewport.scale(), 1.0);
        assert_eq!(ex.custom_origin(), origin);
    }

    #[test]
    fn test_apply_custom_rejects_bad_length() {
        let mut ex = explorer();
        let custom = CustomGrammar {
            length: 0.0,
            ..koch_custom()
        };
        assert_eq!(
            ex.apply_custom(&custom),
            Err(ExplorerError::InvalidSpec(SpecError::InvalidLength(0.0)))
        );
        assert!(ex.system().is_none());
    }

    #[test]
    fn test_tap_iterates_drag_does_not() {
        let mut ex = explorer();
        ex.apply_custom(&koch_custom()).unwrap();

        ex.pointer_pressed(Point::new(50.0, 50.0));
        assert_eq!(ex.pointer_released(), Ok(PanRelease::Tap));
        assert_eq!(ex.system().unwrap().iteration(), 1);

        ex.pointer_pressed(Point::new(50.0, 50.0));
        ex.pointer_moved(Point::new(60.0, 50.0));
        assert_eq!(ex.pointer_released(), Ok(PanRelease::Drag));
        assert_eq!(ex.system().unwrap().iteration(), 1);
        assert_eq!(ex.viewport.offset(), Point::new(10.0, 0.0));
    }

    #[test]
    fn test_manual_guard_refuses() {
        let config = Config {
            limits: Limits {
                manual_ceiling: 10,
                animation_ceiling: 10,
            },
            ..Config::default()
        };
        let mut ex = Explorer::new(&config, 100.0, 100.0);
        ex.apply_custom(&koch_custom()).unwrap();
        ex.next_iteration().unwrap();
        ex.next_iteration().unwrap();
        assert_eq!(
            ex.next_iteration(),
            Err(ExplorerError::Growth(GrowthError::SentenceTooLong {
                length: 36,
                ceiling: 10
            }))
        );
        assert_eq!(ex.system().unwrap().iteration(), 2);

        ex.reset_system().unwrap();
        assert_eq!(ex.system().unwrap().sentence(), "F");
    }

    #[test]
    fn test_animation_through_tick() {
        let mut ex = explorer();
        ex.animation = AnimationSettings {
            delay_ms: 10,
            max_steps: 2,
        };
        ex.apply_custom(&koch_custom()).unwrap();
        let t0 = Instant::now();
        assert_eq!(ex.toggle_animation(t0), Ok(None));
        assert!(ex.is_animating());

        let step = Duration::from_millis(10);
        assert_eq!(ex.tick(t0 + step), Tick::Stepped);
        assert_eq!(ex.tick(t0 + step * 2), Tick::Finished(StopReason::BudgetExhausted));
        assert!(!ex.is_animating());
        assert_eq!(ex.system().unwrap().iteration(), 2);
    }

    #[test]
    fn test_loading_preset_cancels_animation() {
        let mut ex = explorer();
        ex.load_preset("koch").unwrap();
        ex.toggle_animation(Instant::now()).unwrap();
        ex.load_preset("dragon").unwrap();
        assert!(!ex.is_animating());
        assert_eq!(ex.tick(Instant::now() + Duration::from_secs(5)), Tick::Idle);
    }

    #[test]
    fn test_applying_custom_cancels_animation() {
        let mut ex = explorer();
        ex.load_preset("koch").unwrap();
        let t0 = Instant::now();
        assert_eq!(ex.toggle_animation(t0), Ok(None));
        ex.apply_custom(&koch_custom()).unwrap();
        assert!(!ex.is_animating());
        assert_eq!(ex.tick(t0 + Duration::from_secs(5)), Tick::Idle);
        assert_eq!(ex.system().unwrap().iteration(), 0);
    }

    #[test]
    fn test_reset_mid_run_keeps_step_budget() {
        let mut ex = explorer();
        ex.animation = AnimationSettings {
            delay_ms: 10,
            max_steps: 3,
        };
        ex.load_preset("koch").unwrap();
        ex.next_iteration().unwrap();
        ex.next_iteration().unwrap();

        let t0 = Instant::now();
        let step = Duration::from_millis(10);
        assert_eq!(ex.toggle_animation(t0), Ok(None));
        assert_eq!(ex.tick(t0 + step), Tick::Stepped);
        ex.reset_system().unwrap();
        assert!(!ex.is_animating());

        let mut generates = 1;
        for i in 2..20 {
            if ex.tick(t0 + step * i) == Tick::Stepped {
                generates += 1;
            }
        }
        assert!(generates <= 3);
        assert_eq!(ex.system().unwrap().iteration(), 0);
    }

    #[test]
    fn test_symbol_color_and_palette_edits() {
        let mut ex = explorer();
        ex.apply_custom(&koch_custom()).unwrap();
        ex.set_symbol_color('F', 3);
        assert_eq!(ex.symbols().get('F'), Some(3));
        ex.set_symbol_color('F', 99);
        assert_eq!(ex.symbols().get('F'), Some(3));

        ex.set_palette_color(1, Rgb::WHITE);
        assert_eq!(ex.palette.get(1), Rgb::WHITE);
        assert_eq!(ex.import_coolors("https://coolors.co/ABCDEF-123456"), Ok(2));
        assert_eq!(ex.palette.get(0), Rgb::new(0xab, 0xcd, 0xef));
        assert!(ex.import_coolors("nothing here").is_err());
    }

    #[test]
    fn test_redraw_uses_color_settings() {
        let mut ex = explorer();
        ex.apply_custom(&koch_custom()).unwrap();
        ex.color_mode = ColorMode::PerSymbol;
        ex.set_symbol_color('F', 2);
        ex.background = Rgb::BLACK;

        let mut rec = RecordingRenderer::default();
        ex.redraw(&mut rec);
        assert_eq!(rec.calls[0], "background #000000");
        assert_eq!(rec.lines.len(), 1);
        assert_eq!(rec.lines[0].2, ex.palette.get(2));
    }
}
