//! Export - PNG snapshot plus a plain-text settings block
//!
//! `<name>.png` is rendered by the raster backend at the viewport's canvas
//! size; `<name>_settings.txt` records everything needed to reproduce it.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::color::ColorMode;
use crate::lsystem::{Bounds, System};
use crate::render::RasterRenderer;
use crate::state::{Explorer, ExplorerError};

/// Summary of a derived sentence
#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub preset: Option<String>,
    pub iteration: u32,
    pub sentence_length: usize,
    pub segments: usize,
    pub bounds: Bounds,
    pub alphabet: String,
}

impl SystemStats {
    pub fn new(preset: Option<&str>, system: &System) -> Self {
        Self {
            preset: preset.map(str::to_string),
            iteration: system.iteration(),
            sentence_length: system.sentence_len(),
            segments: system.segment_count(),
            bounds: system.bounds(),
            alphabet: system.alphabet().iter().collect(),
        }
    }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Human-readable settings block
pub fn settings_text(explorer: &Explorer, exported_at: &str) -> Result<String, ExplorerError> {
    let system = explorer.system().ok_or(ExplorerError::NoSystem)?;
    let spec = system.spec();

    let mut lines = vec![
        "L-System Settings".to_string(),
        "==================".to_string(),
        format!("Exported:         {}", exported_at),
        String::new(),
        "-- L-System --".to_string(),
        format!("Axiom:            {}", spec.axiom),
        "Rules:".to_string(),
    ];
    lines.extend(spec.rules_text().lines().map(|r| format!("  {}", r)));
    lines.push(format!("Angle:            {}°", spec.angle));
    lines.push(format!("Length:           {}", spec.length));
    lines.push(format!("Start angle:      {}°", spec.start_angle));
    lines.push(format!("Translate origin: x={}, y={}", spec.origin.x, spec.origin.y));

    lines.push(String::new());
    lines.push("-- Colors --".to_string());
    lines.push(format!("Color mode:       {}", explorer.color_mode.as_str()));
    let palette: Vec<String> = explorer.palette.colors().iter().map(|c| c.to_hex()).collect();
    lines.push(format!("Palette:          {}", palette.join(", ")));
    lines.push(format!("Background:       {}", explorer.background));
    if explorer.color_mode == ColorMode::Position {
        lines.push(format!("Position mode:    {}", explorer.position_axis.as_str()));
    }
    if explorer.color_mode == ColorMode::PerSymbol {
        let assignments: Vec<String> = explorer
            .symbols()
            .iter()
            .map(|(sym, idx)| format!("{}={}", sym, explorer.palette.get(idx)))
            .collect();
        lines.push(format!("Symbol colors:    {}", assignments.join(", ")));
    }

    lines.push(String::new());
    lines.push("-- Visual --".to_string());
    lines.push(format!("Stroke weight:    {}px", explorer.stroke_width));

    lines.push(String::new());
    lines.push("-- State --".to_string());
    lines.push(format!("Iteration:        {}", system.iteration()));
    lines.push(format!("Sentence length:  {} chars", group_thousands(system.sentence_len())));

    lines.push(String::new());
    lines.push("-- Animation --".to_string());
    lines.push(format!("Delay:            {}ms", explorer.animation.delay_ms));
    lines.push(format!("Max steps:        {}", explorer.animation.max_steps));

    Ok(lines.join("\n"))
}

/// Write `<name>.png` and `<name>_settings.txt` into `output_dir`
pub fn write_export(output_dir: &Path, name: &str, explorer: &Explorer) -> Result<(PathBuf, PathBuf)> {
    let exported_at = chrono::Local::now().to_rfc3339();
    let text = settings_text(explorer, &exported_at)?;

    let (width, height) = explorer.viewport.canvas_size();
    let mut raster = RasterRenderer::new(width.round().max(1.0) as u32, height.round().max(1.0) as u32);
    explorer.redraw(&mut raster);

    std::fs::create_dir_all(output_dir)?;
    let png_path = output_dir.join(format!("{}.png", name));
    let txt_path = output_dir.join(format!("{}_settings.txt", name));
    raster.save_png(&png_path)?;
    std::fs::write(&txt_path, text)?;

    tracing::info!(png = ?png_path, settings = ?txt_path, "Exported fractal");
    Ok((png_path, txt_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::PositionAxis;
    use crate::config::Config;

    fn koch_explorer() -> Explorer {
        let mut ex = Explorer::new(&Config::default(), 120.0, 80.0);
        ex.load_preset("koch").unwrap();
        ex
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(500000), "500,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_settings_sections() {
        let mut ex = koch_explorer();
        ex.next_iteration().unwrap();
        let text = settings_text(&ex, "2026-01-01T00:00:00+00:00").unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "L-System Settings");
        for section in ["-- L-System --", "-- Colors --", "-- Visual --", "-- State --", "-- Animation --"] {
            assert!(lines.contains(&section), "missing {}", section);
        }
        assert!(lines.contains(&"Axiom:            F"));
        assert!(lines.contains(&"  F=F+F--F+F"));
        assert!(lines.contains(&"Angle:            60°"));
        assert!(lines.contains(&"Translate origin: x=0, y=0.4"));
        assert!(lines.contains(&"Palette:          #000000, #4a90d9, #e84393, #f5a623, #7ed321"));
        assert!(lines.contains(&"Background:       #ffffff"));
        assert!(lines.contains(&"Stroke weight:    1px"));
        assert!(lines.contains(&"Iteration:        1"));
        assert!(lines.contains(&"Sentence length:  8 chars"));
        assert!(lines.contains(&"Delay:            500ms"));
        assert!(lines.contains(&"Max steps:        5"));
        assert!(!text.contains("Position mode"));
    }

    #[test]
    fn test_position_mode_listed_only_when_active() {
        let mut ex = koch_explorer();
        ex.color_mode = ColorMode::Position;
        ex.position_axis = PositionAxis::Radial;
        let text = settings_text(&ex, "now").unwrap();
        assert!(text.contains("Color mode:       position"));
        assert!(text.contains("Position mode:    radial"));
    }

    #[test]
    fn test_settings_need_a_system() {
        let ex = Explorer::new(&Config::default(), 10.0, 10.0);
        assert_eq!(settings_text(&ex, "now"), Err(ExplorerError::NoSystem));
    }

    #[test]
    fn test_stats() {
        let mut ex = koch_explorer();
        ex.next_iteration().unwrap();
        let stats = SystemStats::new(ex.preset_key(), ex.system().unwrap());
        assert_eq!(stats.preset.as_deref(), Some("koch"));
        assert_eq!(stats.sentence_length, 8);
        assert_eq!(stats.segments, 4);
        assert_eq!(stats.alphabet, "F");

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["iteration"], 1);
        assert!(json["bounds"]["max_x"].as_f64().unwrap() > 14.9);
    }

    #[test]
    fn test_write_export() {
        let dir = std::env::temp_dir().join(format!("lsystem_export_{}", std::process::id()));
        let ex = koch_explorer();
        let (png, txt) = write_export(&dir, "koch", &ex).unwrap();

        assert!(png.ends_with("koch.png"));
        assert!(txt.ends_with("koch_settings.txt"));
        let decoded = image::open(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 80));
        let text = std::fs::read_to_string(&txt).unwrap();
        assert!(text.starts_with("L-System Settings"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
