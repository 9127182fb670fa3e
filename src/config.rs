//! Configuration loader - YAML settings file + .env overrides

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::animation::AnimationSettings;
use crate::color::{ColorMode, Palette, PositionAxis, Rgb};
use crate::lsystem::{Preset, PresetTable};

/// Main configuration loaded from lsystems.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extra presets; a key that matches a built-in replaces it
    pub presets: Vec<Preset>,
    pub palette: Palette,
    pub background: Rgb,
    pub stroke_width: f64,
    pub color_mode: ColorMode,
    pub position_axis: PositionAxis,
    pub animation: AnimationSettings,
    pub limits: Limits,
}

/// Sentence length ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Manual "next iteration" refuses past this many characters
    pub manual_ceiling: usize,
    /// Auto-iteration stops past this many characters
    pub animation_ceiling: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            manual_ceiling: 500_000,
            animation_ceiling: 200_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            presets: Vec::new(),
            palette: Palette::default(),
            background: Rgb::WHITE,
            stroke_width: 1.0,
            color_mode: ColorMode::default(),
            position_axis: PositionAxis::default(),
            animation: AnimationSettings::default(),
            limits: Limits::default(),
        }
    }
}

/// Environment overrides loaded from .env
#[derive(Debug, Clone)]
pub struct Env {
    pub output_dir: String,
    pub log_dir: String,
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Built-in presets merged with the configured ones.
    ///
    /// Configured presets that fail validation are skipped with a warning.
    pub fn preset_table(&self) -> PresetTable {
        let mut table = PresetTable::builtin();
        for preset in &self.presets {
            match preset.spec.validate() {
                Ok(()) => table.upsert(preset.clone()),
                Err(e) => tracing::warn!(key = %preset.key, error = %e, "Skipping invalid preset"),
            }
        }
        table
    }
}

impl Env {
    /// Load overrides from .env file and the process environment
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Env {
            output_dir: std::env::var("LSYS_OUTPUT_DIR").unwrap_or_else(|_| "./output".to_string()),
            log_dir: std::env::var("LSYS_LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}
