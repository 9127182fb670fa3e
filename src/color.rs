//! Color Assignment Pipeline
//!
//! Maps each drawn segment to a color under one of five modes. Resolution
//! is pure: it reads the draw-time context plus the palette and symbol map
//! owned by the caller, and never mutates either.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use crate::lsystem::Bounds;

/// Number of palette slots
pub const PALETTE_SIZE: usize = 5;

/// First run of `rrggbb(-rrggbb)*`
static COOLORS_REGEX: OnceLock<Regex> = OnceLock::new();

#[derive(Error, Debug, PartialEq)]
pub enum ColorError {
    #[error("Invalid hex color: {0}")]
    InvalidHex(String),
    #[error("No valid Coolors palette found in URL")]
    NoPalette,
    #[error("Unknown color mode: {0}")]
    UnknownMode(String),
    #[error("Unknown position axis: {0}")]
    UnknownAxis(String),
}

/// 8-bit sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional)
    pub fn from_hex(s: &str) -> Result<Self, ColorError> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorError::InvalidHex(s.to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear blend, `t` clamped to [0, 1]
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgb::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Ordered color stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Rgb>", into = "Vec<Rgb>")]
pub struct Palette {
    colors: Vec<Rgb>,
}

const DEFAULT_PALETTE: [Rgb; PALETTE_SIZE] = [
    Rgb::new(0x00, 0x00, 0x00),
    Rgb::new(0x4a, 0x90, 0xd9),
    Rgb::new(0xe8, 0x43, 0x93),
    Rgb::new(0xf5, 0xa6, 0x23),
    Rgb::new(0x7e, 0xd3, 0x21),
];

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.to_vec(),
        }
    }
}

impl From<Vec<Rgb>> for Palette {
    fn from(colors: Vec<Rgb>) -> Self {
        Palette::new(colors)
    }
}

impl From<Palette> for Vec<Rgb> {
    fn from(palette: Palette) -> Self {
        palette.colors
    }
}

impl Palette {
    /// An empty list falls back to a single black stop
    pub fn new(colors: Vec<Rgb>) -> Self {
        if colors.is_empty() {
            return Self { colors: vec![Rgb::BLACK] };
        }
        Self { colors }
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Entry `index`, wrapping around the palette
    pub fn get(&self, index: usize) -> Rgb {
        self.colors[index % self.colors.len()]
    }

    /// Overwrite entry `index`; out-of-range indices are ignored
    pub fn set(&mut self, index: usize, color: Rgb) {
        if let Some(slot) = self.colors.get_mut(index) {
            *slot = color;
        }
    }

    /// Piecewise-linear interpolation across the stops, `t` in [0, 1]
    pub fn gradient(&self, t: f64) -> Rgb {
        let n = self.colors.len();
        if n == 1 {
            return self.colors[0];
        }
        let seg = t.clamp(0.0, 1.0) * (n - 1) as f64;
        let i = (seg.floor() as usize).min(n - 2);
        self.colors[i].lerp(self.colors[i + 1], seg - i as f64)
    }

    /// Import colors from a Coolors URL such as
    /// `https://coolors.co/264653-2a9d8f-e9c46a`.
    ///
    /// Overwrites the leading entries and returns how many were replaced.
    pub fn import_coolors(&mut self, url: &str) -> Result<usize, ColorError> {
        let re = COOLORS_REGEX.get_or_init(|| {
            Regex::new(r"([0-9a-fA-F]{6}(?:-[0-9a-fA-F]{6})*)").expect("Invalid Coolors Regex")
        });
        let caps = re.captures(url.trim()).ok_or(ColorError::NoPalette)?;
        let hexes: Vec<&str> = caps[1].split('-').collect();
        let mut count = 0;
        for (slot, hex) in self.colors.iter_mut().zip(hexes.iter()) {
            *slot = Rgb::from_hex(hex)?;
            count += 1;
        }
        Ok(count)
    }
}

/// Sub-mode of [`ColorMode::Position`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionAxis {
    #[default]
    Horizontal,
    Vertical,
    Radial,
}

impl PositionAxis {
    pub const ALL: [PositionAxis; 3] = [PositionAxis::Horizontal, PositionAxis::Vertical, PositionAxis::Radial];

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionAxis::Horizontal => "horizontal",
            PositionAxis::Vertical => "vertical",
            PositionAxis::Radial => "radial",
        }
    }

    /// Normalized pen position in [0, 1]
    pub fn parameter(&self, position: (f64, f64), bounds: &Bounds) -> f64 {
        let (x, y) = position;
        match self {
            PositionAxis::Horizontal => {
                if bounds.max_x > bounds.min_x {
                    (x - bounds.min_x) / bounds.width()
                } else {
                    0.0
                }
            }
            PositionAxis::Vertical => {
                if bounds.max_y > bounds.min_y {
                    (y - bounds.min_y) / bounds.height()
                } else {
                    0.0
                }
            }
            PositionAxis::Radial => {
                let (cx, cy) = bounds.center();
                let max_dist = (bounds.max_x - cx)
                    .hypot(bounds.max_y - cy)
                    .max((bounds.min_x - cx).hypot(bounds.min_y - cy))
                    .max(0.001);
                ((x - cx).hypot(y - cy) / max_dist).min(1.0)
            }
        }
    }
}

impl FromStr for PositionAxis {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PositionAxis::ALL
            .into_iter()
            .find(|axis| axis.as_str() == s)
            .ok_or_else(|| ColorError::UnknownAxis(s.to_string()))
    }
}

/// Active coloring policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorMode {
    #[default]
    Flat,
    PaletteGradient,
    Depth,
    Position,
    PerSymbol,
}

impl ColorMode {
    pub const ALL: [ColorMode; 5] = [
        ColorMode::Flat,
        ColorMode::PaletteGradient,
        ColorMode::Depth,
        ColorMode::Position,
        ColorMode::PerSymbol,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Flat => "flat",
            ColorMode::PaletteGradient => "palette-gradient",
            ColorMode::Depth => "depth",
            ColorMode::Position => "position",
            ColorMode::PerSymbol => "per-symbol",
        }
    }
}

impl FromStr for ColorMode {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColorMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ColorError::UnknownMode(s.to_string()))
    }
}

/// Symbol → palette index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolColorMap {
    entries: BTreeMap<char, usize>,
}

impl SymbolColorMap {
    /// Drop symbols missing from `alphabet`, give new ones
    /// `position mod palette_len`.
    pub fn refresh(&mut self, alphabet: &[char], palette_len: usize) {
        self.entries.retain(|sym, _| alphabet.contains(sym));
        let palette_len = palette_len.max(1);
        for (i, &sym) in alphabet.iter().enumerate() {
            self.entries.entry(sym).or_insert(i % palette_len);
        }
    }

    pub fn get(&self, symbol: char) -> Option<usize> {
        self.entries.get(&symbol).copied()
    }

    pub fn set(&mut self, symbol: char, index: usize) {
        self.entries.insert(symbol, index);
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, usize)> + '_ {
        self.entries.iter().map(|(&sym, &idx)| (sym, idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the pipeline may look at for one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorContext {
    pub segment_index: usize,
    pub total_segments: usize,
    pub depth: usize,
    pub position: (f64, f64),
    pub symbol: char,
}

/// Read-only inputs owned by the caller
#[derive(Debug, Clone, Copy)]
pub struct ColorSource<'a> {
    pub mode: ColorMode,
    pub axis: PositionAxis,
    pub palette: &'a Palette,
    pub symbols: &'a SymbolColorMap,
    /// Required for [`ColorMode::Position`]; `None` degrades to `t = 0`
    pub bounds: Option<Bounds>,
}

impl ColorSource<'_> {
    /// Color for one segment under the active mode
    pub fn resolve(&self, ctx: &ColorContext) -> Rgb {
        match self.mode {
            ColorMode::Flat => self.palette.get(0),
            ColorMode::PaletteGradient => {
                let denom = ctx.total_segments.saturating_sub(1).max(1);
                self.palette.gradient(ctx.segment_index as f64 / denom as f64)
            }
            ColorMode::Depth => self.palette.get(ctx.depth),
            ColorMode::Position => {
                let t = self
                    .bounds
                    .map(|b| self.axis.parameter(ctx.position, &b))
                    .unwrap_or(0.0);
                self.palette.gradient(t)
            }
            ColorMode::PerSymbol => self.palette.get(self.symbols.get(ctx.symbol).unwrap_or(0)),
        }
    }
}
