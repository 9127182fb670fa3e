//! L-Systems - grammar rewriting and turtle interpretation
//!
//! - grammar: axiom + rules, the derived sentence and its cached metrics
//! - turtle: the symbol walk shared by drawing, bounds and coloring
//! - presets: built-in fractal definitions

pub mod grammar;
pub mod presets;
pub mod turtle;

pub use grammar::{parse_rules, GrammarSpec, GrowthError, OriginFraction, SpecError, System};
pub use presets::{Preset, PresetTable};
pub use turtle::{Bounds, SegmentStep, TurtleSink};
