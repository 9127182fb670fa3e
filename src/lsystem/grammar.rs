//! Grammar Engine - axiom + production rules + derived sentence
//!
//! Rewriting is total: any character without a rule rewrites to itself.
//! Derived metrics (segment count, bounds) are cached per sentence and
//! dropped whenever the sentence changes.

use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::turtle::{self, Bounds, BoundsSink, TurtleParams};

/// Production rules: one expansion per single-character symbol
pub type Rules = BTreeMap<char, String>;

/// Starting point of the turtle as a fraction of the canvas size
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OriginFraction {
    pub x: f64,
    pub y: f64,
}

/// Immutable definition of an L-system fractal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarSpec {
    pub axiom: String,
    #[serde(default)]
    pub rules: Rules,
    /// Turn angle in degrees
    pub angle: f64,
    /// Segment length in pixels
    pub length: f64,
    /// Initial heading in degrees
    #[serde(default)]
    pub start_angle: f64,
    #[serde(default)]
    pub origin: OriginFraction,
}

#[derive(Error, Debug, PartialEq)]
pub enum SpecError {
    #[error("Segment length must be a positive number, got {0}")]
    InvalidLength(f64),
    #[error("Angle must be finite, got {0}")]
    InvalidAngle(f64),
    #[error("Start angle must be finite, got {0}")]
    InvalidStartAngle(f64),
    #[error("Origin fraction must lie in [0, 1], got ({x}, {y})")]
    OriginOutOfRange { x: f64, y: f64 },
}

#[derive(Error, Debug, PartialEq)]
pub enum GrowthError {
    #[error("Sentence exceeds {ceiling} characters ({length}). Reset to continue.")]
    SentenceTooLong { length: usize, ceiling: usize },
}

impl GrammarSpec {
    /// Reject configurations the engine cannot draw sensibly.
    ///
    /// The engine itself never validates; callers run this before
    /// constructing a [`System`].
    pub fn validate(&self) -> Result<(), SpecError> {
        if !self.length.is_finite() || self.length <= 0.0 {
            return Err(SpecError::InvalidLength(self.length));
        }
        if !self.angle.is_finite() {
            return Err(SpecError::InvalidAngle(self.angle));
        }
        if !self.start_angle.is_finite() {
            return Err(SpecError::InvalidStartAngle(self.start_angle));
        }
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.origin.x) || !in_unit(self.origin.y) {
            return Err(SpecError::OriginOutOfRange {
                x: self.origin.x,
                y: self.origin.y,
            });
        }
        Ok(())
    }

    pub fn turtle_params(&self) -> TurtleParams {
        TurtleParams {
            length: self.length,
            angle: self.angle,
            start_angle: self.start_angle,
        }
    }

    /// Rules rendered back to `symbol=expansion` lines
    pub fn rules_text(&self) -> String {
        self.rules
            .iter()
            .map(|(symbol, expansion)| format!("{}={}", symbol, expansion))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Parse rule text, one `symbol=expansion` per line.
///
/// Lines without `=`, with an empty side, or with a key longer than one
/// character are skipped.
pub fn parse_rules(text: &str) -> Rules {
    let mut rules = Rules::new();
    for line in text.lines() {
        let Some(eq_idx) = line.find('=') else {
            continue;
        };
        if eq_idx == 0 {
            continue;
        }
        let key = line[..eq_idx].trim();
        let value = line[eq_idx + 1..].trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(symbol), None) => {
                rules.insert(symbol, value.to_string());
            }
            _ => {
                tracing::warn!("Skipping rule with multi-character key '{}'", key);
            }
        }
    }
    rules
}

/// A GrammarSpec plus its current derivation
#[derive(Debug, Clone)]
pub struct System {
    spec: GrammarSpec,
    sentence: String,
    iteration: u32,
    alphabet: Vec<char>,
    segments: OnceCell<usize>,
    bounds: OnceCell<Bounds>,
}

impl System {
    pub fn new(spec: GrammarSpec) -> Self {
        let alphabet = compute_alphabet(&spec);
        let sentence = spec.axiom.clone();
        Self {
            spec,
            sentence,
            iteration: 0,
            alphabet,
            segments: OnceCell::new(),
            bounds: OnceCell::new(),
        }
    }

    pub fn spec(&self) -> &GrammarSpec {
        &self.spec
    }

    pub fn sentence(&self) -> &str {
        &self.sentence
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn sentence_len(&self) -> usize {
        self.sentence.len()
    }

    /// Back to the axiom at iteration 0
    pub fn reset(&mut self) {
        self.sentence = self.spec.axiom.clone();
        self.iteration = 0;
        self.invalidate();
    }

    /// Apply every production once, left to right
    pub fn generate(&mut self) {
        self.sentence = rewrite(&self.sentence, &self.spec.rules);
        self.iteration += 1;
        self.invalidate();
        tracing::debug!(
            iteration = self.iteration,
            length = self.sentence.len(),
            "Generated sentence"
        );
    }

    /// Run [`System::generate`] unless the sentence is already past `ceiling`
    pub fn try_generate(&mut self, ceiling: usize) -> Result<(), GrowthError> {
        let length = self.sentence.len();
        if length > ceiling {
            tracing::warn!(length, ceiling, "Refusing to iterate");
            return Err(GrowthError::SentenceTooLong { length, ceiling });
        }
        self.generate();
        Ok(())
    }

    /// Number of drawable (`A`..=`Z`) symbols in the sentence
    pub fn segment_count(&self) -> usize {
        *self
            .segments
            .get_or_init(|| self.sentence.chars().filter(char::is_ascii_uppercase).count())
    }

    /// Bounding box of every pen position, origin included
    pub fn bounds(&self) -> Bounds {
        *self.bounds.get_or_init(|| {
            let mut sink = BoundsSink::default();
            turtle::walk(&self.sentence, &self.spec.turtle_params(), &mut sink);
            sink.bounds
        })
    }

    /// Sorted drawable symbols of the axiom and every rule body
    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    fn invalidate(&mut self) {
        self.segments = OnceCell::new();
        self.bounds = OnceCell::new();
    }
}

/// One rewriting step of `sentence` under `rules`
pub fn rewrite(sentence: &str, rules: &Rules) -> String {
    let mut next = String::with_capacity(sentence.len() * 2);
    for c in sentence.chars() {
        match rules.get(&c) {
            Some(expansion) => next.push_str(expansion),
            None => next.push(c),
        }
    }
    next
}

fn compute_alphabet(spec: &GrammarSpec) -> Vec<char> {
    let symbols: BTreeSet<char> = std::iter::once(spec.axiom.as_str())
        .chain(spec.rules.values().map(String::as_str))
        .flat_map(str::chars)
        .filter(char::is_ascii_uppercase)
        .collect();
    symbols.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(axiom: &str, rules: &[(char, &str)]) -> GrammarSpec {
        GrammarSpec {
            axiom: axiom.to_string(),
            rules: rules.iter().map(|&(k, v)| (k, v.to_string())).collect(),
            angle: 60.0,
            length: 5.0,
            start_angle: 0.0,
            origin: OriginFraction::default(),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identity_default() {
        let mut system = System::new(spec("F+F", &[('F', "FF")]));
        system.generate();
        assert_eq!(system.sentence(), "FF+FF");
        assert_eq!(system.iteration(), 1);
    }

    #[test]
    fn test_rewrite_determinism() {
        let grammar = spec("X", &[('X', "F+[[X]-X]-F[-FX]+X"), ('F', "FF")]);
        let mut a = System::new(grammar.clone());
        let mut b = System::new(grammar);
        for _ in 0..4 {
            a.generate();
        }
        b.generate();
        b.reset();
        for _ in 0..4 {
            b.generate();
        }
        assert_eq!(a.sentence(), b.sentence());
        assert_eq!(a.iteration(), b.iteration());
    }

    #[test]
    fn test_segment_count() {
        let system = System::new(spec("F+F-F", &[]));
        assert_eq!(system.segment_count(), 3);

        let lower = System::new(spec("Ff+[X]x", &[]));
        assert_eq!(lower.segment_count(), 2);
    }

    #[test]
    fn test_koch_bounds() {
        let mut system = System::new(spec("F", &[('F', "F+F--F+F")]));
        system.generate();
        assert_eq!(system.sentence(), "F+F--F+F");

        let b = system.bounds();
        assert!(approx(b.min_x, 0.0));
        assert!(approx(b.max_x, 15.0));
        assert!(approx(b.min_y, 0.0));
        assert!(approx(b.max_y, 5.0 * 60f64.to_radians().sin()));
    }

    #[test]
    fn test_empty_axiom_bounds_include_origin() {
        let system = System::new(spec("", &[]));
        let b = system.bounds();
        assert_eq!((b.min_x, b.max_x, b.min_y, b.max_y), (0.0, 0.0, 0.0, 0.0));
        assert_eq!(system.segment_count(), 0);
    }

    #[test]
    fn test_reset_invalidates_caches() {
        let mut system = System::new(spec("F", &[('F', "F+F--F+F")]));
        system.generate();
        system.generate();
        assert_eq!(system.segment_count(), 16);
        let grown = system.bounds();

        system.reset();
        assert_eq!(system.sentence(), "F");
        assert_eq!(system.iteration(), 0);
        assert_eq!(system.segment_count(), 1);
        let b = system.bounds();
        assert!(approx(b.max_x, 5.0));
        assert!(b.max_x < grown.max_x);
    }

    #[test]
    fn test_cache_follows_generate() {
        let mut system = System::new(spec("F", &[('F', "FF")]));
        assert_eq!(system.segment_count(), 1);
        system.generate();
        assert_eq!(system.segment_count(), 2);
        assert!(approx(system.bounds().max_x, 10.0));
    }

    #[test]
    fn test_alphabet_sorted_and_drawable_only() {
        let system = System::new(spec("LFL+F+LFL", &[('L', "-RF+LFL+FR-"), ('R', "+LF-RFR-FL+")]));
        assert_eq!(system.alphabet(), &['F', 'L', 'R']);

        let lower = System::new(spec("x", &[('x', "a+b")]));
        assert!(lower.alphabet().is_empty());
    }

    #[test]
    fn test_try_generate_refuses_past_ceiling() {
        let mut system = System::new(spec("FFFF", &[('F', "FF")]));
        assert!(system.try_generate(4).is_ok());
        assert_eq!(system.sentence_len(), 8);

        let err = system.try_generate(4).unwrap_err();
        assert_eq!(err, GrowthError::SentenceTooLong { length: 8, ceiling: 4 });
        assert_eq!(system.iteration(), 1);
        assert_eq!(system.sentence_len(), 8);
    }

    #[test]
    fn test_parse_rules() {
        let rules = parse_rules("X = X+YF\nY=FX-Y\nnoequals\n=F\nAB=C\nZ=\n");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[&'X'], "X+YF");
        assert_eq!(rules[&'Y'], "FX-Y");
    }

    #[test]
    fn test_rules_text_round_trip() {
        let grammar = spec("A", &[('A', "+BF-AFA-FB+"), ('B', "-AF+BFB+FA-")]);
        assert_eq!(grammar.rules_text(), "A=+BF-AFA-FB+\nB=-AF+BFB+FA-");
        assert_eq!(parse_rules(&grammar.rules_text()), grammar.rules);
    }

    #[test]
    fn test_validate() {
        assert!(spec("F", &[]).validate().is_ok());

        let mut bad = spec("F", &[]);
        bad.length = 0.0;
        assert_eq!(bad.validate(), Err(SpecError::InvalidLength(0.0)));

        let mut bad = spec("F", &[]);
        bad.angle = f64::NAN;
        assert!(matches!(bad.validate(), Err(SpecError::InvalidAngle(_))));

        let mut bad = spec("F", &[]);
        bad.origin = OriginFraction { x: 1.5, y: 0.0 };
        assert!(matches!(bad.validate(), Err(SpecError::OriginOutOfRange { .. })));
    }

    #[test]
    fn test_origin_defaults_to_top_left() {
        let spec: GrammarSpec = serde_yaml::from_str("axiom: F\nangle: 90\nlength: 5\n").unwrap();
        assert_eq!(spec.origin, OriginFraction { x: 0.0, y: 0.0 });
        assert_eq!(spec.origin, OriginFraction::default());
        assert!(spec.validate().is_ok());
    }
}
