//! Built-in preset table
//!
//! Classic curves and plants with placement tuned for a square canvas.

use serde::{Deserialize, Serialize};

use super::grammar::{GrammarSpec, OriginFraction, Rules};

/// A named GrammarSpec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub key: String,
    pub name: String,
    #[serde(flatten)]
    pub spec: GrammarSpec,
}

/// Ordered preset collection with lookup by key
#[derive(Debug, Clone, Default)]
pub struct PresetTable {
    presets: Vec<Preset>,
}

impl PresetTable {
    pub fn new(presets: Vec<Preset>) -> Self {
        let mut table = Self::default();
        for preset in presets {
            table.upsert(preset);
        }
        table
    }

    /// The sixteen built-in fractals
    pub fn builtin() -> Self {
        Self::new(builtin_presets())
    }

    /// Replace the preset with the same key, or append it
    pub fn upsert(&mut self, preset: Preset) {
        match self.presets.iter_mut().find(|p| p.key == preset.key) {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }

    pub fn first(&self) -> Option<&Preset> {
        self.presets.first()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

fn preset(
    key: &str,
    name: &str,
    axiom: &str,
    rules: &[(char, &str)],
    angle: f64,
    length: f64,
    start_angle: f64,
    origin: (f64, f64),
) -> Preset {
    let rules: Rules = rules.iter().map(|&(k, v)| (k, v.to_string())).collect();
    Preset {
        key: key.to_string(),
        name: name.to_string(),
        spec: GrammarSpec {
            axiom: axiom.to_string(),
            rules,
            angle,
            length,
            start_angle,
            origin: OriginFraction {
                x: origin.0,
                y: origin.1,
            },
        },
    }
}

fn builtin_presets() -> Vec<Preset> {
    vec![
        preset("koch", "Koch Curve", "F", &[('F', "F+F--F+F")], 60.0, 5.0, 0.0, (0.0, 0.4)),
        preset(
            "dragon",
            "Dragon Curve",
            "FX",
            &[('X', "X+YF"), ('Y', "FX-Y")],
            90.0,
            8.0,
            0.0,
            (0.5, 0.5),
        ),
        preset(
            "hilbert",
            "Hilbert Curve",
            "A",
            &[('A', "+BF-AFA-FB+"), ('B', "-AF+BFB+FA-")],
            90.0,
            8.0,
            0.0,
            (0.0, 0.0),
        ),
        preset("tree", "Tree", "F", &[('F', "F[+F]F[-F]F")], 25.0, 10.0, -90.0, (0.5, 1.0)),
        preset(
            "sierpinski",
            "Sierpinski Triangle",
            "F-G-G",
            &[('F', "F-G+F+G-F"), ('G', "GG")],
            120.0,
            10.0,
            0.0,
            (0.0, 1.0),
        ),
        preset(
            "sierpinskiArrow",
            "Sierpinski Arrowhead",
            "A",
            &[('A', "B-A-B"), ('B', "A+B+A")],
            60.0,
            10.0,
            0.0,
            (0.0, 0.5),
        ),
        preset(
            "peano",
            "Peano Curve",
            "X",
            &[('X', "XFYFX+F+YFXFY-F-XFYFX"), ('Y', "YFXFY-F-XFYFX+F+YFXFY")],
            90.0,
            5.0,
            0.0,
            (0.0, 0.0),
        ),
        preset(
            "gosper",
            "Gosper Curve",
            "A",
            &[('A', "A-B--B+A++AA+B-"), ('B', "+A-BB--B-A++A+B")],
            60.0,
            10.0,
            0.0,
            (0.5, 1.0),
        ),
        preset("levy", "Levy C Curve", "F", &[('F', "+F--F+")], 45.0, 10.0, 0.0, (0.5, 0.5)),
        preset(
            "fern",
            "Fern",
            "X",
            &[('X', "F+[[X]-X]-F[-FX]+X"), ('F', "FF")],
            25.0,
            8.0,
            -90.0,
            (0.5, 0.95),
        ),
        preset("crystal", "Crystal", "F+F+F+F", &[('F', "FF+F++F+F")], 90.0, 6.0, 0.0, (0.15, 0.5)),
        preset(
            "moore",
            "Moore Curve",
            "LFL+F+LFL",
            &[('L', "-RF+LFL+FR-"), ('R', "+LF-RFR-FL+")],
            90.0,
            8.0,
            0.0,
            (0.0, 0.0),
        ),
        preset("snowflake", "Snowflake", "F++F++F", &[('F', "F-F++F-F")], 60.0, 8.0, 0.0, (0.25, 0.7)),
        preset(
            "quadraticKoch",
            "Quadratic Koch",
            "F-F-F-F",
            &[('F', "F-F+F+FF-F-F+F")],
            90.0,
            5.0,
            0.0,
            (0.1, 0.35),
        ),
        preset(
            "bush",
            "Bush",
            "Y",
            &[('X', "X[-FFF][+FFF]FX"), ('Y', "YFX[+Y][-Y]")],
            25.7,
            8.0,
            -90.0,
            (0.5, 0.95),
        ),
        preset(
            "pentigree",
            "Pentigree",
            "F-F-F-F-F",
            &[('F', "F-F++F+F-F-F")],
            72.0,
            8.0,
            0.0,
            (0.5, 0.6),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_presets_valid() {
        let table = PresetTable::builtin();
        assert_eq!(table.len(), 16);
        for preset in table.iter() {
            assert!(preset.spec.validate().is_ok(), "{} is invalid", preset.key);
        }
        assert_eq!(table.first().map(|p| p.key.as_str()), Some("koch"));
    }

    #[test]
    fn test_lookup() {
        let table = PresetTable::builtin();
        let tree = table.get("tree").unwrap();
        assert_eq!(tree.name, "Tree");
        assert_eq!(tree.spec.start_angle, -90.0);
        assert!(table.get("nope").is_none());
    }

    #[test]
    fn test_upsert_overrides_by_key() {
        let mut table = PresetTable::builtin();
        let mut koch = table.get("koch").unwrap().clone();
        koch.spec.length = 3.0;
        table.upsert(koch);
        assert_eq!(table.len(), 16);
        assert_eq!(table.get("koch").unwrap().spec.length, 3.0);
        assert_eq!(table.first().map(|p| p.key.as_str()), Some("koch"));
    }
}
