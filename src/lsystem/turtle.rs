//! Turtle Interpreter - sentence to draw/turn/push/pop operations
//!
//! One walk serves every consumer: the renderer, the bounding-box pass and
//! the color pipeline all plug in as a [`TurtleSink`]. The walk keeps its own
//! position/heading stack so each drawn segment comes with its pen position
//! and bracket depth.

/// Geometric parameters of a walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurtleParams {
    /// Segment length
    pub length: f64,
    /// Turn angle in degrees
    pub angle: f64,
    /// Initial heading in degrees
    pub start_angle: f64,
}

/// Symbol classes of the turtle alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// `A`..=`Z`: draw one segment
    Letter(char),
    /// `+`
    TurnLeft,
    /// `-`
    TurnRight,
    /// `[`
    Push,
    /// `]`
    Pop,
    /// Anything else is ignored
    Other(char),
}

impl Symbol {
    pub fn classify(c: char) -> Self {
        match c {
            'A'..='Z' => Symbol::Letter(c),
            '+' => Symbol::TurnLeft,
            '-' => Symbol::TurnRight,
            '[' => Symbol::Push,
            ']' => Symbol::Pop,
            other => Symbol::Other(other),
        }
    }
}

/// Pen position and heading (radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurtleState {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

/// A segment about to be drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStep {
    /// 0-based index among drawn segments
    pub index: usize,
    /// Saved-state stack size at draw time
    pub depth: usize,
    /// Pen position before the move
    pub start: (f64, f64),
    /// Pen position after the move
    pub end: (f64, f64),
    pub symbol: char,
}

/// Receiver of turtle operations.
///
/// `pop_state` is only called for a matching `push_state`; an unbalanced
/// `]` never reaches the sink.
pub trait TurtleSink {
    fn draw_segment(&mut self, step: &SegmentStep);

    fn turn(&mut self, _delta_degrees: f64) {}

    fn push_state(&mut self) {}

    fn pop_state(&mut self) {}
}

/// Interpret `sentence` left to right, feeding `sink`.
///
/// Returns the pen state after the last symbol.
pub fn walk<S: TurtleSink + ?Sized>(sentence: &str, params: &TurtleParams, sink: &mut S) -> TurtleState {
    let turn_rad = params.angle.to_radians();
    let mut state = TurtleState {
        x: 0.0,
        y: 0.0,
        heading: params.start_angle.to_radians(),
    };
    let mut stack: Vec<TurtleState> = Vec::new();
    let mut index = 0;

    for c in sentence.chars() {
        match Symbol::classify(c) {
            Symbol::Letter(symbol) => {
                let start = (state.x, state.y);
                state.x += state.heading.cos() * params.length;
                state.y += state.heading.sin() * params.length;
                sink.draw_segment(&SegmentStep {
                    index,
                    depth: stack.len(),
                    start,
                    end: (state.x, state.y),
                    symbol,
                });
                index += 1;
            }
            Symbol::TurnLeft => {
                state.heading += turn_rad;
                sink.turn(params.angle);
            }
            Symbol::TurnRight => {
                state.heading -= turn_rad;
                sink.turn(-params.angle);
            }
            Symbol::Push => {
                stack.push(state);
                sink.push_state();
            }
            Symbol::Pop => {
                if let Some(saved) = stack.pop() {
                    state = saved;
                    sink.pop_state();
                }
            }
            Symbol::Other(_) => {}
        }
    }

    state
}

/// Axis-aligned box of pen positions
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for Bounds {
    /// The degenerate box around the origin
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 0.0,
            min_y: 0.0,
            max_y: 0.0,
        }
    }
}

impl Bounds {
    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }
}

/// Accumulates [`Bounds`] without drawing
#[derive(Debug, Default)]
pub struct BoundsSink {
    pub bounds: Bounds,
}

impl TurtleSink for BoundsSink {
    fn draw_segment(&mut self, step: &SegmentStep) {
        self.bounds.include(step.end.0, step.end.1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Op {
        Draw(usize, usize, char),
        Turn(f64),
        Push,
        Pop,
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl TurtleSink for Recorder {
        fn draw_segment(&mut self, step: &SegmentStep) {
            self.ops.push(Op::Draw(step.index, step.depth, step.symbol));
        }
        fn turn(&mut self, delta_degrees: f64) {
            self.ops.push(Op::Turn(delta_degrees));
        }
        fn push_state(&mut self) {
            self.ops.push(Op::Push);
        }
        fn pop_state(&mut self) {
            self.ops.push(Op::Pop);
        }
    }

    const UNIT: TurtleParams = TurtleParams {
        length: 1.0,
        angle: 90.0,
        start_angle: 0.0,
    };

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_classify() {
        assert_eq!(Symbol::classify('F'), Symbol::Letter('F'));
        assert_eq!(Symbol::classify('+'), Symbol::TurnLeft);
        assert_eq!(Symbol::classify('-'), Symbol::TurnRight);
        assert_eq!(Symbol::classify('['), Symbol::Push);
        assert_eq!(Symbol::classify(']'), Symbol::Pop);
        assert_eq!(Symbol::classify('f'), Symbol::Other('f'));
        assert_eq!(Symbol::classify('|'), Symbol::Other('|'));
    }

    #[test]
    fn test_operation_sequence() {
        let mut rec = Recorder::default();
        walk("F[+G]-xH", &UNIT, &mut rec);
        assert_eq!(
            rec.ops,
            vec![
                Op::Draw(0, 0, 'F'),
                Op::Push,
                Op::Turn(90.0),
                Op::Draw(1, 1, 'G'),
                Op::Pop,
                Op::Turn(-90.0),
                Op::Draw(2, 0, 'H'),
            ]
        );
    }

    #[test]
    fn test_branch_restores_position() {
        let mut rec = Recorder::default();
        let end = walk("F[+F]F", &UNIT, &mut rec);
        assert!(close((end.x, end.y), (2.0, 0.0)));
        assert!(end.heading.abs() < 1e-12);
    }

    #[test]
    fn test_unbalanced_close_is_noop() {
        let mut rec = Recorder::default();
        let end = walk("F]F", &UNIT, &mut rec);
        assert!(close((end.x, end.y), (2.0, 0.0)));
        assert!(!rec.ops.contains(&Op::Pop));
    }

    #[test]
    fn test_unclosed_open_keeps_state() {
        let mut rec = Recorder::default();
        let end = walk("F[F", &UNIT, &mut rec);
        assert!(close((end.x, end.y), (2.0, 0.0)));
        assert_eq!(rec.ops.last(), Some(&Op::Draw(1, 1, 'F')));
    }

    #[test]
    fn test_start_angle_and_segment_positions() {
        struct Ends(Vec<((f64, f64), (f64, f64))>);
        impl TurtleSink for Ends {
            fn draw_segment(&mut self, step: &SegmentStep) {
                self.0.push((step.start, step.end));
            }
        }

        let params = TurtleParams {
            length: 2.0,
            angle: 90.0,
            start_angle: -90.0,
        };
        let mut ends = Ends(Vec::new());
        walk("F+F", &params, &mut ends);
        assert!(close(ends.0[0].0, (0.0, 0.0)));
        assert!(close(ends.0[0].1, (0.0, -2.0)));
        assert!(close(ends.0[1].0, (0.0, -2.0)));
        assert!(close(ends.0[1].1, (2.0, -2.0)));
    }

    #[test]
    fn test_bounds_sink() {
        let mut sink = BoundsSink::default();
        walk("F+F+F", &UNIT, &mut sink);
        let b = sink.bounds;
        assert!(close((b.min_x, b.max_x), (0.0, 1.0)));
        assert!(close((b.min_y, b.max_y), (0.0, 1.0)));
        assert!(close(b.center(), (0.5, 0.5)));
    }
}
