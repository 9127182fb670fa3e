//! 2D affine transforms and a canvas-style transform stack

/// Row-major 2x3 matrix: `x' = a*x + c*y + e`, `y' = b*x + d*y + f`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            e: dx,
            f: dy,
            ..Self::IDENTITY
        }
    }

    pub fn rotation(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn scaling(factor: f64) -> Self {
        Self {
            a: factor,
            d: factor,
            ..Self::IDENTITY
        }
    }

    /// `self` applied after `inner`
    pub fn then(&self, inner: &Affine) -> Affine {
        Affine {
            a: self.a * inner.a + self.c * inner.b,
            b: self.b * inner.a + self.d * inner.b,
            c: self.a * inner.c + self.c * inner.d,
            d: self.b * inner.c + self.d * inner.d,
            e: self.a * inner.e + self.c * inner.f + self.e,
            f: self.b * inner.e + self.d * inner.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    /// Uniform scale factor (length of a transformed unit vector)
    pub fn scale_factor(&self) -> f64 {
        (self.a * self.d - self.b * self.c).abs().sqrt()
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Current transform plus saved copies.
///
/// New operations are composed on the local side, the way a canvas API
/// does: `translate` then `rotate` rotates around the translated origin.
#[derive(Debug, Clone, Default)]
pub struct TransformStack {
    current: Affine,
    saved: Vec<Affine>,
}

impl TransformStack {
    pub fn current(&self) -> &Affine {
        &self.current
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn reset(&mut self) {
        self.current = Affine::IDENTITY;
        self.saved.clear();
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.current = self.current.then(&Affine::translation(dx, dy));
    }

    pub fn rotate(&mut self, radians: f64) {
        self.current = self.current.then(&Affine::rotation(radians));
    }

    pub fn scale(&mut self, factor: f64) {
        self.current = self.current.then(&Affine::scaling(factor));
    }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Restore the last saved transform; empty stack is a no-op
    pub fn pop(&mut self) {
        if let Some(saved) = self.saved.pop() {
            self.current = saved;
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        self.current.apply(x, y)
    }
}
