//! Viewport Controller - pan/zoom state and gesture math
//!
//! Screen mapping: `screen = center + offset + scale * (canvas - center)`,
//! where `canvas` is a point in unzoomed canvas space. Every zoom keeps the
//! canvas point under its anchor fixed on screen.

/// Scale bounds
pub const MIN_SCALE: f64 = 0.05;
pub const MAX_SCALE: f64 = 100.0;

/// Screen-space point in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(&self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// What a pointer release meant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanRelease {
    /// Pressed and released without moving
    Tap,
    /// The pointer moved while pressed
    Drag,
    /// No pan was in progress
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    origin: Point,
    moved: bool,
}

/// Pan offset + zoom scale, plus in-flight gesture state
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    scale: f64,
    offset: Point,
    canvas_width: f64,
    canvas_height: f64,
    drag: Option<Drag>,
    pinch_distance: f64,
}

impl Viewport {
    pub fn new(canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            scale: 1.0,
            offset: Point::default(),
            canvas_width,
            canvas_height,
            drag: None,
            pinch_distance: 0.0,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn canvas_size(&self) -> (f64, f64) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn screen_center(&self) -> Point {
        Point::new(self.canvas_width / 2.0, self.canvas_height / 2.0)
    }

    pub fn resize(&mut self, canvas_width: f64, canvas_height: f64) {
        self.canvas_width = canvas_width;
        self.canvas_height = canvas_height;
    }

    /// Back to `scale = 1`, no offset; drops any gesture in flight
    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.offset = Point::default();
        self.drag = None;
        self.pinch_distance = 0.0;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Canvas-space point to screen
    pub fn to_screen(&self, p: Point) -> Point {
        let c = self.screen_center();
        Point::new(
            c.x + self.offset.x + self.scale * (p.x - c.x),
            c.y + self.offset.y + self.scale * (p.y - c.y),
        )
    }

    /// Screen point to canvas space
    pub fn to_canvas(&self, s: Point) -> Point {
        let c = self.screen_center();
        Point::new(
            c.x + (s.x - c.x - self.offset.x) / self.scale,
            c.y + (s.y - c.y - self.offset.y) / self.scale,
        )
    }

    /// Multiply the scale by `factor`, keeping `anchor` fixed
    pub fn zoom(&mut self, anchor: Point, factor: f64) {
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        let c = self.screen_center();
        let px = anchor.x - c.x;
        let py = anchor.y - c.y;
        let ratio = new_scale / self.scale;
        self.offset.x = px - (px - self.offset.x) * ratio;
        self.offset.y = py - (py - self.offset.y) * ratio;
        self.scale = new_scale;
    }

    /// Mouse wheel: one notch in or out
    pub fn wheel(&mut self, anchor: Point, delta: f64) {
        if delta == 0.0 {
            return;
        }
        let factor = if delta > 0.0 { 1.1 } else { 0.9 };
        self.zoom(anchor, factor);
    }

    pub fn pan_start(&mut self, pointer: Point) {
        self.drag = Some(Drag {
            origin: Point::new(pointer.x - self.offset.x, pointer.y - self.offset.y),
            moved: false,
        });
        self.pinch_distance = 0.0;
    }

    pub fn pan_move(&mut self, pointer: Point) {
        if let Some(drag) = self.drag.as_mut() {
            self.offset = Point::new(pointer.x - drag.origin.x, pointer.y - drag.origin.y);
            drag.moved = true;
        }
    }

    /// End the pan; a [`PanRelease::Tap`] asks the caller for one grammar step
    pub fn pan_end(&mut self) -> PanRelease {
        match self.drag.take() {
            Some(Drag { moved: false, .. }) => PanRelease::Tap,
            Some(Drag { moved: true, .. }) => PanRelease::Drag,
            None => PanRelease::Idle,
        }
    }

    /// Two fingers down: arm a pinch. The press can no longer be a tap.
    pub fn pinch_start(&mut self, a: Point, b: Point) {
        if let Some(drag) = self.drag.as_mut() {
            drag.moved = true;
        }
        self.pinch_distance = a.distance(b);
    }

    /// Zoom by the change in finger distance, anchored at the midpoint.
    ///
    /// The first sample after arming only records the distance.
    pub fn pinch_move(&mut self, a: Point, b: Point) {
        let d = a.distance(b);
        if self.pinch_distance > 0.0 {
            let factor = d / self.pinch_distance;
            self.zoom(a.midpoint(b), factor);
        }
        self.pinch_distance = d;
    }

    /// One finger lifted mid-pinch: restart a single-finger pan from the
    /// remaining finger, already marked as moved.
    pub fn pinch_end(&mut self, remaining: Option<Point>) {
        self.pinch_distance = 0.0;
        match remaining {
            Some(pointer) => {
                self.pan_start(pointer);
                if let Some(drag) = self.drag.as_mut() {
                    drag.moved = true;
                }
            }
            None => self.drag = None,
        }
    }
}
