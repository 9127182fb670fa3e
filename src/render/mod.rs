//! Rendering - the drawing surface contract and the per-frame draw pass
//!
//! The core never rasterizes. It issues calls against a [`Renderer`] in the
//! order dictated by the viewport transform and the turtle walk:
//!
//! 1. translate to canvas center + pan offset
//! 2. scale by the zoom
//! 3. translate back by the canvas center
//! 4. translate by `origin * canvas size`
//! 5. rotate by the start angle
//!
//! then one `draw_line` + `translate` per segment, `rotate` per turn and
//! `push_transform`/`pop_transform` per bracket.

pub mod affine;
pub mod raster;

pub use affine::TransformStack;
pub use raster::RasterRenderer;

use crate::color::{ColorContext, ColorMode, ColorSource, Rgb};
use crate::lsystem::{turtle, SegmentStep, System, TurtleSink};
use crate::viewport::Viewport;

/// Drawing primitives consumed by the core
pub trait Renderer {
    fn background(&mut self, color: Rgb);
    fn reset_transform(&mut self);
    fn translate(&mut self, dx: f64, dy: f64);
    fn rotate(&mut self, radians: f64);
    fn scale(&mut self, factor: f64);
    fn push_transform(&mut self);
    fn pop_transform(&mut self);
    fn draw_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64);
    fn set_stroke_color(&mut self, color: Rgb);
    fn set_stroke_width(&mut self, px: f64);
}

/// Apply the viewport and fractal placement transforms, in order
pub fn apply_view_transform<R: Renderer + ?Sized>(renderer: &mut R, viewport: &Viewport, system: &System) {
    let (width, height) = viewport.canvas_size();
    let offset = viewport.offset();
    let origin = system.spec().origin;

    renderer.reset_transform();
    renderer.translate(width / 2.0 + offset.x, height / 2.0 + offset.y);
    renderer.scale(viewport.scale());
    renderer.translate(-width / 2.0, -height / 2.0);
    renderer.translate(width * origin.x, height * origin.y);
    renderer.rotate(system.spec().start_angle.to_radians());
}

/// One full frame: background, view transform, colored segments
pub fn draw_frame<R: Renderer + ?Sized>(
    renderer: &mut R,
    system: &System,
    viewport: &Viewport,
    colors: &ColorSource<'_>,
    background: Rgb,
    stroke_width: f64,
) {
    renderer.background(background);
    apply_view_transform(renderer, viewport, system);
    renderer.set_stroke_width(stroke_width);

    let total_segments = match colors.mode {
        ColorMode::Flat => 1,
        _ => system.segment_count(),
    };
    let source = ColorSource {
        bounds: match colors.mode {
            ColorMode::Position => Some(system.bounds()),
            _ => None,
        },
        ..*colors
    };
    if source.mode == ColorMode::Flat {
        renderer.set_stroke_color(source.palette.get(0));
    }

    let mut sink = DrawSink {
        renderer,
        colors: &source,
        total_segments,
        length: system.spec().length,
    };
    turtle::walk(system.sentence(), &system.spec().turtle_params(), &mut sink);
}

/// Routes turtle operations to a [`Renderer`], coloring each segment
struct DrawSink<'a, R: Renderer + ?Sized> {
    renderer: &'a mut R,
    colors: &'a ColorSource<'a>,
    total_segments: usize,
    length: f64,
}

impl<R: Renderer + ?Sized> TurtleSink for DrawSink<'_, R> {
    fn draw_segment(&mut self, step: &SegmentStep) {
        if self.colors.mode != ColorMode::Flat {
            let ctx = ColorContext {
                segment_index: step.index,
                total_segments: self.total_segments,
                depth: step.depth,
                position: step.start,
                symbol: step.symbol,
            };
            self.renderer.set_stroke_color(self.colors.resolve(&ctx));
        }
        self.renderer.draw_line(0.0, 0.0, self.length, 0.0);
        self.renderer.translate(self.length, 0.0);
    }

    fn turn(&mut self, delta_degrees: f64) {
        self.renderer.rotate(delta_degrees.to_radians());
    }

    fn push_state(&mut self) {
        self.renderer.push_transform();
    }

    fn pop_state(&mut self) {
        self.renderer.pop_transform();
    }
}
