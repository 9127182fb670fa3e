//! Raster backend - draws into an in-memory RGBA image for PNG export

use image::{Rgba, RgbaImage};
use std::path::Path;

use super::{Renderer, TransformStack};
use crate::color::Rgb;

/// [`Renderer`] over an `image::RgbaImage`
pub struct RasterRenderer {
    image: RgbaImage,
    stack: TransformStack,
    stroke: Rgb,
    stroke_width: f64,
}

impl RasterRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            stack: TransformStack::default(),
            stroke: Rgb::BLACK,
            stroke_width: 1.0,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn save_png(&self, path: &Path) -> anyhow::Result<()> {
        self.image.save(path)?;
        Ok(())
    }

    /// Fill every pixel whose center lies within `radius` of the segment
    fn fill_capsule(&mut self, (sx, sy): (f64, f64), (ex, ey): (f64, f64), radius: f64) {
        let (w, h) = self.image.dimensions();
        let pixel = Rgba([self.stroke.r, self.stroke.g, self.stroke.b, 255]);
        let (dx, dy) = (ex - sx, ey - sy);
        let len = dx.hypot(dy);
        let (ux, uy) = if len > f64::EPSILON { (dx / len, dy / len) } else { (0.0, 0.0) };

        let y_min = (sy.min(ey) - radius).floor().max(0.0) as i64;
        let y_max = (sy.max(ey) + radius).ceil().min(h as f64 - 1.0) as i64;
        for y in y_min..=y_max {
            let py = y as f64 + 0.5;
            let mut span: Option<(f64, f64)> = None;
            let mut merge = |range: Option<(f64, f64)>| {
                if let Some((lo, hi)) = range {
                    span = Some(match span {
                        Some((a, b)) => (a.min(lo), b.max(hi)),
                        None => (lo, hi),
                    });
                }
            };

            merge(disc_span(sx, sy, radius, py));
            merge(disc_span(ex, ey, radius, py));
            if len > f64::EPSILON {
                // Body: |cross| <= radius and 0 <= projection <= len, both linear in x
                let qy = py - sy;
                let across = linear_span(-uy, ux * qy, -radius, radius);
                let along = linear_span(ux, uy * qy, 0.0, len);
                if let (Some((a0, a1)), Some((b0, b1))) = (across, along) {
                    let (lo, hi) = (a0.max(b0), a1.min(b1));
                    if lo <= hi {
                        merge(Some((lo + sx, hi + sx)));
                    }
                }
            }

            let Some((lo, hi)) = span else { continue };
            let x_min = (lo - 0.5).ceil().max(0.0) as i64;
            let x_max = (hi - 0.5).floor().min(w as f64 - 1.0) as i64;
            for x in x_min..=x_max {
                self.image.put_pixel(x as u32, y as u32, pixel);
            }
        }
    }
}

/// Horizontal extent of a disc on the row at `py`
fn disc_span(cx: f64, cy: f64, radius: f64, py: f64) -> Option<(f64, f64)> {
    let dy = py - cy;
    let rem = radius * radius - dy * dy;
    if rem < 0.0 {
        return None;
    }
    let half = rem.sqrt();
    Some((cx - half, cx + half))
}

/// Values of `x` with `lo <= a * x + b <= hi`
fn linear_span(a: f64, b: f64, lo: f64, hi: f64) -> Option<(f64, f64)> {
    if a.abs() < 1e-12 {
        return (lo..=hi).contains(&b).then_some((f64::NEG_INFINITY, f64::INFINITY));
    }
    let (x0, x1) = ((lo - b) / a, (hi - b) / a);
    Some((x0.min(x1), x0.max(x1)))
}

impl Renderer for RasterRenderer {
    fn background(&mut self, color: Rgb) {
        let pixel = Rgba([color.r, color.g, color.b, 255]);
        for p in self.image.pixels_mut() {
            *p = pixel;
        }
    }

    fn reset_transform(&mut self) {
        self.stack.reset();
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.stack.translate(dx, dy);
    }

    fn rotate(&mut self, radians: f64) {
        self.stack.rotate(radians);
    }

    fn scale(&mut self, factor: f64) {
        self.stack.scale(factor);
    }

    fn push_transform(&mut self) {
        self.stack.push();
    }

    fn pop_transform(&mut self) {
        self.stack.pop();
    }

    fn draw_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        let (sx, sy) = self.stack.apply(x0, y0);
        let (ex, ey) = self.stack.apply(x1, y1);
        let radius = (self.stroke_width * self.stack.current().scale_factor() / 2.0).max(0.5);

        let (w, h) = self.image.dimensions();
        let (w, h) = (w as f64, h as f64);
        let outside = |a: f64, b: f64, lo: f64, hi: f64| a.max(b) < lo - radius || a.min(b) > hi + radius;
        if outside(sx, ex, 0.0, w) || outside(sy, ey, 0.0, h) {
            return;
        }

        self.fill_capsule((sx, sy), (ex, ey), radius);
    }

    fn set_stroke_color(&mut self, color: Rgb) {
        self.stroke = color;
    }

    fn set_stroke_width(&mut self, px: f64) {
        self.stroke_width = px;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_at(r: &RasterRenderer, x: u32, y: u32) -> Rgb {
        let p = r.image().get_pixel(x, y);
        Rgb::new(p[0], p[1], p[2])
    }

    #[test]
    fn test_background_fills() {
        let mut r = RasterRenderer::new(4, 3);
        r.background(Rgb::new(1, 2, 3));
        assert!(r.image().pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn test_line_under_transform() {
        let mut r = RasterRenderer::new(20, 20);
        r.background(Rgb::WHITE);
        r.set_stroke_color(Rgb::BLACK);
        r.set_stroke_width(3.0);
        r.translate(2.0, 10.0);
        r.draw_line(0.0, 0.0, 15.0, 0.0);

        assert_eq!(rgb_at(&r, 5, 10), Rgb::BLACK);
        assert_eq!(rgb_at(&r, 16, 9), Rgb::BLACK);
        assert_eq!(rgb_at(&r, 5, 2), Rgb::WHITE);
        assert_eq!(rgb_at(&r, 19, 10), Rgb::WHITE);
    }

    #[test]
    fn test_thick_line_has_round_caps() {
        let mut r = RasterRenderer::new(40, 20);
        r.background(Rgb::WHITE);
        r.set_stroke_width(8.0);
        r.draw_line(10.0, 10.0, 30.0, 10.0);

        assert_eq!(rgb_at(&r, 20, 13), Rgb::BLACK);
        assert_eq!(rgb_at(&r, 20, 15), Rgb::WHITE);
        assert_eq!(rgb_at(&r, 33, 10), Rgb::BLACK);
        assert_eq!(rgb_at(&r, 33, 13), Rgb::WHITE);
        assert_eq!(rgb_at(&r, 6, 10), Rgb::BLACK);
    }

    #[test]
    fn test_diagonal_line() {
        let mut r = RasterRenderer::new(24, 24);
        r.background(Rgb::WHITE);
        r.set_stroke_width(2.0);
        r.draw_line(0.0, 0.0, 20.0, 20.0);

        assert_eq!(rgb_at(&r, 10, 10), Rgb::BLACK);
        assert_eq!(rgb_at(&r, 11, 10), Rgb::BLACK);
        assert_eq!(rgb_at(&r, 10, 14), Rgb::WHITE);
        assert_eq!(rgb_at(&r, 23, 23), Rgb::WHITE);
    }

    #[test]
    fn test_wide_zoomed_stroke_fills_disc_at_a_point() {
        let mut r = RasterRenderer::new(500, 100);
        r.background(Rgb::WHITE);
        r.scale(100.0);
        r.set_stroke_width(0.1);
        r.draw_line(0.5, 0.5, 0.5, 0.5);

        assert_eq!(rgb_at(&r, 50, 50), Rgb::BLACK);
        assert_eq!(rgb_at(&r, 50, 45), Rgb::BLACK);
        assert_eq!(rgb_at(&r, 50, 40), Rgb::WHITE);
    }

    #[test]
    fn test_offscreen_line_is_skipped() {
        let mut r = RasterRenderer::new(10, 10);
        r.background(Rgb::WHITE);
        r.draw_line(-100.0, -100.0, -50.0, -80.0);
        assert!(r.image().pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }
}
