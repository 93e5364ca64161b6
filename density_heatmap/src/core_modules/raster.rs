// THEORY:
// The `RasterAccumulator` turns points into density. Every point is drawn as a
// "stamp": concentric rings of decreasing alpha, from the point itself out to
// the stamp radius. Stamps from different points are added together on the
// canvas, so overlapping stamps grow darker and hotspots emerge on their own.
//
// Key principles:
// 1.  **Per-Point Scratch Map**: A stamp is first drawn into a coordinate→color
//     scratch map. Rings are traced by sampling the circle every 0.1°, so nearby
//     samples of the same ring (and rings of the same stamp) hit the same pixel
//     many times. The scratch map collapses those hits: the last ring to reach a
//     pixel wins, and the stamp contributes to that pixel exactly once.
// 2.  **Linear Falloff**: Each ring is `alpha_step / (radius / line_width)`
//     fainter than the previous one, so the stamp fades to nothing at its edge.
// 3.  **Additive Flush**: After the stamp is complete its scratch map is added
//     onto the canvas alpha. There is no clamping; the colorizer decides how
//     much density is "hot".
// 4.  **Reuse**: The scratch map lives as long as the accumulator and is only
//     cleared between stamps, so a long run does not reallocate it per point.

use crate::core_modules::canvas::Canvas;
use crate::core_modules::point::Point2D;
use image::Rgba;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Starting alpha for cluster (density) stamps.
pub const DENSITY_ALPHA_STEP: f32 = 0.01;
/// Starting alpha for trajectory stamps.
pub const TRAJECTORY_ALPHA_STEP: f32 = 0.1;
pub const DEFAULT_LINE_WIDTH: u32 = 1;

/// One sample every tenth of a degree.
const ANGLE_SAMPLES: usize = 3600;

// (cos, sin) for every sampled angle, built on first use.
static UNIT_CIRCLE: OnceLock<Vec<(f64, f64)>> = OnceLock::new();

fn unit_circle() -> &'static [(f64, f64)] {
    UNIT_CIRCLE.get_or_init(|| {
        (0..ANGLE_SAMPLES)
            .map(|tenth| {
                let phi = (tenth as f64 / 10.0).to_radians();
                (phi.cos(), phi.sin())
            })
            .collect()
    })
}

/// How a single point is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampStyle {
    /// Rings are drawn for `0..radius`; nothing lands at or beyond it.
    pub radius: u32,
    /// Alpha of the innermost ring.
    pub alpha_step: f32,
    /// Ring thickness in pixels, also the ring spacing.
    pub line_width: u32,
    /// RGB written alongside the alpha.
    pub color: [f32; 3],
}

impl StampStyle {
    pub fn new(radius: u32, alpha_step: f32) -> Self {
        Self {
            radius,
            alpha_step,
            line_width: DEFAULT_LINE_WIDTH,
            color: [1.0, 1.0, 1.0],
        }
    }
}

/// Draws stamps into a canvas through a reusable scratch map.
pub struct RasterAccumulator {
    style: StampStyle,
    scratch: HashMap<(i32, i32), Rgba<f32>>,
}

impl RasterAccumulator {
    pub fn new(style: StampStyle) -> Self {
        let mut accumulator = Self {
            style,
            scratch: HashMap::new(),
        };
        accumulator.set_style(style);
        accumulator
    }

    pub fn style(&self) -> &StampStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: StampStyle) {
        self.style = StampStyle {
            line_width: style.line_width.max(1),
            ..style
        };
    }

    /// Stamps one point onto the canvas. Returns the number of distinct pixels the
    /// stamp covered, including any that fell off the canvas.
    pub fn stamp(&mut self, canvas: &mut Canvas, point: Point2D) -> usize {
        let StampStyle {
            radius,
            alpha_step,
            line_width,
            color: [red, green, blue],
        } = self.style;

        self.scratch.clear();

        let width = line_width as i32;
        let decay = alpha_step / (radius as f32 / line_width as f32);
        let mut alpha = alpha_step;

        for ring in (0..radius).step_by(line_width as usize) {
            let ring = ring as f64;
            let pixel = Rgba([red, green, blue, alpha]);

            for &(cos, sin) in unit_circle() {
                let x = (point.x + ring * cos) as i32;
                let y = (point.y + ring * sin) as i32;
                for y2 in (y - width + 1..=y).rev() {
                    for x2 in x..x + width {
                        self.scratch.insert((x2, y2), pixel);
                    }
                }
            }

            alpha -= decay;
        }

        let covered = self.scratch.len();
        self.flush(canvas);
        covered
    }

    /// Adds the scratch map onto the canvas.
    fn flush(&mut self, canvas: &mut Canvas) {
        for (&(x, y), &Rgba([red, green, blue, alpha])) in &self.scratch {
            if let Some(previous) = canvas.alpha_at(x, y) {
                canvas.put(x, y, Rgba([red, green, blue, alpha + previous]));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-6;

    #[test]
    fn stamp_fades_outwards_and_stops_at_the_radius() {
        let mut canvas = Canvas::new(40, 40);
        let mut accumulator = RasterAccumulator::new(StampStyle::new(5, DENSITY_ALPHA_STEP));
        let center = Point2D::new(20.5, 20.5);
        accumulator.stamp(&mut canvas, center);

        // Along the +x axis each pixel is last written by the ring at its own distance.
        let along_axis: Vec<f32> = (0..=6).map(|k| canvas.alpha_at(20 + k, 20).unwrap()).collect();
        for k in 0..4 {
            assert!(
                along_axis[k] > along_axis[k + 1],
                "alpha at {k} ({}) not above alpha at {} ({})",
                along_axis[k],
                k + 1,
                along_axis[k + 1]
            );
        }
        assert!(along_axis[4] > 0.0);
        assert_eq!(along_axis[5], 0.0);
        assert_eq!(along_axis[6], 0.0);
        assert!((along_axis[0] - DENSITY_ALPHA_STEP).abs() < TOLERANCE);

        for (x, y, pixel) in canvas.as_image().enumerate_pixels() {
            if pixel[3] == 0.0 {
                continue;
            }
            let distance = Point2D::new(x as f64 + 0.5, y as f64 + 0.5).distance(&center);
            assert!(distance < 5.0, "pixel ({x}, {y}) painted at distance {distance}");
            assert!(pixel[3] <= DENSITY_ALPHA_STEP + TOLERANCE);
        }
    }

    #[test]
    fn overlapping_stamps_accumulate_without_clamping() {
        let mut canvas = Canvas::new(20, 20);
        let mut accumulator = RasterAccumulator::new(StampStyle::new(3, 0.6));
        let point = Point2D::new(10.5, 10.5);
        accumulator.stamp(&mut canvas, point);
        accumulator.stamp(&mut canvas, point);

        let center = canvas.alpha_at(10, 10).unwrap();
        assert!((center - 1.2).abs() < TOLERANCE, "center alpha {center}");
    }

    #[test]
    fn pixels_off_the_canvas_are_dropped() {
        let mut canvas = Canvas::new(10, 10);
        let mut accumulator = RasterAccumulator::new(StampStyle::new(5, DENSITY_ALPHA_STEP));
        let covered = accumulator.stamp(&mut canvas, Point2D::new(0.5, 0.5));

        let painted = canvas.painted_pixels();
        assert!(painted > 0);
        assert!(covered > painted);
    }

    #[test]
    fn wider_lines_space_the_rings_out() {
        let mut canvas = Canvas::new(40, 40);
        let style = StampStyle {
            line_width: 2,
            ..StampStyle::new(6, DENSITY_ALPHA_STEP)
        };
        let mut accumulator = RasterAccumulator::new(style);
        accumulator.stamp(&mut canvas, Point2D::new(20.5, 20.5));

        // Rings at 0, 2 and 4; the outermost carries two decrements of step / 3.
        let decay = DENSITY_ALPHA_STEP / (6.0 / 2.0);
        let expected = DENSITY_ALPHA_STEP - decay - decay;
        let outer = canvas.alpha_at(24, 20).unwrap();
        assert!((outer - expected).abs() < TOLERANCE, "{outer} != {expected}");
        assert_eq!(canvas.alpha_at(26, 20), Some(0.0));
    }

    #[test]
    fn zero_line_width_is_treated_as_one() {
        let style = StampStyle {
            line_width: 0,
            ..StampStyle::new(4, TRAJECTORY_ALPHA_STEP)
        };
        let accumulator = RasterAccumulator::new(style);
        assert_eq!(accumulator.style().line_width, 1);
    }
}
