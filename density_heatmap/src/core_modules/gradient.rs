// THEORY:
// The gradient mapper is the last stage of a run. Up to this point the canvas
// only holds density, encoded as accumulated alpha. Colorization reads that
// density back and replaces every painted pixel with a color from a fixed
// blue → cyan → green → yellow → red ramp, plus a matching alpha ramp so sparse
// areas stay see-through and hotspots become nearly opaque.
//
// The ramp is a `const`: it is built at compile time and shared by every run.
//
// Colorization is a one-shot transform. Its output alpha is the ramp's alpha,
// not the density, so colorizing an already colorized canvas gives a different
// (wrong) image.

use crate::core_modules::canvas::Canvas;
use image::Rgba;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub position: f32,
    pub color: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaStop {
    pub position: f32,
    pub alpha: f32,
}

/// A piecewise-linear color ramp with an independent alpha ramp.
/// Stops must be sorted by position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient {
    pub colors: &'static [ColorStop],
    pub alphas: &'static [AlphaStop],
}

/// Density ramp used by every heatmap.
pub const HEAT_GRADIENT: Gradient = Gradient {
    colors: &[
        ColorStop {
            position: 0.0,
            color: [0.0, 0.0, 1.0],
        },
        ColorStop {
            position: 0.25,
            color: [0.0, 1.0, 1.0],
        },
        ColorStop {
            position: 0.5,
            color: [0.0, 1.0, 0.0],
        },
        // Warm yellow, not pure (1, 1, 0).
        ColorStop {
            position: 0.75,
            color: [1.0, 0.921_568_63, 0.015_686_275],
        },
        ColorStop {
            position: 1.0,
            color: [1.0, 0.0, 0.0],
        },
    ],
    alphas: &[
        AlphaStop {
            position: 0.0,
            alpha: 0.0,
        },
        AlphaStop {
            position: 1.0,
            alpha: 0.9,
        },
    ],
};

impl Gradient {
    /// Samples the ramp at `t`, clamped to [0, 1].
    pub fn evaluate(&self, t: f32) -> Rgba<f32> {
        let t = t.clamp(0.0, 1.0);
        let [red, green, blue] = self.color_at(t);
        Rgba([red, green, blue, self.alpha_at(t)])
    }

    fn color_at(&self, t: f32) -> [f32; 3] {
        let stops = self.colors;
        let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
            return [0.0; 3];
        };
        if t <= first.position {
            return first.color;
        }
        for pair in stops.windows(2) {
            let (low, high) = (&pair[0], &pair[1]);
            if t <= high.position {
                let f = fraction(t, low.position, high.position);
                return [
                    lerp(low.color[0], high.color[0], f),
                    lerp(low.color[1], high.color[1], f),
                    lerp(low.color[2], high.color[2], f),
                ];
            }
        }
        last.color
    }

    fn alpha_at(&self, t: f32) -> f32 {
        let stops = self.alphas;
        let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
            return 1.0;
        };
        if t <= first.position {
            return first.alpha;
        }
        for pair in stops.windows(2) {
            let (low, high) = (&pair[0], &pair[1]);
            if t <= high.position {
                return lerp(low.alpha, high.alpha, fraction(t, low.position, high.position));
            }
        }
        last.alpha
    }
}

fn fraction(t: f32, start: f32, end: f32) -> f32 {
    let span = end - start;
    if span <= 0.0 { 1.0 } else { (t - start) / span }
}

fn lerp(a: f32, b: f32, f: f32) -> f32 {
    a + (b - a) * f
}

/// Replaces every painted pixel with its ramp color. Returns how many were painted.
pub fn colorize_pixels<'a>(pixels: impl IntoIterator<Item = &'a mut Rgba<f32>>) -> usize {
    let mut colorized = 0;
    for pixel in pixels {
        let intensity = pixel[3] * 255.0;
        if intensity == 0.0 {
            continue;
        }
        *pixel = HEAT_GRADIENT.evaluate(intensity / 255.0);
        colorized += 1;
    }
    colorized
}

pub fn colorize(canvas: &mut Canvas) -> usize {
    colorize_pixels(canvas.pixels_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::canvas::TRANSPARENT;

    fn assert_close(actual: Rgba<f32>, expected: [f32; 4]) {
        for channel in 0..4 {
            assert!(
                (actual[channel] - expected[channel]).abs() < 1e-5,
                "{:?} != {:?}",
                actual.0,
                expected
            );
        }
    }

    #[test]
    fn stops_are_hit_exactly() {
        assert_close(HEAT_GRADIENT.evaluate(0.0), [0.0, 0.0, 1.0, 0.0]);
        assert_close(HEAT_GRADIENT.evaluate(0.25), [0.0, 1.0, 1.0, 0.225]);
        assert_close(HEAT_GRADIENT.evaluate(0.5), [0.0, 1.0, 0.0, 0.45]);
        assert_close(HEAT_GRADIENT.evaluate(1.0), [1.0, 0.0, 0.0, 0.9]);
    }

    #[test]
    fn between_stops_is_linear() {
        assert_close(HEAT_GRADIENT.evaluate(0.125), [0.0, 0.5, 1.0, 0.1125]);
        assert_close(HEAT_GRADIENT.evaluate(0.875), [1.0, 0.460_784_3, 0.007_843_138, 0.7875]);
    }

    #[test]
    fn saturated_density_clamps_to_red() {
        assert_close(HEAT_GRADIENT.evaluate(3.7), [1.0, 0.0, 0.0, 0.9]);
    }

    #[test]
    fn transparent_pixels_are_left_alone() {
        let mut pixels = vec![TRANSPARENT, Rgba([1.0, 1.0, 1.0, 0.01])];
        assert_eq!(colorize_pixels(pixels.iter_mut()), 1);
        assert_eq!(pixels[0], TRANSPARENT);

        // Sparse density sits at the blue end.
        let sparse = pixels[1];
        assert!(sparse[2] > sparse[1] && sparse[1] > sparse[0]);
        assert!(sparse[3] < 0.05);
    }

    #[test]
    fn colorizing_twice_changes_the_result() {
        let mut pixels = vec![Rgba([1.0, 1.0, 1.0, 0.5])];
        colorize_pixels(pixels.iter_mut());
        let once = pixels[0];
        assert_close(once, [0.0, 1.0, 0.0, 0.45]);

        colorize_pixels(pixels.iter_mut());
        assert_ne!(pixels[0], once);
    }
}
