// THEORY:
// The `Canvas` is the accumulation buffer of a single heatmap run. It is a
// floating-point RGBA surface, so stamped alpha can pile up past 1.0: density is
// stored as alpha saturation and only turned into color at the very end.
//
// A fresh canvas is fully transparent white. It is owned by exactly one run and
// is either colorized and handed out, or dropped.

use image::{Rgba, Rgba32FImage, RgbaImage};

/// The color every pixel starts with: white, fully transparent.
pub const TRANSPARENT: Rgba<f32> = Rgba([1.0, 1.0, 1.0, 0.0]);

/// A W×H floating-point RGBA accumulation surface.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: Rgba32FImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: Rgba32FImage::from_pixel(width, height, TRANSPARENT),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether a signed pixel coordinate lands on the canvas.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    /// Accumulated alpha at a signed coordinate, `None` off-canvas.
    pub fn alpha_at(&self, x: i32, y: i32) -> Option<f32> {
        self.get(x, y).map(|pixel| pixel[3])
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&Rgba<f32>> {
        if !self.contains(x, y) {
            return None;
        }
        Some(self.image.get_pixel(x as u32, y as u32))
    }

    /// Writes a pixel; off-canvas coordinates are ignored. Returns whether it landed.
    pub fn put(&mut self, x: i32, y: i32, pixel: Rgba<f32>) -> bool {
        if !self.contains(x, y) {
            return false;
        }
        self.image.put_pixel(x as u32, y as u32, pixel);
        true
    }

    /// Number of pixels with non-zero alpha.
    pub fn painted_pixels(&self) -> usize {
        self.image.pixels().filter(|pixel| pixel[3] != 0.0).count()
    }

    pub fn pixels_mut(&mut self) -> impl Iterator<Item = &mut Rgba<f32>> {
        self.image.pixels_mut()
    }

    pub fn as_image(&self) -> &Rgba32FImage {
        &self.image
    }

    pub fn into_image(self) -> Rgba32FImage {
        self.image
    }
}

/// Quantizes a floating-point image to 8 bits per channel, clamping to [0, 1].
pub fn to_rgba8(image: &Rgba32FImage) -> RgbaImage {
    let quantize = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        Rgba([quantize(r), quantize(g), quantize(b), quantize(a)])
    })
}
