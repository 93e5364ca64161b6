// THEORY:
// `Point2D` is the unit of input for every stage of the heatmap engine. By the
// time a point reaches this crate it has already been projected into raster
// space by the host, so it is nothing more than an (x, y) pair in pixels.
//
// It is a "dumb" data container, exactly like the pixel and chunk types of an
// image pipeline: it knows its own coordinates, how far it is from another
// point and how to slide towards one. Everything else (grouping, stamping,
// coloring) lives in the stages that consume it.

/// A raw recorded position, only meaningful together with a `ProjectionSurface`.
pub type WorldPoint = [f64; 3];

/// A screen-space coordinate in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in screen space.
    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Linear interpolation towards `other`; `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(&self, other: &Point2D, t: f64) -> Point2D {
        Point2D {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Arithmetic mean of a set of points. `None` for an empty set.
    pub fn mean<'a>(points: impl IntoIterator<Item = &'a Point2D>) -> Option<Point2D> {
        let mut count = 0usize;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for point in points {
            sum_x += point.x;
            sum_y += point.y;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(Point2D {
            x: sum_x / count as f64,
            y: sum_y / count as f64,
        })
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Point2D { x, y }
    }
}
