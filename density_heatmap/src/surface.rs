// THEORY:
// The engine never decides how a recorded world position maps to a pixel; that
// belongs to the host's camera. A `ProjectionSurface` is the seam: it reports
// the resolution of the render target and projects world positions onto it.
// When the host cannot provide one, the run fails before anything is allocated.

use crate::core_modules::point::{Point2D, WorldPoint};

/// A render target plus the projection onto it.
pub trait ProjectionSurface: Send + Sync {
    /// Target resolution in pixels, `(width, height)`.
    fn resolution(&self) -> (u32, u32);

    fn project(&self, world: WorldPoint) -> Point2D;
}

/// A surface for positions that are already in pixels: `x` and `y` pass through, `z` is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSurface {
    pub width: u32,
    pub height: u32,
}

impl ScreenSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ProjectionSurface for ScreenSurface {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn project(&self, world: WorldPoint) -> Point2D {
        Point2D::new(world[0], world[1])
    }
}
