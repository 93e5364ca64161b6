// THEORY:
// Offline there is no live camera to ask, so the renderer approximates the
// recording camera with an axis-aligned orthographic view. Two world axes are
// picked (x/y for 2D sessions, x/z for top-down 3D sessions), the view is
// centered on the camera position and scaled so that `2 * orth_size` world units
// span the image height. Camera rotation is not modelled.
//
// The second world axis points up while image rows count down from the top,
// so that axis is flipped: world "up" lands in the upper half of the image.

use crate::events::SettingsData;
use clap::ValueEnum;
use density_heatmap::{Point2D, ProjectionSurface, WorldPoint};

/// The pair of world axes mapped onto the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Plane {
    Xy,
    Xz,
}

impl Plane {
    fn pick(self, world: WorldPoint) -> (f64, f64) {
        match self {
            Plane::Xy => (world[0], world[1]),
            Plane::Xz => (world[0], world[2]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarSurface {
    pub plane: Plane,
    pub width: u32,
    pub height: u32,
    /// World coordinates that land on the image center.
    pub center: (f64, f64),
    pub pixels_per_unit: f64,
}

impl PlanarSurface {
    /// A surface where one world unit is one pixel and the world origin is the
    /// bottom-left corner.
    pub fn pixel_space(plane: Plane, width: u32, height: u32) -> Self {
        Self {
            plane,
            width,
            height,
            center: (width as f64 / 2.0, height as f64 / 2.0),
            pixels_per_unit: 1.0,
        }
    }

    /// The recording camera's view, when the settings carry its position and size.
    pub fn from_camera(plane: Plane, settings: &SettingsData) -> Option<Self> {
        let orth_size = settings.cam_orth_size.filter(|size| *size > 0.0)?;
        let camera = [
            settings.cam_pos_x?,
            settings.cam_pos_y?,
            settings.cam_pos_z?,
        ];
        Some(Self {
            plane,
            width: settings.texture_width,
            height: settings.texture_height,
            center: plane.pick(camera),
            pixels_per_unit: settings.texture_height as f64 / (2.0 * orth_size),
        })
    }
}

impl ProjectionSurface for PlanarSurface {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn project(&self, world: WorldPoint) -> Point2D {
        let (a, b) = self.plane.pick(world);
        Point2D::new(
            (a - self.center.0) * self.pixels_per_unit + self.width as f64 / 2.0,
            self.height as f64 / 2.0 - (b - self.center.1) * self.pixels_per_unit,
        )
    }
}
