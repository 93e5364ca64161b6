// THEORY:
// This file is the entry point of the `density_heatmap` library crate. The public
// face of the crate is the `HeatmapPipeline` together with its configuration
// (`PipelineConfig`, `HeatmapMode`), its result (`Heatmap`) and the run-scoped
// progress and cancellation types.
//
// The algorithmic leaves (clustering, densifying, stamping, coloring) live in
// `core_modules` and stay usable on their own, but a host normally only talks to
// the pipeline: hand it projected points, await the colorized image.

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod surface;

pub use core_modules::point::{Point2D, WorldPoint};
pub use error::{HeatmapError, Result};
pub use pipeline::{Heatmap, HeatmapMode, HeatmapPipeline, PipelineConfig};
pub use progress::{CancelHandle, CancelToken, Progress, RunStage, cancel_pair};
pub use surface::{ProjectionSurface, ScreenSurface};
