// THEORY:
// The `pipeline` module is the top-level API of the heatmap engine. It strings the
// leaves together into one run and owns everything a run needs to be repeated
// cheaply: the stamp scratch map and the progress channel.
//
// A run moves through fixed stages:
//   Idle → Clustering | Densifying → Stamping → Colorizing → Done
// Density mode groups the points into clusters and stamps every member (each
// cluster's seed drawn at the cluster's centroid). Trajectory mode fills the
// recorded path with evenly spaced points and stamps those. Both modes share the
// stamping and coloring stages.
//
// Runs take `&mut self`, so one pipeline can never run twice at the same time
// and its scratch map is never shared. Stamps are flushed strictly in order;
// between two stamps the run yields to the scheduler so a host UI can repaint
// and poll progress, and checks whether it has been cancelled. A run either
// returns a fully colorized image or nothing at all.

use crate::core_modules::canvas::{self, Canvas};
use crate::core_modules::clusterer::dbscan;
use crate::core_modules::densifier::densify;
use crate::core_modules::gradient;
use crate::core_modules::raster::{
    DEFAULT_LINE_WIDTH, DENSITY_ALPHA_STEP, RasterAccumulator, StampStyle, TRAJECTORY_ALPHA_STEP,
};
use crate::error::{HeatmapError, Result};
use crate::progress::{CancelToken, Progress, ProgressReporter, RunStage};
use crate::surface::ProjectionSurface;
use image::{Rgba32FImage, RgbaImage};
use tokio::sync::watch;

// Re-export key data structures for the public API.
pub use crate::core_modules::clusterer::{Cluster, ClusterSet, PointLabel};
pub use crate::core_modules::point::{Point2D, WorldPoint};

const DEFAULT_CLUSTER_RADIUS: u32 = 15;
const DEFAULT_CLUSTER_EPSILON: f64 = 30.0;
const DEFAULT_CLUSTER_MIN_POINTS: u32 = 1;
const DEFAULT_TRAFFIC_RADIUS: u32 = 5;

/// Which heatmap to draw, with its per-run parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "mode", rename_all = "snake_case")
)]
pub enum HeatmapMode {
    /// Cluster the points, then stamp every cluster member.
    Density {
        radius: u32,
        epsilon: f64,
        min_points: u32,
    },
    /// Fill the path between consecutive points, then stamp the fill.
    /// `radius` is both the fill spacing and the stamp radius.
    Trajectory { radius: u32 },
}

impl HeatmapMode {
    pub fn density_default() -> Self {
        HeatmapMode::Density {
            radius: DEFAULT_CLUSTER_RADIUS,
            epsilon: DEFAULT_CLUSTER_EPSILON,
            min_points: DEFAULT_CLUSTER_MIN_POINTS,
        }
    }

    pub fn trajectory_default() -> Self {
        HeatmapMode::Trajectory {
            radius: DEFAULT_TRAFFIC_RADIUS,
        }
    }

    pub fn radius(&self) -> u32 {
        match *self {
            HeatmapMode::Density { radius, .. } | HeatmapMode::Trajectory { radius } => radius,
        }
    }

    /// Short name used in file names and logs.
    pub fn name(&self) -> &'static str {
        match self {
            HeatmapMode::Density { .. } => "cluster",
            HeatmapMode::Trajectory { .. } => "traffic",
        }
    }
}

/// Configuration for the HeatmapPipeline, shared by every run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct PipelineConfig {
    /// Ring thickness and ring spacing of every stamp, in pixels.
    pub line_width: u32,
    /// Innermost ring alpha for density stamps.
    pub density_alpha_step: f32,
    /// Innermost ring alpha for trajectory stamps.
    pub trajectory_alpha_step: f32,
    /// RGB written by the stamps before colorization.
    pub stamp_color: [f32; 3],
    /// Yield to the scheduler between two stamps.
    pub yield_between_points: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            density_alpha_step: DENSITY_ALPHA_STEP,
            trajectory_alpha_step: TRAJECTORY_ALPHA_STEP,
            stamp_color: [1.0, 1.0, 1.0],
            yield_between_points: true,
        }
    }
}

/// The finished, colorized output of one run.
#[derive(Debug, Clone)]
pub struct Heatmap {
    pub image: Rgba32FImage,
    pub mode: HeatmapMode,
    /// Number of stamps drawn.
    pub stamped_points: usize,
    /// The clustering behind a density heatmap; `None` for trajectories.
    pub clusters: Option<ClusterSet>,
}

impl Heatmap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// 8-bit RGBA copy, ready for encoding.
    pub fn to_rgba8(&self) -> RgbaImage {
        canvas::to_rgba8(&self.image)
    }
}

/// The main, top-level struct for the heatmap engine.
pub struct HeatmapPipeline {
    config: PipelineConfig,
    accumulator: RasterAccumulator,
    progress: ProgressReporter,
}

impl HeatmapPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let style = StampStyle {
            radius: 0,
            alpha_step: config.density_alpha_step,
            line_width: config.line_width,
            color: config.stamp_color,
        };
        Self {
            accumulator: RasterAccumulator::new(style),
            progress: ProgressReporter::new(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A receiver for progress snapshots; stays valid across runs.
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> Progress {
        self.progress.snapshot()
    }

    /// Projects raw world positions through `surface`, then renders them.
    /// Fails with `ProjectionUnavailable` when there is no surface.
    pub async fn render_projected(
        &mut self,
        surface: Option<&dyn ProjectionSurface>,
        world_points: &[WorldPoint],
        mode: HeatmapMode,
        cancel: Option<&CancelToken>,
    ) -> Result<Heatmap> {
        let Some(surface) = surface else {
            log::warn!("no projection surface available, heatmap run skipped");
            return Err(HeatmapError::ProjectionUnavailable);
        };

        let (width, height) = surface.resolution();
        let points: Vec<Point2D> = world_points
            .iter()
            .map(|world| surface.project(*world))
            .collect();
        self.render(&points, width, height, mode, cancel).await
    }

    /// Renders already projected points onto a `width` × `height` heatmap.
    pub async fn render(
        &mut self,
        points: &[Point2D],
        width: u32,
        height: u32,
        mode: HeatmapMode,
        cancel: Option<&CancelToken>,
    ) -> Result<Heatmap> {
        self.validate(points, width, height, &mode)?;
        log::debug!(
            "{} heatmap: {} points onto {}x{}",
            mode.name(),
            points.len(),
            width,
            height
        );

        // Stage 1: Grouping
        let (stamps, clusters, alpha_step) = match mode {
            HeatmapMode::Density {
                epsilon, min_points, ..
            } => {
                self.progress.begin(RunStage::Clustering);
                let clusters = dbscan::create_clusters(points, epsilon, min_points);
                log::debug!(
                    "{} clusters, {} noise points",
                    clusters.len(),
                    clusters.noise_count()
                );

                // Seeds are drawn at their cluster's centroid; the caller's points stay untouched.
                let mut working = points.to_vec();
                clusters.apply_centroids(&mut working);
                let stamps: Vec<Point2D> = clusters
                    .clusters
                    .iter()
                    .flat_map(|cluster| cluster.members.iter().map(|&index| working[index]))
                    .collect();
                (stamps, Some(clusters), self.config.density_alpha_step)
            }
            HeatmapMode::Trajectory { radius } => {
                self.progress.begin(RunStage::Densifying);
                let stamps = densify(points, radius);
                log::debug!("path densified into {} points", stamps.len());
                (stamps, None, self.config.trajectory_alpha_step)
            }
        };
        let total = stamps.len();
        self.progress.set_total(total);

        // Stage 2: Stamping
        let mut canvas = Canvas::new(width, height);
        self.accumulator.set_style(StampStyle {
            radius: mode.radius(),
            alpha_step,
            line_width: self.config.line_width,
            color: self.config.stamp_color,
        });
        self.progress.enter(RunStage::Stamping);

        for (stamped, point) in stamps.iter().enumerate() {
            if self.config.yield_between_points {
                tokio::task::yield_now().await;
            }
            if cancel.is_some_and(CancelToken::is_cancelled) {
                self.progress.enter(RunStage::Cancelled);
                log::info!("{} heatmap cancelled after {stamped} of {total} points", mode.name());
                return Err(HeatmapError::Cancelled { stamped, total });
            }

            let covered = self.accumulator.stamp(&mut canvas, *point);
            self.progress.advance();
            log::trace!(
                "stamp {}/{total} at ({:.1}, {:.1}) covered {covered} px",
                stamped + 1,
                point.x,
                point.y
            );
        }

        // Stage 3: Colorization
        if total > 0 {
            self.progress.enter(RunStage::Colorizing);
            let colorized = gradient::colorize(&mut canvas);
            log::debug!("colorized {colorized} pixels");
        }

        self.progress.enter(RunStage::Done);
        log::info!("{} heatmap finished: {total} stamps on {width}x{height}", mode.name());

        Ok(Heatmap {
            image: canvas.into_image(),
            mode,
            stamped_points: total,
            clusters,
        })
    }

    /// Rejects parameters that cannot produce a heatmap, before any state changes.
    fn validate(
        &self,
        points: &[Point2D],
        width: u32,
        height: u32,
        mode: &HeatmapMode,
    ) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(HeatmapError::invalid(
                "canvas",
                format!("dimensions must be positive, got {width}x{height}"),
            ));
        }
        let channels = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4));
        if channels.is_none() {
            return Err(HeatmapError::invalid(
                "canvas",
                format!("{width}x{height} does not fit in memory"),
            ));
        }
        if let Some(index) = points.iter().position(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(HeatmapError::invalid(
                "points",
                format!("point {index} is not finite: {:?}", points[index]),
            ));
        }
        if self.config.line_width == 0 {
            return Err(HeatmapError::invalid("line_width", "must be at least 1"));
        }
        if mode.radius() == 0 {
            return Err(HeatmapError::invalid("radius", "must be at least 1"));
        }
        if let HeatmapMode::Density {
            epsilon, min_points, ..
        } = *mode
        {
            if !epsilon.is_finite() || epsilon <= 0.0 {
                return Err(HeatmapError::invalid(
                    "epsilon",
                    format!("must be a positive number, got {epsilon}"),
                ));
            }
            if min_points == 0 {
                return Err(HeatmapError::invalid("min_points", "must be at least 1"));
            }
        }
        Ok(())
    }
}

impl Default for HeatmapPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
