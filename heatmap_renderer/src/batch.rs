// THEORY:
// Every job becomes one independent tokio task with its own `HeatmapPipeline`.
// Normally each input file is its own job; in combined mode all inputs are
// merged, in argument order, into a single job and a single image. Jobs run at
// most one per CPU at a time (a semaphore hands out the permits) and are joined
// together at the end. A failing job is reported and counted but never stops its
// siblings. All jobs share one cancel token, so a single Ctrl-C stops the whole
// batch at the next stamp boundary.

use crate::events;
use crate::image_helper;
use crate::planar::PlanarSurface;
use anyhow::{Context, Result};
use density_heatmap::{
    CancelToken, HeatmapMode, HeatmapPipeline, PipelineConfig, Progress, ProjectionSurface,
    RunStage,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Semaphore, watch};

/// Everything one output image needs to be rendered.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Event files whose positions are concatenated in this order.
    pub inputs: Vec<PathBuf>,
    /// Names the job in logs and in the batch report.
    pub label: PathBuf,
    pub output: PathBuf,
    pub mode: HeatmapMode,
    pub surface: PlanarSurface,
    pub event_name: Option<String>,
}

impl RenderJob {
    /// One image for one input file, named after the file.
    pub fn new(
        input: PathBuf,
        output_dir: &Path,
        mode: HeatmapMode,
        surface: PlanarSurface,
        event_name: Option<String>,
    ) -> Self {
        Self::build(vec![input.clone()], input, output_dir, mode, surface, event_name)
    }

    /// One image for all `inputs` together, named `name`.
    pub fn combined(
        inputs: Vec<PathBuf>,
        name: &str,
        output_dir: &Path,
        mode: HeatmapMode,
        surface: PlanarSurface,
        event_name: Option<String>,
    ) -> Self {
        Self::build(inputs, PathBuf::from(name), output_dir, mode, surface, event_name)
    }

    fn build(
        inputs: Vec<PathBuf>,
        label: PathBuf,
        output_dir: &Path,
        mode: HeatmapMode,
        surface: PlanarSurface,
        event_name: Option<String>,
    ) -> Self {
        let output = image_helper::output_path(output_dir, &label, mode.name());
        Self {
            inputs,
            label,
            output,
            mode,
            surface,
            event_name,
        }
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    /// Failed jobs by label.
    pub failed: Vec<(PathBuf, anyhow::Error)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub async fn render_one(
    job: &RenderJob,
    config: PipelineConfig,
    cancel: &CancelToken,
) -> Result<PathBuf> {
    let mut world = Vec::new();
    let mut recorded = 0;
    for input in &job.inputs {
        let records = events::load_events(input)?;
        recorded += records.len();
        world.extend(events::positions(&records, job.event_name.as_deref()));
    }
    log::info!(
        "{}: {} of {} events selected from {} file(s)",
        job.label.display(),
        world.len(),
        recorded,
        job.inputs.len()
    );

    let mut pipeline = HeatmapPipeline::new(config);
    let watcher = tokio::spawn(log_progress(job.label.clone(), pipeline.subscribe()));
    let surface: &dyn ProjectionSurface = &job.surface;
    let rendered = pipeline
        .render_projected(Some(surface), &world, job.mode, Some(cancel))
        .await;
    // The watcher ends once the pipeline, and with it the sender, is gone.
    drop(pipeline);
    let _ = watcher.await;

    let heatmap =
        rendered.with_context(|| format!("failed to render {}", job.label.display()))?;
    image_helper::save(&job.output, &heatmap.to_rgba8())?;
    log::info!(
        "{}: {} stamps written to {}",
        job.label.display(),
        heatmap.stamped_points,
        job.output.display()
    );
    Ok(job.output.clone())
}

pub async fn render_all(
    jobs: Vec<RenderJob>,
    config: PipelineConfig,
    cancel: CancelToken,
) -> BatchReport {
    let permits = Arc::new(Semaphore::new(num_cpus::get().max(1)));

    let handles = jobs.into_iter().map(|job| {
        let permits = Arc::clone(&permits);
        let config = config.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => render_one(&job, config, &cancel).await,
                Err(closed) => Err(closed.into()),
            };
            (job.label, result)
        })
    });

    let mut report = BatchReport::default();
    for joined in futures::future::join_all(handles).await {
        match joined {
            Ok((_, Ok(path))) => report.written.push(path),
            Ok((label, Err(error))) => {
                log::error!("{}: {error:#}", label.display());
                report.failed.push((label, error));
            }
            Err(join_error) => {
                log::error!("render task failed: {join_error}");
                report.failed.push((PathBuf::new(), join_error.into()));
            }
        }
    }
    report
}

/// Logs stage changes and every tenth of the stamping work.
async fn log_progress(label: PathBuf, mut rx: watch::Receiver<Progress>) {
    let mut stage = RunStage::Idle;
    let mut decile = 0;
    while rx.changed().await.is_ok() {
        let progress = *rx.borrow_and_update();
        if progress.stage != stage {
            stage = progress.stage;
            decile = 0;
            log::debug!("{}: {:?}", label.display(), stage);
        }
        let reached = (progress.fraction() * 10.0) as u32;
        if stage == RunStage::Stamping && reached > decile {
            decile = reached;
            log::debug!(
                "{}: {}/{} stamps ({}%)",
                label.display(),
                progress.current,
                progress.total,
                decile * 10
            );
        }
    }
}
