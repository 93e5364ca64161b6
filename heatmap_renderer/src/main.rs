mod batch;
mod events;
mod image_helper;
mod planar;

use anyhow::{Result, bail};
use batch::RenderJob;
use clap::{ArgAction, Parser, ValueEnum};
use density_heatmap::{HeatmapMode, PipelineConfig, cancel_pair};
use planar::{Plane, PlanarSurface};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Clustered density heatmap
    Cluster,
    /// Path (trajectory) heatmap
    Traffic,
}

/// Renders recorded event files into heatmap PNGs.
#[derive(Debug, Parser)]
#[command(name = "heatmap_renderer", version, about)]
struct Args {
    /// Event files: JSON arrays of {eventName, xPos, yPos, zPos}
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = ModeArg::Cluster)]
    mode: ModeArg,

    /// Image width; overridden by --settings
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Image height; overridden by --settings
    #[arg(long, default_value_t = 1024)]
    height: u32,

    /// Session settings.json (texture size, 2D mode, camera)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Stamp radius in pixels (cluster default 15, traffic default 5)
    #[arg(long)]
    radius: Option<u32>,

    /// Cluster distance, scaled by the number of points
    #[arg(long)]
    epsilon: Option<f64>,

    /// Minimum cluster size, scaled by the number of points
    #[arg(long)]
    min_points: Option<u32>,

    /// World axes mapped onto the image; defaults to xz unless the session was 2D
    #[arg(long, value_enum)]
    plane: Option<Plane>,

    /// Pixels per world unit when no camera is known
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// World coordinates at the image center when no camera is known
    #[arg(long, num_args = 2, value_names = ["A", "B"], allow_negative_numbers = true)]
    center: Option<Vec<f64>>,

    /// Only render events with this name
    #[arg(long)]
    event: Option<String>,

    /// Merge all inputs, in order, into one image named NAME (default "Combined")
    #[arg(
        long,
        value_name = "NAME",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "Combined"
    )]
    combine: Option<String>,

    /// Stamp line width in pixels
    #[arg(long, default_value_t = 1)]
    line_width: u32,

    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn heatmap_mode(&self) -> HeatmapMode {
        match self.mode {
            ModeArg::Cluster => match HeatmapMode::density_default() {
                HeatmapMode::Density {
                    radius,
                    epsilon,
                    min_points,
                } => HeatmapMode::Density {
                    radius: self.radius.unwrap_or(radius),
                    epsilon: self.epsilon.unwrap_or(epsilon),
                    min_points: self.min_points.unwrap_or(min_points),
                },
                other => other,
            },
            ModeArg::Traffic => HeatmapMode::Trajectory {
                radius: self
                    .radius
                    .unwrap_or(HeatmapMode::trajectory_default().radius()),
            },
        }
    }

    fn surface(&self) -> Result<PlanarSurface> {
        let Some(path) = &self.settings else {
            let plane = self.plane.unwrap_or(Plane::Xz);
            return Ok(self.manual_surface(plane, self.width, self.height));
        };

        let settings = events::load_settings(path)?;
        let plane = self.plane.unwrap_or(if settings.is_2d_mode { Plane::Xy } else { Plane::Xz });
        if let Some(surface) = PlanarSurface::from_camera(plane, &settings) {
            log::debug!("using the recorded camera view: {surface:?}");
            return Ok(surface);
        }
        Ok(self.manual_surface(plane, settings.texture_width, settings.texture_height))
    }

    fn manual_surface(&self, plane: Plane, width: u32, height: u32) -> PlanarSurface {
        let mut surface = PlanarSurface::pixel_space(plane, width, height);
        surface.pixels_per_unit = self.scale;
        if let Some(&[a, b]) = self.center.as_deref() {
            surface.center = (a, b);
        }
        surface
    }

    /// One job per input, or a single job for all of them with `--combine`.
    fn jobs(&self, mode: HeatmapMode, surface: PlanarSurface) -> Vec<RenderJob> {
        let event = &self.event;
        match &self.combine {
            Some(name) => vec![RenderJob::combined(
                self.inputs.clone(),
                name,
                &self.output_dir,
                mode,
                surface,
                event.clone(),
            )],
            None => self
                .inputs
                .iter()
                .map(|input| {
                    RenderJob::new(input.clone(), &self.output_dir, mode, surface, event.clone())
                })
                .collect(),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Argument Parsing & Setup ---
    let args = Args::parse();
    init_logging(args.verbose);

    if !args.scale.is_finite() || args.scale <= 0.0 {
        bail!("--scale must be a positive number, got {}", args.scale);
    }
    let mode = args.heatmap_mode();
    let surface = args.surface()?;
    let config = PipelineConfig {
        line_width: args.line_width,
        ..PipelineConfig::default()
    };
    log::info!(
        "rendering {} file(s) as {} heatmaps at {}x{}",
        args.inputs.len(),
        mode.name(),
        surface.width,
        surface.height
    );

    // --- 2. Cancellation ---
    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, stopping after the current stamp");
            handle.cancel();
        }
    });

    // --- 3. Batch Rendering ---
    let jobs = args.jobs(mode, surface);
    let report = batch::render_all(jobs, config, token).await;

    for path in &report.written {
        println!("{}", path.display());
    }
    if !report.is_success() {
        bail!(
            "{} of {} job(s) failed",
            report.failed.len(),
            report.failed.len() + report.written.len()
        );
    }
    Ok(())
}
