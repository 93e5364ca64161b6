// THEORY:
// A heatmap run can take a while (every stamp traces thousands of circle samples),
// so the host wants to draw a progress bar and keep the option to give up. Both
// concerns are run-scoped and travel over `tokio::sync::watch` channels, the
// same primitive used for play/pause control elsewhere in the stack:
//
// - `Progress` snapshots are published by the pipeline and can be read by any
//   number of pollers, at any moment, without blocking the run. A snapshot is
//   only published after a stamp has been fully flushed.
// - A `CancelHandle` / `CancelToken` pair lets the host stop a run. The token is
//   checked at the suspension point between two stamps.

use tokio::sync::watch;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStage {
    #[default]
    Idle,
    Clustering,
    Densifying,
    Stamping,
    Colorizing,
    Done,
    Cancelled,
}

/// A snapshot of a run's progress. `current` never decreases within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub stage: RunStage,
    /// Stamps fully flushed onto the canvas.
    pub current: usize,
    /// Stamps this run will perform; known once clustering or densifying is over.
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.stage == RunStage::Done && self.current == self.total
    }

    /// Completed share of the stamping work in [0, 1].
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return if self.stage == RunStage::Done { 1.0 } else { 0.0 };
        }
        self.current as f64 / self.total as f64
    }
}

/// Publishing side of the progress channel, owned by the pipeline.
#[derive(Debug)]
pub(crate) struct ProgressReporter {
    tx: watch::Sender<Progress>,
}

impl ProgressReporter {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(Progress::default());
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Progress> {
        self.tx.subscribe()
    }

    pub(crate) fn snapshot(&self) -> Progress {
        *self.tx.borrow()
    }

    /// Resets the counters for a new run.
    pub(crate) fn begin(&self, stage: RunStage) {
        self.tx.send_replace(Progress {
            stage,
            current: 0,
            total: 0,
        });
    }

    pub(crate) fn enter(&self, stage: RunStage) {
        self.tx.send_modify(|progress| progress.stage = stage);
    }

    pub(crate) fn set_total(&self, total: usize) {
        self.tx.send_modify(|progress| progress.total = total);
    }

    pub(crate) fn advance(&self) {
        self.tx.send_modify(|progress| progress.current += 1);
    }
}

/// Host side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Pipeline side of a cancellation pair. Stays cancelled once cancelled, even if
/// the handle is dropped.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}
