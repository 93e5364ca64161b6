use thiserror::Error;

/// Everything that can stop a heatmap run. An empty point set is not an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeatmapError {
    /// No camera or render target was supplied to project the points onto.
    #[error("projection surface unavailable: no camera or render target to project onto")]
    ProjectionUnavailable,

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The run was cancelled between two stamps; no canvas is returned.
    #[error("heatmap run cancelled after {stamped} of {total} points")]
    Cancelled { stamped: usize, total: usize },
}

impl HeatmapError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        HeatmapError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HeatmapError>;
