use thiserror::Error;
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid waveform segment: {0}")]
    InvalidSegment(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("insufficient channels: need at least {required}, got {available}")]
    InsufficientChannels { required: usize, available: usize },
    #[error("beamforming failed for window {window}: {message}")]
    Beamforming { window: usize, message: String },
    #[error("worker operation failed ({name}): {message}")]
    RpcFailure { name: String, message: String },
    #[error("worker pool is not running")]
    WorkerUnavailable,
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
impl PipelineError {
    /// Stable variant name carried across the worker boundary.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineError::InvalidSegment(_) => "InvalidSegment",
            PipelineError::InvalidConfiguration(_) => "InvalidConfiguration",
            PipelineError::InsufficientChannels { .. } => "InsufficientChannels",
            PipelineError::Beamforming { .. } => "Beamforming",
            PipelineError::RpcFailure { .. } => "RpcFailure",
            PipelineError::WorkerUnavailable => "WorkerUnavailable",
            PipelineError::Plot(_) => "Plot",
            PipelineError::Config(_) => "Config",
            PipelineError::Serialization(_) => "Serialization",
            PipelineError::Io(_) => "Io",
        }
    }
}
impl From<serde_json::Error> for PipelineError {
    fn from(value: serde_json::Error) -> Self {
        PipelineError::Serialization(value.to_string())
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for PipelineError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        PipelineError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for PipelineError {
    fn from(value: image::ImageError) -> Self {
        PipelineError::Plot(value.to_string())
    }
}
