// Domain errors - Error taxonomy for the domain layer

use thiserror::Error;

/// Domain-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// No spherical signal was confident enough; callers fall back to flat processing
    #[error("Projection classification ambiguous: {0}")]
    ClassificationAmbiguous(String),

    /// A ray resolved to a coordinate outside every valid source region
    #[error("Geometry out of range: {0}")]
    GeometryOutOfRange(String),

    /// External encoder invocation failed or timed out
    #[error(
        "Pass {pass_index}/{total_passes} failed for {format} ({codec}), exit code {exit_code:?}: {stderr}"
    )]
    PassExecutionFailed {
        format: String,
        codec: String,
        pass_index: u8,
        total_passes: u8,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// A declared ladder tier has no completed rendition
    #[error("Ladder inconsistent for {format}: tier '{tier}' has no completed rendition")]
    LadderInconsistent { format: String, tier: String },

    /// Temporary storage or concurrency budget exhausted
    #[error("Resource budget exceeded: requested {requested_mib} MiB, {available_mib} MiB available")]
    ResourceBudgetExceeded { requested_mib: u32, available_mib: u32 },

    /// Projection cannot be used for the requested operation
    #[error("Unsupported projection: {0}")]
    UnsupportedProjection(String),

    /// Output or streaming format is not known
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// No encoding profile for the format/preset pair
    #[error("No encoding profile for format '{format}' with preset '{preset}'")]
    UnknownProfile { format: String, preset: String },

    /// Frame dimensions do not fit the requested layout
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// File system operation failed
    #[error("File system error: {0}")]
    FsFail(String),

    /// Frame could not be decoded or loaded
    #[error("Decode failed: {0}")]
    DecodeFail(String),

    /// Job was cancelled between passes
    #[error("Job cancelled after pass {completed_passes}")]
    Cancelled { completed_passes: u8 },

    /// Manifest or descriptor could not be serialized
    #[error("Manifest write failed: {0}")]
    ManifestWrite(String),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
}

impl DomainError {
    /// Whether the error has a safe local resolution (fallback or backpressure)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DomainError::ClassificationAmbiguous(_) | DomainError::ResourceBudgetExceeded { .. }
        )
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::FsFail(err.to_string())
    }
}

impl From<image::ImageError> for DomainError {
    fn from(err: image::ImageError) -> Self {
        DomainError::DecodeFail(err.to_string())
    }
}
