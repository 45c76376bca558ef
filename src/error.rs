use thiserror::Error;

/// Errors raised by the collocation pipeline.
///
/// An absent target word is not an error: the pipeline returns an empty
/// report and the caller decides how to present it.
#[derive(Debug, Error)]
pub enum CollocationError {
    #[error("target word is missing or blank")]
    EmptyTarget,

    #[error("target must be a single word, got {0:?}")]
    InvalidTarget(String),

    #[error("reference corpus has zero total tokens")]
    DegenerateReference,

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("cloud weights cannot be normalized by total {0}")]
    DegenerateWeights(f64),

    #[error("corpus provider failed: {0}")]
    Provider(#[source] anyhow::Error),

    #[error("result cache failed: {0}")]
    Cache(#[source] anyhow::Error),

    #[error("export failed: {0}")]
    Export(#[source] anyhow::Error),
}

impl CollocationError {
    /// Whether the error stems from caller-supplied parameters, which the
    /// caller can fix by adjusting them.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyTarget | Self::InvalidTarget(_) | Self::InvalidThreshold(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CollocationError>;
