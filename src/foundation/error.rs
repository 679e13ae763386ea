/// Convenience result type used across zopmark.
pub type WmResult<T> = Result<T, WatermarkError>;

/// Top-level error taxonomy used by store and compositor APIs.
#[derive(thiserror::Error, Debug)]
pub enum WatermarkError {
    /// A watermark id did not resolve to a stored config.
    #[error("watermark config not found: {0}")]
    ConfigNotFound(String),

    /// The source artifact could not be decoded.
    #[error("decode failure: {0}")]
    Decode(String),

    /// Rendering or blending the overlay failed.
    #[error("composite failure: {0}")]
    Composite(String),

    /// Reading or writing persisted configs failed.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Invalid user-provided config or options.
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller cancelled a long-running call.
    #[error("compositing cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of a [`WatermarkError`], used by callers to apply fallback policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// See [`WatermarkError::ConfigNotFound`].
    ConfigNotFound,
    /// See [`WatermarkError::Decode`].
    Decode,
    /// See [`WatermarkError::Composite`].
    Composite,
    /// See [`WatermarkError::Persistence`].
    Persistence,
    /// See [`WatermarkError::Validation`].
    Validation,
    /// See [`WatermarkError::Cancelled`].
    Cancelled,
    /// See [`WatermarkError::Other`].
    Other,
}

impl WatermarkError {
    /// Build a [`WatermarkError::ConfigNotFound`] value.
    pub fn config_not_found(id: impl Into<String>) -> Self {
        Self::ConfigNotFound(id.into())
    }

    /// Build a [`WatermarkError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`WatermarkError::Composite`] value.
    pub fn composite(msg: impl Into<String>) -> Self {
        Self::Composite(msg.into())
    }

    /// Build a [`WatermarkError::Persistence`] value.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Build a [`WatermarkError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ConfigNotFound(_) => FailureKind::ConfigNotFound,
            Self::Decode(_) => FailureKind::Decode,
            Self::Composite(_) => FailureKind::Composite,
            Self::Persistence(_) => FailureKind::Persistence,
            Self::Validation(_) => FailureKind::Validation,
            Self::Cancelled => FailureKind::Cancelled,
            Self::Other(_) => FailureKind::Other,
        }
    }

    /// Whether a caller should fall back to the unwatermarked original instead of failing.
    ///
    /// Decode and composite failures (and cancellation) never invalidate the generated media
    /// itself, so the original artifact remains a valid result.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Decode | FailureKind::Composite | FailureKind::Cancelled
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
