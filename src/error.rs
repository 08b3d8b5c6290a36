// THEORY:
// A single error type for the whole scoring engine. Both pipelines are pure
// functions, so the only things that can go wrong are a caller handing us an
// option outside its domain, an image with no pixels, the async facade failing
// (a background task dying, or the service being closed), or artifact I/O
// failing. Degenerate *data* (flat images, empty masks) is never an error; the
// stages handle it with explicit fallback values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    /// An option is outside its documented domain (unknown input type, even
    /// kernel size, component index out of range, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("image has no pixels: {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// A blocking scoring task panicked or was cancelled.
    #[error("scoring task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("scoring service is closed")]
    ServiceClosed,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ScoreError>;

impl ScoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ScoreError::InvalidArgument(message.into())
    }
}
