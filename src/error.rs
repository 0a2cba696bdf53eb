use thiserror::Error;

/// Failures surfaced by the layer's mutation and setup surface.
///
/// Per-pixel conditions never show up here: an out-of-bounds world coordinate
/// just skips that pixel, a missing color table degrades LUT rendering to a
/// no-op, and a cancelled flood reports a normal
/// [`FloodOutcome`](crate::region::FloodOutcome) — none of them abort a pass.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Invalid configuration input — rejected before any state changes.
    #[error("invalid {field}: {reason}")]
    Config { field: &'static str, reason: String },

    #[error("no volume attached to this layer")]
    NoVolume,

    #[error("no color table with id {0}")]
    NoColorTable(i32),
}

impl LayerError {
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        LayerError::Config {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
