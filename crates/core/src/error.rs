//! Error types for cloudfield.

use thiserror::Error;

/// Errors produced by noise, shape, layer and controller operations.
#[derive(Debug, Error)]
pub enum CloudError {
    /// Width or height was zero, negative or non-finite when creating a
    /// canvas extent or scalar field.
    #[error("invalid dimensions: width and height must be positive and finite")]
    InvalidDimensions,

    /// Grid sampling was requested with a spacing that would never advance.
    #[error("invalid grid resolution {0}: must be positive and finite")]
    InvalidGridResolution(f64),

    /// Grid sampling at this spacing would visit more points than allowed.
    #[error("grid resolution {resolution} is too fine: {points} points exceed the limit of {limit}")]
    GridTooDense {
        resolution: f64,
        points: f64,
        limit: usize,
    },

    /// An octave descriptor had an unusable scale, weight or time rate.
    #[error("invalid {octave} octave: {reason}")]
    InvalidOctave {
        octave: &'static str,
        reason: &'static str,
    },

    /// The octave weights summed to zero, so samples cannot be normalized.
    #[error("octave weights sum to zero: at least one octave must carry weight")]
    ZeroOctaveWeight,

    /// A field was configured with no depth layers.
    #[error("layer count must be at least 1")]
    ZeroLayerCount,

    /// A layer depth fell outside [0, 1].
    #[error("invalid layer depth {0}: must lie in [0, 1]")]
    InvalidDepth(f64),

    /// A shape region had non-finite placement or negative extents.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// A configuration value was out of its documented range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// `update` or `display` was called before `generate`.
    #[error("cloud field has not been generated yet: call generate() first")]
    NotGenerated,

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// Writing a snapshot failed.
    #[error("i/o error: {0}")]
    Io(String),
}

impl CloudError {
    /// Shorthand for [`CloudError::InvalidParameter`].
    pub fn parameter(name: &str, reason: impl Into<String>) -> Self {
        CloudError::InvalidParameter {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}
