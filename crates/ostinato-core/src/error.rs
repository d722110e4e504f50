//! Error types for ostinato-core.

use thiserror::Error;

/// Error type for ostinato-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid pitch: {0}. Must be between 0.1 and 4.0")]
    InvalidPitch(f32),

    #[error("Invalid channel count: {0}")]
    InvalidChannels(usize),

    #[error("Unknown resampler quality: {0}")]
    UnknownQuality(u8),

    #[error("Resampler construction failed: {0}")]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),

    #[error("Resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::InvalidPitch(9.0);
        assert!(err.to_string().contains("9"));

        let err = Error::UnknownQuality(7);
        assert_eq!(err.to_string(), "Unknown resampler quality: 7");
    }
}
