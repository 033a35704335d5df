//! Error types for settings operations.

use thiserror::Error;

/// Errors that can occur while reading, checking or applying settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Pipeline values rejected by the engine
    #[error("invalid pipeline: {0}")]
    Pipeline(#[from] ember_core::ConfigError),

    /// Oversampling ratio other than 1, 2, 4 or 8
    #[error("unsupported oversampling factor {0} (expected 1, 2, 4 or 8)")]
    InvalidOversampling(usize),

    /// Unknown overdrive voice
    #[error("unknown voice: {0}")]
    UnknownVoice(String),

    /// Unknown compressor law
    #[error("unknown compressor: {0}")]
    UnknownCompressor(String),

    /// Unknown circuit model
    #[error("unknown circuit: {0}")]
    UnknownCircuit(String),

    /// Control value outside its declared range
    #[error("parameter '{stage}.{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Settings table the value came from.
        stage: &'static str,
        /// Control name.
        param: &'static str,
        /// The rejected value.
        value: f32,
        /// Smallest accepted value.
        min: f32,
        /// Largest accepted value.
        max: f32,
    },
}
