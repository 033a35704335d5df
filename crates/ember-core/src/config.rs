//! Pipeline configuration established at prepare time.

use core::fmt;

use crate::oversample::OversamplingFactor;

/// Lowest sample rate [`PipelineConfig::clamped`] will produce.
pub const MIN_SAMPLE_RATE: f32 = 1.0;

/// Rejected pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Sample rate was zero, negative or not finite.
    InvalidSampleRate(f32),
    /// Maximum block size was zero.
    InvalidBlockSize,
    /// Channel count was zero.
    InvalidChannelCount,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSampleRate(sr) => {
                write!(f, "invalid sample rate {sr} (must be finite and > 0)")
            }
            Self::InvalidBlockSize => write!(f, "maximum block size must be at least 1"),
            Self::InvalidChannelCount => write!(f, "channel count must be at least 1"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Sample rate, block bound, channel count and oversampling for one
/// pipeline.
///
/// Read-only during processing. Changing any field means calling `prepare`
/// again, which recomputes every model constant and filter coefficient.
///
/// A `PipelineConfig` can only be built through [`new`](Self::new) or
/// [`clamped`](Self::clamped), so every instance has a positive, finite
/// sample rate before any constant derived from it is computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    sample_rate: f32,
    max_block_size: usize,
    channels: usize,
    oversampling: OversamplingFactor,
}

impl PipelineConfig {
    /// Validates and builds a configuration.
    ///
    /// ```rust
    /// use ember_core::{ConfigError, OversamplingFactor, PipelineConfig};
    ///
    /// let ok = PipelineConfig::new(48000.0, 512, 2, OversamplingFactor::X2);
    /// assert!(ok.is_ok());
    /// assert_eq!(
    ///     PipelineConfig::new(0.0, 512, 2, OversamplingFactor::X2),
    ///     Err(ConfigError::InvalidSampleRate(0.0))
    /// );
    /// ```
    pub fn new(
        sample_rate: f32,
        max_block_size: usize,
        channels: usize,
        oversampling: OversamplingFactor,
    ) -> Result<Self, ConfigError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        if max_block_size == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }
        if channels == 0 {
            return Err(ConfigError::InvalidChannelCount);
        }
        Ok(Self {
            sample_rate,
            max_block_size,
            channels,
            oversampling,
        })
    }

    /// Builds a configuration, clamping invalid values to safe minimums
    /// instead of rejecting them.
    pub fn clamped(
        sample_rate: f32,
        max_block_size: usize,
        channels: usize,
        oversampling: OversamplingFactor,
    ) -> Self {
        let sample_rate = if sample_rate.is_finite() {
            sample_rate.max(MIN_SAMPLE_RATE)
        } else {
            MIN_SAMPLE_RATE
        };
        Self {
            sample_rate,
            max_block_size: max_block_size.max(1),
            channels: channels.max(1),
            oversampling,
        }
    }

    /// Same configuration with a different oversampling factor.
    pub fn with_oversampling(self, oversampling: OversamplingFactor) -> Self {
        Self { oversampling, ..self }
    }

    /// Base sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Largest block `process` will be called with.
    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Oversampling factor applied around nonlinear stages.
    pub fn oversampling(&self) -> OversamplingFactor {
        self.oversampling
    }

    /// Sample rate inside the oversampled domain.
    pub fn oversampled_rate(&self) -> f32 {
        self.sample_rate * self.oversampling.ratio() as f32
    }

    /// Largest block inside the oversampled domain.
    pub fn oversampled_block_size(&self) -> usize {
        self.max_block_size * self.oversampling.ratio()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            max_block_size: 512,
            channels: 1,
            oversampling: OversamplingFactor::X1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_sample_rates() {
        for sr in [0.0, -44100.0, f32::NAN, f32::INFINITY] {
            assert!(PipelineConfig::new(sr, 64, 1, OversamplingFactor::X1).is_err(), "{sr}");
        }
    }

    #[test]
    fn rejects_empty_shapes() {
        assert_eq!(
            PipelineConfig::new(48000.0, 0, 1, OversamplingFactor::X1),
            Err(ConfigError::InvalidBlockSize)
        );
        assert_eq!(
            PipelineConfig::new(48000.0, 64, 0, OversamplingFactor::X1),
            Err(ConfigError::InvalidChannelCount)
        );
    }

    #[test]
    fn clamps_to_minimums() {
        let config = PipelineConfig::clamped(-1.0, 0, 0, OversamplingFactor::X4);
        assert_eq!(config.sample_rate(), MIN_SAMPLE_RATE);
        assert_eq!(config.max_block_size(), 1);
        assert_eq!(config.channels(), 1);
    }

    #[test]
    fn oversampled_dimensions() {
        let config = PipelineConfig::new(44100.0, 256, 2, OversamplingFactor::X4).unwrap();
        assert_eq!(config.oversampled_rate(), 176400.0);
        assert_eq!(config.oversampled_block_size(), 1024);
        let x2 = config.with_oversampling(OversamplingFactor::X2);
        assert_eq!(x2.oversampled_block_size(), 512);
    }
}
