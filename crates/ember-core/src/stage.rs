//! The block-processing contract shared by every voice and utility stage.
//!
//! ## Design Decisions
//!
//! - **Planar multi-channel blocks**: `process` receives one mutable slice
//!   per channel. Every slice has the same length, at most the prepared
//!   `max_block_size`.
//!
//! - **Prepare / process split**: `prepare` may allocate and recomputes every
//!   constant derived from the configuration. `process` and `reset` never
//!   allocate, lock or block.
//!
//! - **Bypass is a no-op**: a bypassed stage returns without touching the
//!   buffer and without advancing any smoother or filter state.

use crate::config::PipelineConfig;

/// Block-based processing stage.
///
/// # Example
///
/// ```rust
/// use ember_core::{PipelineConfig, Stage};
///
/// struct Trim {
///     gain: f32,
///     bypassed: bool,
/// }
///
/// impl Stage for Trim {
///     fn prepare(&mut self, _config: &PipelineConfig) {}
///
///     fn reset(&mut self) {}
///
///     fn process(&mut self, channels: &mut [&mut [f32]]) {
///         if self.bypassed {
///             return;
///         }
///         for channel in channels.iter_mut() {
///             for s in channel.iter_mut() {
///                 *s *= self.gain;
///             }
///         }
///     }
///
///     fn set_bypassed(&mut self, bypassed: bool) {
///         self.bypassed = bypassed;
///     }
///
///     fn is_bypassed(&self) -> bool {
///         self.bypassed
///     }
/// }
///
/// let mut trim = Trim { gain: 0.5, bypassed: false };
/// let mut block = [1.0_f32; 4];
/// trim.process_mono(&mut block);
/// assert_eq!(block, [0.5; 4]);
/// ```
pub trait Stage {
    /// Sizes buffers and derives every rate-dependent constant.
    ///
    /// Called once before processing and again on any configuration change.
    /// Leaves the stage in its reset state.
    fn prepare(&mut self, config: &PipelineConfig);

    /// Restores all model state and smoothers to their initial values
    /// without reallocating.
    fn reset(&mut self);

    /// Processes one block in place.
    fn process(&mut self, channels: &mut [&mut [f32]]);

    /// Enables or disables bypass.
    fn set_bypassed(&mut self, bypassed: bool);

    /// Current bypass state.
    fn is_bypassed(&self) -> bool;

    /// Processes a single-channel block in place.
    fn process_mono(&mut self, buffer: &mut [f32]) {
        self.process(&mut [buffer]);
    }

    /// Latency introduced by the stage, in base-rate samples.
    fn latency_samples(&self) -> usize {
        0
    }
}

/// Number of samples in a planar block (length of the first channel).
#[inline]
pub fn block_len(channels: &[&mut [f32]]) -> usize {
    channels.first().map_or(0, |c| c.len())
}
