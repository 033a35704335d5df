//! Ember Core - real-time scaffolding for analog circuit emulation
//!
//! This crate provides the pieces every circuit model and voice pipeline is
//! built from, designed for real-time audio with zero allocation in the
//! processing path.
//!
//! # Core Abstractions
//!
//! ## Solvers
//!
//! - [`omega`] - Wright omega function `W(e^x)`, the closed-form solver
//!   behind every diode, tube and op-amp model
//! - [`CubicLookup`] - Cubic Hermite table for caching expensive static
//!   transfer curves
//!
//! ## Parameter Smoothing
//!
//! - [`LinearSmoothedParam`] - Linear ramps with an exact landing on target
//! - [`AtomicParam`] - Lock-free target hand-off from the control thread
//!
//! ## Filters
//!
//! - [`Biquad`] - Direct Form I second-order section
//! - [`BiquadCoefficients`] plus the designers in [`biquad`] (RBJ responses
//!   and the [`drive_filter`] band boost)
//!
//! ## Anti-Aliasing
//!
//! - [`Oversampler`] - Cascaded polyphase IIR half-band up/down sampler
//!
//! ## Pipeline Contract
//!
//! - [`PipelineConfig`] - Sample rate, block bound, channels, oversampling
//! - [`Stage`] - prepare / reset / process / bypass
//!
//! # no_std Support
//!
//! Disable the default `std` feature for embedded targets:
//!
//! ```toml
//! [dependencies]
//! ember-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations, locks or unbounded loops while processing
//! - **Prepare-time constants**: Everything derived from the sample rate is
//!   computed once in `prepare`
//! - **Deterministic**: Identical input and parameter history produce
//!   identical output

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod biquad;
pub mod config;
pub mod lookup;
pub mod math;
pub mod omega;
pub mod oversample;
pub mod smoother;
pub mod stage;

pub use biquad::{
    BUTTERWORTH_Q, Biquad, BiquadCoefficients, bandpass, drive_filter, high_shelf, highpass,
    low_shelf, lowpass, notch, peaking,
};
pub use config::{ConfigError, MIN_SAMPLE_RATE, PipelineConfig};
pub use lookup::CubicLookup;
pub use math::{db_to_linear, flush_denormal, knob, lerp, linear_to_db, log_cosh, sign, wet_dry_mix};
pub use omega::{omega, omega3, omega4};
pub use oversample::{HalfBandStage, Oversampler, OversamplingFactor};
pub use smoother::{AtomicParam, DEFAULT_RAMP_SECONDS, LinearSmoothedParam};
pub use stage::{Stage, block_len};
