//! Ember Voices - complete pedal and amp pipelines built on ember circuit models
//!
//! Every voice is a [`Stage`](ember_core::Stage): it owns its filters,
//! circuit models and oversampler, takes its controls from a shared
//! [`Controls`] block written by the control thread, and never allocates
//! inside `process`.
//!
//! # Stages
//!
//! ## Drive
//!
//! - [`Fuzz`] - Gated germanium fuzz into an op-amp clipper (4x)
//! - [`Borealis`] - Split-band BJT and CMOS overdrive (2x)
//! - [`Helios`] - Blended clean/driven diode and CMOS overdrive (2x)
//! - [`Nebula`] - Triode preamp into an op-amp knee (2x)
//! - [`CircuitStage`] - Any single circuit model at the pipeline's factor
//!
//! ## Dynamics and Tone
//!
//! - [`Compressor`] - Opto, FET and VCA laws behind one stage
//! - [`NoiseGate`] - Downward expander used inside the fuzz
//! - [`AmpEq`] - Four-band amp tone stack
//!
//! ## Chain
//!
//! - [`Engine`] - input → compressor → fuzz → overdrive voice → amp EQ →
//!   master → output, driven from an [`EngineHandle`]
//!
//! ## Example
//!
//! ```rust
//! use ember_core::{PipelineConfig, Stage};
//! use ember_voices::{fuzz, Fuzz};
//!
//! let mut pedal = Fuzz::new(&PipelineConfig::default());
//! pedal.controls().set(fuzz::SUSTAIN, 8.0);
//! pedal.reset();
//!
//! let mut block = vec![0.0_f32; 512];
//! pedal.process_mono(&mut block);
//! ```
//!
//! # Features
//!
//! - `std` (default) - `std::error::Error` for the parse errors
//! - `tracing` - `debug!` lines on prepare and on voice switches

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod amp_eq;
pub mod borealis;
pub mod circuit_stage;
pub mod compressor;
pub mod engine;
pub mod fuzz;
pub mod gate;
pub mod helios;
pub mod nebula;
pub mod params;
pub mod voice;

pub use amp_eq::AmpEq;
pub use borealis::Borealis;
pub use circuit_stage::CircuitStage;
pub use compressor::{Compressor, CompressorKind, CompressorLink, ParseCompressorKindError};
pub use engine::{Engine, EngineHandle};
pub use fuzz::Fuzz;
pub use gate::{Ballistics, Detection, NoiseGate};
pub use helios::Helios;
pub use nebula::Nebula;
pub use params::{Controls, ParamSpec, ParamUnit, find_param};
pub use voice::{ParseVoiceKindError, Voice, VoiceKind};
