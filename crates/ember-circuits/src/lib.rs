//! Ember Circuits - per-sample models of analog nonlinear stages
//!
//! Every model here is a pure `(state, input) -> (output, state)` function
//! over constants derived once from component values and the sample rate.
//! Stateless models use `()` as their state.
//!
//! # Models
//!
//! ## Diodes
//!
//! - [`DiodeClipper`] - Diode pair after an RC network, solved in closed
//!   form with [`ember_core::omega`]. Germanium and silicon presets, with
//!   symmetric or single-polarity clipping
//!
//! ## Transistors
//!
//! - [`BjtFollower`] - Emitter follower with a saturation branch
//! - [`Jfet`] - Asymmetric JFET stage with quadratic compression
//! - [`CmosInverter`] - Unbuffered inverter, fixed-iteration Newton solve
//! - [`CmosLut`] - The same curve from a warped table
//! - [`CmosApprox`] - Closed-form inverter fit
//!
//! ## Op-Amps
//!
//! - [`OpAmpTanh`] - Integrated-tanh soft clipper
//! - [`OpAmpKnee`] - Rail knee with a cubic small-signal region
//!
//! ## Tubes
//!
//! - [`Triode`] - Common-cathode stage as a wave digital filter
//!
//! # Dispatch
//!
//! Voices embed concrete model types. Tools that pick a model at runtime use
//! [`Circuit`], a closed enum that matches once per block.
//!
//! # no_std Support
//!
//! ```toml
//! [dependencies]
//! ember-circuits = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod bjt;
pub mod circuit;
pub mod cmos;
pub mod diode;
pub mod jfet;
pub mod model;
pub mod opamp;
pub mod triode;

pub use bjt::BjtFollower;
pub use circuit::{Circuit, CircuitKind, ParseCircuitKindError};
pub use cmos::{CMOS_BIAS, CMOS_ITERATIONS, CMOS_SUPPLY, CmosApprox, CmosInverter, CmosLut};
pub use diode::{
    DiodeClipper, DiodePolarity, GERMANIUM_SATURATION_CURRENT, SILICON_SATURATION_CURRENT,
};
pub use jfet::Jfet;
pub use model::{CircuitModel, Stateful};
pub use opamp::{OpAmpKnee, OpAmpTanh};
pub use triode::{Triode, TriodeState};
