//! Closed set of circuit models with per-block dispatch.
//!
//! [`Circuit`] owns one channel of any model. `process_block` matches on the
//! variant once and then runs that model's monomorphic loop, so selecting a
//! model never costs a branch per sample.

use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use crate::bjt::BjtFollower;
use crate::cmos::{CmosApprox, CmosInverter, CmosLut};
use crate::diode::{DiodeClipper, DiodePolarity};
use crate::jfet::Jfet;
use crate::model::{CircuitModel, Stateful};
use crate::opamp::{OpAmpKnee, OpAmpTanh};
use crate::triode::Triode;

/// Identifies a circuit model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitKind {
    /// Symmetric germanium diode pair.
    GermaniumDiode,
    /// Symmetric silicon diode pair.
    SiliconDiode,
    /// BJT emitter follower.
    Bjt,
    /// Integrated-tanh op-amp clipper.
    OpAmpTanh,
    /// Omega-knee op-amp clipper.
    OpAmpKnee,
    /// Iterative CMOS inverter.
    Cmos,
    /// Table-driven CMOS inverter.
    CmosLut,
    /// Closed-form CMOS inverter.
    CmosApprox,
    /// JFET stage.
    Jfet,
    /// Wave-digital triode stage.
    Triode,
}

impl CircuitKind {
    /// Every model, in display order.
    pub const ALL: [Self; 10] = [
        Self::GermaniumDiode,
        Self::SiliconDiode,
        Self::Bjt,
        Self::OpAmpTanh,
        Self::OpAmpKnee,
        Self::Cmos,
        Self::CmosLut,
        Self::CmosApprox,
        Self::Jfet,
        Self::Triode,
    ];

    /// Short identifier used on the command line and in settings files.
    pub fn name(self) -> &'static str {
        match self {
            Self::GermaniumDiode => "germanium",
            Self::SiliconDiode => "silicon",
            Self::Bjt => "bjt",
            Self::OpAmpTanh => "opamp-tanh",
            Self::OpAmpKnee => "opamp-knee",
            Self::Cmos => "cmos",
            Self::CmosLut => "cmos-lut",
            Self::CmosApprox => "cmos-approx",
            Self::Jfet => "jfet",
            Self::Triode => "triode",
        }
    }

    /// One-line description.
    pub fn description(self) -> &'static str {
        match self {
            Self::GermaniumDiode => "Germanium diode pair after an RC network (closed form)",
            Self::SiliconDiode => "Silicon diode pair after an RC network (closed form)",
            Self::Bjt => "Emitter follower with saturation branch",
            Self::OpAmpTanh => "Integrated-tanh op-amp soft clipper",
            Self::OpAmpKnee => "Op-amp rail knee with cubic small-signal region",
            Self::Cmos => "CMOS inverter, 5-step Newton-Raphson KCL solve",
            Self::CmosLut => "CMOS inverter from a warped lookup table",
            Self::CmosApprox => "CMOS inverter, closed-form approximation",
            Self::Jfet => "Asymmetric JFET stage",
            Self::Triode => "Common-cathode triode, wave digital filter",
        }
    }

    /// True when the model carries state between samples.
    pub fn is_stateful(self) -> bool {
        matches!(self, Self::GermaniumDiode | Self::SiliconDiode | Self::Triode)
    }
}

impl fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognised circuit name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCircuitKindError(pub String);

impl fmt::Display for ParseCircuitKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown circuit model '{}'", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseCircuitKindError {}

impl FromStr for CircuitKind {
    type Err = ParseCircuitKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCircuitKindError(String::from(s)))
    }
}

/// One channel of any circuit model.
#[derive(Debug, Clone)]
pub enum Circuit {
    /// See [`CircuitKind::GermaniumDiode`].
    GermaniumDiode(Stateful<DiodeClipper>),
    /// See [`CircuitKind::SiliconDiode`].
    SiliconDiode(Stateful<DiodeClipper>),
    /// See [`CircuitKind::Bjt`].
    Bjt(Stateful<BjtFollower>),
    /// See [`CircuitKind::OpAmpTanh`].
    OpAmpTanh(Stateful<OpAmpTanh>),
    /// See [`CircuitKind::OpAmpKnee`].
    OpAmpKnee(Stateful<OpAmpKnee>),
    /// See [`CircuitKind::Cmos`].
    Cmos(Stateful<CmosInverter>),
    /// See [`CircuitKind::CmosLut`].
    CmosLut(Stateful<CmosLut>),
    /// See [`CircuitKind::CmosApprox`].
    CmosApprox(Stateful<CmosApprox>),
    /// See [`CircuitKind::Jfet`].
    Jfet(Stateful<Jfet>),
    /// See [`CircuitKind::Triode`].
    Triode(Stateful<Triode>),
}

/// Expands `$body` once per variant with `$m` bound to the inner
/// [`Stateful`].
macro_rules! dispatch {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            Circuit::GermaniumDiode($m) => $body,
            Circuit::SiliconDiode($m) => $body,
            Circuit::Bjt($m) => $body,
            Circuit::OpAmpTanh($m) => $body,
            Circuit::OpAmpKnee($m) => $body,
            Circuit::Cmos($m) => $body,
            Circuit::CmosLut($m) => $body,
            Circuit::CmosApprox($m) => $body,
            Circuit::Jfet($m) => $body,
            Circuit::Triode($m) => $body,
        }
    };
}

impl Circuit {
    /// Builds a channel of `kind` with constants derived for `sample_rate`.
    ///
    /// [`CircuitKind::CmosLut`] builds its table here, so construct it at
    /// prepare time, never on the audio thread.
    pub fn new(kind: CircuitKind, sample_rate: f32) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!("circuit_new: {} at {sample_rate} Hz", kind.name());

        match kind {
            CircuitKind::GermaniumDiode => {
                Self::GermaniumDiode(Stateful::new(DiodeClipper::germanium(sample_rate)))
            }
            CircuitKind::SiliconDiode => Self::SiliconDiode(Stateful::new(DiodeClipper::silicon(
                sample_rate,
                DiodePolarity::Symmetric,
            ))),
            CircuitKind::Bjt => Self::Bjt(Stateful::new(BjtFollower::new())),
            CircuitKind::OpAmpTanh => Self::OpAmpTanh(Stateful::new(OpAmpTanh::new())),
            CircuitKind::OpAmpKnee => Self::OpAmpKnee(Stateful::new(OpAmpKnee::new())),
            CircuitKind::Cmos => Self::Cmos(Stateful::new(CmosInverter::new())),
            CircuitKind::CmosLut => Self::CmosLut(Stateful::new(CmosLut::new())),
            CircuitKind::CmosApprox => Self::CmosApprox(Stateful::new(CmosApprox::new())),
            CircuitKind::Jfet => Self::Jfet(Stateful::new(Jfet::default())),
            CircuitKind::Triode => Self::Triode(Stateful::new(Triode::new(sample_rate))),
        }
    }

    /// Which model this channel runs.
    pub fn kind(&self) -> CircuitKind {
        match self {
            Self::GermaniumDiode(_) => CircuitKind::GermaniumDiode,
            Self::SiliconDiode(_) => CircuitKind::SiliconDiode,
            Self::Bjt(_) => CircuitKind::Bjt,
            Self::OpAmpTanh(_) => CircuitKind::OpAmpTanh,
            Self::OpAmpKnee(_) => CircuitKind::OpAmpKnee,
            Self::Cmos(_) => CircuitKind::Cmos,
            Self::CmosLut(_) => CircuitKind::CmosLut,
            Self::CmosApprox(_) => CircuitKind::CmosApprox,
            Self::Jfet(_) => CircuitKind::Jfet,
            Self::Triode(_) => CircuitKind::Triode,
        }
    }

    /// Processes a block in place.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        dispatch!(self, m => m.process_block(buffer))
    }

    /// Processes one sample. Prefer [`process_block`](Self::process_block)
    /// in loops.
    pub fn process(&mut self, input: f32) -> f32 {
        dispatch!(self, m => m.process(input))
    }

    /// Restores the model's initial state.
    pub fn reset(&mut self) {
        dispatch!(self, m => m.reset())
    }

    /// Output at rest with zero input.
    pub fn dc_operating_point(&self) -> f32 {
        dispatch!(self, m => m.model().dc_operating_point())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn names_round_trip() {
        for kind in CircuitKind::ALL {
            assert_eq!(kind.name().parse::<CircuitKind>(), Ok(kind));
            assert_eq!(Circuit::new(kind, 48000.0).kind(), kind);
        }
        assert_eq!("  Triode ".parse::<CircuitKind>(), Ok(CircuitKind::Triode));
        assert!("pentode".parse::<CircuitKind>().is_err());
    }

    #[test]
    fn block_matches_per_sample() {
        for kind in CircuitKind::ALL {
            let mut a = Circuit::new(kind, 96000.0);
            let mut b = a.clone();
            let mut block = vec![0.0_f32; 64];
            for (i, s) in block.iter_mut().enumerate() {
                *s = libm::sinf(i as f32 * 0.3) * 1.5;
            }
            let expected: alloc::vec::Vec<f32> = block.iter().map(|&x| b.process(x)).collect();
            a.process_block(&mut block);
            assert_eq!(block, expected, "{kind}");
        }
    }

    #[test]
    fn reset_restores_initial_output() {
        for kind in CircuitKind::ALL {
            let mut c = Circuit::new(kind, 48000.0);
            let first = c.process(0.7);
            for _ in 0..100 {
                c.process(2.0);
            }
            c.reset();
            assert_eq!(c.process(0.7), first, "{kind}");
        }
    }
}
