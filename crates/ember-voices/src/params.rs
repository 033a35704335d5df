//! Control descriptions and the lock-free control block.
//!
//! A voice's controls are described by a static table of [`ParamSpec`]s.
//! [`Controls`] holds one [`AtomicParam`] per entry plus the bypass flag and
//! is shared through an `Arc` between the control thread, which only stores,
//! and the audio thread, which loads every value once per block and forwards
//! it into the matching [`LinearSmoothedParam`].

use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use ember_core::{AtomicParam, DEFAULT_RAMP_SECONDS, LinearSmoothedParam};

/// Display unit of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamUnit {
    /// 0–10 knob position.
    Knob,
    /// Decibels.
    Decibels,
    /// Hertz.
    Hertz,
    /// Compression ratio (n:1).
    Ratio,
    /// Plain factor (mix amounts, linear gains).
    Factor,
}

impl ParamUnit {
    /// Suffix for formatted values.
    pub const fn suffix(&self) -> &'static str {
        match self {
            ParamUnit::Decibels => " dB",
            ParamUnit::Hertz => " Hz",
            ParamUnit::Ratio => ":1",
            ParamUnit::Knob | ParamUnit::Factor => "",
        }
    }
}

/// Name, unit, range and default of one control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Stable lowercase identifier (settings keys, CLI arguments).
    pub name: &'static str,
    /// Display unit.
    pub unit: ParamUnit,
    /// Smallest accepted value.
    pub min: f32,
    /// Largest accepted value.
    pub max: f32,
    /// Value after construction.
    pub default: f32,
}

impl ParamSpec {
    /// Describes a control.
    pub const fn new(
        name: &'static str,
        unit: ParamUnit,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            unit,
            min,
            max,
            default,
        }
    }

    /// A 0–10 knob.
    pub const fn knob(name: &'static str, default: f32) -> Self {
        Self::new(name, ParamUnit::Knob, 0.0, 10.0, default)
    }

    /// Wet/dry blend, 0–1, fully wet by default.
    pub const fn mix() -> Self {
        Self::new("mix", ParamUnit::Factor, 0.0, 1.0, 1.0)
    }

    /// Clamps `value` into range. NaN maps to the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// True when `value` lies inside the range.
    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Index of the control called `name` in `specs`.
pub fn find_param(specs: &[ParamSpec], name: &str) -> Option<usize> {
    specs.iter().position(|spec| spec.name.eq_ignore_ascii_case(name))
}

/// Published control values of one stage.
///
/// # Example
///
/// ```rust
/// use ember_voices::{Controls, ParamSpec};
///
/// static SPECS: [ParamSpec; 2] = [ParamSpec::knob("drive", 5.0), ParamSpec::mix()];
///
/// let controls = Controls::new(&SPECS);
/// controls.set(0, 12.0);
/// assert_eq!(controls.get(0), 10.0);
/// assert!(controls.set_by_name("mix", 0.25));
/// assert_eq!(controls.get(1), 0.25);
/// ```
#[derive(Debug)]
pub struct Controls {
    specs: &'static [ParamSpec],
    values: Vec<AtomicParam>,
    bypassed: AtomicBool,
}

impl Controls {
    /// Creates the block with every control at its default.
    pub fn new(specs: &'static [ParamSpec]) -> Self {
        Self {
            specs,
            values: specs.iter().map(|spec| AtomicParam::new(spec.default)).collect(),
            bypassed: AtomicBool::new(false),
        }
    }

    /// The control table.
    pub fn specs(&self) -> &'static [ParamSpec] {
        self.specs
    }

    /// Publishes `value` (clamped) for control `index`. Unknown indices are
    /// ignored.
    pub fn set(&self, index: usize, value: f32) {
        if let (Some(spec), Some(slot)) = (self.specs.get(index), self.values.get(index)) {
            slot.store(spec.clamp(value));
        }
    }

    /// Latest published value of control `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range.
    pub fn get(&self, index: usize) -> f32 {
        self.values[index].load()
    }

    /// Publishes a value by control name. Returns `false` for unknown names.
    pub fn set_by_name(&self, name: &str, value: f32) -> bool {
        match find_param(self.specs, name) {
            Some(index) => {
                self.set(index, value);
                true
            }
            None => false,
        }
    }

    /// Puts every control back to its default.
    pub fn restore_defaults(&self) {
        for (spec, slot) in self.specs.iter().zip(&self.values) {
            slot.store(spec.default);
        }
    }

    /// Enables or disables bypass.
    pub fn set_bypassed(&self, bypassed: bool) {
        self.bypassed.store(bypassed, Ordering::Relaxed);
    }

    /// Current bypass flag.
    pub fn is_bypassed(&self) -> bool {
        self.bypassed.load(Ordering::Relaxed)
    }

    /// Audio side: forwards every published value into its smoother.
    pub fn pull(&self, smoothed: &mut [LinearSmoothedParam]) {
        for (param, slot) in smoothed.iter_mut().zip(&self.values) {
            param.set_target(slot.load());
        }
    }

    /// Audio side: jumps every smoother to the published value.
    pub fn snap(&self, smoothed: &mut [LinearSmoothedParam]) {
        for (param, slot) in smoothed.iter_mut().zip(&self.values) {
            param.set_current_and_target(slot.load());
        }
    }

    /// Builds one settled smoother per control for `sample_rate`.
    pub fn smoothers<const N: usize>(&self, sample_rate: f32) -> [LinearSmoothedParam; N] {
        core::array::from_fn(|i| {
            let initial = self.values.get(i).map_or(0.0, AtomicParam::load);
            LinearSmoothedParam::new(initial, sample_rate, DEFAULT_RAMP_SECONDS)
        })
    }
}
