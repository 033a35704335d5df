//! A single circuit model as a stage: input drive, the model at the
//! pipeline's oversampling factor, output level and wet/dry mix.
//!
//! Used to audition one model in isolation.
//!
//! ## Controls
//!
//! | Index | Name | Range | Default |
//! |-------|------|-------|---------|
//! | 0 | drive | -24–36 dB | 0 |
//! | 1 | level | -60–12 dB | 0 |
//! | 2 | mix | 0–1 | 1 |

use alloc::sync::Arc;

use ember_circuits::{Circuit, CircuitKind};
use ember_core::{LinearSmoothedParam, PipelineConfig, Stage, block_len, db_to_linear};

use crate::params::{Controls, ParamSpec, ParamUnit};
use crate::voice::{Oversampled, WetPath};

/// Drive control index.
pub const DRIVE: usize = 0;
/// Level control index.
pub const LEVEL: usize = 1;
/// Mix control index.
pub const MIX: usize = 2;

/// Control table.
pub static PARAMS: [ParamSpec; 3] = [
    ParamSpec::new("drive", ParamUnit::Decibels, -24.0, 36.0, 0.0),
    ParamSpec::new("level", ParamUnit::Decibels, -60.0, 12.0, 0.0),
    ParamSpec::mix(),
];

#[derive(Debug, Clone)]
struct CircuitPath {
    circuit: Circuit,
    drive: f32,
}

impl WetPath for CircuitPath {
    fn process(&mut self, block: &mut [f32], level: &[f32]) {
        for sample in block.iter_mut() {
            *sample *= self.drive;
        }
        self.circuit.process_block(block);
        for (sample, &l) in block.iter_mut().zip(level) {
            *sample *= db_to_linear(l);
        }
    }

    fn clear(&mut self) {
        self.circuit.reset();
    }
}

/// One circuit model wrapped as a [`Stage`].
///
/// # Example
///
/// ```rust
/// use ember_circuits::CircuitKind;
/// use ember_core::{OversamplingFactor, PipelineConfig, Stage};
/// use ember_voices::CircuitStage;
///
/// let config = PipelineConfig::default().with_oversampling(OversamplingFactor::X4);
/// let mut stage = CircuitStage::new(CircuitKind::GermaniumDiode, &config);
/// let mut block = vec![0.25_f32; 128];
/// stage.process_mono(&mut block);
/// ```
#[derive(Debug, Clone)]
pub struct CircuitStage {
    kind: CircuitKind,
    controls: Arc<Controls>,
    smoothed: [LinearSmoothedParam; 3],
    core: Oversampled<CircuitPath>,
}

impl CircuitStage {
    /// Creates and prepares a stage running `kind` at `config`'s
    /// oversampling factor.
    pub fn new(kind: CircuitKind, config: &PipelineConfig) -> Self {
        let controls = Arc::new(Controls::new(&PARAMS));
        let smoothed = controls.smoothers(config.sample_rate());
        let mut stage = Self {
            kind,
            controls,
            smoothed,
            core: Oversampled::new(config.oversampling()),
        };
        stage.prepare(config);
        stage
    }

    /// The wrapped model.
    pub fn kind(&self) -> CircuitKind {
        self.kind
    }

    /// Control block shared with the control thread.
    pub fn controls(&self) -> &Arc<Controls> {
        &self.controls
    }

    fn apply_drive(&mut self, drive_db: f32) {
        let drive = db_to_linear(drive_db);
        for path in self.core.paths_mut() {
            path.drive = drive;
        }
    }
}

impl Stage for CircuitStage {
    fn prepare(&mut self, config: &PipelineConfig) {
        self.core = Oversampled::new(config.oversampling());
        self.smoothed = self.controls.smoothers(config.oversampled_rate());
        let kind = self.kind;
        let drive = db_to_linear(self.smoothed[DRIVE].current());
        self.core.prepare(config, |rate| CircuitPath {
            circuit: Circuit::new(kind, rate),
            drive,
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "circuit_stage_prepare: {} at {} Hz x{}",
            kind,
            config.sample_rate(),
            self.core.ratio()
        );
    }

    fn reset(&mut self) {
        self.controls.snap(&mut self.smoothed);
        self.core.reset();
        self.apply_drive(self.smoothed[DRIVE].current());
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        if self.controls.is_bypassed() || !self.core.is_prepared() {
            return;
        }
        self.controls.pull(&mut self.smoothed);

        let ratio = self.core.ratio();
        for range in self.core.chunks(block_len(channels)) {
            if self.smoothed[DRIVE].is_smoothing() {
                let drive = self.smoothed[DRIVE].skip(range.len() * ratio);
                self.apply_drive(drive);
            }
            let [_, level, mix] = &mut self.smoothed;
            self.core.render(channels, range, mix, level);
        }
    }

    fn set_bypassed(&mut self, bypassed: bool) {
        self.controls.set_bypassed(bypassed);
    }

    fn is_bypassed(&self) -> bool {
        self.controls.is_bypassed()
    }
}
