//! The capability every circuit model implements.
//!
//! A model is a pure function of `(state, input) -> (output, state)` plus
//! immutable physical constants computed at construction. Keeping state out
//! of the model lets one set of constants drive several channels, and makes
//! each step trivially reproducible.
//!
//! [`Stateful`] pairs a model with the state of one channel for callers
//! that just want `process(sample)`.

/// One-sample transform of an analog circuit.
///
/// # Example
///
/// ```rust
/// use ember_circuits::{CircuitModel, OpAmpTanh, Stateful};
///
/// let model = OpAmpTanh::new();
/// let (y, _) = model.step((), 0.5);
/// assert!((y - 0.5).abs() < 1e-3);
///
/// let mut channel = Stateful::new(model);
/// let mut block = [0.0_f32, 1.0, 3.0];
/// channel.process_block(&mut block);
/// assert_eq!(block[2], 1.0);
/// ```
pub trait CircuitModel {
    /// Per-channel memory carried between samples.
    type State: Copy;

    /// State the model rests in with no input applied.
    fn initial_state(&self) -> Self::State;

    /// Computes one output sample and the next state.
    fn step(&self, state: Self::State, input: f32) -> (f32, Self::State);

    /// Output produced at rest with zero input.
    fn dc_operating_point(&self) -> f32;
}

/// A model together with the state of one signal channel.
#[derive(Debug, Clone)]
pub struct Stateful<M: CircuitModel> {
    model: M,
    state: M::State,
}

impl<M: CircuitModel> Stateful<M> {
    /// Wraps `model` starting from its initial state.
    pub fn new(model: M) -> Self {
        let state = model.initial_state();
        Self { model, state }
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let (output, state) = self.model.step(self.state, input);
        self.state = state;
        output
    }

    /// Processes a block in place.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        let mut state = self.state;
        for sample in buffer.iter_mut() {
            let (output, next) = self.model.step(state, *sample);
            *sample = output;
            state = next;
        }
        self.state = state;
    }

    /// Returns to the model's initial state.
    pub fn reset(&mut self) {
        self.state = self.model.initial_state();
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Current channel state.
    pub fn state(&self) -> M::State {
        self.state
    }
}
