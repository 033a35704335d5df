//! Engine settings for ember voice pipelines.
//!
//! An [`EngineSettings`] document describes a whole [`Engine`](ember_voices::Engine):
//! the pipeline it is prepared with, the selected overdrive voice, and the
//! controls of every stage. Documents are TOML; every table and key is
//! optional and falls back to the stage's own default.
//!
//! This crate never touches the filesystem. Callers read and write the
//! text themselves and hand it to [`EngineSettings::from_toml`] /
//! [`EngineSettings::to_toml`].
//!
//! # Example
//!
//! ```rust
//! use ember_config::EngineSettings;
//! use ember_voices::Engine;
//!
//! let settings = EngineSettings::from_toml(
//!     r#"
//!     [engine]
//!     voice = "nebula"
//!     master = -6.0
//!
//!     [nebula]
//!     drive = 7.5
//!     "#,
//! )
//! .unwrap();
//!
//! let engine = Engine::new(&settings.pipeline().unwrap());
//! settings.apply(&engine.handle()).unwrap();
//! ```

mod error;
mod settings;

/// Per-stage settings tables.
pub mod stages;

pub use error::ConfigError;
pub use settings::{EngineSettings, PipelineSettings};
pub use stages::{
    AmpEqSettings, BorealisSettings, ChainSettings, CompressorSettings, FuzzSettings,
    HeliosSettings, NebulaSettings, StageSettings,
};

/// Looks up a circuit model by name, case-insensitively.
///
/// ```rust
/// use ember_circuits::CircuitKind;
///
/// assert_eq!(ember_config::circuit_kind("Triode").unwrap(), CircuitKind::Triode);
/// assert!(ember_config::circuit_kind("pentode").is_err());
/// ```
pub fn circuit_kind(name: &str) -> Result<ember_circuits::CircuitKind, ConfigError> {
    name.parse()
        .map_err(|_| ConfigError::UnknownCircuit(name.to_string()))
}
