//! Run configuration, parsed once from the host environment.
//!
//! [`Settings::from_env`] is pure parse-and-validate: no network, no
//! disk. An inverted warn/alert pair or an unparsable numeric value is
//! a fatal [`ConfigError`] and the run aborts before any evaluation.
//! The resulting value is immutable; the evaluator receives thresholds
//! by reference and never reads ambient state.

pub mod error;
pub mod settings;
pub mod thresholds;

pub use error::ConfigError;
pub use settings::{EmailSettings, Settings};
pub use thresholds::{ThresholdPair, Thresholds};
