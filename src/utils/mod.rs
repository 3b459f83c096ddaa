// file: src/utils/mod.rs
// description: utility functions module exports
// reference: internal module structure

pub mod logging;
pub mod redact;
pub mod validation;

pub use logging::{LogFormat, LogSettings, init_logger};
pub use redact::redact;
pub use validation::Validator;
