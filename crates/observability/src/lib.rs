//! # livevoice-observability
//!
//! Structured Logging via tracing-subscriber. Bibliotheks-Crates erzeugen
//! nur Events, initialisiert wird genau einmal im Binary.

pub mod logging;

pub use logging::{logging_initialisieren, LogConfig, LogFormat, LoggingError};
