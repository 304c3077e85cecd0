//! Parameter definitions with units and documented semantics.
//!
//! All magic numbers are extracted here with:
//! - Units (depth units, milliseconds, Hz, dB)
//! - Reference values for the default look
//! - Validation at startup

mod audio;
mod file;
mod render;
mod trace;

// Re-export all types
pub use audio::SpectrumConfig;
pub use file::Config;
pub use render::{OrthoCamera, RenderConfig};
pub use trace::{FoldMapping, ScheduleConfig, TraceParams};
