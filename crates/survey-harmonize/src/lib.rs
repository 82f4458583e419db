//! Harmonization of wave-specific raw records onto the canonical schema.

pub mod harmonizer;
pub mod report;
pub mod resolve;

pub use harmonizer::{HarmonizeError, Harmonized, harmonize};
pub use report::{HarmonizationReport, MissingSource};
