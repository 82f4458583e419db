//! Versioned wave mappings for the survey indicator engine.
//!
//! The `standards/` directory is pinned by `manifest.toml`: every file is listed
//! with a SHA-256 checksum and a role (`wave`, `wave_base`, `poverty_lines`).
//! [`WaveRegistry::load`] verifies the pins, resolves `extends` inheritance, and
//! checks every wave resolves the canonical fields the indicator catalogue needs.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod mapping;
pub mod paths;
pub mod poverty;
pub mod registry;

pub use crate::error::StandardsError;
pub use crate::mapping::{FieldDescription, FieldResolution, FieldRule, WaveMapping};
pub use crate::paths::{STANDARDS_ENV_VAR, standards_root};
pub use crate::poverty::{AreaLines, PovertyLines};
pub use crate::registry::{VerifySummary, WaveRegistry, install, installed};
