//! Location of the versioned standards directory.

use std::path::PathBuf;

/// Environment variable overriding the standards root.
pub const STANDARDS_ENV_VAR: &str = "SURVEY_STANDARDS_DIR";

/// Standards root: `$SURVEY_STANDARDS_DIR`, else `<workspace>/standards`.
pub fn standards_root() -> PathBuf {
    if let Ok(root) = std::env::var(STANDARDS_ENV_VAR) {
        return PathBuf::from(root);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../standards")
}

pub fn manifest_path() -> PathBuf {
    standards_root().join("manifest.toml")
}
