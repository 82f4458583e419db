#![deny(unsafe_code)]

use std::path::PathBuf;

use survey_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum StandardsError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("invalid sha256 for {path}: {message}")]
    InvalidSha256 { path: PathBuf, message: String },

    #[error("invalid manifest path {path}: {message}")]
    InvalidPath { path: PathBuf, message: String },

    #[error("duplicate path in manifest: {path}")]
    DuplicatePath { path: PathBuf },

    #[error("missing file listed in manifest: {path}")]
    MissingFile { path: PathBuf },

    #[error("unexpected file present under standards/: {path}")]
    UnexpectedFile { path: PathBuf },

    #[error("sha256 mismatch for {path} (expected {expected}, got {actual})")]
    Sha256Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("wave file {path} has no wave id")]
    MissingWaveId { path: PathBuf },

    #[error("invalid wave id in {path}: {source}")]
    InvalidWaveId {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    #[error("duplicate wave id: {wave}")]
    DuplicateWave { wave: String },

    #[error("unknown wave: {wave}")]
    UnknownWave { wave: String },

    #[error("{path}: unknown canonical field '{field}'")]
    UnknownField { path: PathBuf, field: String },

    #[error("wave {wave}: recode target '{code}' is not a code of {field}")]
    InvalidCode {
        wave: String,
        field: String,
        code: String,
    },

    #[error("wave {wave}: field {field} is not categorical and cannot carry a recode table")]
    RecodeNotCategorical { wave: String, field: String },

    #[error("{path}: field {field} is both mapped and declared not available")]
    Conflict { path: PathBuf, field: String },

    #[error("wave {wave} extends unknown base '{base}'")]
    MissingBase { wave: String, base: String },

    #[error("wave {wave} references unknown poverty lines '{name}'")]
    MissingPovertyLines { wave: String, name: String },

    #[error("invalid poverty lines {path}: {message}")]
    InvalidPovertyLines { path: PathBuf, message: String },

    #[error(
        "wave {wave}: canonical field {field} is neither mapped nor declared not available"
    )]
    IncompleteMapping { wave: String, field: String },

    #[error("a wave registry is already installed")]
    AlreadyInstalled,
}

impl StandardsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
