use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid wave id '{value}': expected YYYY-MM")]
    InvalidWaveId { value: String },

    #[error("unknown canonical field: {name}")]
    UnknownField { name: String },

    #[error("code '{code}' is not in the domain of canonical field {field}")]
    UnknownCode { field: String, code: String },

    #[error("column {field} has {actual} rows, frame has {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("column {field} does not match the kind of its canonical field")]
    KindMismatch { field: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
