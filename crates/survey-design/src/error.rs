use thiserror::Error;

#[derive(Debug, Error)]
pub enum DesignError {
    #[error("wave {wave} does not collect design field {field}")]
    FieldNotCollected { wave: String, field: String },

    #[error("design field {field} must be numeric")]
    NotNumeric { field: String },

    #[error("design field {field} must be an identifier")]
    NotIdentifier { field: String },
}

pub type Result<T> = std::result::Result<T, DesignError>;
