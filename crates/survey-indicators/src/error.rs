use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("unknown indicator: {name}")]
    UnknownIndicator { name: String },

    #[error("no indicators requested")]
    EmptyRequest,

    #[error("wave {wave} was supplied more than once")]
    DuplicateWave { wave: String },

    #[error("calculation cancelled before all waves started")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, IndicatorError>;
