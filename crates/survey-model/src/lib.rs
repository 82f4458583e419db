pub mod error;
pub mod frame;
pub mod raw;
pub mod result;
pub mod schema;
pub mod wave;

pub use error::{ModelError, Result};
pub use frame::{CanonicalColumn, CanonicalFrame, CanonicalFrameBuilder, Slot};
pub use raw::RawTable;
pub use result::{ResultRow, ResultTable, UndefinedReason, Unit, WaveCell, WideRow, WideTable};
pub use schema::{CanonicalField, FieldKind};
pub use wave::WaveId;
