//! Survey design layer: binds canonical records to weights, strata, and PSUs
//! and provides design-consistent weighted estimators.

pub mod design;
pub mod error;
pub mod estimate;
pub mod spec;

pub use design::{DesignExclusions, SurveyDesign};
pub use error::{DesignError, Result};
pub use estimate::{Estimate, Z_95};
pub use spec::DesignSpec;
