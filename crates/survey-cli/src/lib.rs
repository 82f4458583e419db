//! Library side of the `svyind` command-line tool.

pub mod logging;
pub mod pipeline;
