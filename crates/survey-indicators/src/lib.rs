//! Indicator catalogue and calculator.
//!
//! Each indicator is a subpopulation predicate plus an aggregation, evaluated
//! against a [`survey_design::SurveyDesign`] so that point estimates use the
//! survey weights and intervals follow the declared design.

#![deny(unsafe_code)]

pub mod calculator;
pub mod catalogue;
pub mod error;
pub mod export;
pub mod functional;
pub mod predicate;
pub mod request;

pub use calculator::{
    CalculationOptions, CancellationToken, Layout, MultiWaveTable, calculate, calculate_multi,
    calculate_multi_with, calculate_with,
};
pub use catalogue::{Aggregate, Catalogue, IndicatorSpec, catalogue};
pub use error::{IndicatorError, Result};
pub use export::{Cell, NamedRow, long_frame, long_rows, wide_frame, wide_rows};
pub use predicate::{Predicate, Truth, Unknown};
pub use request::IndicatorRequest;
