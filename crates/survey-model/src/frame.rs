//! Canonical records stored column-wise.
//!
//! A [`CanonicalFrame`] holds one column per canonical field for a single wave.
//! Every cell is a [`Slot`], which keeps "not collected / sentinel" apart from
//! "collected but not understood" so indicators can report both exclusions.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ModelError, Result};
use crate::schema::{CanonicalField, FieldKind};
use crate::wave::WaveId;

/// One canonical cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot<T> {
    /// Absent, empty, or a declared missing-value sentinel.
    Missing,
    /// A raw value outside the wave's recode table or unparseable.
    Unrecognized,
    Value(T),
}

impl<T> Slot<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Slot::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Slot::Missing)
    }

    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Slot::Unrecognized)
    }

    pub fn as_ref(&self) -> Slot<&T> {
        match self {
            Slot::Missing => Slot::Missing,
            Slot::Unrecognized => Slot::Unrecognized,
            Slot::Value(value) => Slot::Value(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Slot<U> {
        match self {
            Slot::Missing => Slot::Missing,
            Slot::Unrecognized => Slot::Unrecognized,
            Slot::Value(value) => Slot::Value(f(value)),
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Slot::Missing, Slot::Value)
    }
}

/// Column storage matching [`FieldKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalColumn {
    Number(Vec<Slot<f64>>),
    Code(Vec<Slot<&'static str>>),
    Ident(Vec<Slot<String>>),
}

impl CanonicalColumn {
    pub fn missing(kind: FieldKind, len: usize) -> Self {
        match kind {
            FieldKind::Number => Self::Number(vec![Slot::Missing; len]),
            FieldKind::Code => Self::Code(vec![Slot::Missing; len]),
            FieldKind::Identifier => Self::Ident(vec![Slot::Missing; len]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Number(values) => values.len(),
            Self::Code(values) => values.len(),
            Self::Ident(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Number(_) => FieldKind::Number,
            Self::Code(_) => FieldKind::Code,
            Self::Ident(_) => FieldKind::Identifier,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Self::Number(values) => values.get(row).is_none_or(Slot::is_missing),
            Self::Code(values) => values.get(row).is_none_or(Slot::is_missing),
            Self::Ident(values) => values.get(row).is_none_or(Slot::is_missing),
        }
    }
}

/// Canonical records of one wave.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFrame {
    wave: WaveId,
    len: usize,
    columns: BTreeMap<CanonicalField, CanonicalColumn>,
    unavailable: BTreeSet<CanonicalField>,
}

impl CanonicalFrame {
    pub fn builder(wave: WaveId, len: usize) -> CanonicalFrameBuilder {
        CanonicalFrameBuilder {
            wave,
            len,
            columns: BTreeMap::new(),
            unavailable: BTreeSet::new(),
        }
    }

    pub fn wave(&self) -> &WaveId {
        &self.wave
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// False when the wave does not collect `field`.
    pub fn is_available(&self, field: CanonicalField) -> bool {
        !self.unavailable.contains(&field)
    }

    pub fn unavailable(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.unavailable.iter().copied()
    }

    pub fn column(&self, field: CanonicalField) -> Option<&CanonicalColumn> {
        self.columns.get(&field)
    }

    pub fn numbers(&self, field: CanonicalField) -> Option<&[Slot<f64>]> {
        match self.columns.get(&field) {
            Some(CanonicalColumn::Number(values)) => Some(values),
            _ => None,
        }
    }

    pub fn codes(&self, field: CanonicalField) -> Option<&[Slot<&'static str>]> {
        match self.columns.get(&field) {
            Some(CanonicalColumn::Code(values)) => Some(values),
            _ => None,
        }
    }

    pub fn idents(&self, field: CanonicalField) -> Option<&[Slot<String>]> {
        match self.columns.get(&field) {
            Some(CanonicalColumn::Ident(values)) => Some(values),
            _ => None,
        }
    }

    pub fn number(&self, field: CanonicalField, row: usize) -> Slot<f64> {
        self.numbers(field)
            .and_then(|values| values.get(row).copied())
            .unwrap_or(Slot::Missing)
    }

    pub fn code(&self, field: CanonicalField, row: usize) -> Slot<&'static str> {
        self.codes(field)
            .and_then(|values| values.get(row).copied())
            .unwrap_or(Slot::Missing)
    }

    pub fn ident(&self, field: CanonicalField, row: usize) -> Slot<&str> {
        self.idents(field)
            .and_then(|values| values.get(row))
            .map_or(Slot::Missing, |slot| slot.as_ref().map(String::as_str))
    }
}

/// Assembles a [`CanonicalFrame`], checking column lengths and kinds.
///
/// Fields never supplied are filled with `Missing` and recorded as unavailable.
#[derive(Debug)]
pub struct CanonicalFrameBuilder {
    wave: WaveId,
    len: usize,
    columns: BTreeMap<CanonicalField, CanonicalColumn>,
    unavailable: BTreeSet<CanonicalField>,
}

impl CanonicalFrameBuilder {
    pub fn column(mut self, field: CanonicalField, column: CanonicalColumn) -> Result<Self> {
        if column.len() != self.len {
            return Err(ModelError::LengthMismatch {
                field: field.as_str().to_string(),
                expected: self.len,
                actual: column.len(),
            });
        }
        if column.kind() != field.kind() {
            return Err(ModelError::KindMismatch {
                field: field.as_str().to_string(),
            });
        }
        self.unavailable.remove(&field);
        self.columns.insert(field, column);
        Ok(self)
    }

    pub fn numbers(self, field: CanonicalField, values: Vec<Slot<f64>>) -> Result<Self> {
        self.column(field, CanonicalColumn::Number(values))
    }

    /// Code column from plain strings, validated against the field's domain.
    pub fn codes<S: AsRef<str>>(
        self,
        field: CanonicalField,
        values: impl IntoIterator<Item = Option<S>>,
    ) -> Result<Self> {
        let slots = values
            .into_iter()
            .map(|value| match value {
                Some(code) => field.intern_code(code.as_ref()).map(Slot::Value),
                None => Ok(Slot::Missing),
            })
            .collect::<Result<Vec<_>>>()?;
        self.column(field, CanonicalColumn::Code(slots))
    }

    pub fn idents(self, field: CanonicalField, values: Vec<Slot<String>>) -> Result<Self> {
        self.column(field, CanonicalColumn::Ident(values))
    }

    /// Declare a field as not collected in this wave.
    pub fn unavailable(mut self, field: CanonicalField) -> Self {
        self.columns
            .insert(field, CanonicalColumn::missing(field.kind(), self.len));
        self.unavailable.insert(field);
        self
    }

    pub fn build(mut self) -> CanonicalFrame {
        for field in CanonicalField::ALL {
            if !self.columns.contains_key(&field) {
                self.columns
                    .insert(field, CanonicalColumn::missing(field.kind(), self.len));
                self.unavailable.insert(field);
            }
        }
        CanonicalFrame {
            wave: self.wave,
            len: self.len,
            columns: self.columns,
            unavailable: self.unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave() -> WaveId {
        WaveId::parse("2025-02").unwrap()
    }

    #[test]
    fn unsupplied_fields_are_unavailable() {
        let frame = CanonicalFrame::builder(wave(), 2)
            .numbers(
                CanonicalField::Weight,
                vec![Slot::Value(1.0), Slot::Value(2.0)],
            )
            .unwrap()
            .build();
        assert!(frame.is_available(CanonicalField::Weight));
        assert!(!frame.is_available(CanonicalField::Age));
        assert_eq!(frame.number(CanonicalField::Age, 0), Slot::Missing);
    }

    #[test]
    fn length_and_kind_are_checked() {
        let err = CanonicalFrame::builder(wave(), 2)
            .numbers(CanonicalField::Age, vec![Slot::Value(20.0)])
            .unwrap_err();
        assert!(matches!(err, ModelError::LengthMismatch { .. }));

        let err = CanonicalFrame::builder(wave(), 1)
            .numbers(CanonicalField::Gender, vec![Slot::Value(1.0)])
            .unwrap_err();
        assert!(matches!(err, ModelError::KindMismatch { .. }));
    }

    #[test]
    fn code_columns_are_interned() {
        let frame = CanonicalFrame::builder(wave(), 3)
            .codes(
                CanonicalField::Activity,
                [Some("employed"), None, Some("Unemployed")],
            )
            .unwrap()
            .build();
        assert_eq!(
            frame.code(CanonicalField::Activity, 0),
            Slot::Value("employed")
        );
        assert_eq!(frame.code(CanonicalField::Activity, 1), Slot::Missing);
        assert_eq!(
            frame.code(CanonicalField::Activity, 2),
            Slot::Value("unemployed")
        );
    }
}
