//! Subpopulation predicates over canonical records with three-valued logic.
//!
//! A comparison against a `Missing` or `Unrecognized` cell is neither true nor
//! false. `And`/`Or` follow Kleene logic, so a record that is certainly outside
//! a subpopulation is never reported as excluded just because some other field
//! is unknown.

use std::collections::BTreeSet;
use std::fmt;

use survey_model::{CanonicalField, CanonicalFrame, Slot};

/// Why a predicate could not be decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unknown {
    Missing,
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown(Unknown),
}

impl Truth {
    fn from_bool(value: bool) -> Self {
        if value { Truth::True } else { Truth::False }
    }

    fn from_slot<T>(slot: Slot<T>, test: impl FnOnce(T) -> bool) -> Self {
        match slot {
            Slot::Missing => Truth::Unknown(Unknown::Missing),
            Slot::Unrecognized => Truth::Unknown(Unknown::Unrecognized),
            Slot::Value(value) => Truth::from_bool(test(value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    All,
    /// Categorical field takes one of the listed canonical codes.
    CodeIn(CanonicalField, &'static [&'static str]),
    /// `value >= bound`
    AtLeast(CanonicalField, f64),
    /// `value > bound`
    Above(CanonicalField, f64),
    /// `value < bound`
    Below(CanonicalField, f64),
    /// `low <= value < high`
    Between(CanonicalField, f64, f64),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn and(parts: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(parts.into_iter().collect())
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    pub fn eval(&self, frame: &CanonicalFrame, row: usize) -> Truth {
        match self {
            Predicate::All => Truth::True,
            Predicate::CodeIn(field, codes) => {
                Truth::from_slot(frame.code(*field, row), |code| codes.contains(&code))
            }
            Predicate::AtLeast(field, bound) => {
                Truth::from_slot(frame.number(*field, row), |v| v >= *bound)
            }
            Predicate::Above(field, bound) => {
                Truth::from_slot(frame.number(*field, row), |v| v > *bound)
            }
            Predicate::Below(field, bound) => {
                Truth::from_slot(frame.number(*field, row), |v| v < *bound)
            }
            Predicate::Between(field, low, high) => {
                Truth::from_slot(frame.number(*field, row), |v| v >= *low && v < *high)
            }
            Predicate::And(parts) => {
                let mut unknown = None;
                for part in parts {
                    match part.eval(frame, row) {
                        Truth::False => return Truth::False,
                        Truth::Unknown(reason) => {
                            unknown.get_or_insert(reason);
                        }
                        Truth::True => {}
                    }
                }
                unknown.map_or(Truth::True, Truth::Unknown)
            }
            Predicate::Or(parts) => {
                let mut unknown = None;
                for part in parts {
                    match part.eval(frame, row) {
                        Truth::True => return Truth::True,
                        Truth::Unknown(reason) => {
                            unknown.get_or_insert(reason);
                        }
                        Truth::False => {}
                    }
                }
                unknown.map_or(Truth::False, Truth::Unknown)
            }
            Predicate::Not(inner) => match inner.eval(frame, row) {
                Truth::True => Truth::False,
                Truth::False => Truth::True,
                unknown => unknown,
            },
        }
    }

    /// Canonical fields the predicate reads.
    pub fn fields(&self) -> BTreeSet<CanonicalField> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut BTreeSet<CanonicalField>) {
        match self {
            Predicate::All => {}
            Predicate::CodeIn(field, _)
            | Predicate::AtLeast(field, _)
            | Predicate::Above(field, _)
            | Predicate::Below(field, _)
            | Predicate::Between(field, _, _) => {
                out.insert(*field);
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                for part in parts {
                    part.collect_fields(out);
                }
            }
            Predicate::Not(inner) => inner.collect_fields(out),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str| -> fmt::Result {
            for (idx, part) in parts.iter().enumerate() {
                if idx > 0 {
                    write!(f, " {sep} ")?;
                }
                match part {
                    Predicate::And(_) | Predicate::Or(_) => write!(f, "({part})")?,
                    _ => write!(f, "{part}")?,
                }
            }
            Ok(())
        };
        match self {
            Predicate::All => f.write_str("all"),
            Predicate::CodeIn(field, codes) => write!(f, "{field} in {{{}}}", codes.join(", ")),
            Predicate::AtLeast(field, bound) => write!(f, "{field} >= {bound}"),
            Predicate::Above(field, bound) => write!(f, "{field} > {bound}"),
            Predicate::Below(field, bound) => write!(f, "{field} < {bound}"),
            Predicate::Between(field, low, high) => write!(f, "{low} <= {field} < {high}"),
            Predicate::And(parts) => join(f, parts, "and"),
            Predicate::Or(parts) => join(f, parts, "or"),
            Predicate::Not(inner) => match inner.as_ref() {
                Predicate::And(_) | Predicate::Or(_) => write!(f, "not ({inner})"),
                _ => write!(f, "not {inner}"),
            },
        }
    }
}
