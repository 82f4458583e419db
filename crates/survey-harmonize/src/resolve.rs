//! Raw cell to canonical slot resolution.

use survey_model::Slot;
use survey_standards::FieldRule;

/// Integral numbers lose their fractional zeros so `"1.0"` matches a `"1"` key.
fn numeric_key(value: &str) -> Option<String> {
    let parsed: f64 = value.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    let rendered = format!("{parsed}");
    if rendered.contains('.') {
        Some(rendered.trim_end_matches('0').trim_end_matches('.').to_string())
    } else {
        Some(rendered)
    }
}

fn is_missing(rule: &FieldRule, raw: &str) -> bool {
    raw.trim().is_empty() || rule.is_missing_code(raw)
}

/// Resolve a categorical cell through the rule's recode table.
///
/// Without a recode table the raw value must already be a canonical code.
pub fn resolve_code(rule: &FieldRule, raw: &str) -> Slot<&'static str> {
    if is_missing(rule, raw) {
        return Slot::Missing;
    }
    let trimmed = raw.trim();
    if rule.recode.is_empty() {
        return rule
            .field
            .intern_code(trimmed)
            .map_or(Slot::Unrecognized, Slot::Value);
    }
    if let Some(code) = rule.recode(trimmed) {
        return Slot::Value(code);
    }
    numeric_key(trimmed)
        .and_then(|key| rule.recode(&key))
        .map_or(Slot::Unrecognized, Slot::Value)
}

pub fn resolve_number(rule: &FieldRule, raw: &str) -> Slot<f64> {
    if is_missing(rule, raw) {
        return Slot::Missing;
    }
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Slot::Value(value),
        _ => Slot::Unrecognized,
    }
}

/// Identifiers are carried verbatim.
pub fn resolve_ident(rule: &FieldRule, raw: &str) -> Slot<String> {
    if is_missing(rule, raw) {
        return Slot::Missing;
    }
    Slot::Value(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_model::CanonicalField;

    fn activity() -> FieldRule {
        FieldRule::new(CanonicalField::Activity, "JENISKEGIA")
            .with_missing_codes(["9"])
            .with_recode("1", "employed")
            .unwrap()
            .with_recode("2", "unemployed")
            .unwrap()
    }

    #[test]
    fn recode_accepts_numeric_spellings() {
        let rule = activity();
        assert_eq!(resolve_code(&rule, "1"), Slot::Value("employed"));
        assert_eq!(resolve_code(&rule, " 2.0 "), Slot::Value("unemployed"));
        assert_eq!(resolve_code(&rule, "7"), Slot::Unrecognized);
    }

    #[test]
    fn sentinel_and_blank_are_missing() {
        let rule = activity();
        assert_eq!(resolve_code(&rule, "9"), Slot::Missing);
        assert_eq!(resolve_code(&rule, "  "), Slot::Missing);
    }

    #[test]
    fn codes_without_recode_must_be_canonical() {
        let rule = FieldRule::new(CanonicalField::Gender, "gender");
        assert_eq!(resolve_code(&rule, "Female"), Slot::Value("female"));
        assert_eq!(resolve_code(&rule, "2"), Slot::Unrecognized);
    }

    #[test]
    fn numbers_parse_or_are_unrecognized() {
        let rule = FieldRule::new(CanonicalField::Age, "B4K5").with_missing_codes(["999"]);
        assert_eq!(resolve_number(&rule, "34"), Slot::Value(34.0));
        assert_eq!(resolve_number(&rule, "999"), Slot::Missing);
        assert_eq!(resolve_number(&rule, "tiga"), Slot::Unrecognized);
        assert_eq!(resolve_number(&rule, "NaN"), Slot::Unrecognized);
    }
}
