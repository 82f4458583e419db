//! Poverty lines in Rupiah per capita per month.

use std::collections::BTreeMap;

use serde::Serialize;

/// Urban and rural lines of one region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AreaLines {
    pub urban: f64,
    pub rural: f64,
}

impl AreaLines {
    pub fn uniform(line: f64) -> Self {
        Self {
            urban: line,
            rural: line,
        }
    }

    /// Line for a canonical `urban_rural` code. An unknown area resolves only
    /// when both lines agree.
    pub fn for_area(&self, area: Option<&str>) -> Option<f64> {
        match area {
            Some("urban") => Some(self.urban),
            Some("rural") => Some(self.rural),
            _ if self.urban == self.rural => Some(self.urban),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PovertyLines {
    pub name: String,
    pub period: String,
    pub national: AreaLines,
    /// Per-province overrides keyed by province code.
    pub provinces: BTreeMap<String, AreaLines>,
}

impl PovertyLines {
    /// A single line applied to every record.
    pub fn uniform(line: f64) -> Self {
        Self {
            name: "uniform".to_string(),
            period: String::new(),
            national: AreaLines::uniform(line),
            provinces: BTreeMap::new(),
        }
    }

    pub fn with_province(mut self, province: impl Into<String>, lines: AreaLines) -> Self {
        self.provinces.insert(province.into(), lines);
        self
    }

    /// Province line when one is published, otherwise the national line.
    pub fn lookup(&self, province: Option<&str>, area: Option<&str>) -> Option<f64> {
        match province.and_then(|code| self.provinces.get(code.trim())) {
            Some(lines) => lines.for_area(area),
            None => self.national.for_area(area),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> PovertyLines {
        PovertyLines {
            name: "2024-03".to_string(),
            period: "2024-03".to_string(),
            national: AreaLines {
                urban: 601_871.0,
                rural: 556_874.0,
            },
            provinces: BTreeMap::new(),
        }
        .with_province("31", AreaLines::uniform(825_000.0))
    }

    #[test]
    fn province_line_takes_precedence() {
        let lines = lines();
        assert_eq!(lines.lookup(Some("31"), Some("urban")), Some(825_000.0));
        assert_eq!(lines.lookup(Some("31"), None), Some(825_000.0));
    }

    #[test]
    fn falls_back_to_national_by_area() {
        let lines = lines();
        assert_eq!(lines.lookup(Some("11"), Some("rural")), Some(556_874.0));
        assert_eq!(lines.lookup(None, Some("urban")), Some(601_871.0));
        assert_eq!(lines.lookup(Some("11"), None), None);
    }

    #[test]
    fn uniform_lines_ignore_area() {
        assert_eq!(PovertyLines::uniform(10.0).lookup(None, None), Some(10.0));
    }
}
