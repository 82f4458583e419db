use serde::Serialize;
use survey_model::CanonicalField;
use survey_standards::WaveMapping;

/// Which canonical fields carry the sampling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DesignSpec {
    pub weight: CanonicalField,
    pub strata: Option<CanonicalField>,
    pub psu: Option<CanonicalField>,
    pub fpc: Option<CanonicalField>,
}

impl Default for DesignSpec {
    fn default() -> Self {
        Self::weight_only()
    }
}

impl DesignSpec {
    /// Single-stage, unstratified: variance falls back to the approximate form.
    pub fn weight_only() -> Self {
        Self {
            weight: CanonicalField::Weight,
            strata: None,
            psu: None,
            fpc: None,
        }
    }

    /// Stratified cluster design on the canonical design fields.
    pub fn stratified() -> Self {
        Self {
            strata: Some(CanonicalField::Strata),
            psu: Some(CanonicalField::Psu),
            ..Self::weight_only()
        }
    }

    /// Declare every design field the wave maps.
    pub fn from_mapping(mapping: &WaveMapping) -> Self {
        let declared = |field: CanonicalField| mapping.is_mapped(field).then_some(field);
        Self {
            weight: CanonicalField::Weight,
            strata: declared(CanonicalField::Strata),
            psu: declared(CanonicalField::Psu),
            fpc: declared(CanonicalField::Fpc),
        }
    }

    pub fn without_strata(mut self) -> Self {
        self.strata = None;
        self
    }

    pub fn without_psu(mut self) -> Self {
        self.psu = None;
        self
    }

    pub fn with_fpc(mut self) -> Self {
        self.fpc = Some(CanonicalField::Fpc);
        self
    }

    pub fn declared_fields(&self) -> Vec<CanonicalField> {
        std::iter::once(self.weight)
            .chain(self.strata)
            .chain(self.psu)
            .chain(self.fpc)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_model::WaveId;
    use survey_standards::FieldRule;

    #[test]
    fn from_mapping_declares_only_mapped_fields() {
        let mapping = WaveMapping::new(WaveId::parse("2025-02").unwrap(), "sakernas")
            .map(FieldRule::new(CanonicalField::Weight, "WEIGHT"))
            .map(FieldRule::new(CanonicalField::Psu, "PSU"))
            .not_available(CanonicalField::Strata);
        let spec = DesignSpec::from_mapping(&mapping);
        assert_eq!(spec.strata, None);
        assert_eq!(spec.psu, Some(CanonicalField::Psu));
        assert_eq!(spec.without_psu().psu, None);
    }
}
