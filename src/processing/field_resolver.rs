use crate::models::{
    CanonicalField, ExtractedFieldMap, FieldMappings, ResolvedRecord, DEFAULT_FIELD_MAPPINGS,
};
use crate::utils::PassportError;
use regex::{Regex, RegexBuilder};

/// Whitespace- and case-insensitive substring matcher for one expected label.
///
/// The label is matched literally; each run of whitespace in it matches zero
/// or more whitespace characters in the candidate.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    pattern: Regex,
}

impl LabelMatcher {
    /// Returns `Ok(None)` for a label with no visible characters, which matches nothing.
    pub fn new(expected_label: &str) -> Result<Option<Self>, PassportError> {
        Self::build(expected_label, None)
    }

    fn build(expected_label: &str, size_limit: Option<usize>) -> Result<Option<Self>, PassportError> {
        let tokens: Vec<String> = expected_label.split_whitespace().map(regex::escape).collect();
        if tokens.is_empty() {
            return Ok(None);
        }

        let mut builder = RegexBuilder::new(&tokens.join(r"\s*"));
        builder.case_insensitive(true);
        if let Some(limit) = size_limit {
            builder.size_limit(limit);
        }
        let pattern = builder.build().map_err(|e| {
            PassportError::InvalidConfiguration(format!(
                "Cannot build matcher for label {:?}: {}",
                expected_label, e
            ))
        })?;
        Ok(Some(LabelMatcher { pattern }))
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.pattern.is_match(candidate)
    }

    /// Value of the first label, in map order, that this matcher accepts.
    pub fn find_value<'a>(&self, fields: &'a ExtractedFieldMap) -> Option<&'a str> {
        fields
            .iter()
            .find(|(label, _)| self.is_match(label))
            .map(|(_, value)| value)
    }
}

/// Resolves extracted labels to the canonical passport fields of one nationality.
pub struct FieldResolver<'a> {
    mappings: &'a FieldMappings,
}

impl Default for FieldResolver<'static> {
    fn default() -> Self {
        FieldResolver::new(&DEFAULT_FIELD_MAPPINGS)
    }
}

impl<'a> FieldResolver<'a> {
    pub fn new(mappings: &'a FieldMappings) -> Self {
        FieldResolver { mappings }
    }

    /// Fails when the nationality code has no mapping; unmatched fields resolve to `None`.
    /// Labels are checked when `FieldMappings` is loaded, so matcher construction does not fail here.
    pub fn resolve(
        &self,
        fields: &ExtractedFieldMap,
        nationality_code: &str,
    ) -> Result<ResolvedRecord, PassportError> {
        let mapping = self.mappings.get_mapping(nationality_code)?;

        let mut record = ResolvedRecord {
            nationality_code: nationality_code.to_string(),
            ..Default::default()
        };

        for field in CanonicalField::ALL {
            let value = LabelMatcher::new(mapping.label(field))?
                .and_then(|matcher| matcher.find_value(fields).map(str::to_string));
            record.set_field(field, value);
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uk_fields() -> ExtractedFieldMap {
        vec![
            ("Given names", "John"),
            ("Surname", "Doe"),
            ("Date of birth", "1990-01-01"),
            ("Nationality", "British"),
            ("Place of birth", "London"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_resolves_uk_record() {
        let record = FieldResolver::default().resolve(&uk_fields(), "UK").unwrap();

        assert_eq!(
            record,
            ResolvedRecord {
                first_name: Some("John".to_string()),
                last_name: Some("Doe".to_string()),
                dob: Some("1990-01-01".to_string()),
                nationality: Some("British".to_string()),
                pob: Some("London".to_string()),
                nationality_code: "UK".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_code_fails_regardless_of_fields() {
        let resolver = FieldResolver::default();
        for fields in [uk_fields(), ExtractedFieldMap::new()] {
            match resolver.resolve(&fields, "ZZ") {
                Err(PassportError::UnsupportedNationality(code)) => assert_eq!(code, "ZZ"),
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn test_empty_fields_resolve_to_nulls() {
        let record = FieldResolver::default().resolve(&ExtractedFieldMap::new(), "UK").unwrap();

        assert_eq!(record.missing_fields(), CanonicalField::ALL.to_vec());
        assert_eq!(record.nationality_code, "UK");
    }

    #[test]
    fn test_french_labels_match_with_ocr_noise() {
        let fields: ExtractedFieldMap = vec![
            ("1. Nom", "DUPONT"),
            ("2. PRÉNOMS", "Marie"),
            ("Nationalité", "Française"),
            ("Date de  naissance", "02 03 1985"),
            ("Lieu de naissance", "PARIS"),
        ]
        .into_iter()
        .collect();

        let record = FieldResolver::default().resolve(&fields, "FR").unwrap();
        assert_eq!(record.last_name.as_deref(), Some("DUPONT"));
        assert_eq!(record.first_name.as_deref(), Some("Marie"));
        assert_eq!(record.dob.as_deref(), Some("02 03 1985"));
        assert_eq!(record.pob.as_deref(), Some("PARIS"));
    }

    #[test]
    fn test_first_match_in_input_order_wins() {
        // "Nom" is contained in both labels
        let fields: ExtractedFieldMap = vec![("Nom d'usage", "MARTIN"), ("Nom", "DUPONT")]
            .into_iter()
            .collect();

        let record = FieldResolver::default().resolve(&fields, "FR").unwrap();
        assert_eq!(record.last_name.as_deref(), Some("MARTIN"));
    }

    #[test]
    fn test_matcher_ignores_whitespace_and_case() {
        let matcher = LabelMatcher::new("Date of birth").unwrap().unwrap();
        assert!(matcher.is_match("Date   of Birth"));
        assert!(matcher.is_match("  date of birth (dd/mm/yyyy)"));
        assert!(matcher.is_match("Dateofbirth"));
        assert!(matcher.is_match("Date\tof\nbirth"));
        assert!(!matcher.is_match("Date of issue"));
    }

    #[test]
    fn test_matcher_treats_metacharacters_literally() {
        let matcher = LabelMatcher::new("Surname (1)").unwrap().unwrap();
        assert!(matcher.is_match("Surname(1)"));
        assert!(!matcher.is_match("Surname 1"));

        let dotted = LabelMatcher::new("No.").unwrap().unwrap();
        assert!(dotted.is_match("Passport No."));
        assert!(!dotted.is_match("Nom"));
    }

    #[test]
    fn test_blank_label_matches_nothing() {
        assert!(LabelMatcher::new("").unwrap().is_none());
        assert!(LabelMatcher::new("   ").unwrap().is_none());
    }

    #[test]
    fn test_oversized_matcher_is_configuration_error() {
        match LabelMatcher::build("Date of birth", Some(16)) {
            Err(PassportError::InvalidConfiguration(message)) => assert!(message.contains("Date of birth")),
            other => panic!("unexpected result: {:?}", other.map(|m| m.is_some())),
        }
    }

    #[test]
    fn test_custom_mappings() {
        let mappings = FieldMappings::from_json(
            r#"{ "DE": { "firstName": "Vornamen", "lastName": "Name", "dob": "Geburtstag",
                         "nationality": "Staatsangehörigkeit", "pob": "Geburtsort" } }"#,
        )
        .unwrap();
        let fields: ExtractedFieldMap = vec![("Vornamen / Given names", "ERIKA")].into_iter().collect();

        let record = FieldResolver::new(&mappings).resolve(&fields, "DE").unwrap();
        assert_eq!(record.first_name.as_deref(), Some("ERIKA"));
        assert!(FieldResolver::new(&mappings).resolve(&fields, "UK").is_err());
    }
}
