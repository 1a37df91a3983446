use crate::models::CanonicalField;
use crate::processing::LabelMatcher;
use crate::utils::PassportError;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const BUILTIN_FIELD_MAPPINGS: &str = include_str!("../../config/field_mappings.json");

lazy_static! {
    /// Built-in label vocabularies, parsed once per process.
    pub static ref DEFAULT_FIELD_MAPPINGS: FieldMappings =
        FieldMappings::from_json(BUILTIN_FIELD_MAPPINGS).expect("built-in field mappings are valid");
}

/// Expected source-language label for each canonical field of one nationality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub nationality: String,
    pub pob: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl FieldMapping {
    pub fn label(&self, field: CanonicalField) -> &str {
        match field {
            CanonicalField::FirstName => &self.first_name,
            CanonicalField::LastName => &self.last_name,
            CanonicalField::DateOfBirth => &self.dob,
            CanonicalField::Nationality => &self.nationality,
            CanonicalField::PlaceOfBirth => &self.pob,
        }
    }
}

/// Nationality code -> field mapping table.
#[derive(Debug, Clone, Default)]
pub struct FieldMappings {
    mappings: BTreeMap<String, FieldMapping>,
    // alias -> primary code
    aliases: HashMap<String, String>,
}

impl FieldMappings {
    pub fn from_json(json: &str) -> Result<Self, PassportError> {
        let mappings: BTreeMap<String, FieldMapping> = serde_json::from_str(json)?;
        Self::from_mappings(mappings)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PassportError> {
        let json = std::fs::read_to_string(&path).map_err(|e| {
            PassportError::InvalidConfiguration(format!(
                "Failed to read field mappings from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    pub fn from_mappings(mappings: BTreeMap<String, FieldMapping>) -> Result<Self, PassportError> {
        let mut aliases = HashMap::new();
        for (code, mapping) in &mappings {
            for field in CanonicalField::ALL {
                LabelMatcher::new(mapping.label(field)).map_err(|e| {
                    PassportError::InvalidConfiguration(format!("{} label of {} is unusable ({})", field, code, e))
                })?;
            }
            for alias in &mapping.aliases {
                if mappings.contains_key(alias) {
                    return Err(PassportError::InvalidConfiguration(format!(
                        "Alias {} of {} shadows a nationality code",
                        alias, code
                    )));
                }
                if let Some(previous) = aliases.insert(alias.clone(), code.clone()) {
                    return Err(PassportError::InvalidConfiguration(format!(
                        "Alias {} is declared by both {} and {}",
                        alias, previous, code
                    )));
                }
            }
        }
        Ok(FieldMappings { mappings, aliases })
    }

    /// Case-sensitive exact lookup by code or alias.
    pub fn get_mapping(&self, nationality_code: &str) -> Result<&FieldMapping, PassportError> {
        let code = self
            .aliases
            .get(nationality_code)
            .map(String::as_str)
            .unwrap_or(nationality_code);
        self.mappings
            .get(code)
            .ok_or_else(|| PassportError::UnsupportedNationality(nationality_code.to_string()))
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(String::as_str)
    }
}
