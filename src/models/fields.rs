use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Label -> value pairs reduced from a form-analysis result.
///
/// Labels keep the position they were first seen at; inserting a label again
/// replaces its value in place. Iteration therefore follows input order, which
/// is what fuzzy matching uses to break ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFieldMap {
    entries: Vec<(String, String)>,
    // label -> position in entries
    index: HashMap<String, usize>,
}

impl ExtractedFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: String, value: String) {
        match self.index.get(&label) {
            Some(&position) => self.entries[position].1 = value,
            None => {
                self.index.insert(label.clone(), self.entries.len());
                self.entries.push((label, value));
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.index
            .get(label)
            .map(|&position| self.entries[position].1.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractedFieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ExtractedFieldMap::new();
        for (label, value) in iter {
            map.insert(label.into(), value.into());
        }
        map
    }
}

/// The five normalized passport attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    FirstName,
    LastName,
    DateOfBirth,
    Nationality,
    PlaceOfBirth,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 5] = [
        CanonicalField::FirstName,
        CanonicalField::LastName,
        CanonicalField::DateOfBirth,
        CanonicalField::Nationality,
        CanonicalField::PlaceOfBirth,
    ];

    /// Column the field is persisted to.
    pub fn column(&self) -> &'static str {
        match self {
            CanonicalField::FirstName => "first_name",
            CanonicalField::LastName => "last_name",
            CanonicalField::DateOfBirth => "dob",
            CanonicalField::Nationality => "nationality",
            CanonicalField::PlaceOfBirth => "pob",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CanonicalField::FirstName => "firstName",
            CanonicalField::LastName => "lastName",
            CanonicalField::DateOfBirth => "dob",
            CanonicalField::Nationality => "nationality",
            CanonicalField::PlaceOfBirth => "pob",
        };
        f.write_str(name)
    }
}

/// Canonical fields resolved for one passport image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRecord {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub nationality: Option<String>,
    pub pob: Option<String>,
    pub nationality_code: String,
}

impl ResolvedRecord {
    pub fn field(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::FirstName => self.first_name.as_deref(),
            CanonicalField::LastName => self.last_name.as_deref(),
            CanonicalField::DateOfBirth => self.dob.as_deref(),
            CanonicalField::Nationality => self.nationality.as_deref(),
            CanonicalField::PlaceOfBirth => self.pob.as_deref(),
        }
    }

    pub fn set_field(&mut self, field: CanonicalField, value: Option<String>) {
        let slot = match field {
            CanonicalField::FirstName => &mut self.first_name,
            CanonicalField::LastName => &mut self.last_name,
            CanonicalField::DateOfBirth => &mut self.dob,
            CanonicalField::Nationality => &mut self.nationality,
            CanonicalField::PlaceOfBirth => &mut self.pob,
        };
        *slot = value;
    }

    /// Canonical fields that did not resolve to a value.
    pub fn missing_fields(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|field| self.field(*field).is_none())
            .collect()
    }
}
