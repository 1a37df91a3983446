use crate::models::{FieldMappings, DEFAULT_FIELD_MAPPINGS};
use crate::utils::PassportError;
use lazy_static::lazy_static;
use regex::Regex;
use std::env;
use std::path::PathBuf;

pub const BUCKET_NAME: &str = "BUCKET_NAME";
pub const DB_CONNECTION_STRING: &str = "DB_CONNECTION_STRING";
pub const DB_TABLE_NAME: &str = "DB_TABLE_NAME";
pub const FIELD_MAPPINGS_PATH: &str = "FIELD_MAPPINGS_PATH";

lazy_static! {
    static ref TABLE_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Table names are interpolated into statements, so only plain identifiers are accepted.
pub fn validate_table_name(table: &str) -> Result<(), PassportError> {
    if TABLE_NAME.is_match(table) {
        Ok(())
    } else {
        Err(PassportError::InvalidConfiguration(format!(
            "Invalid table name: {:?}",
            table
        )))
    }
}

/// Handler settings. Every value is optional here; each handler checks the
/// ones it needs when it runs.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub bucket_name: Option<String>,
    pub db_connection_string: Option<String>,
    pub db_table_name: Option<String>,
    pub field_mappings_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any name -> value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Config {
            bucket_name: get(BUCKET_NAME),
            db_connection_string: get(DB_CONNECTION_STRING),
            db_table_name: get(DB_TABLE_NAME),
            field_mappings_path: get(FIELD_MAPPINGS_PATH).map(PathBuf::from),
        }
    }

    pub fn bucket_name(&self) -> Result<&str, PassportError> {
        self.bucket_name
            .as_deref()
            .ok_or_else(|| PassportError::MissingConfiguration(BUCKET_NAME.to_string()))
    }

    pub fn db_connection_string(&self) -> Result<&str, PassportError> {
        self.db_connection_string
            .as_deref()
            .ok_or_else(|| PassportError::MissingConfiguration(DB_CONNECTION_STRING.to_string()))
    }

    pub fn db_table_name(&self) -> Result<&str, PassportError> {
        let table = self
            .db_table_name
            .as_deref()
            .ok_or_else(|| PassportError::MissingConfiguration(DB_TABLE_NAME.to_string()))?;
        validate_table_name(table)?;
        Ok(table)
    }

    /// Field mappings from `FIELD_MAPPINGS_PATH`, or the built-in table.
    pub fn field_mappings(&self) -> Result<FieldMappings, PassportError> {
        match &self.field_mappings_path {
            Some(path) => FieldMappings::from_file(path),
            None => Ok(DEFAULT_FIELD_MAPPINGS.clone()),
        }
    }
}
