use thiserror::Error;

#[derive(Debug, Error)]
pub enum PassportError {
    #[error("Unsupported nationality: {0}")]
    UnsupportedNationality(String),

    #[error("Nationality not specified")]
    MissingNationalityMetadata,

    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    #[error("{0} not defined or detected")]
    MissingConfiguration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Form analysis error: {0}")]
    AnalysisError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PassportError {
    /// HTTP status the boundary handlers answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            PassportError::MalformedUpload(_) => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_boundary_wording() {
        assert_eq!(
            PassportError::UnsupportedNationality("ZZ".to_string()).to_string(),
            "Unsupported nationality: ZZ"
        );
        assert_eq!(
            PassportError::MissingNationalityMetadata.to_string(),
            "Nationality not specified"
        );
        assert_eq!(
            PassportError::MissingConfiguration("DB_TABLE_NAME".to_string()).to_string(),
            "DB_TABLE_NAME not defined or detected"
        );
    }

    #[test]
    fn test_only_malformed_upload_is_client_error() {
        assert_eq!(PassportError::MalformedUpload("no key".into()).status_code(), 400);
        assert_eq!(PassportError::MissingNationalityMetadata.status_code(), 500);
        assert_eq!(PassportError::UnsupportedNationality("X".into()).status_code(), 500);
    }
}
