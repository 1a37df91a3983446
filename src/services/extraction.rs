use crate::config::validate_table_name;
use crate::models::ResolvedRecord;
use crate::passport_extractor::PassportExtractor;
use crate::services::envelope::{ApiResponse, StorageEvent};
use crate::services::upload::NATIONALITY_METADATA_KEY;
use crate::storage::{Connection, Database, FormAnalyzer, ObjectStore};
use crate::utils::PassportError;
use log::{debug, error, info, warn};
use serde_json::json;

/// Result of processing one stored passport image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub object_key: String,
    pub record: ResolvedRecord,
}

/// Reacts to object-created notifications: analyses the stored image,
/// resolves the passport fields and inserts them as one row.
pub struct ExtractionHandler<'a, S, A, D> {
    store: S,
    analyzer: A,
    database: D,
    table: Option<String>,
    extractor: PassportExtractor<'a>,
}

impl<'a, S, A, D> ExtractionHandler<'a, S, A, D>
where
    S: ObjectStore,
    A: FormAnalyzer,
    D: Database,
{
    pub fn new(store: S, analyzer: A, database: D, extractor: PassportExtractor<'a>) -> Self {
        ExtractionHandler {
            store,
            analyzer,
            database,
            table: None,
            extractor,
        }
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn database(&self) -> &D {
        &self.database
    }

    pub fn handle(&self, event: &StorageEvent) -> ApiResponse {
        info!("Received storage event, attempting to process");

        let outcome = self
            .database
            .connect()
            .and_then(|mut connection| self.process(event, &mut connection));

        match outcome {
            Ok(outcome) => {
                info!("Stored passport fields for object key {}", outcome.object_key);
                ApiResponse::json(
                    200,
                    json!({
                        "message": "Form analysis completed and stored for object key:",
                        "objectKey": outcome.object_key,
                    }),
                )
            }
            Err(e) => {
                error!("Error processing storage event: {}", e);
                ApiResponse::json(
                    e.status_code(),
                    json!({ "message": "Error processing storage event", "error": e.to_string() }),
                )
            }
        }
    }

    /// Runs the pipeline for the first record of `event` on an open connection.
    pub fn process<C: Connection>(
        &self,
        event: &StorageEvent,
        connection: &mut C,
    ) -> Result<ExtractionOutcome, PassportError> {
        let record = event
            .records
            .first()
            .ok_or_else(|| PassportError::EventError("Event contains no records".to_string()))?;
        if event.records.len() > 1 {
            warn!("Event carries {} records; only the first is processed", event.records.len());
        }

        let bucket = record.bucket();
        let object_key = record.decoded_key()?;

        let head = self.store.head_object(bucket, &object_key)?;
        debug!("Metadata for s3://{}/{}: {:?}", bucket, object_key, head.metadata);

        let nationality = head
            .metadata
            .get(NATIONALITY_METADATA_KEY)
            .filter(|code| !code.is_empty())
            .ok_or(PassportError::MissingNationalityMetadata)?;

        let nodes = self.analyzer.analyze_form(bucket, &object_key)?;
        debug!("Form analysis returned {} blocks", nodes.len());

        let resolved = self.extractor.extract(&nodes, nationality)?;
        let missing = resolved.missing_fields();
        if !missing.is_empty() {
            warn!("No label matched for {:?} in {}", missing, object_key);
        }

        info!("Data extracted, attempting to store in db");
        let table = self
            .table
            .as_deref()
            .ok_or_else(|| PassportError::MissingConfiguration(crate::config::DB_TABLE_NAME.to_string()))?;
        validate_table_name(table)?;
        connection.insert_record(table, &resolved)?;

        Ok(ExtractionOutcome {
            object_key,
            record: resolved,
        })
    }
}
