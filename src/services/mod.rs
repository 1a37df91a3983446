pub mod envelope;
pub mod extraction;
pub mod upload;

pub use envelope::{ApiResponse, ProxyRequest, StorageEvent, StorageEventRecord};
pub use extraction::{ExtractionHandler, ExtractionOutcome};
pub use upload::{UploadHandler, UploadRequest, NATIONALITY_METADATA_KEY};
