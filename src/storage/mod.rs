pub mod analyzer;
#[cfg(feature = "aws")]
pub mod aws;
pub mod database;
pub mod object_store;

pub use analyzer::{FormAnalyzer, SavedResponseAnalyzer, StaticAnalyzer};
#[cfg(feature = "aws")]
pub use aws::{AwsContext, S3ObjectStore, TextractFormAnalyzer};
pub use database::{
    Connection, Database, MemoryConnection, MemoryDatabase, PassportRow, PostgresConnection, PostgresDatabase,
    SqlDatabase, SqliteConnection, SqliteDatabase,
};
pub use object_store::{FsObjectStore, MemoryObjectStore, ObjectMetadata, ObjectStore, PutObjectRequest};
