// Command-line front end for the passport upload and extraction handlers

use clap::{Parser, Subcommand};
use log::error;
use passport_forms::{
    config::Config,
    services::{ApiResponse, ExtractionHandler, ProxyRequest, StorageEvent, UploadHandler},
    storage::{FormAnalyzer, FsObjectStore, ObjectStore, SavedResponseAnalyzer, SqlDatabase},
    utils::PassportError,
    PassportExtractor,
};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "passport-forms", version, about = "Passport image upload and form-field extraction")]
struct Cli {
    /// Root directory of the local object store
    #[arg(long, env = "STORAGE_ROOT", default_value = "storage")]
    storage_root: PathBuf,

    /// Root directory of saved form-analysis responses
    #[arg(long, env = "ANALYSIS_ROOT", default_value = "analysis")]
    analysis_root: PathBuf,

    /// JSON file overriding the built-in field mappings
    #[arg(long, env = "FIELD_MAPPINGS_PATH")]
    field_mappings: Option<PathBuf>,

    /// Use S3 and Textract instead of the local directories
    #[cfg(feature = "aws")]
    #[arg(long)]
    aws: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a base64-encoded passport image from an upload request
    Upload {
        /// Upload request JSON (API gateway proxy shape)
        #[arg(long)]
        event: PathBuf,

        #[arg(long, env = "BUCKET_NAME")]
        bucket: Option<String>,
    },
    /// Extract and persist passport fields for an object-created notification
    Extract {
        /// Notification JSON
        #[arg(long)]
        event: PathBuf,

        /// PostgreSQL connection string, or sqlite://<path>
        #[arg(long = "db", env = "DB_CONNECTION_STRING")]
        db_connection_string: Option<String>,

        #[arg(long, env = "DB_TABLE_NAME")]
        table: Option<String>,
    },
    /// Resolve passport fields from a saved form-analysis response
    Resolve {
        #[arg(long)]
        analysis: PathBuf,

        #[arg(long)]
        nationality: String,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PassportError> {
    let json = fs::read(path)
        .map_err(|e| PassportError::EventError(format!("Failed to read {}: {}", path.display(), e)))?;
    Ok(serde_json::from_slice(&json)?)
}

fn print_response(response: &ApiResponse) -> Result<bool, PassportError> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(response.is_success())
}

fn upload<S: ObjectStore>(store: S, bucket: &str, request: &ProxyRequest) -> Result<bool, PassportError> {
    print_response(&UploadHandler::new(store, bucket).handle(request))
}

fn extract<S: ObjectStore, A: FormAnalyzer>(
    store: S,
    analyzer: A,
    config: &Config,
    extractor: PassportExtractor,
    event: &StorageEvent,
) -> Result<bool, PassportError> {
    let database = SqlDatabase::from_connection_string(config.db_connection_string()?)?;
    let mut handler = ExtractionHandler::new(store, analyzer, database, extractor);
    if let Some(table) = config.db_table_name.as_deref() {
        handler = handler.with_table(table);
    }
    print_response(&handler.handle(event))
}

fn run(cli: Cli) -> Result<bool, PassportError> {
    let mut config = Config::from_env();
    config.field_mappings_path = cli.field_mappings.or(config.field_mappings_path);
    let mappings = config.field_mappings()?;
    let extractor = PassportExtractor::new(&mappings);

    #[cfg(feature = "aws")]
    let aws = if cli.aws {
        Some(passport_forms::storage::AwsContext::load()?)
    } else {
        None
    };

    match cli.command {
        Command::Upload { event, bucket } => {
            config.bucket_name = bucket.or(config.bucket_name);
            let request: ProxyRequest = read_json(&event)?;
            let bucket = config.bucket_name()?;

            #[cfg(feature = "aws")]
            if let Some(context) = &aws {
                return upload(passport_forms::storage::S3ObjectStore::new(context), bucket, &request);
            }
            upload(FsObjectStore::new(&cli.storage_root), bucket, &request)
        }
        Command::Extract {
            event,
            db_connection_string,
            table,
        } => {
            config.db_connection_string = db_connection_string.or(config.db_connection_string);
            config.db_table_name = table.or(config.db_table_name);
            let event: StorageEvent = read_json(&event)?;

            #[cfg(feature = "aws")]
            if let Some(context) = &aws {
                return extract(
                    passport_forms::storage::S3ObjectStore::new(context),
                    passport_forms::storage::TextractFormAnalyzer::new(context),
                    &config,
                    extractor,
                    &event,
                );
            }
            extract(
                FsObjectStore::new(&cli.storage_root),
                SavedResponseAnalyzer::new(&cli.analysis_root),
                &config,
                extractor,
                &event,
            )
        }
        Command::Resolve {
            analysis,
            nationality,
        } => {
            let nodes = SavedResponseAnalyzer::load_response(analysis)?.into_nodes();
            let record = extractor.extract(&nodes, &nationality)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{}", err);
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
