use crate::config::validate_table_name;
use crate::models::ResolvedRecord;
use crate::utils::PassportError;
use log::debug;
use postgres::NoTls;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Columns written for every processed passport, in bind order.
pub const PASSPORT_COLUMNS: [&str; 5] = ["first_name", "last_name", "dob", "nationality", "pob"];

/// One persisted row: `first_name, last_name, dob, nationality, pob`, all nullable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassportRow {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub nationality: Option<String>,
    pub pob: Option<String>,
}

impl From<&ResolvedRecord> for PassportRow {
    fn from(record: &ResolvedRecord) -> Self {
        PassportRow {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            dob: record.dob.clone(),
            nationality: record.nationality.clone(),
            pob: record.pob.clone(),
        }
    }
}

/// `INSERT INTO <table>(first_name, ..., pob) VALUES(<p>1, ..., <p>5)`.
///
/// Only the table name is interpolated; callers validate it first.
pub fn insert_statement(table: &str, placeholder_prefix: &str) -> String {
    let placeholders: Vec<String> = (1..=PASSPORT_COLUMNS.len())
        .map(|i| format!("{}{}", placeholder_prefix, i))
        .collect();
    format!(
        "INSERT INTO {}({}) VALUES({})",
        table,
        PASSPORT_COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

/// Source of scoped connections. A connection is released when it is dropped.
pub trait Database {
    type Connection: Connection;

    fn connect(&self) -> Result<Self::Connection, PassportError>;
}

pub trait Connection {
    fn insert_record(&mut self, table: &str, record: &ResolvedRecord) -> Result<(), PassportError>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn insert_record(&mut self, table: &str, record: &ResolvedRecord) -> Result<(), PassportError> {
        (**self).insert_record(table, record)
    }
}

/// PostgreSQL, addressed by a libpq-style connection string.
pub struct PostgresDatabase {
    connection_string: String,
}

impl PostgresDatabase {
    pub fn new(connection_string: &str) -> Self {
        PostgresDatabase {
            connection_string: connection_string.to_string(),
        }
    }
}

impl Database for PostgresDatabase {
    type Connection = PostgresConnection;

    fn connect(&self) -> Result<PostgresConnection, PassportError> {
        let client = postgres::Client::connect(&self.connection_string, NoTls)
            .map_err(|e| PassportError::DatabaseError(format!("Failed to connect: {}", e)))?;
        debug!("Opened PostgreSQL connection");
        Ok(PostgresConnection { client })
    }
}

pub struct PostgresConnection {
    client: postgres::Client,
}

impl Connection for PostgresConnection {
    fn insert_record(&mut self, table: &str, record: &ResolvedRecord) -> Result<(), PassportError> {
        validate_table_name(table)?;
        let row = PassportRow::from(record);
        self.client
            .execute(
                insert_statement(table, "$").as_str(),
                &[&row.first_name, &row.last_name, &row.dob, &row.nationality, &row.pob],
            )
            .map_err(|e| PassportError::DatabaseError(format!("Insert into {} failed: {}", table, e)))?;
        Ok(())
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        debug!("Released PostgreSQL connection");
    }
}

/// SQLite database file, or an in-memory database for `:memory:`.
pub struct SqliteDatabase {
    path: PathBuf,
}

impl SqliteDatabase {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        SqliteDatabase { path: path.into() }
    }
}

impl Database for SqliteDatabase {
    type Connection = SqliteConnection;

    fn connect(&self) -> Result<SqliteConnection, PassportError> {
        let conn = rusqlite::Connection::open(&self.path).map_err(|e| {
            PassportError::DatabaseError(format!("Failed to open {}: {}", self.path.display(), e))
        })?;
        debug!("Opened SQLite connection at {}", self.path.display());
        Ok(SqliteConnection { conn })
    }
}

pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl Connection for SqliteConnection {
    fn insert_record(&mut self, table: &str, record: &ResolvedRecord) -> Result<(), PassportError> {
        validate_table_name(table)?;
        let row = PassportRow::from(record);
        self.conn
            .execute(
                &insert_statement(table, "?"),
                rusqlite::params![row.first_name, row.last_name, row.dob, row.nationality, row.pob],
            )
            .map_err(|e| PassportError::DatabaseError(format!("Insert into {} failed: {}", table, e)))?;
        Ok(())
    }
}

/// Backend chosen from the connection string: `sqlite://<path>` (or
/// `sqlite::memory:`) selects SQLite, anything else is handed to PostgreSQL.
pub enum SqlDatabase {
    Postgres(PostgresDatabase),
    Sqlite(SqliteDatabase),
}

impl SqlDatabase {
    pub fn from_connection_string(connection_string: &str) -> Result<Self, PassportError> {
        let connection_string = connection_string.trim();
        if connection_string.is_empty() {
            return Err(PassportError::InvalidConfiguration(
                "Database connection string is empty".to_string(),
            ));
        }

        if connection_string == "sqlite::memory:" {
            return Ok(SqlDatabase::Sqlite(SqliteDatabase::new(":memory:")));
        }
        match connection_string.strip_prefix("sqlite://") {
            Some("") => Err(PassportError::InvalidConfiguration(
                "SQLite connection string has no path".to_string(),
            )),
            Some(path) => Ok(SqlDatabase::Sqlite(SqliteDatabase::new(path))),
            None => Ok(SqlDatabase::Postgres(PostgresDatabase::new(connection_string))),
        }
    }
}

impl Database for SqlDatabase {
    type Connection = Box<dyn Connection>;

    fn connect(&self) -> Result<Box<dyn Connection>, PassportError> {
        let connection: Box<dyn Connection> = match self {
            SqlDatabase::Postgres(db) => Box::new(db.connect()?),
            SqlDatabase::Sqlite(db) => Box::new(db.connect()?),
        };
        Ok(connection)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Vec<PassportRow>>,
    open_connections: usize,
    total_connections: usize,
}

/// In-process database that also tracks connection lifecycle.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: &str) -> Vec<PassportRow> {
        self.state
            .lock()
            .map(|state| state.tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn open_connections(&self) -> usize {
        self.state.lock().map(|state| state.open_connections).unwrap_or(0)
    }

    pub fn total_connections(&self) -> usize {
        self.state.lock().map(|state| state.total_connections).unwrap_or(0)
    }
}

impl Database for MemoryDatabase {
    type Connection = MemoryConnection;

    fn connect(&self) -> Result<MemoryConnection, PassportError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| PassportError::DatabaseError("Database lock poisoned".to_string()))?;
        state.open_connections += 1;
        state.total_connections += 1;
        Ok(MemoryConnection {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

impl Connection for MemoryConnection {
    fn insert_record(&mut self, table: &str, record: &ResolvedRecord) -> Result<(), PassportError> {
        validate_table_name(table)?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| PassportError::DatabaseError("Database lock poisoned".to_string()))?;
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(PassportRow::from(record));
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.open_connections = state.open_connections.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CREATE_TABLE: &str = "CREATE TABLE passport_data (
        id INTEGER PRIMARY KEY,
        first_name TEXT, last_name TEXT, dob TEXT, nationality TEXT, pob TEXT
    )";

    fn record() -> ResolvedRecord {
        ResolvedRecord {
            first_name: Some("John".to_string()),
            last_name: Some("Doe".to_string()),
            dob: None,
            nationality: Some("British".to_string()),
            pob: Some("London".to_string()),
            nationality_code: "UK".to_string(),
        }
    }

    fn read_rows(path: &std::path::Path) -> Vec<PassportRow> {
        let conn = rusqlite::Connection::open(path).unwrap();
        let mut stmt = conn
            .prepare("SELECT first_name, last_name, dob, nationality, pob FROM passport_data ORDER BY id")
            .unwrap();
        let rows = stmt
            .query_map([], |row| {
                Ok(PassportRow {
                    first_name: row.get(0)?,
                    last_name: row.get(1)?,
                    dob: row.get(2)?,
                    nationality: row.get(3)?,
                    pob: row.get(4)?,
                })
            })
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        rows
    }

    #[test]
    fn test_insert_statement_binds_five_columns() {
        assert_eq!(
            insert_statement("passport_data", "$"),
            "INSERT INTO passport_data(first_name, last_name, dob, nationality, pob) VALUES($1, $2, $3, $4, $5)"
        );
        assert_eq!(
            insert_statement("p", "?"),
            "INSERT INTO p(first_name, last_name, dob, nationality, pob) VALUES(?1, ?2, ?3, ?4, ?5)"
        );
    }

    #[test]
    fn test_sqlite_insert_writes_all_five_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("passports.db");
        rusqlite::Connection::open(&path).unwrap().execute(CREATE_TABLE, []).unwrap();

        let db = SqlDatabase::from_connection_string(&format!("sqlite://{}", path.display())).unwrap();
        {
            let mut conn = db.connect().unwrap();
            conn.insert_record("passport_data", &record()).unwrap();
        }

        let rows = read_rows(&path);
        assert_eq!(
            rows,
            vec![PassportRow {
                first_name: Some("John".to_string()),
                last_name: Some("Doe".to_string()),
                dob: None,
                nationality: Some("British".to_string()),
                pob: Some("London".to_string()),
            }]
        );
    }

    #[test]
    fn test_sqlite_insert_into_missing_table_fails() {
        let dir = TempDir::new().unwrap();
        let db = SqliteDatabase::new(dir.path().join("empty.db"));
        let mut conn = db.connect().unwrap();
        assert!(matches!(
            conn.insert_record("passport_data", &record()),
            Err(PassportError::DatabaseError(_))
        ));
    }

    #[test]
    fn test_connection_string_selects_backend() {
        assert!(matches!(
            SqlDatabase::from_connection_string("postgres://user:pw@db.example:5432/passports"),
            Ok(SqlDatabase::Postgres(_))
        ));
        assert!(matches!(
            SqlDatabase::from_connection_string("host=localhost user=app"),
            Ok(SqlDatabase::Postgres(_))
        ));
        assert!(matches!(
            SqlDatabase::from_connection_string("sqlite:///var/lib/passports.db"),
            Ok(SqlDatabase::Sqlite(_))
        ));
        assert!(matches!(
            SqlDatabase::from_connection_string("sqlite::memory:"),
            Ok(SqlDatabase::Sqlite(_))
        ));
        assert!(SqlDatabase::from_connection_string("sqlite://").is_err());
        assert!(SqlDatabase::from_connection_string("  ").is_err());
    }

    #[test]
    fn test_unreachable_postgres_is_database_error() {
        let db = PostgresDatabase::new("postgres://user:pw@127.0.0.1:1/passports?connect_timeout=1");
        assert!(matches!(db.connect(), Err(PassportError::DatabaseError(_))));
    }

    #[test]
    fn test_rejects_unsafe_table_names() {
        let db = MemoryDatabase::new();
        let mut conn = db.connect().unwrap();
        assert!(conn.insert_record("passports; DROP TABLE x", &record()).is_err());
        assert!(conn.insert_record("passport_data", &record()).is_ok());
    }

    #[test]
    fn test_memory_connections_are_released_on_drop() {
        let db = MemoryDatabase::new();
        {
            let _first = db.connect().unwrap();
            let _second = db.connect().unwrap();
            assert_eq!(db.open_connections(), 2);
        }
        assert_eq!(db.open_connections(), 0);
        assert_eq!(db.total_connections(), 2);
    }
}
