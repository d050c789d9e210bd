//! SQLite connection, schema and the owned store handle.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, SqlxSqliteConnector, Statement};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::domain::DomainError;

/// Open a database from a sqlx URL (`sqlite::memory:`, `sqlite://clefs.db?mode=rwc`)
/// and make sure the schema exists.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let options =
        SqliteConnectOptions::from_str(database_url).map_err(|e| DbErr::Custom(e.to_string()))?;
    let (_, db) = connect(options).await?;
    Ok(db)
}

async fn single_connection(options: SqliteConnectOptions) -> Result<SqlitePool, DbErr> {
    // One connection: in-memory databases live and die with it.
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| DbErr::Custom(e.to_string()))
}

async fn connect(
    options: SqliteConnectOptions,
) -> Result<(SqlitePool, DatabaseConnection), DbErr> {
    // Rollback journal keeps every committed write in the main file,
    // so a plain file copy is a complete backup.
    let options = options
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Delete);

    let pool = single_connection(options).await?;
    let db = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());
    run_migrations(&db).await?;

    Ok((pool, db))
}

/// Read-only connection to a foreign database file, schema untouched.
/// Close the returned pool when done.
pub async fn open_read_only(path: &Path) -> Result<(SqlitePool, DatabaseConnection), DbErr> {
    let options = SqliteConnectOptions::new().filename(path).read_only(true);
    let pool = single_connection(options).await?;
    let db = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());
    Ok((pool, db))
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        sql.to_owned(),
    ))
    .await?;
    Ok(())
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS buildings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS rooms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            type TEXT,
            building_id INTEGER NOT NULL,
            FOREIGN KEY (building_id) REFERENCES buildings(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            number TEXT UNIQUE NOT NULL,
            description TEXT,
            quantity_total INTEGER NOT NULL DEFAULT 1,
            quantity_reserve INTEGER NOT NULL DEFAULT 0,
            storage_location TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_keys_number ON keys(number);
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS borrowers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_borrowers_name ON borrowers(name);
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key_id INTEGER NOT NULL,
            borrower_id INTEGER NOT NULL,
            loan_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            return_date TEXT,
            FOREIGN KEY (key_id) REFERENCES keys(id) ON DELETE CASCADE,
            FOREIGN KEY (borrower_id) REFERENCES borrowers(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_loans_key_id ON loans(key_id);
        CREATE INDEX IF NOT EXISTS idx_loans_borrower_id ON loans(borrower_id);
        CREATE INDEX IF NOT EXISTS idx_loans_return_date ON loans(return_date);
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS key_room_association (
            key_id INTEGER NOT NULL,
            room_id INTEGER NOT NULL,
            PRIMARY KEY (key_id, room_id),
            FOREIGN KEY (key_id) REFERENCES keys(id) ON DELETE CASCADE,
            FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    Ok(())
}

/// Owned handle on the database file.
///
/// Lifecycle is Closed -> Open -> Closed -> Open. The file may only be
/// swapped (restore, reset) while the store is closed.
pub struct Store {
    path: PathBuf,
    pool: Option<SqlitePool>,
    conn: Option<DatabaseConnection>,
}

impl Store {
    /// A closed store pointing at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: None,
            conn: None,
        }
    }

    /// Create and open a store in one step
    pub async fn open_at(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let mut store = Self::new(path);
        store.open().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Closed -> Open. Creates the file and schema when missing.
    pub async fn open(&mut self) -> Result<(), DomainError> {
        if self.is_open() {
            return Err(DomainError::InvalidState(
                "la base de données est déjà ouverte".to_string(),
            ));
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);
        let (pool, conn) = connect(options).await?;

        self.pool = Some(pool);
        self.conn = Some(conn);
        tracing::info!("Base de données ouverte: {}", self.path.display());
        Ok(())
    }

    /// Open -> Closed. Closing a closed store does nothing.
    pub async fn close(&mut self) -> Result<(), DomainError> {
        self.conn = None;
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            tracing::info!("Base de données fermée: {}", self.path.display());
        }
        Ok(())
    }

    /// Connection of an open store
    pub fn conn(&self) -> Result<&DatabaseConnection, DomainError> {
        self.conn.as_ref().ok_or_else(|| {
            DomainError::InvalidState("la base de données est fermée".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::new(dir.path().join("clefs.db"));

        assert!(!store.is_open());
        assert!(matches!(store.conn(), Err(DomainError::InvalidState(_))));

        store.open().await.unwrap();
        assert!(store.path().exists());
        assert!(store.conn().is_ok());
        assert!(matches!(
            store.open().await,
            Err(DomainError::InvalidState(_))
        ));

        store.close().await.unwrap();
        assert!(!store.is_open());
        store.close().await.unwrap();

        store.open().await.unwrap();
        assert!(store.is_open());
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let db = init_db("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();
        run_migrations(&db).await.unwrap();
    }
}
