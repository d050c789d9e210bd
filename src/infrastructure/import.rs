//! Import from a database written by an older version of the application.
//!
//! Rows are merged by primary id with `INSERT OR IGNORE`: anything already
//! present in the current database wins. Rows whose parent is missing
//! (a room without its building, a loan without its key) are skipped.

use std::path::Path;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, FromQueryResult,
    Statement, TransactionTrait, Value,
};
use serde::Serialize;

use crate::domain::DomainError;
use crate::infrastructure::backup;
use crate::infrastructure::db::{self, Store};

/// Rows read from the legacy file and rows actually added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub read: u64,
    pub inserted: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub backup_path: std::path::PathBuf,
    pub buildings: TableCount,
    pub rooms: TableCount,
    pub keys: TableCount,
    pub associations: TableCount,
    pub borrowers: TableCount,
    pub loans: TableCount,
}

#[derive(Debug, FromQueryResult)]
struct LegacyBuilding {
    id: i32,
    name: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct LegacyRoom {
    id: i32,
    name: Option<String>,
    room_type: Option<String>,
    building_id: Option<i32>,
}

#[derive(Debug, FromQueryResult)]
struct LegacyKey {
    id: i32,
    number: Option<String>,
    description: Option<String>,
    quantity_total: Option<i32>,
    quantity_reserve: Option<i32>,
    storage_location: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct LegacyAssociation {
    key_id: i32,
    room_id: i32,
}

#[derive(Debug, FromQueryResult)]
struct LegacyBorrower {
    id: i32,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct LegacyLoan {
    id: i32,
    key_id: i32,
    borrower_id: i32,
    loan_date: Option<String>,
    return_date: Option<String>,
}

fn stmt(sql: &str) -> Statement {
    Statement::from_string(DbBackend::Sqlite, sql.to_owned())
}

async fn has_table(legacy: &DatabaseConnection, table: &str) -> Result<bool, DomainError> {
    let row = legacy
        .query_one(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            [Value::from(table)],
        ))
        .await?;
    Ok(row.is_some())
}

/// Rooms were called locations in the oldest schema
async fn room_tables(legacy: &DatabaseConnection) -> Result<(&'static str, &'static str), DomainError> {
    if has_table(legacy, "rooms").await? {
        Ok(("rooms", "SELECT key_id, room_id FROM key_room_association"))
    } else if has_table(legacy, "locations").await? {
        Ok((
            "locations",
            "SELECT key_id, location_id AS room_id FROM key_location_association",
        ))
    } else {
        Err(DomainError::Validation(
            "la base à importer ne contient ni salles ni emplacements".to_string(),
        ))
    }
}

async fn insert(
    txn: &DatabaseTransaction,
    sql: &str,
    values: Vec<Value>,
    count: &mut TableCount,
) -> Result<(), DomainError> {
    let result = txn
        .execute(Statement::from_sql_and_values(DbBackend::Sqlite, sql, values))
        .await?;
    count.read += 1;
    count.inserted += result.rows_affected();
    Ok(())
}

/// Merge a legacy database file into the open store.
///
/// A safety backup of the current file goes to `backups/` first. The whole
/// merge runs in one transaction.
pub async fn import_legacy_database(
    store: &Store,
    legacy_path: &Path,
) -> Result<ImportSummary, DomainError> {
    if !legacy_path.is_file() {
        return Err(DomainError::NotFound(format!(
            "base à importer {}",
            legacy_path.display()
        )));
    }

    let conn = store.conn()?;
    backup::create_backup_directory(store.path())?;
    let backup_path = backup::default_backup_path(store.path());
    backup::backup_database(store.path(), &backup_path)?;

    let (pool, legacy) = db::open_read_only(legacy_path).await?;
    let result = merge(conn, &legacy).await;
    pool.close().await;

    let mut summary = result?;
    summary.backup_path = backup_path;
    tracing::info!(
        "Importation réussie: {} bâtiments, {} salles, {} clés, {} associations, {} emprunteurs, {} emprunts",
        summary.buildings.inserted,
        summary.rooms.inserted,
        summary.keys.inserted,
        summary.associations.inserted,
        summary.borrowers.inserted,
        summary.loans.inserted
    );
    Ok(summary)
}

async fn merge(
    conn: &DatabaseConnection,
    legacy: &DatabaseConnection,
) -> Result<ImportSummary, DomainError> {
    let (room_table, association_query) = room_tables(legacy).await?;

    let buildings = LegacyBuilding::find_by_statement(stmt("SELECT id, name FROM buildings ORDER BY id"))
        .all(legacy)
        .await?;
    let rooms = LegacyRoom::find_by_statement(stmt(&format!(
        "SELECT id, name, type AS room_type, building_id FROM {room_table} ORDER BY id"
    )))
    .all(legacy)
    .await?;
    let keys = LegacyKey::find_by_statement(stmt(
        "SELECT id, number, description, quantity_total, quantity_reserve, storage_location \
         FROM keys ORDER BY id",
    ))
    .all(legacy)
    .await?;
    let associations = LegacyAssociation::find_by_statement(stmt(association_query))
        .all(legacy)
        .await?;
    let borrowers =
        LegacyBorrower::find_by_statement(stmt("SELECT id, name, email FROM borrowers ORDER BY id"))
            .all(legacy)
            .await?;
    let loans = LegacyLoan::find_by_statement(stmt(
        "SELECT id, key_id, borrower_id, loan_date, return_date FROM loans ORDER BY id",
    ))
    .all(legacy)
    .await?;

    let mut summary = ImportSummary::default();
    let txn = conn.begin().await?;

    for b in buildings {
        insert(
            &txn,
            "INSERT OR IGNORE INTO buildings (id, name) VALUES (?, ?)",
            vec![b.id.into(), b.name.unwrap_or_default().into()],
            &mut summary.buildings,
        )
        .await?;
    }

    for r in rooms {
        let building_id = r.building_id.unwrap_or_default();
        insert(
            &txn,
            "INSERT OR IGNORE INTO rooms (id, name, type, building_id) \
             SELECT ?, ?, ?, ? WHERE EXISTS (SELECT 1 FROM buildings WHERE id = ?)",
            vec![
                r.id.into(),
                r.name.unwrap_or_default().into(),
                r.room_type.into(),
                building_id.into(),
                building_id.into(),
            ],
            &mut summary.rooms,
        )
        .await?;
    }

    for k in keys {
        insert(
            &txn,
            "INSERT OR IGNORE INTO keys \
             (id, number, description, quantity_total, quantity_reserve, storage_location) \
             VALUES (?, ?, ?, ?, ?, ?)",
            vec![
                k.id.into(),
                k.number.unwrap_or_else(|| format!("K{}", k.id)).into(),
                k.description.into(),
                k.quantity_total.unwrap_or(1).into(),
                k.quantity_reserve.unwrap_or(0).into(),
                k.storage_location.into(),
            ],
            &mut summary.keys,
        )
        .await?;
    }

    for a in associations {
        insert(
            &txn,
            "INSERT OR IGNORE INTO key_room_association (key_id, room_id) \
             SELECT ?, ? WHERE EXISTS (SELECT 1 FROM keys WHERE id = ?) \
             AND EXISTS (SELECT 1 FROM rooms WHERE id = ?)",
            vec![
                a.key_id.into(),
                a.room_id.into(),
                a.key_id.into(),
                a.room_id.into(),
            ],
            &mut summary.associations,
        )
        .await?;
    }

    for b in borrowers {
        insert(
            &txn,
            "INSERT OR IGNORE INTO borrowers (id, name, email) VALUES (?, ?, ?)",
            vec![
                b.id.into(),
                b.name.unwrap_or_default().into(),
                b.email.filter(|e| !e.is_empty()).into(),
            ],
            &mut summary.borrowers,
        )
        .await?;
    }

    for l in loans {
        insert(
            &txn,
            "INSERT OR IGNORE INTO loans (id, key_id, borrower_id, loan_date, return_date) \
             SELECT ?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP), ? \
             WHERE EXISTS (SELECT 1 FROM keys WHERE id = ?) \
             AND EXISTS (SELECT 1 FROM borrowers WHERE id = ?)",
            vec![
                l.id.into(),
                l.key_id.into(),
                l.borrower_id.into(),
                l.loan_date.into(),
                l.return_date.filter(|d| !d.is_empty()).into(),
                l.key_id.into(),
                l.borrower_id.into(),
            ],
            &mut summary.loans,
        )
        .await?;
    }

    txn.commit().await?;
    Ok(summary)
}
