//! Backup, restore and reset of the database file.
//!
//! Backups live in a `backups/` directory next to the database file and are
//! plain byte copies. The store uses a rollback journal, so the main file
//! holds every committed write and can be copied while open.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::domain::DomainError;
use crate::infrastructure::db::Store;

pub const BACKUP_DIR: &str = "backups";

/// One file of the backups directory
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Local>,
    pub size_str: String,
}

/// `YYYYMMDD_HHMMSS`, local time
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Sibling `backups/` directory of a database file
pub fn backup_dir(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(BACKUP_DIR)
}

/// `<dir of db>/backups/clefs_backup_<timestamp>.db`, with a `_<n>` suffix
/// when a backup of the same second already exists
pub fn default_backup_path(db_path: &Path) -> PathBuf {
    free_backup_path(&backup_dir(db_path), &timestamp())
}

fn free_backup_path(dir: &Path, stamp: &str) -> PathBuf {
    let first = dir.join(format!("clefs_backup_{stamp}.db"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("clefs_backup_{stamp}_{n}.db")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Same file on disk, whatever path was used to reach it
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

pub fn create_backup_directory(db_path: &Path) -> Result<PathBuf, DomainError> {
    let dir = backup_dir(db_path);
    fs::create_dir_all(&dir)
        .map_err(|e| DomainError::io("création du répertoire de sauvegarde", e))?;
    Ok(dir)
}

fn copy_synced(source: &Path, dest: &Path) -> io::Result<u64> {
    let mut reader = File::open(source)?;
    let mut writer = File::create(dest)?;
    let bytes = io::copy(&mut reader, &mut writer)?;
    writer.sync_all()?;
    Ok(bytes)
}

/// Copy `source` to `dest`, creating the destination directory.
pub fn backup_database(source: &Path, dest: &Path) -> Result<(), DomainError> {
    if !source.exists() {
        return Err(DomainError::Io(format!(
            "base de données introuvable : {}",
            source.display()
        )));
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| DomainError::io("création du répertoire de sauvegarde", e))?;
    }

    let bytes =
        copy_synced(source, dest).map_err(|e| DomainError::io("copie de la base de données", e))?;
    tracing::info!(
        "Sauvegarde créée: {} ({})",
        dest.display(),
        format_file_size(bytes)
    );
    Ok(())
}

/// Replace the store's file with `backup_path`, then reopen the store.
///
/// The current file, when present, is first copied to
/// `<path>.before_restore.<timestamp>`; that path is returned.
pub async fn restore_database(
    store: &mut Store,
    backup_path: &Path,
) -> Result<Option<PathBuf>, DomainError> {
    if !backup_path.is_file() {
        return Err(DomainError::NotFound(format!(
            "sauvegarde {}",
            backup_path.display()
        )));
    }

    let db_path = store.path().to_path_buf();
    if same_file(backup_path, &db_path) {
        return Err(DomainError::Validation(
            "la sauvegarde est la base de données courante".to_string(),
        ));
    }

    store.close().await?;

    let safety = if db_path.exists() {
        let mut name = db_path.clone().into_os_string();
        name.push(format!(".before_restore.{}", timestamp()));
        let safety = PathBuf::from(name);
        backup_database(&db_path, &safety)?;
        Some(safety)
    } else {
        None
    };

    copy_synced(backup_path, &db_path)
        .map_err(|e| DomainError::io("copie de la sauvegarde", e))?;

    store.open().await?;
    tracing::info!(
        "Base de données restaurée depuis {}",
        backup_path.display()
    );
    Ok(safety)
}

/// Back up into `backups/`, then start over with an empty database.
///
/// Returns the backup path. Nothing is deleted when the backup fails.
pub async fn reset_database(store: &mut Store) -> Result<PathBuf, DomainError> {
    let db_path = store.path().to_path_buf();

    create_backup_directory(&db_path)?;
    let backup_path = default_backup_path(&db_path);
    backup_database(&db_path, &backup_path)?;

    store.close().await?;

    match fs::remove_file(&db_path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(DomainError::io("suppression de la base de données", e)),
    }

    store.open().await?;
    tracing::warn!(
        "Base de données réinitialisée, sauvegarde: {}",
        backup_path.display()
    );
    Ok(backup_path)
}

/// Metadata of a single file
pub fn backup_info(path: &Path) -> Result<BackupInfo, DomainError> {
    let meta = fs::metadata(path).map_err(|e| DomainError::io("lecture de la sauvegarde", e))?;
    let modified = meta
        .modified()
        .map_err(|e| DomainError::io("date de la sauvegarde", e))?;

    Ok(BackupInfo {
        path: path.to_path_buf(),
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: meta.len(),
        modified: DateTime::<Local>::from(modified),
        size_str: format_file_size(meta.len()),
    })
}

/// `.db` files of the backups directory, newest first
pub fn list_backups(db_path: &Path) -> Result<Vec<BackupInfo>, DomainError> {
    let dir = backup_dir(db_path);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries =
        fs::read_dir(&dir).map_err(|e| DomainError::io("lecture du répertoire de sauvegarde", e))?;

    let mut backups = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "db") {
            continue;
        }
        match backup_info(&path) {
            Ok(info) => backups.push(info),
            Err(e) => tracing::debug!("Sauvegarde ignorée {}: {}", path.display(), e),
        }
    }

    backups.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(backups)
}

/// Remove one backup. Only absolute paths inside a `backups` directory
/// are accepted, checked before touching the filesystem.
pub fn delete_backup(path: &Path) -> Result<(), DomainError> {
    if !path.is_absolute() {
        return Err(DomainError::Validation(
            "le chemin doit être absolu".to_string(),
        ));
    }

    let in_backup_dir = path
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|name| name == BACKUP_DIR);
    if !in_backup_dir {
        return Err(DomainError::Validation(
            "le fichier doit être dans le dossier 'backups'".to_string(),
        ));
    }

    if !path.is_file() {
        return Err(DomainError::NotFound(format!("sauvegarde {}", path.display())));
    }

    fs::remove_file(path).map_err(|e| DomainError::io("suppression de la sauvegarde", e))?;
    tracing::info!("Sauvegarde supprimée: {}", path.display());
    Ok(())
}

/// Human readable size, base 1024
pub fn format_file_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    let prefix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn delete_outside_backups_is_rejected() {
        let err = delete_backup(Path::new("/data/clefs.db")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = delete_backup(Path::new("backups/clefs_backup.db")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn delete_missing_backup_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(BACKUP_DIR).join("absent.db");
        assert!(matches!(
            delete_backup(&path),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn listing_keeps_only_db_files() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("clefs.db");
        assert!(list_backups(&db_path).unwrap().is_empty());

        let backups = create_backup_directory(&db_path).unwrap();
        fs::write(backups.join("a.db"), b"abc").unwrap();
        fs::write(backups.join("notes.txt"), b"x").unwrap();

        let listed = list_backups(&db_path).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "a.db");
        assert_eq!(listed[0].size, 3);
        assert_eq!(listed[0].size_str, "3 B");
    }

    #[test]
    fn default_path_sits_in_backups() {
        let path = default_backup_path(Path::new("/srv/clefs/clefs.db"));
        assert_eq!(path.parent(), Some(Path::new("/srv/clefs/backups")));
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("clefs_backup_"));
        assert!(name.ends_with(".db"));
    }

    #[test]
    fn taken_backup_name_gets_a_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = "20240301_120000";

        let first = free_backup_path(dir.path(), stamp);
        assert_eq!(first, dir.path().join("clefs_backup_20240301_120000.db"));
        fs::write(&first, b"data").unwrap();

        let second = free_backup_path(dir.path(), stamp);
        assert_eq!(second, dir.path().join("clefs_backup_20240301_120000_1.db"));
        fs::write(&second, b"").unwrap();

        let third = free_backup_path(dir.path(), stamp);
        assert_eq!(third, dir.path().join("clefs_backup_20240301_120000_2.db"));
        assert_eq!(fs::read(&first).unwrap(), b"data");
    }
}
