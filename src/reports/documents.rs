use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::DomainError;
use crate::infrastructure::backup::timestamp;

pub fn ensure_documents_dir(dir: &Path) -> Result<(), DomainError> {
    fs::create_dir_all(dir).map_err(|e| DomainError::io("création du dossier documents", e))
}

/// `<prefix>_<id>_<timestamp>.<ext>`, or `<prefix>_<timestamp>.<ext>` without an id
pub fn generate_filename(prefix: &str, id: Option<i32>, ext: &str) -> String {
    match id {
        Some(id) if id > 0 => format!("{prefix}_{id}_{}.{ext}", timestamp()),
        _ => format!("{prefix}_{}.{ext}", timestamp()),
    }
}

/// Write a document into `dir` and return its full path
pub fn save_document(dir: &Path, filename: &str, contents: &str) -> Result<PathBuf, DomainError> {
    ensure_documents_dir(dir)?;
    let path = dir.join(filename);
    fs::write(&path, contents).map_err(|e| DomainError::io("écriture du document", e))?;
    tracing::info!("Document enregistré: {}", path.display());
    Ok(path)
}
