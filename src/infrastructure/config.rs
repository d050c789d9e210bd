use std::env;
use std::path::{Path, PathBuf};

pub const DB_FILE_NAME: &str = "clefs.db";
pub const DOCUMENTS_DIR: &str = "documents";

#[derive(Clone, Debug)]
pub struct Config {
    pub db_path: PathBuf,
    pub documents_dir: PathBuf,
}

impl Config {
    /// `CLEFS_DB_PATH` and `CLEFS_DOCUMENTS_DIR`, falling back to defaults.
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        let db_path = env::var("CLEFS_DB_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let documents_dir = env::var("CLEFS_DOCUMENTS_DIR")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DOCUMENTS_DIR));

        Self {
            db_path,
            documents_dir,
        }
    }
}

/// `clefs.db` next to the executable. Binaries run from a cargo `target/`
/// directory use the working directory instead.
pub fn default_db_path() -> PathBuf {
    let exe = env::current_exe().ok();
    let cwd = env::current_dir().ok();
    db_path_for(exe.as_deref(), cwd.as_deref())
}

fn db_path_for(exe: Option<&Path>, cwd: Option<&Path>) -> PathBuf {
    let Some(exe) = exe else {
        return PathBuf::from(DB_FILE_NAME);
    };

    let in_build_dir = exe
        .ancestors()
        .any(|dir| dir.file_name().is_some_and(|name| name == "target"));

    if in_build_dir && let Some(cwd) = cwd {
        return cwd.join(DB_FILE_NAME);
    }

    exe.parent()
        .map(|dir| dir.join(DB_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
}
