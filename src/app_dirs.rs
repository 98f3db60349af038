use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "passfort";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `~/.local/state/passfort`, or the platform's local data dir when
    /// `HOME` is unset.
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("progress.db"))
    }

    /// Local copy of the progress records, used when the database is
    /// unavailable.
    pub fn local_progress_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("progress.json"))
    }

    pub fn history_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("log.csv"))
    }

    pub fn trace_log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("passfort.log"))
    }
}
