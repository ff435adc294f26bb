use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Default log file location, `~/.local/state/typist/typist.log` when
    /// `HOME` is set
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("typist");
            Some(state_dir.join("typist.log"))
        } else {
            ProjectDirs::from("", "", "typist")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("typist.log"))
        }
    }
}
