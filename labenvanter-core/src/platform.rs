//! Platform-specific paths for application data.

use std::path::PathBuf;

/// Get the platform-specific directory for the saved inventory state.
pub fn get_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".data")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("LabEnvanter")
}

/// Make sure the data directory exists.
pub fn ensure_data_dir() -> std::io::Result<()> {
    std::fs::create_dir_all(get_data_dir())
}

/// Default path of the state database.
pub fn get_default_state_path() -> PathBuf {
    get_data_dir().join("state.db")
}
