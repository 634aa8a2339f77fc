//! Cross-Platform Path Utilities
//!
//! Functions for resolving application directories across platforms.

use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Deep Research directory (~/.deep-research/)
pub fn deep_research_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".deep-research"))
}

/// Get the preferences file path (~/.deep-research/preferences.json)
pub fn preferences_path() -> AppResult<PathBuf> {
    Ok(deep_research_dir()?.join("preferences.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &PathBuf) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the Deep Research directory, creating if it doesn't exist
pub fn ensure_deep_research_dir() -> AppResult<PathBuf> {
    let path = deep_research_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
