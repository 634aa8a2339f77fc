//! JSON Preference Management
//!
//! Handles reading and writing the preferences file: the selected profile,
//! the response mode, and the last-open conversation per profile. Host
//! convenience state only; the session state machine never consults it.

use std::fs;
use std::path::PathBuf;

use crate::models::settings::{Preferences, ResponseMode};
use crate::utils::error::AppResult;
use crate::utils::paths::{ensure_deep_research_dir, preferences_path};

/// Preference service backed by a JSON file
#[derive(Debug)]
pub struct PreferencesService {
    path: PathBuf,
    prefs: Preferences,
}

impl PreferencesService {
    /// Create a preferences service, loading existing preferences or
    /// creating defaults at the standard location.
    pub fn new() -> AppResult<Self> {
        ensure_deep_research_dir()?;
        Self::with_path(preferences_path()?)
    }

    /// Create a preferences service backed by a specific file
    pub fn with_path(path: PathBuf) -> AppResult<Self> {
        let prefs = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            let defaults = Preferences::default();
            Self::save_to_file(&path, &defaults)?;
            defaults
        };

        Ok(Self { path, prefs })
    }

    fn load_from_file(path: &PathBuf) -> AppResult<Preferences> {
        let content = fs::read_to_string(path)?;
        let prefs: Preferences = serde_json::from_str(&content)?;
        Ok(prefs)
    }

    fn save_to_file(path: &PathBuf, prefs: &Preferences) -> AppResult<()> {
        let content = serde_json::to_string_pretty(prefs)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current preferences
    pub fn get(&self) -> &Preferences {
        &self.prefs
    }

    /// Set the response mode and persist
    pub fn set_response_mode(&mut self, mode: ResponseMode) -> AppResult<()> {
        self.prefs.response_mode = mode;
        self.save()
    }

    /// Set the selected profile and persist
    pub fn set_selected_profile(&mut self, profile_id: impl Into<String>) -> AppResult<()> {
        self.prefs.selected_profile = Some(profile_id.into());
        self.save()
    }

    /// Remember the open conversation for a profile and persist
    pub fn set_conversation_for_profile(
        &mut self,
        profile_id: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> AppResult<()> {
        self.prefs
            .set_conversation_for_profile(profile_id, conversation_id);
        self.save()
    }

    /// Forget the open conversation for a profile and persist
    pub fn clear_conversation_for_profile(&mut self, profile_id: &str) -> AppResult<()> {
        self.prefs.clear_conversation_for_profile(profile_id);
        self.save()
    }

    /// Save the current preferences to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.path, &self.prefs)
    }

    /// Reload preferences from disk
    pub fn reload(&mut self) -> AppResult<()> {
        self.prefs = Self::load_from_file(&self.path)?;
        Ok(())
    }
}
