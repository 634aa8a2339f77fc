//! Settings Models
//!
//! Host-side preference data persisted in preferences.json.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How the backend should compose answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Multi-step decomposed research process
    Decomposed,
    /// Single-pass answer
    Simple,
}

impl Default for ResponseMode {
    fn default() -> Self {
        Self::Decomposed
    }
}

/// User preferences.
///
/// Convenience state for UI hosts; never consulted by the session state
/// machine itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Preferred response composition mode
    #[serde(default)]
    pub response_mode: ResponseMode,
    /// Last selected profile id
    #[serde(default)]
    pub selected_profile: Option<String>,
    /// Last open conversation per profile id
    #[serde(default)]
    pub profile_conversations: HashMap<String, String>,
}

impl Preferences {
    /// Last open conversation for a profile
    pub fn conversation_for_profile(&self, profile_id: &str) -> Option<&str> {
        self.profile_conversations
            .get(profile_id)
            .map(String::as_str)
    }

    /// Remember the open conversation for a profile
    pub fn set_conversation_for_profile(
        &mut self,
        profile_id: impl Into<String>,
        conversation_id: impl Into<String>,
    ) {
        self.profile_conversations
            .insert(profile_id.into(), conversation_id.into());
    }

    /// Forget the open conversation for a profile
    pub fn clear_conversation_for_profile(&mut self, profile_id: &str) {
        self.profile_conversations.remove(profile_id);
    }
}
