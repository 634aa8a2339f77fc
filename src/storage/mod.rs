//! Storage Layer
//!
//! Local persistence: the JSON preferences file. Conversation and
//! invocation persistence lives behind the backend collaborators.

pub mod prefs;

pub use prefs::*;
