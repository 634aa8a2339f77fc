//! Integration Tests Module
//!
//! End-to-end tests for the session core against scripted in-memory
//! collaborators: submission lifecycle, stream reconciliation,
//! cancellation, and the polling fallback.

// Scripted mock collaborators shared by the tests
mod support;


// Polling fallback and conversation resume tests
mod polling_test;
