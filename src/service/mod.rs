//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by the study bot:
//! - Database services (e.g., Firestore)
//! - LLM services (e.g., Gemini)
//! - The HTTP receiver for datastore triggers
//!
//! The database and LLM modules define both generic traits and concrete
//! implementations, allowing for extensibility and easy testing.

pub mod db;
pub mod llm;
pub mod trigger;
