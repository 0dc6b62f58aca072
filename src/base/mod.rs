//! Core components, types, and utilities for the study bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - The persona prompt and fixed replies.
//! - The Firestore document model.
//! - Common types and result handling.

pub mod config;
pub mod document;
pub mod prompts;
pub mod types;
