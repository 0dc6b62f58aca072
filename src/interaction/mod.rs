//! Event handling for the study bot.
//!
//! This module turns datastore events into replies:
//! - Detecting @-mentions and extracting the question
//! - Generating a response from the LLM
//! - Storing the reply (or a fallback apology) in the group chat

pub mod mention;
pub mod message_created;
pub mod response;
