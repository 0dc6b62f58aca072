//! Library root for `study-bot`.
//!
//! Study-bot answers questions in study-group chats stored in Firestore:
//! - Listens for newly created group messages
//! - Detects `@gemini` mentions
//! - Asks Gemini the question with a study-assistant persona
//! - Appends the answer (or an apology) to the same chat
//!
//! The datastore and the LLM sit behind traits so either can be swapped,
//! or mocked in tests.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the study-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with database and LLM clients
/// - Serves trigger deliveries until shutdown
pub async fn start(config: Config) -> Void {
    info!("Starting study-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install the rustls crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
