//! Runtime services and shared state for the study bot.

use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{db::DbClient, llm::LlmClient, trigger},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the database client, LLM client, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The database client instance.
    pub db: DbClient,
    /// The LLM client instance.
    pub llm: LlmClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the database.
        let db = DbClient::firestore(&config)?;

        // Initialize the LLM client.
        if !config.has_gemini_api_key() {
            warn!("GEMINI_API_KEY is not set; mentions will be answered with a configuration notice.");
        }

        let llm = LlmClient::gemini(&config);

        info!("Runtime initialized for project `{}`.", config.firestore_project_id);

        Ok(Self { config, db, llm })
    }

    /// Serve trigger deliveries until shutdown.
    pub async fn start(&self) -> Void {
        trigger::serve(self.clone()).await
    }
}
