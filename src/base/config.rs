//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::base::prompts;

use super::types::Res;

/// Default base URL of Gemini's OpenAI-compatible API.
fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

/// Default Gemini model to call.
fn default_gemini_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

/// Default persona directive placed before each question.
fn default_system_directive() -> String {
    prompts::STUDY_GROUP_DIRECTIVE.to_string()
}

/// Default Firestore database id.
fn default_firestore_database() -> String {
    "(default)".to_string()
}

/// Default deployment region (co-located with the Firestore database).
fn default_region() -> String {
    "asia-southeast1".to_string()
}

/// Default bind address.
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Default port (Cloud Run passes `PORT`).
fn default_port() -> u16 {
    8080
}

/// Configuration for the study bot.
#[derive(Debug, Clone)]
pub struct Config {
    /// The shared settings.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

/// Settings, read from the environment or a TOML file.
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Gemini API key (`GEMINI_API_KEY`).
    /// When absent, replies explain that the bot is not configured.
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible Gemini endpoint (`GEMINI_API_BASE`).
    #[serde(default = "default_gemini_api_base")]
    pub gemini_api_base: String,
    /// Model id sent with each request (`GEMINI_MODEL`).
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    /// Optional custom persona directive to override the default (`SYSTEM_DIRECTIVE`).
    #[serde(default = "default_system_directive")]
    pub system_directive: String,
    /// Google Cloud project that owns the Firestore database (`FIRESTORE_PROJECT_ID`).
    pub firestore_project_id: String,
    /// Firestore database id (`FIRESTORE_DATABASE`).
    #[serde(default = "default_firestore_database")]
    pub firestore_database: String,
    /// `host:port` of a Firestore emulator (`FIRESTORE_EMULATOR_HOST`).
    #[serde(default)]
    pub firestore_emulator_host: Option<String>,
    /// Static OAuth access token for Firestore (`FIRESTORE_ACCESS_TOKEN`).
    /// Without one, tokens come from the metadata server.
    #[serde(default)]
    pub firestore_access_token: Option<String>,
    /// Region the service is deployed to (`REGION`).
    #[serde(default = "default_region")]
    pub region: String,
    /// Address to listen on (`BIND_ADDRESS`).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port to listen on (`PORT`).
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_api_base: default_gemini_api_base(),
            gemini_model: default_gemini_model(),
            system_directive: default_system_directive(),
            firestore_project_id: String::new(),
            firestore_database: default_firestore_database(),
            firestore_emulator_host: None,
            firestore_access_token: None,
            region: default_region(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load from the environment (after reading `.env`, if any), then the
    /// explicit config file or `.hidden/config.toml`.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        // A missing `.env` is the normal case in production.
        let _ = dotenvy::dotenv();

        let mut cfg = config::Config::builder().add_source(config::Environment::default());

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let mut inner: ConfigInner = cfg.build()?.try_deserialize()?;

        // Blank secrets count as unset.
        if inner.gemini_api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            inner.gemini_api_key = None;
        }

        if inner.firestore_access_token.as_deref().is_some_and(|token| token.trim().is_empty()) {
            inner.firestore_access_token = None;
        }

        if inner.firestore_project_id.trim().is_empty() {
            return Err(anyhow::anyhow!("Firestore project id must be set."));
        }

        if inner.port == 0 {
            return Err(anyhow::anyhow!("Port must be non-zero."));
        }

        Ok(inner.into())
    }

    /// Whether a Gemini API key is available.
    pub fn has_gemini_api_key(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

// Tests.
