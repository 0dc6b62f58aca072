//! Firestore implementation of the message store, over the REST API.
//!
//! New messages are written with a single `documents:commit` so that
//! `createdAt` can be set to the server's request time in the same write.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::base::{
    config::Config,
    document::{Document, message_collection_path},
    types::{CREATED_AT_FIELD, NewMessage, Res},
};

use super::{DbClient, GenericDbClient};

const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1";
const METADATA_TOKEN_URL: &str = "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const EMULATOR_TOKEN: &str = "owner";

/// Tokens are refreshed this many seconds before they expire.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

// Extra methods on `DbClient` applied by the firestore implementation.

impl DbClient {
    /// Creates a Firestore-backed database client.
    pub fn firestore(config: &Config) -> Res<Self> {
        let client = FirestoreDbClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Wire types.

#[derive(Debug, Serialize)]
struct CommitRequest {
    writes: Vec<Write>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Write {
    update: Document,
    update_transforms: Vec<FieldTransform>,
    current_document: Option<Precondition>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldTransform {
    field_path: String,
    set_to_server_value: ServerValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ServerValue {
    RequestTime,
}

#[derive(Debug, Serialize)]
struct Precondition {
    exists: bool,
}

/// Response of the metadata server's token endpoint.
#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: i64,
}

// Access tokens.

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

enum TokenSource {
    /// A fixed token (configured, or the emulator's).
    Static(String),
    /// Tokens for the default service account, fetched from the metadata server.
    Metadata { url: String, cache: Mutex<Option<CachedToken>> },
}

impl TokenSource {
    fn metadata(url: impl Into<String>) -> Self {
        Self::Metadata {
            url: url.into(),
            cache: Mutex::new(None),
        }
    }

    async fn access_token(&self, http: &reqwest::Client) -> Res<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Metadata { url, cache } => {
                let mut cache = cache.lock().await;

                if let Some(token) = cache.as_ref()
                    && Utc::now() < token.refresh_at
                {
                    return Ok(token.value.clone());
                }

                debug!("Fetching access token from the metadata server ...");

                let response = http.get(url).header("Metadata-Flavor", "Google").send().await?;
                let status = response.status();

                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(anyhow!("Metadata server returned {status}: {body}"));
                }

                let token: MetadataToken = response.json().await?;
                let refresh_at = TimeDelta::try_seconds(token.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS))
                    .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                    .ok_or_else(|| anyhow!("Metadata server returned an invalid token lifetime: {}", token.expires_in))?;

                *cache = Some(CachedToken {
                    value: token.access_token.clone(),
                    refresh_at,
                });

                Ok(token.access_token)
            }
        }
    }
}

// Specific implementations.

/// Firestore database client implementation.
pub struct FirestoreDbClient {
    http: reqwest::Client,
    base_url: String,
    /// `projects/{project}/databases/{database}`.
    database_path: String,
    tokens: TokenSource,
}

impl FirestoreDbClient {
    /// Create a new Firestore client.
    #[instrument(name = "FirestoreDbClient::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        let http = reqwest::Client::builder().build()?;
        let database_path = format!("projects/{}/databases/{}", config.firestore_project_id, config.firestore_database);

        let (base_url, tokens) = if let Some(host) = &config.firestore_emulator_host {
            info!("Using the Firestore emulator at `{host}`.");
            (format!("http://{host}/v1"), TokenSource::Static(EMULATOR_TOKEN.to_string()))
        } else if let Some(token) = &config.firestore_access_token {
            (FIRESTORE_API_BASE.to_string(), TokenSource::Static(token.clone()))
        } else {
            (FIRESTORE_API_BASE.to_string(), TokenSource::metadata(METADATA_TOKEN_URL))
        };

        Ok(Self {
            http,
            base_url,
            database_path,
            tokens,
        })
    }

    fn commit_url(&self) -> String {
        format!("{}/{}/documents:commit", self.base_url, self.database_path)
    }

    fn document_name(&self, class_code: &str, group_id: &str, document_id: &str) -> String {
        format!("{}/documents/{}/{document_id}", self.database_path, message_collection_path(class_code, group_id))
    }
}

#[async_trait]
impl GenericDbClient for FirestoreDbClient {
    #[instrument(name = "FirestoreDbClient::append_message", skip(self, message))]
    async fn append_message(&self, class_code: &str, group_id: &str, message: &NewMessage) -> Res<String> {
        let document_id = Uuid::new_v4().simple().to_string();

        let request = CommitRequest {
            writes: vec![Write {
                update: Document {
                    name: Some(self.document_name(class_code, group_id, &document_id)),
                    fields: message.to_fields(),
                    ..Default::default()
                },
                update_transforms: vec![FieldTransform {
                    field_path: CREATED_AT_FIELD.to_string(),
                    set_to_server_value: ServerValue::RequestTime,
                }],
                current_document: Some(Precondition { exists: false }),
            }],
        };

        let token = self.tokens.access_token(&self.http).await?;
        let response = self.http.post(self.commit_url()).bearer_auth(token).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Firestore commit failed with {status}: {body}"));
        }

        info!("Message `{document_id}` appended.");

        Ok(document_id)
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::base::config::ConfigInner;

    const COMMIT_PATH: &str = "/v1/projects/demo/databases/(default)/documents:commit";

    fn create_emulator_config(host: String) -> Config {
        Config::from(ConfigInner {
            firestore_project_id: "demo".to_string(),
            firestore_emulator_host: Some(host),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_append_message_commits_document_with_server_timestamp() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", COMMIT_PATH)
            .match_header("authorization", "Bearer owner")
            .match_body(Matcher::PartialJson(json!({
                "writes": [{
                    "update": {
                        "fields": {
                            "text": { "stringValue": "4" },
                            "senderId": { "stringValue": "gemini_ai" },
                            "isAIMessage": { "booleanValue": true },
                            "aiModel": { "stringValue": "gemini-pro" },
                            "replyToMessageId": { "stringValue": "m1" },
                            "deletedBy": { "arrayValue": { "values": [] } }
                        }
                    },
                    "updateTransforms": [{ "fieldPath": "createdAt", "setToServerValue": "REQUEST_TIME" }],
                    "currentDocument": { "exists": false }
                }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "writeResults": [{ "updateTime": "2024-03-01T10:00:00Z" }], "commitTime": "2024-03-01T10:00:00Z" }).to_string())
            .create_async()
            .await;

        let client = DbClient::firestore(&create_emulator_config(server.host_with_port())).unwrap();
        let id = client.append_message("CS101", "g1", &NewMessage::ai_reply("4", "m1")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn test_append_message_reports_http_errors() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", COMMIT_PATH)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"Missing or insufficient permissions."}}"#)
            .create_async()
            .await;

        let client = DbClient::firestore(&create_emulator_config(server.host_with_port())).unwrap();
        let err = client.append_message("CS101", "g1", &NewMessage::fallback()).await.unwrap_err();

        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("insufficient permissions"));
    }

    #[tokio::test]
    async fn test_document_name_layout() {
        let client = FirestoreDbClient::new(&create_emulator_config("localhost:8080".to_string())).unwrap();

        assert_eq!(client.commit_url(), "http://localhost:8080/v1/projects/demo/databases/(default)/documents:commit");
        assert_eq!(client.document_name("CS101", "g1", "abc"), "projects/demo/databases/(default)/documents/classes/CS101/groups/g1/messages/abc");
    }

    #[tokio::test]
    async fn test_metadata_token_is_cached() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/token")
            .match_header("metadata-flavor", "Google")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "access_token": "ya29.test", "expires_in": 3599, "token_type": "Bearer" }).to_string())
            .expect(1)
            .create_async()
            .await;

        let http = reqwest::Client::new();
        let tokens = TokenSource::metadata(format!("{}/token", server.url()));

        assert_eq!(tokens.access_token(&http).await.unwrap(), "ya29.test");
        assert_eq!(tokens.access_token(&http).await.unwrap(), "ya29.test");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_metadata_token_with_invalid_lifetime() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "access_token": "ya29.test", "expires_in": i64::MAX, "token_type": "Bearer" }).to_string())
            .create_async()
            .await;

        let http = reqwest::Client::new();
        let tokens = TokenSource::metadata(format!("{}/token", server.url()));

        let err = tokens.access_token(&http).await.unwrap_err();
        assert!(err.to_string().contains("invalid token lifetime"));
    }

    #[tokio::test]
    async fn test_metadata_token_failure() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server.mock("GET", "/token").with_status(404).create_async().await;

        let http = reqwest::Client::new();
        let tokens = TokenSource::metadata(format!("{}/token", server.url()));

        assert!(tokens.access_token(&http).await.is_err());
    }
}
