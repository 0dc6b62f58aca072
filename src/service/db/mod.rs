pub mod firestore;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{NewMessage, Res};

// Traits.

/// Generic database client trait that clients must implement.
///
/// The bot only ever appends: existing message documents are never read
/// back, updated, or deleted.
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Appends `message` to `classes/{class_code}/groups/{group_id}/messages`.
    ///
    /// The store assigns `createdAt` at write time. Returns the id of the new document.
    async fn append_message(&self, class_code: &str, group_id: &str, message: &NewMessage) -> Res<String>;
}

/// Database client for the study bot.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}
