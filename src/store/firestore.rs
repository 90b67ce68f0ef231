// SPDX-License-Identifier: MIT

//! Firestore-backed document store.
//!
//! Production implementation of [`DocumentStore`]. Documents cross this
//! boundary as opaque JSON objects; the sync service owns the typed
//! mapping.
//!
//! For local development and tests, set `FIRESTORE_EMULATOR_HOST` to talk
//! to the emulator with an unauthenticated connection.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Result, SyncError};
use crate::store::DocumentStore;

/// Firestore client wrapper.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Connect to Firestore for the given project.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use an unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::connect_emulator(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| remote_err(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Connect to the Firestore emulator with a dummy token source.
    async fn connect_emulator(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| remote_err(format!("Failed to connect to Firestore Emulator: {}", e)))?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }
}

fn remote_err(message: impl Into<String>) -> SyncError {
    SyncError::remote("firestore", message)
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| remote_err(e.to_string()))
    }

    async fn set_document(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(&data)
            .execute()
            .await
            .map_err(|e| remote_err(e.to_string()))?;
        Ok(())
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<()> {
        let fields: Vec<String> = patch.keys().cloned().collect();
        let data = Value::Object(patch);

        let _: () = self
            .client
            .fluent()
            .update()
            .fields(fields)
            .in_col(collection)
            .document_id(id)
            .object(&data)
            .execute()
            .await
            .map_err(|e| remote_err(e.to_string()))?;
        Ok(())
    }
}
