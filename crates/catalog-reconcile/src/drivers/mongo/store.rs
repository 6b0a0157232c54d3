//! MongoDB document store.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, FindOneOptions, FindOptions as MongoFindOptions};
use mongodb::{Client, Database};
use tracing::{debug, info};

use super::convert::{document_to_record, filter_to_document, projection_document, value_to_bson};
use crate::config::DocumentConfig;
use crate::core::{DocumentFilter, DocumentStore, FieldValue, FindOptions, Record, ID_FIELD};
use crate::error::{ReconcileError, Result};

/// Server selection timeout.
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// [`DocumentStore`] backed by the official MongoDB driver.
pub struct MongoDocumentStore {
    client: Client,
    database: Database,
}

impl MongoDocumentStore {
    /// Connect to the search index and verify the connection.
    pub async fn new(config: &DocumentConfig, max_conns: usize) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.url).await.map_err(|e| {
            ReconcileError::Config(format!("invalid document.url: {}", e))
        })?;
        options.max_pool_size = Some(max_conns.max(1) as u32);
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        options.app_name = Some("catalog-reconcile".to_string());

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);
        let store = Self { client, database };
        store.ping().await?;

        info!(
            "Connected to MongoDB database {} (max {} connections)",
            config.database, max_conns
        );

        Ok(store)
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        options: &FindOptions,
    ) -> Result<Vec<Record>> {
        let query = filter_to_document(filter);
        let limit = options
            .limit
            .map(|l| {
                i64::try_from(l).map_err(|_| {
                    ReconcileError::query_failed("document", format!("limit {} out of range", l))
                })
            })
            .transpose()?;

        let find_options = MongoFindOptions::builder()
            .projection(options.projection.as_deref().map(projection_document))
            .sort(
                options
                    .sort_ascending_by
                    .as_ref()
                    .map(|field| doc! { field.as_str(): 1 }),
            )
            .limit(limit)
            .build();

        debug!("MongoDB find on {}: {}", collection, query);
        let docs: Vec<Document> = self
            .database
            .collection::<Document>(collection)
            .find(query, find_options)
            .await?
            .try_collect()
            .await?;

        Ok(docs.into_iter().map(document_to_record).collect())
    }

    async fn find_one(
        &self,
        collection: &str,
        key: &FieldValue,
        projection: Option<&[&str]>,
    ) -> Result<Option<Record>> {
        let filter = doc! { ID_FIELD: value_to_bson(key) };
        let options = FindOneOptions::builder()
            .projection(projection.map(projection_document))
            .build();

        let doc = self
            .database
            .collection::<Document>(collection)
            .find_one(filter, options)
            .await?;

        Ok(doc.map(document_to_record))
    }

    async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "mongodb"
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}
