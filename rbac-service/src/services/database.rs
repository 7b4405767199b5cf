use crate::models::{Membership, Organization};
use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", uri, e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for rbac-service");

        let memberships = self.memberships();

        // A subject belongs to at most one organization.
        let subject_index = IndexModel::builder()
            .keys(doc! { "subject_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("subject_lookup".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        memberships
            .create_index(subject_index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create subject_id index on memberships collection: {}",
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on memberships.subject_id");

        // Org-scoped user listing and the delete cascade both filter on org_id.
        let org_index = IndexModel::builder()
            .keys(doc! { "org_id": 1 })
            .options(IndexOptions::builder().name("org_lookup".to_string()).build())
            .build();

        memberships.create_index(org_index, None).await.map_err(|e| {
            tracing::error!(
                "Failed to create org_id index on memberships collection: {}",
                e
            );
            AppError::from(e)
        })?;
        tracing::info!("Created index on memberships.org_id");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    /// Removes every membership of the given organization. Called after the
    /// organization document itself is deleted; the two deletes are not
    /// atomic, a crash in between leaves orphaned memberships.
    pub async fn delete_org_memberships(&self, org_id: &str) -> Result<u64, AppError> {
        let result = self
            .memberships()
            .delete_many(doc! { "org_id": org_id }, None)
            .await?;
        Ok(result.deleted_count)
    }

    pub fn organizations(&self) -> Collection<Organization> {
        self.db.collection("organizations")
    }

    pub fn memberships(&self) -> Collection<Membership> {
        self.db.collection("memberships")
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
