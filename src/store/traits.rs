use crate::model::{ActorIdentity, UserRecord};
use crate::store::error::BackendError;

/// Row as exchanged with the remote data service
pub type Row = serde_json::Value;

/// Equality filters, ordering and limit for a row listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<(String, String)>,
    pub order_by: Option<String>,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by = Some(column.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Row-oriented remote data service, one table per entity kind
#[async_trait::async_trait]
pub trait DataService: Send + Sync {
    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Row>, BackendError>;
    /// Insert a row and return it as stored (with server-assigned columns)
    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError>;
    /// Overwrite the given columns of the row matching `id`
    async fn update(&self, table: &str, row: Row, id: &str) -> Result<Row, BackendError>;
    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError>;
}

/// Blob storage used for entity photos
#[async_trait::async_trait]
pub trait StorageService: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError>;
    async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError>;
    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), BackendError>;
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Resolves a user id to the backend's user record
#[async_trait::async_trait]
pub trait UserLookup: Send + Sync {
    async fn lookup_user(&self, id: &str) -> Result<UserRecord, BackendError>;
}

/// Local persistence of the signed-in actor, owned by the auth layer
pub trait ActorSource: Send + Sync {
    fn current_actor(&self) -> Option<ActorIdentity>;
}

pub trait Backend: DataService + StorageService + Send + Sync {}
impl<T: DataService + StorageService + Send + Sync> Backend for T {}
