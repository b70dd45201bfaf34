use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use crate::document::FileRecord;
use crate::error::StoreError;
use crate::operation::{DownloadMode, Filter, UploadMode};

pub type StoreResult<T> = Result<T, StoreError>;

/// What a single store call touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreOutcome {
    /// Documents written, modified, deleted or returned.
    pub documents: u64,
    /// Payload bytes moved by blob calls.
    pub bytes: u64,
}

impl StoreOutcome {
    pub fn documents(documents: u64) -> Self {
        StoreOutcome { documents, bytes: 0 }
    }

    pub fn bytes(bytes: u64) -> Self {
        StoreOutcome { documents: 0, bytes }
    }
}

/// The database client a session drives. Every call is one round trip to the server.
///
/// Implementations select their database, collection and blob bucket when they are built;
/// the runner never changes them mid-session.
#[async_trait]
pub trait DataStore: Send {
    /// Endpoint name, for logs and errors.
    fn name(&self) -> &str;

    async fn ping(&mut self) -> StoreResult<()>;

    async fn insert_one(&mut self, record: &FileRecord) -> StoreResult<StoreOutcome>;

    async fn insert_many(&mut self, records: &[FileRecord]) -> StoreResult<StoreOutcome>;

    /// Sets `updated: true` on the first match.
    async fn update_one(&mut self, filter: &Filter) -> StoreResult<StoreOutcome>;

    /// Sets `updated: true` on every match.
    async fn update_many(&mut self, filter: &Filter) -> StoreResult<StoreOutcome>;

    async fn delete_one(&mut self, filter: &Filter) -> StoreResult<StoreOutcome>;

    async fn delete_many(&mut self, filter: &Filter) -> StoreResult<StoreOutcome>;

    async fn drop_collection(&mut self) -> StoreResult<StoreOutcome>;

    /// With `decode` the document is deserialized into a [`FileRecord`], otherwise it is
    /// left as raw BSON.
    async fn find_one(&mut self, filter: &Filter, decode: bool) -> StoreResult<StoreOutcome>;

    async fn find_many(
        &mut self,
        filter: &Filter,
        hint: Option<&str>,
        decode: bool,
    ) -> StoreResult<StoreOutcome>;

    /// Ascending single-field index.
    async fn create_index(&mut self, field: &str) -> StoreResult<StoreOutcome>;

    async fn upload(
        &mut self,
        mode: UploadMode,
        filename: &str,
        source: &Path,
    ) -> StoreResult<StoreOutcome>;

    async fn download(&mut self, mode: DownloadMode, filename: &str) -> StoreResult<StoreOutcome>;

    async fn drop_bucket(&mut self) -> StoreResult<StoreOutcome>;

    /// Releases the connection.
    async fn close(&mut self) -> StoreResult<()>;
}
