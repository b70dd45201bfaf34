use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, Document, RawDocumentBuf};
use futures::{AsyncReadExt, AsyncWriteExt, TryStreamExt};
use mongodb::{
    gridfs::GridFsBucket,
    options::{ClientOptions, Hint},
    Client, Collection, IndexModel,
};
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, info};

use crate::document::FileRecord;
use crate::endpoint::TargetEndpoint;
use crate::error::{ConnectionError, StoreError};
use crate::operation::{DownloadMode, Filter, UploadMode};
use crate::store::{DataStore, StoreOutcome, StoreResult};

const UPLOAD_CHUNK_SIZE: u32 = 200_000;
const STREAM_READ_SIZE: usize = 1024;

fn set_updated() -> Document {
    doc! { "$set": { "updated": true } }
}

/// [`DataStore`] backed by the MongoDB async driver.
pub struct MongoStore {
    endpoint: String,
    client: Client,
    files: Collection<FileRecord>,
    bucket: GridFsBucket,
}

impl MongoStore {
    /// Builds a client for `endpoint`. The driver connects lazily, so reachability is only
    /// known after the first round trip ([`DataStore::ping`]).
    pub async fn connect(
        endpoint: &TargetEndpoint,
        selection_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let client_error = |source: mongodb::error::Error| ConnectionError::Client {
            endpoint: endpoint.name.clone(),
            source: source.into(),
        };

        let mut options = ClientOptions::parse(endpoint.uri()).await.map_err(client_error)?;
        options.app_name = Some("mongo-bench".to_string());
        options.server_selection_timeout = Some(selection_timeout);
        let client = Client::with_options(options).map_err(client_error)?;

        let files = client
            .database(&endpoint.database)
            .collection::<FileRecord>(&endpoint.collection);
        let bucket = client.database(&endpoint.blob_database).gridfs_bucket(None);

        info!(endpoint = %endpoint, "client created");
        Ok(MongoStore {
            endpoint: endpoint.name.clone(),
            client,
            files,
            bucket,
        })
    }

    fn raw(&self) -> Collection<RawDocumentBuf> {
        self.files.clone_with_type()
    }
}

#[async_trait]
impl DataStore for MongoStore {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn ping(&mut self) -> StoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    async fn insert_one(&mut self, record: &FileRecord) -> StoreResult<StoreOutcome> {
        self.files.insert_one(record).await?;
        Ok(StoreOutcome::documents(1))
    }

    async fn insert_many(&mut self, records: &[FileRecord]) -> StoreResult<StoreOutcome> {
        let result = self.files.insert_many(records).await?;
        Ok(StoreOutcome::documents(result.inserted_ids.len() as u64))
    }

    async fn update_one(&mut self, filter: &Filter) -> StoreResult<StoreOutcome> {
        let result = self
            .files
            .update_one(filter.to_document(), set_updated())
            .await?;
        Ok(StoreOutcome::documents(result.modified_count))
    }

    async fn update_many(&mut self, filter: &Filter) -> StoreResult<StoreOutcome> {
        let result = self
            .files
            .update_many(filter.to_document(), set_updated())
            .await?;
        Ok(StoreOutcome::documents(result.modified_count))
    }

    async fn delete_one(&mut self, filter: &Filter) -> StoreResult<StoreOutcome> {
        let result = self.files.delete_one(filter.to_document()).await?;
        Ok(StoreOutcome::documents(result.deleted_count))
    }

    async fn delete_many(&mut self, filter: &Filter) -> StoreResult<StoreOutcome> {
        let result = self.files.delete_many(filter.to_document()).await?;
        Ok(StoreOutcome::documents(result.deleted_count))
    }

    async fn drop_collection(&mut self) -> StoreResult<StoreOutcome> {
        self.files.drop().await?;
        Ok(StoreOutcome::default())
    }

    async fn find_one(&mut self, filter: &Filter, decode: bool) -> StoreResult<StoreOutcome> {
        let found = if decode {
            self.files.find_one(filter.to_document()).await?.is_some()
        } else {
            self.raw().find_one(filter.to_document()).await?.is_some()
        };
        Ok(StoreOutcome::documents(found as u64))
    }

    async fn find_many(
        &mut self,
        filter: &Filter,
        hint: Option<&str>,
        decode: bool,
    ) -> StoreResult<StoreOutcome> {
        let hint = hint.map(|field| Hint::Keys(doc! { field: 1 }));

        let count = if decode {
            let mut find = self.files.find(filter.to_document());
            if let Some(hint) = hint {
                find = find.hint(hint);
            }
            let records: Vec<FileRecord> = find.await?.try_collect().await?;
            records.len()
        } else {
            let raw = self.raw();
            let mut find = raw.find(filter.to_document());
            if let Some(hint) = hint {
                find = find.hint(hint);
            }
            let mut cursor = find.await?;
            let mut n = 0;
            while cursor.try_next().await?.is_some() {
                n += 1;
            }
            n
        };
        Ok(StoreOutcome::documents(count as u64))
    }

    async fn create_index(&mut self, field: &str) -> StoreResult<StoreOutcome> {
        let model = IndexModel::builder().keys(doc! { field: 1 }).build();
        let result = self.files.create_index(model).await?;
        debug!(index = %result.index_name, "index created");
        Ok(StoreOutcome::default())
    }

    async fn upload(
        &mut self,
        mode: UploadMode,
        filename: &str,
        source: &Path,
    ) -> StoreResult<StoreOutcome> {
        match mode {
            UploadMode::FromStream => {
                let file = tokio::fs::File::open(source).await?;
                let mut upload = self
                    .bucket
                    .open_upload_stream(filename)
                    .metadata(doc! { "metadata tag": "first" })
                    .await?;
                let length = futures::io::copy(file.compat(), &mut upload).await?;
                upload.close().await?;
                Ok(StoreOutcome::bytes(length))
            }
            UploadMode::OpenStream => {
                let content = tokio::fs::read(source).await?;
                let mut upload = self
                    .bucket
                    .open_upload_stream(filename)
                    .chunk_size_bytes(UPLOAD_CHUNK_SIZE)
                    .await?;
                upload.write_all(&content).await?;
                upload.close().await?;
                Ok(StoreOutcome::bytes(content.len() as u64))
            }
        }
    }

    async fn download(&mut self, mode: DownloadMode, filename: &str) -> StoreResult<StoreOutcome> {
        let mut stream = self.bucket.open_download_stream_by_name(filename).await?;
        let read = match mode {
            DownloadMode::ToBuffer => {
                let mut buffer = Vec::new();
                stream.read_to_end(&mut buffer).await?
            }
            DownloadMode::OpenStream => {
                let mut buffer = vec![0u8; STREAM_READ_SIZE];
                stream.read(&mut buffer).await?
            }
        };
        Ok(StoreOutcome::bytes(read as u64))
    }

    async fn drop_bucket(&mut self) -> StoreResult<StoreOutcome> {
        self.bucket.drop().await?;
        Ok(StoreOutcome::default())
    }

    async fn close(&mut self) -> StoreResult<()> {
        self.client.clone().shutdown().await;
        info!(endpoint = %self.endpoint, "client shut down");
        Ok(())
    }
}
