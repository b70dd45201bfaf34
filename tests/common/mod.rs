// In-memory DataStore used by the integration tests in place of a MongoDB server.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use mongo_bench::{
    DataStore, DownloadMode, FileRecord, Filter, StoreError, StoreOutcome, StoreResult,
    UploadMode,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Ping,
    InsertOne(String),
    InsertMany(usize),
    UpdateOne(Filter),
    UpdateMany(Filter),
    DeleteOne(Filter),
    DeleteMany(Filter),
    DropCollection,
    FindOne(Filter, bool),
    FindMany(Filter, Option<String>, bool),
    CreateIndex(String),
    Upload(UploadMode, String),
    Download(DownloadMode, String),
    DropBucket,
    Close,
}

#[derive(Debug, Default)]
pub struct Shared {
    pub calls: Vec<Call>,
    pub records: Vec<FileRecord>,
    pub indexes: Vec<String>,
    pub blobs: Vec<(String, Vec<u8>)>,
    collection_exists: bool,
}

/// Lets a test inspect the store after the runner has consumed it.
#[derive(Clone)]
pub struct Handle(Arc<Mutex<Shared>>);

impl Handle {
    pub fn lock(&self) -> MutexGuard<'_, Shared> {
        self.0.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }
}

pub struct MemoryStore {
    name: String,
    shared: Arc<Mutex<Shared>>,
    unreachable: bool,
    failing_close: bool,
    strict_drop: bool,
    failing: Vec<&'static str>,
    delays: HashMap<&'static str, Duration>,
}

impl MemoryStore {
    pub fn new(name: &str) -> (Self, Handle) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let store = MemoryStore {
            name: name.to_string(),
            shared: shared.clone(),
            unreachable: false,
            failing_close: false,
            strict_drop: false,
            failing: Vec::new(),
            delays: HashMap::new(),
        };
        (store, Handle(shared))
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.failing_close = true;
        self
    }

    /// Dropping a collection that does not exist fails with "ns not found".
    pub fn strict_drop(mut self) -> Self {
        self.strict_drop = true;
        self
    }

    /// Every call to `op` fails.
    pub fn failing(mut self, op: &'static str) -> Self {
        self.failing.push(op);
        self
    }

    /// Every call to `op` sleeps `delay` first.
    pub fn delay(mut self, op: &'static str, delay: Duration) -> Self {
        self.delays.insert(op, delay);
        self
    }

    async fn enter(&self, op: &'static str, call: Call) -> StoreResult<MutexGuard<'_, Shared>> {
        if let Some(delay) = self.delays.get(op) {
            tokio::time::sleep(*delay).await;
        }
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(call);
        if self.failing.contains(&op) {
            return Err(StoreError::other(format!("{} failed", op)));
        }
        Ok(shared)
    }
}

fn matches(filter: &Filter, record: &FileRecord) -> bool {
    match filter {
        Filter::All => true,
        Filter::Updated => record.updated,
        Filter::CountBelow(n) => record.count < *n,
        Filter::Id(id) => &record.id == id,
    }
}

fn insert(shared: &mut Shared, record: &FileRecord) -> StoreResult<()> {
    if shared.records.iter().any(|r| r.id == record.id) {
        return Err(StoreError::other(format!("E11000 duplicate key: {}", record.id)));
    }
    shared.records.push(record.clone());
    shared.collection_exists = true;
    Ok(())
}

#[async_trait]
impl DataStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&mut self) -> StoreResult<()> {
        self.enter("ping", Call::Ping).await?;
        if self.unreachable {
            return Err(StoreError::other("connection refused"));
        }
        Ok(())
    }

    async fn insert_one(&mut self, record: &FileRecord) -> StoreResult<StoreOutcome> {
        let mut shared = self.enter("insert_one", Call::InsertOne(record.id.clone())).await?;
        insert(&mut shared, record)?;
        Ok(StoreOutcome::documents(1))
    }

    async fn insert_many(&mut self, records: &[FileRecord]) -> StoreResult<StoreOutcome> {
        let mut shared = self.enter("insert_many", Call::InsertMany(records.len())).await?;
        for record in records {
            insert(&mut shared, record)?;
        }
        Ok(StoreOutcome::documents(records.len() as u64))
    }

    async fn update_one(&mut self, filter: &Filter) -> StoreResult<StoreOutcome> {
        let mut shared = self.enter("update_one", Call::UpdateOne(filter.clone())).await?;
        let modified = match shared.records.iter_mut().find(|r| matches(filter, r)) {
            Some(record) if !record.updated => {
                record.updated = true;
                1
            }
            _ => 0,
        };
        Ok(StoreOutcome::documents(modified))
    }

    async fn update_many(&mut self, filter: &Filter) -> StoreResult<StoreOutcome> {
        let mut shared = self.enter("update_many", Call::UpdateMany(filter.clone())).await?;
        let mut modified = 0;
        for record in shared.records.iter_mut().filter(|r| matches(filter, r)) {
            if !record.updated {
                record.updated = true;
                modified += 1;
            }
        }
        Ok(StoreOutcome::documents(modified))
    }

    async fn delete_one(&mut self, filter: &Filter) -> StoreResult<StoreOutcome> {
        let mut shared = self.enter("delete_one", Call::DeleteOne(filter.clone())).await?;
        match shared.records.iter().position(|r| matches(filter, r)) {
            Some(i) => {
                shared.records.remove(i);
                Ok(StoreOutcome::documents(1))
            }
            None => Ok(StoreOutcome::documents(0)),
        }
    }

    async fn delete_many(&mut self, filter: &Filter) -> StoreResult<StoreOutcome> {
        let mut shared = self.enter("delete_many", Call::DeleteMany(filter.clone())).await?;
        let before = shared.records.len();
        shared.records.retain(|r| !matches(filter, r));
        Ok(StoreOutcome::documents((before - shared.records.len()) as u64))
    }

    async fn drop_collection(&mut self) -> StoreResult<StoreOutcome> {
        let strict = self.strict_drop;
        let mut shared = self.enter("drop_collection", Call::DropCollection).await?;
        if strict && !shared.collection_exists {
            return Err(StoreError::other("ns not found"));
        }
        shared.records.clear();
        shared.indexes.clear();
        shared.collection_exists = false;
        Ok(StoreOutcome::default())
    }

    async fn find_one(&mut self, filter: &Filter, decode: bool) -> StoreResult<StoreOutcome> {
        let shared = self.enter("find_one", Call::FindOne(filter.clone(), decode)).await?;
        let found = shared.records.iter().any(|r| matches(filter, r));
        Ok(StoreOutcome::documents(found as u64))
    }

    async fn find_many(
        &mut self,
        filter: &Filter,
        hint: Option<&str>,
        decode: bool,
    ) -> StoreResult<StoreOutcome> {
        let call = Call::FindMany(filter.clone(), hint.map(str::to_string), decode);
        let shared = self.enter("find_many", call).await?;
        if let Some(field) = hint {
            if !shared.indexes.iter().any(|i| i == field) {
                return Err(StoreError::other(
                    "hint provided does not correspond to an existing index",
                ));
            }
        }
        let n = shared.records.iter().filter(|r| matches(filter, r)).count();
        Ok(StoreOutcome::documents(n as u64))
    }

    async fn create_index(&mut self, field: &str) -> StoreResult<StoreOutcome> {
        let mut shared = self.enter("create_index", Call::CreateIndex(field.to_string())).await?;
        if !shared.indexes.iter().any(|i| i == field) {
            shared.indexes.push(field.to_string());
        }
        shared.collection_exists = true;
        Ok(StoreOutcome::default())
    }

    async fn upload(
        &mut self,
        mode: UploadMode,
        filename: &str,
        source: &Path,
    ) -> StoreResult<StoreOutcome> {
        let content = tokio::fs::read(source).await?;
        let mut shared = self.enter("upload", Call::Upload(mode, filename.to_string())).await?;
        let length = content.len() as u64;
        shared.blobs.push((filename.to_string(), content));
        Ok(StoreOutcome::bytes(length))
    }

    async fn download(&mut self, mode: DownloadMode, filename: &str) -> StoreResult<StoreOutcome> {
        let shared = self.enter("download", Call::Download(mode, filename.to_string())).await?;
        let content = shared
            .blobs
            .iter()
            .rev()
            .find(|(name, _)| name == filename)
            .map(|(_, content)| content)
            .ok_or_else(|| StoreError::other(format!("file not found: {}", filename)))?;
        let read = match mode {
            DownloadMode::ToBuffer => content.len(),
            DownloadMode::OpenStream => content.len().min(1024),
        };
        Ok(StoreOutcome::bytes(read as u64))
    }

    async fn drop_bucket(&mut self) -> StoreResult<StoreOutcome> {
        let mut shared = self.enter("drop_bucket", Call::DropBucket).await?;
        shared.blobs.clear();
        Ok(StoreOutcome::default())
    }

    async fn close(&mut self) -> StoreResult<()> {
        self.enter("close", Call::Close).await?;
        if self.failing_close {
            return Err(StoreError::other("connection reset during shutdown"));
        }
        Ok(())
    }
}
