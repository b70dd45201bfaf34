//! Operation descriptors: what a benchmark step does, how often, and what it needs
//! before the timer starts.

use bson::{doc, Document};
use serde::{Deserialize, Serialize};

/// Deterministic key generator shared by every keyed descriptor, so a lookup step
/// finds the keys an earlier insert step wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpace {
    prefix: &'static str,
}

pub const KEYS: KeySpace = KeySpace { prefix: "fafa" };

impl KeySpace {
    pub fn key(&self, i: u64) -> String {
        format!("{}{}", self.prefix, i)
    }

    /// Keys `1..=n`.
    pub fn keys(&self, n: u64) -> impl Iterator<Item = String> + '_ {
        (1..=n).map(move |i| self.key(i))
    }
}

/// Document key used by a keyed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// The same key on every repetition.
    Fixed(String),
    /// `fafa{i}` on repetition `i`, counting from 1.
    Sequential,
}

impl Key {
    pub fn resolve(&self, iteration: u64) -> String {
        match self {
            Key::Fixed(id) => id.clone(),
            Key::Sequential => KEYS.key(iteration),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    All,
    /// Documents touched by an update (`updated: true`).
    Updated,
    /// `count < n`
    CountBelow(i64),
    Id(String),
}

impl Filter {
    pub fn to_document(&self) -> Document {
        match self {
            Filter::All => doc! {},
            Filter::Updated => doc! { "updated": true },
            Filter::CountBelow(n) => doc! { "count": { "$lt": *n } },
            Filter::Id(id) => doc! { "_id": id.as_str() },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMode {
    /// Hand the driver a reader over the payload file.
    FromStream,
    /// Open an upload stream and write the payload bytes into it.
    OpenStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMode {
    /// Download the whole file into memory.
    ToBuffer,
    /// Open a download stream and read its first kilobyte.
    OpenStream,
}

/// One category of benchmarked work against the data store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    InsertOne { key: Key },
    /// The batch of `count` records is built before the timer starts.
    InsertMany { count: u64 },
    UpdateOne { key: Key },
    UpdateMany { filter: Filter },
    DeleteOne { filter: Filter },
    DeleteById { key: Key },
    DeleteMany { filter: Filter },
    DropCollection,
    FindOne { filter: Filter, decode: bool },
    FindById { key: Key, decode: bool },
    FindMany {
        filter: Filter,
        #[serde(default)]
        hint: Option<String>,
        decode: bool,
    },
    CreateIndex { field: String },
    BlobUpload { mode: UploadMode },
    BlobDownload { mode: DownloadMode },
    DropBucket,
}

impl Operation {
    /// Whether the operation reads the payload file.
    pub fn needs_payload(&self) -> bool {
        matches!(self, Operation::BlobUpload { .. })
    }
}

fn one() -> u64 {
    1
}

/// A named, repeatable unit of benchmarked work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    #[serde(default = "one")]
    pub repetitions: u64,
    /// Abort the session when this descriptor fails.
    #[serde(default)]
    pub fatal: bool,
    /// Index created before the timer starts.
    #[serde(default)]
    pub setup_index: Option<String>,
    pub operation: Operation,
}

impl OperationDescriptor {
    pub fn new(name: impl Into<String>, operation: Operation) -> Self {
        OperationDescriptor {
            name: name.into(),
            repetitions: 1,
            fatal: false,
            setup_index: None,
            operation,
        }
    }

    pub fn repeat(mut self, repetitions: u64) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    pub fn with_index(mut self, field: impl Into<String>) -> Self {
        self.setup_index = Some(field.into());
        self
    }

    /// Repetitions actually executed. Zero is read as one.
    pub fn effective_repetitions(&self) -> u64 {
        self.repetitions.max(1)
    }
}
