use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::operation::{
    DownloadMode, Filter, Key, Operation, OperationDescriptor as Op, UploadMode,
};

const THOUSAND: u64 = 1_000;
const MILLION: u64 = 1_000_000;

/// Size of the insert-many batch that seeds the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    #[default]
    Thousand,
    Million,
}

impl Scale {
    pub fn count(self) -> u64 {
        match self {
            Scale::Thousand => THOUSAND,
            Scale::Million => MILLION,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Scale::Thousand => "Thousand",
            Scale::Million => "Million",
        }
    }
}

impl FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "thousand" | "1000" => Ok(Scale::Thousand),
            "million" | "1000000" => Ok(Scale::Million),
            other => Err(format!("unknown scale '{}', expected thousand or million", other)),
        }
    }
}

/// Ordered descriptors for one session. Order is part of what is measured: lookups
/// depend on the inserts before them, indexed finds on the index created before them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub descriptors: Vec<Op>,
}

impl Plan {
    pub fn new(name: impl Into<String>) -> Self {
        Plan {
            name: name.into(),
            descriptors: Vec::new(),
        }
    }

    pub fn then(mut self, descriptor: Op) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Op> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    /// The default suite: seed the collection, update and look up every key, range
    /// queries over an index, then the GridFS round trip.
    pub fn standard(scale: Scale) -> Self {
        let n = THOUSAND;
        Plan::new(format!("standard-{}", scale.label().to_ascii_lowercase()))
            .then(reset())
            .then(insert_many(scale))
            .then(Op::new("UpdateOne", Operation::UpdateOne { key: Key::Sequential }).repeat(n))
            .then(find_by_id(false).repeat(n))
            .then(find_by_id(true).repeat(n))
            .then(find_updated(false).with_index("updated").repeat(n))
            .then(find_updated(true).repeat(n))
            .then(Op::new("DeleteAll", Operation::DropCollection))
            .then(upload(UploadMode::FromStream).repeat(n))
            .then(download(DownloadMode::ToBuffer).repeat(n))
            .then(drop_bucket())
    }

    /// Every benchmark variant, including the ones the standard suite leaves out.
    pub fn full(scale: Scale) -> Self {
        let n = THOUSAND;
        Plan::new(format!("full-{}", scale.label().to_ascii_lowercase()))
            .then(reset())
            .then(Op::new("InsertOne", Operation::InsertOne { key: Key::Fixed("fafa0".into()) }))
            .then(insert_many(scale))
            .then(Op::new("UpdateOne", Operation::UpdateOne { key: Key::Sequential }).repeat(n))
            .then(Op::new("UpdateMany", Operation::UpdateMany { filter: Filter::All }))
            .then(Op::new("FindOne", Operation::FindOne { filter: Filter::All, decode: false }))
            .then(find_by_id(false).repeat(n))
            .then(find_by_id(true).repeat(n))
            .then(find_updated(false).with_index("updated").repeat(n))
            .then(find_updated(true).repeat(n))
            .then(Op::new(
                "FindAll",
                Operation::FindMany { filter: Filter::All, hint: None, decode: false },
            ))
            .then(Op::new("DeleteOne", Operation::DeleteOne { filter: Filter::Updated }))
            .then(Op::new("DeleteMany", Operation::DeleteMany { filter: Filter::All }))
            .then(Op::new("DeleteAll", Operation::DropCollection))
            .then(upload(UploadMode::FromStream).repeat(n))
            .then(upload(UploadMode::OpenStream).repeat(n))
            .then(download(DownloadMode::ToBuffer).repeat(n))
            .then(download(DownloadMode::OpenStream).repeat(n))
            .then(drop_bucket())
    }

    pub fn from_json_file(path: &Path) -> Result<Self, PlanError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

// Residual data from an earlier run would make the seeding insert fail on duplicate keys.
fn reset() -> Op {
    Op::new("ResetCollection", Operation::DropCollection)
}

fn insert_many(scale: Scale) -> Op {
    Op::new(
        format!("InsertMany{}", scale.label()),
        Operation::InsertMany { count: scale.count() },
    )
}

fn find_by_id(decode: bool) -> Op {
    let name = if decode {
        "FindOneByIdWithDeserialization"
    } else {
        "FindOneByIdWithoutDeserialization"
    };
    Op::new(name, Operation::FindById { key: Key::Sequential, decode })
}

fn find_updated(decode: bool) -> Op {
    let name = if decode {
        "FindManyUsingIndexWithDeserialization"
    } else {
        "FindManyUsingIndexWithoutDeserialization"
    };
    Op::new(
        name,
        Operation::FindMany {
            filter: Filter::Updated,
            hint: Some("updated".into()),
            decode,
        },
    )
}

fn upload(mode: UploadMode) -> Op {
    let name = match mode {
        UploadMode::FromStream => "GridFSUploadFromStream",
        UploadMode::OpenStream => "GridFSUploadOpeningUploadStream",
    };
    Op::new(name, Operation::BlobUpload { mode })
}

fn download(mode: DownloadMode) -> Op {
    let name = match mode {
        DownloadMode::ToBuffer => "GridFSSearchAndDownloadToBuffer",
        DownloadMode::OpenStream => "GridFSSearchAndDownloadOpeningStream",
    };
    Op::new(name, Operation::BlobDownload { mode })
}

// A bucket that cannot be dropped leaves later measurements on stale blobs.
fn drop_bucket() -> Op {
    Op::new("ClearGridFS", Operation::DropBucket).fatal()
}
