use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Document stored in the benchmark collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_date: Option<DateTime>,
    pub count: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub updated: bool,
}

impl FileRecord {
    /// The single document written by insert-one: `count` 0, no edit date.
    pub fn seed(id: impl Into<String>) -> Self {
        FileRecord {
            id: id.into(),
            file_name: "fakeFile.fake".to_string(),
            edit_date: None,
            count: 0,
            updated: false,
        }
    }

    /// Record `i` of an insert-many batch. The whole batch shares one edit date.
    pub fn numbered(key: String, i: u64, edit_date: DateTime) -> Self {
        FileRecord {
            id: key,
            file_name: format!("fakeFile.fake{}", i),
            edit_date: Some(edit_date),
            count: i as i64,
            updated: false,
        }
    }
}
