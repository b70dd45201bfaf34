use serde::{Deserialize, Serialize};

pub const DEFAULT_DATABASE: &str = "benchmarkMain";
pub const DEFAULT_COLLECTION: &str = "files";
pub const DEFAULT_BLOB_DATABASE: &str = "benchmarkGridFS";

/// Server builds under test, one port each.
const BUILTIN: [(&str, u16); 4] = [
    ("mongo50", 27015),
    ("mongo60", 27016),
    ("mongo70", 27017),
    ("mongo80", 27018),
];

/// One database instance to benchmark. Not mutated once a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEndpoint {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub collection: String,
    /// Database holding the GridFS bucket.
    pub blob_database: String,
}

impl TargetEndpoint {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        TargetEndpoint {
            name: name.into(),
            host: host.into(),
            port,
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            blob_database: DEFAULT_BLOB_DATABASE.to_string(),
        }
    }

    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.host, self.port)
    }

    /// All built-in endpoints, in ascending server version.
    pub fn builtin() -> Vec<TargetEndpoint> {
        BUILTIN
            .iter()
            .map(|(name, port)| TargetEndpoint::new(*name, "localhost", *port))
            .collect()
    }

    pub fn lookup(name: &str) -> Option<TargetEndpoint> {
        Self::builtin().into_iter().find(|e| e.name == name)
    }
}

impl std::fmt::Display for TargetEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}:{}, {}.{}, blobs in {})",
            self.name, self.host, self.port, self.database, self.collection, self.blob_database
        )
    }
}
