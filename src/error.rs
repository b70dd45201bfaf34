use std::time::Duration;

use thiserror::Error;

/// Failure reported by a [`DataStore`](crate::store::DataStore) call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn other(message: impl Into<String>) -> Self {
        StoreError::Other(message.into())
    }
}

/// The session cannot start.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("cannot build client for {endpoint}: {source}")]
    Client {
        endpoint: String,
        #[source]
        source: StoreError,
    },

    #[error("endpoint {endpoint} is unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: StoreError,
    },

    #[error("endpoint {endpoint} did not answer within {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
}

/// Failure of a single descriptor. Recorded on its run result, never thrown past the runner.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("setup failed: {0}")]
    Setup(#[source] StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure while releasing the connection at session end.
#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("failed to release connection to {endpoint}: {source}")]
    Release {
        endpoint: String,
        #[source]
        source: StoreError,
    },

    #[error("releasing connection to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("cannot read plan file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid plan: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_mentions_setup() {
        let err = OperationError::Setup(StoreError::other("index build failed"));
        assert_eq!(err.to_string(), "setup failed: index build failed");
    }

    #[test]
    fn store_error_is_transparent() {
        let err = OperationError::from(StoreError::other("bad filter"));
        assert_eq!(err.to_string(), "bad filter");
    }
}
