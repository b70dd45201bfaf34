//! Micro-benchmark harness for MongoDB server builds.
//!
//! A [`Plan`] is an ordered list of [`OperationDescriptor`]s. A [`Runner`] executes it
//! against one [`TargetEndpoint`] through a [`DataStore`] and returns a
//! [`SessionReport`] with the timing and outcome of every descriptor.

pub mod config;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod mongo;
pub mod operation;
pub mod payload;
pub mod plan;
pub mod report;
pub mod runner;
pub mod store;

pub use config::RunConfig;
pub use document::FileRecord;
pub use endpoint::TargetEndpoint;
pub use error::{ConnectionError, OperationError, PlanError, StoreError, TeardownError};
pub use mongo::MongoStore;
pub use operation::{DownloadMode, Filter, Key, Operation, OperationDescriptor, UploadMode, KEYS};
pub use plan::{Plan, Scale};
pub use report::{FailureKind, Outcome, RunResult, SessionReport};
pub use runner::{run, Runner, SessionState};
pub use store::{DataStore, StoreOutcome, StoreResult};

/// Connects to `endpoint` with the MongoDB driver and runs `plan` in one session.
pub async fn run_endpoint(
    endpoint: &TargetEndpoint,
    plan: &Plan,
    config: RunConfig,
) -> Result<SessionReport, ConnectionError> {
    let store = MongoStore::connect(endpoint, config.connect_timeout).await?;
    run(store, plan, config).await
}
