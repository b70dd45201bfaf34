//! Benchmark session orchestration.
//!
//! A session connects to one endpoint, executes an ordered plan of descriptors one at a
//! time, and releases the connection on every exit path. Per descriptor the runner
//! performs setup outside the timed window, times exactly `repetitions` calls, and
//! records the outcome. Failures are recorded and the session continues, except for
//! descriptors marked `fatal`, which end the session.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use bson::DateTime;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::document::FileRecord;
use crate::error::{ConnectionError, OperationError, StoreError, TeardownError};
use crate::operation::{Filter, Key, Operation, OperationDescriptor, KEYS};
use crate::payload::{blob_name, check_payload};
use crate::plan::Plan;
use crate::report::{FailureKind, Outcome, RunResult, SessionReport};
use crate::store::{DataStore, StoreOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    RunningSession,
    SessionComplete,
}

/// Bounds `call` by `limit`; an expired call is an operation failure.
async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, OperationError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match timeout(limit, call).await {
        Ok(result) => result.map_err(OperationError::from),
        Err(_) => Err(OperationError::Timeout(limit)),
    }
}

/// State built before a descriptor's timer starts.
enum Prepared {
    Nothing,
    Batch(Vec<FileRecord>),
    Payload { path: PathBuf, name: String },
    Blob(String),
}

/// Owns the store connection for exactly one session.
pub struct Runner<S: DataStore> {
    store: S,
    config: RunConfig,
    state: SessionState,
}

impl<S: DataStore> Runner<S> {
    /// Verifies the store answers a round trip. On failure the store is dropped and no
    /// operation may run.
    pub async fn connect(mut store: S, config: RunConfig) -> Result<Self, ConnectionError> {
        let endpoint = store.name().to_string();
        let pinged = timeout(config.connect_timeout, store.ping()).await;
        match pinged {
            Ok(Ok(())) => {
                info!(endpoint = %endpoint, "connected");
                Ok(Runner {
                    store,
                    config,
                    state: SessionState::Connected,
                })
            }
            Ok(Err(source)) => Err(ConnectionError::Unreachable { endpoint, source }),
            Err(_) => Err(ConnectionError::Timeout {
                endpoint,
                timeout: config.connect_timeout,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn endpoint(&self) -> &str {
        self.store.name()
    }

    /// Executes `plan` in order. Never fails: descriptor failures end up in the report.
    pub async fn run_session(&mut self, plan: &Plan) -> SessionReport {
        self.state = SessionState::RunningSession;
        let mut report = SessionReport::new(self.store.name(), &plan.name);
        info!(endpoint = %self.store.name(), plan = %plan.name, descriptors = plan.len(), "session started");

        for descriptor in plan.iter() {
            let result = self.run_descriptor(descriptor).await;

            if !result.succeeded() && descriptor.fatal {
                let reason = result.failure_reason().unwrap_or_default().to_string();
                error!(descriptor = %descriptor.name, %reason, "fatal descriptor failed, aborting session");
                report.abort(&descriptor.name, reason);
                break;
            }
            report.push(result);
        }

        self.state = SessionState::SessionComplete;
        info!(
            endpoint = %self.store.name(),
            results = report.results.len(),
            failed = report.failures().count(),
            "session complete"
        );
        report
    }

    /// Releases the connection.
    pub async fn close(mut self) -> Result<(), TeardownError> {
        let endpoint = self.store.name().to_string();
        let limit = self.config.connect_timeout;
        self.state = SessionState::Disconnected;
        let closed = timeout(limit, self.store.close()).await;
        match closed {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(TeardownError::Release { endpoint, source }),
            Err(_) => Err(TeardownError::Timeout {
                endpoint,
                timeout: limit,
            }),
        }
    }

    async fn run_descriptor(&mut self, descriptor: &OperationDescriptor) -> RunResult {
        let repetitions = descriptor.effective_repetitions();
        let mut result = RunResult {
            name: descriptor.name.clone(),
            repetitions,
            completed: 0,
            elapsed: Duration::ZERO,
            outcome: Outcome::Success,
            last: None,
        };

        let prepared = match self.prepare(descriptor).await {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!(descriptor = %descriptor.name, error = %err, "setup failed, skipping");
                result.outcome = Outcome::Failed {
                    kind: FailureKind::from(&err),
                    reason: err.to_string(),
                    failures: repetitions,
                };
                return result;
            }
        };

        let mut first_error: Option<OperationError> = None;
        let mut failures = 0;

        let start = Instant::now();
        for iteration in 1..=repetitions {
            match self.execute(&descriptor.operation, &prepared, iteration).await {
                Ok(outcome) => {
                    result.completed += 1;
                    result.last = Some(outcome);
                }
                Err(err) => {
                    failures += 1;
                    debug!(descriptor = %descriptor.name, iteration, error = %err, "repetition failed");
                    first_error.get_or_insert(err);
                    if descriptor.fatal {
                        break;
                    }
                }
            }
        }
        result.elapsed = start.elapsed();

        if let Some(err) = first_error {
            warn!(descriptor = %descriptor.name, failures, error = %err, "descriptor failed");
            result.outcome = Outcome::Failed {
                kind: FailureKind::from(&err),
                reason: err.to_string(),
                failures,
            };
        } else {
            debug!(descriptor = %descriptor.name, elapsed = ?result.elapsed, "descriptor done");
        }
        result
    }

    /// Descriptor-local work that must stay out of the measured time.
    async fn prepare(&mut self, descriptor: &OperationDescriptor) -> Result<Prepared, OperationError> {
        let limit = self.config.op_timeout;

        if let Some(field) = &descriptor.setup_index {
            bounded(limit, self.store.create_index(field))
                .await
                .map_err(into_setup)?;
        }

        match &descriptor.operation {
            Operation::InsertMany { count } => {
                let now = DateTime::now();
                let batch = (1..=*count)
                    .map(|i| FileRecord::numbered(KEYS.key(i), i, now))
                    .collect();
                Ok(Prepared::Batch(batch))
            }
            op if op.needs_payload() => {
                let path = self.config.payload.clone();
                check_payload(&path)
                    .await
                    .map_err(|err| OperationError::Setup(err.into()))?;
                let name = blob_name(&path);
                Ok(Prepared::Payload { path, name })
            }
            Operation::BlobDownload { .. } => Ok(Prepared::Blob(blob_name(&self.config.payload))),
            _ => Ok(Prepared::Nothing),
        }
    }

    async fn execute(
        &mut self,
        operation: &Operation,
        prepared: &Prepared,
        iteration: u64,
    ) -> Result<StoreOutcome, OperationError> {
        let limit = self.config.op_timeout;
        let store = &mut self.store;

        match operation {
            Operation::InsertOne { key } => {
                let record = FileRecord::seed(key.resolve(iteration));
                bounded(limit, store.insert_one(&record)).await
            }
            Operation::InsertMany { .. } => match prepared {
                Prepared::Batch(batch) => bounded(limit, store.insert_many(batch)).await,
                _ => Err(StoreError::other("insert batch was not prepared").into()),
            },
            Operation::UpdateOne { key } => {
                bounded(limit, store.update_one(&by_id(key, iteration))).await
            }
            Operation::UpdateMany { filter } => bounded(limit, store.update_many(filter)).await,
            Operation::DeleteOne { filter } => bounded(limit, store.delete_one(filter)).await,
            Operation::DeleteById { key } => {
                bounded(limit, store.delete_one(&by_id(key, iteration))).await
            }
            Operation::DeleteMany { filter } => bounded(limit, store.delete_many(filter)).await,
            Operation::DropCollection => bounded(limit, store.drop_collection()).await,
            Operation::FindOne { filter, decode } => {
                bounded(limit, store.find_one(filter, *decode)).await
            }
            Operation::FindById { key, decode } => {
                bounded(limit, store.find_one(&by_id(key, iteration), *decode)).await
            }
            Operation::FindMany { filter, hint, decode } => {
                bounded(limit, store.find_many(filter, hint.as_deref(), *decode)).await
            }
            Operation::CreateIndex { field } => bounded(limit, store.create_index(field)).await,
            Operation::BlobUpload { mode } => match prepared {
                Prepared::Payload { path, name } => {
                    bounded(limit, store.upload(*mode, name, path)).await
                }
                _ => Err(StoreError::other("payload was not prepared").into()),
            },
            Operation::BlobDownload { mode } => match prepared {
                Prepared::Blob(name) => bounded(limit, store.download(*mode, name)).await,
                _ => Err(StoreError::other("blob name was not prepared").into()),
            },
            Operation::DropBucket => bounded(limit, store.drop_bucket()).await,
        }
    }
}

fn by_id(key: &Key, iteration: u64) -> Filter {
    Filter::Id(key.resolve(iteration))
}

fn into_setup(err: OperationError) -> OperationError {
    match err {
        OperationError::Store(source) => OperationError::Setup(source),
        other => other,
    }
}

/// Runs one complete session: connect, execute `plan`, release the connection.
///
/// Only a connection failure is returned as an error. A failed teardown is logged and
/// attached to the report without touching the recorded results.
pub async fn run<S: DataStore>(
    store: S,
    plan: &Plan,
    config: RunConfig,
) -> Result<SessionReport, ConnectionError> {
    let mut runner = Runner::connect(store, config).await?;
    let mut report = runner.run_session(plan).await;
    if let Err(err) = runner.close().await {
        warn!(error = %err, "teardown failed");
        report.teardown_error = Some(err.to_string());
    }
    Ok(report)
}
