use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::OperationError;
use crate::store::StoreOutcome;

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Setup,
    Operation,
    Timeout,
}

impl From<&OperationError> for FailureKind {
    fn from(err: &OperationError) -> Self {
        match err {
            OperationError::Setup(_) => FailureKind::Setup,
            OperationError::Store(_) => FailureKind::Operation,
            OperationError::Timeout(_) => FailureKind::Timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failed {
        kind: FailureKind,
        /// First failure seen.
        reason: String,
        /// Failed repetitions.
        failures: u64,
    },
}

/// Outcome and timing of one descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub name: String,
    pub repetitions: u64,
    /// Repetitions that succeeded.
    pub completed: u64,
    #[serde(rename = "elapsed_seconds", serialize_with = "as_secs")]
    pub elapsed: Duration,
    pub outcome: Outcome,
    /// What the last successful repetition touched.
    pub last: Option<StoreOutcome>,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success => None,
            Outcome::Failed { reason, .. } => Some(reason),
        }
    }

    /// Documents touched by the last successful repetition.
    pub fn documents(&self) -> Option<u64> {
        self.last.map(|outcome| outcome.documents)
    }

    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.repetitions as f64 / secs
    }

    pub fn avg_latency_us(&self) -> f64 {
        self.elapsed.as_micros() as f64 / self.repetitions.max(1) as f64
    }

    pub fn print(&self) {
        println!("{}", self.line());
    }

    fn line(&self) -> String {
        let status = match &self.outcome {
            Outcome::Success => "ok".to_string(),
            Outcome::Failed { kind, reason, failures } => {
                format!("FAILED {:?} x{}: {}", kind, failures, reason)
            }
        };
        format!(
            "{:<44} {:>8} ops in {:>10.2?} ({:>10.0} ops/sec, {:>10.2} µs/op) {}",
            self.name,
            self.repetitions,
            self.elapsed,
            self.ops_per_sec(),
            self.avg_latency_us(),
            status,
        )
    }
}

/// Where a session stopped after a fatal descriptor failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Abort {
    pub descriptor: String,
    pub reason: String,
}

/// Run results of one session, in plan order.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub endpoint: String,
    pub plan: String,
    pub results: Vec<RunResult>,
    pub aborted: Option<Abort>,
    pub teardown_error: Option<String>,
}

impl SessionReport {
    pub fn new(endpoint: impl Into<String>, plan: impl Into<String>) -> Self {
        SessionReport {
            endpoint: endpoint.into(),
            plan: plan.into(),
            results: Vec::new(),
            aborted: None,
            teardown_error: None,
        }
    }

    pub fn push(&mut self, result: RunResult) {
        self.results.push(result);
    }

    pub fn abort(&mut self, descriptor: impl Into<String>, reason: impl Into<String>) {
        self.aborted = Some(Abort {
            descriptor: descriptor.into(),
            reason: reason.into(),
        });
    }

    pub fn failures(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|r| !r.succeeded())
    }

    /// No failed descriptor, no abort. Teardown problems do not count.
    pub fn succeeded(&self) -> bool {
        self.aborted.is_none() && self.failures().next().is_none()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:=<60}", "");
        let _ = writeln!(out, "Endpoint: {}  Plan: {}", self.endpoint, self.plan);
        let _ = writeln!(out, "{:=<60}", "");
        for result in &self.results {
            let _ = writeln!(out, "{}", result.line());
        }
        if let Some(abort) = &self.aborted {
            let _ = writeln!(out, "ABORTED at {}: {}", abort.descriptor, abort.reason);
        }
        if let Some(err) = &self.teardown_error {
            let _ = writeln!(out, "teardown: {}", err);
        }
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
