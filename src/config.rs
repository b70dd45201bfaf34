use std::path::PathBuf;
use std::time::Duration;

use crate::payload::DEFAULT_PAYLOAD;

pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for one session, shared by every descriptor in the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Upper bound on a single store call.
    pub op_timeout: Duration,
    /// Upper bound on the connection check and on teardown.
    pub connect_timeout: Duration,
    /// File uploaded by blob descriptors.
    pub payload: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            op_timeout: DEFAULT_OP_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            payload: PathBuf::from(DEFAULT_PAYLOAD),
        }
    }
}

impl RunConfig {
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<PathBuf>) -> Self {
        self.payload = payload.into();
        self
    }
}
