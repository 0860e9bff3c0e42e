use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::event::EventError;

pub static RUN_STATUS_CHANGE: &str = "Run Status Change";

/// Run status change event emitted by the workflow engine
///
/// ```json
/// {
///     "detail-type": "Run Status Change",
///     "source": "aws.omics",
///     "time": "2023-07-28T06:19:39Z",
///     "resources": ["arn:aws:omics:us-west-2:0000000000:run/1111111"],
///     "detail": {
///         "omicsVersion": "1.0.0",
///         "arn": "arn:aws:omics:us-west-2:0000000000:run/1111111",
///         "status": "COMPLETED"
///     }
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct RunStatusEvent {
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    pub source: Option<String>,
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resources: Vec<String>,
    pub detail: RunStatusDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatusDetail {
    pub arn: String,
    pub status: RunStatus,
    pub omics_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Starting,
    Running,
    Stopping,
    Completed,
    Deleted,
    Cancelled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let status = match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Starting => "STARTING",
            RunStatus::Running => "RUNNING",
            RunStatus::Stopping => "STOPPING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Deleted => "DELETED",
            RunStatus::Cancelled => "CANCELLED",
            RunStatus::Failed => "FAILED",
            RunStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{status}")
    }
}

/// Reject events from any other producer before looking at their shape
pub fn check_detail_type(event: &Value) -> Result<(), EventError> {
    match event.get("detail-type").and_then(Value::as_str) {
        Some(detail_type) if detail_type == RUN_STATUS_CHANGE => Ok(()),
        other => Err(EventError::UnexpectedDetailType(other.unwrap_or_default().to_string())),
    }
}

impl RunStatusEvent {
    /// Run id is the final path segment of the run ARN
    pub fn run_id(&self) -> Result<&str, EventError> {
        match self.detail.arn.rsplit('/').next() {
            Some(id) if !id.is_empty() && id != self.detail.arn => Ok(id),
            _ => Err(EventError::InvalidEvent(format!("no run id in ARN {}", self.detail.arn))),
        }
    }

    /// Seconds between the engine emitting the event and now
    pub fn age(&self, now: DateTime<Utc>) -> Option<i64> {
        self.time.map(|time| (now - time).num_seconds())
    }
}
