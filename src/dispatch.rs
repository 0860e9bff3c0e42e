//! Event handlers that turn one incoming event into workflow run submissions
//!
//! A handler either submits runs, decides that nothing needs to happen, or fails. Benign
//! outcomes are [Outcome] values. Failures are [DispatchError]s that end the invocation
//! and let the platform apply its own retry policy.

use std::fmt;

use serde_json::{json, Value};

use crate::engine::EngineError;
use crate::event::EventError;
use crate::manifest::ManifestError;
use crate::pipeline::PipelineState;
use crate::store::StoreError;

/// Manifest upload: one initial run per sample
pub mod initial;
/// Run completion: one downstream run per completed upstream run
pub mod chained;
/// Find the output artifact of a completed run
pub mod locate;

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Submitted { run_ids: Vec<String>, state: PipelineState },
    /// Nothing to do for this event, which is not an error
    Skipped { reason: String, state: Option<PipelineState> },
}

impl Outcome {
    /// Invocation response returned to the platform
    pub fn to_response(&self) -> Value {
        match self {
            Outcome::Submitted { run_ids, state } => json!({
                "statusCode": 200,
                "statusMessage": "Workflows launched successfully",
                "runIds": run_ids,
                "state": state,
            }),
            Outcome::Skipped { reason, state } => json!({
                "statusCode": 200,
                "statusMessage": format!("Finished successfully. No workflow started: {reason}"),
                "runIds": Vec::<String>::new(),
                "state": state,
            }),
        }
    }
}

/// Whether delivering the same event again could succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Retryable,
    Fatal,
}

#[derive(Debug)]
pub enum DispatchError {
    Manifest(ManifestError),
    Event(EventError),
    Store(StoreError),
    Engine(EngineError),
    /// Some samples were submitted, the rest failed. Submitted runs are not rolled back.
    PartialSubmission { submitted: Vec<String>, failed: usize },
    MissingArtifact(String),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Manifest(ManifestError::ReadError(_)) => ErrorKind::Retryable,
            DispatchError::Manifest(_) => ErrorKind::Fatal,
            DispatchError::Event(_) => ErrorKind::Fatal,
            DispatchError::Store(StoreError::InvalidUri(_)) => ErrorKind::Fatal,
            DispatchError::Store(_) => ErrorKind::Retryable,
            DispatchError::Engine(EngineError::ApiError { status, .. })
                if *status < 500 && *status != 429 =>
            {
                ErrorKind::Fatal
            }
            DispatchError::Engine(_) => ErrorKind::Retryable,
            DispatchError::PartialSubmission { .. } => ErrorKind::Retryable,
            DispatchError::MissingArtifact(_) => ErrorKind::Fatal,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DispatchError::Manifest(err) => write!(f, "{err}"),
            DispatchError::Event(err) => write!(f, "{err}"),
            DispatchError::Store(err) => write!(f, "{err}"),
            DispatchError::Engine(err) => write!(f, "{err}"),
            DispatchError::PartialSubmission { submitted, failed } => write!(
                f,
                "error launching {failed} workflow(s), {} submitted, check logs",
                submitted.len()
            ),
            DispatchError::MissingArtifact(prefix) => {
                write!(f, "no output artifact found under {prefix}, exiting")
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Manifest(err) => Some(err),
            DispatchError::Event(err) => Some(err),
            DispatchError::Store(err) => Some(err),
            DispatchError::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ManifestError> for DispatchError {
    fn from(err: ManifestError) -> Self {
        DispatchError::Manifest(err)
    }
}

impl From<EventError> for DispatchError {
    fn from(err: EventError) -> Self {
        DispatchError::Event(err)
    }
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        DispatchError::Store(err)
    }
}

impl From<EngineError> for DispatchError {
    fn from(err: EngineError) -> Self {
        DispatchError::Engine(err)
    }
}
