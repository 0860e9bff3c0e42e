//! Incoming events are parsed untyped, validated against a JSON schema, then deserialised

use std::fmt;

/// Compile embedded schemas and validate raw events
pub mod schema;
/// Object created notifications that announce a manifest upload
pub mod upload;
/// Run status change events from the workflow engine
pub mod run_status;

#[derive(Debug)]
pub enum EventError {
    SchemaError(String),
    InvalidEvent(String),
    DecodeError(String),
    UnexpectedDetailType(String),
    /// Number of object records in an upload event other than one
    RecordCount(usize),
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventError::SchemaError(msg) => write!(f, "can't compile event schema {msg}"),
            EventError::InvalidEvent(msg) => write!(f, "event fails validation: {msg}"),
            EventError::DecodeError(msg) => write!(f, "can't deserialise event: {msg}"),
            EventError::UnexpectedDetailType(detail_type) => write!(
                f,
                "unknown event ({detail_type:?}) triggered this handler, unable to process"
            ),
            EventError::RecordCount(0) => write!(f, "no file detected for analysis"),
            EventError::RecordCount(n) => {
                write!(f, "{n} files in one upload event, multiple files are not supported")
            }
        }
    }
}

impl std::error::Error for EventError {}
