//! Workflow execution engine access: start runs and look them up

use std::fmt;

use async_trait::async_trait;

/// Request and response bodies of the engine API
pub mod run;
/// SigV4 signed REST client built on rusoto_core
pub mod omics;

pub use run::{RunDescriptor, StartRunRequest, StartRunResponse, WorkflowType};

#[derive(Debug)]
pub enum EngineError {
    /// Credentials or TLS setup failed while building the client
    ClientError(String),
    /// The request never produced an HTTP response
    TransportError(String),
    /// The engine answered with a non-success status
    ApiError { status: u16, message: String },
    DecodeError(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::ClientError(msg) => write!(f, "can't build engine client: {msg}"),
            EngineError::TransportError(msg) => write!(f, "engine request failed: {msg}"),
            EngineError::ApiError { status, message } => {
                write!(f, "engine returned HTTP {status}: {message}")
            }
            EngineError::DecodeError(msg) => write!(f, "can't decode engine response: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn start_run(&self, request: &StartRunRequest) -> Result<StartRunResponse, EngineError>;

    async fn get_run(&self, run_id: &str) -> Result<RunDescriptor, EngineError>;
}
