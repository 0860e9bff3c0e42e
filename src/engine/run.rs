use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowType {
    Ready2Run,
    Private,
}

/// Body of a `POST /run` call
///
/// Built by a dispatcher, submitted once, and never kept.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunRequest {
    pub workflow_type: WorkflowType,
    pub workflow_id: String,
    pub name: String,
    pub role_arn: String,
    pub parameters: Value,
    pub output_uri: String,
    pub log_level: String,
    pub tags: BTreeMap<String, String>,
    /// Engine side idempotency token, fresh for every request
    pub request_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunResponse {
    pub id: String,
    pub arn: Option<String>,
    pub status: Option<String>,
}

/// The parts of a `GET /run/{id}` response the chained dispatcher needs
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDescriptor {
    pub id: String,
    pub workflow_id: String,
    pub output_uri: String,
    pub status: Option<String>,
}
