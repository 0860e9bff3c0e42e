//! In-memory object store and workflow engine for handler tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::{EngineError, RunDescriptor, StartRunRequest, StartRunResponse, WorkflowEngine};
use crate::store::{Download, ListPage, ObjectStore, S3Uri, StoreError};

pub struct FakeStore {
    /// (bucket, key) in listing order, with object contents
    objects: Vec<(S3Uri, String)>,
    page_size: usize,
    list_calls: Mutex<usize>,
}

impl FakeStore {
    pub fn new() -> FakeStore {
        FakeStore { objects: Vec::new(), page_size: 1000, list_calls: Mutex::new(0) }
    }

    pub fn with_page_size(mut self, page_size: usize) -> FakeStore {
        self.page_size = page_size;
        self
    }

    pub fn with_object(mut self, uri: &str, contents: &str) -> FakeStore {
        let location = S3Uri::parse(uri).expect("valid test uri");
        self.objects.push((location, contents.to_string()));
        self
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn download(&self, location: &S3Uri, dest: &Path) -> Result<Download, StoreError> {
        match self.objects.iter().find(|(uri, _)| uri == location) {
            Some((_, contents)) => {
                std::fs::write(dest, contents).map_err(|err| StoreError::WriteError(err.to_string()))?;
                Ok(Download::Saved)
            }
            None => Ok(Download::NotFound),
        }
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage, StoreError> {
        *self.list_calls.lock().unwrap() += 1;
        let start: usize = continuation.map(|token| token.parse().unwrap()).unwrap_or(0);
        let matching: Vec<&String> = self
            .objects
            .iter()
            .filter(|(uri, _)| uri.bucket == bucket && uri.key.starts_with(prefix))
            .map(|(uri, _)| &uri.key)
            .collect();
        let end = (start + self.page_size).min(matching.len());
        let keys = matching[start..end].iter().map(|key| key.to_string()).collect();
        let next = if end < matching.len() { Some(end.to_string()) } else { None };
        Ok(ListPage { keys, next })
    }
}

#[derive(Default)]
pub struct FakeEngine {
    runs: HashMap<String, RunDescriptor>,
    /// Requests whose run name contains one of these fail
    failing_names: Vec<String>,
    submitted: Mutex<Vec<StartRunRequest>>,
    attempts: Mutex<usize>,
}

impl FakeEngine {
    pub fn new() -> FakeEngine {
        FakeEngine::default()
    }

    pub fn with_run(mut self, id: &str, workflow_id: &str, output_uri: &str) -> FakeEngine {
        let run = RunDescriptor {
            id: id.to_string(),
            workflow_id: workflow_id.to_string(),
            output_uri: output_uri.to_string(),
            status: Some("COMPLETED".to_string()),
        };
        self.runs.insert(id.to_string(), run);
        self
    }

    pub fn failing_for(mut self, name_part: &str) -> FakeEngine {
        self.failing_names.push(name_part.to_string());
        self
    }

    pub fn submitted(&self) -> Vec<StartRunRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl WorkflowEngine for FakeEngine {
    async fn start_run(&self, request: &StartRunRequest) -> Result<StartRunResponse, EngineError> {
        *self.attempts.lock().unwrap() += 1;
        if self.failing_names.iter().any(|part| request.name.contains(part.as_str())) {
            return Err(EngineError::ApiError { status: 400, message: "ValidationException".to_string() });
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request.clone());
        let id = format!("{}", 9000000 + submitted.len());
        Ok(StartRunResponse {
            arn: Some(format!("arn:aws:omics:us-west-2:000000000000:run/{id}")),
            id,
            status: Some("PENDING".to_string()),
        })
    }

    async fn get_run(&self, run_id: &str) -> Result<RunDescriptor, EngineError> {
        self.runs.get(run_id).cloned().ok_or_else(|| EngineError::ApiError {
            status: 404,
            message: format!("run {run_id} not found"),
        })
    }
}
