use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::InitialConfig;
use crate::dispatch::{DispatchError, Outcome};
use crate::engine::{StartRunRequest, WorkflowEngine, WorkflowType};
use crate::event::schema::EventSchema;
use crate::event::upload::ObjectCreatedEvent;
use crate::manifest::{read_manifest, SampleParams};
use crate::pipeline::{PipelineState, Transition};
use crate::store::{Download, ObjectStore, S3Uri};

static SOURCE_TAG: &str = "LAMBDA_INITIAL_WORKFLOW";

/// Reacts to a manifest upload by starting one ready-to-run workflow per sample
pub struct InitialDispatcher {
    config: InitialConfig,
    schema: EventSchema,
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn WorkflowEngine>,
}

impl InitialDispatcher {
    pub fn new(
        config: InitialConfig,
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn WorkflowEngine>,
    ) -> Result<InitialDispatcher, DispatchError> {
        let schema = EventSchema::object_created()?;
        Ok(InitialDispatcher { config, schema, store, engine })
    }

    pub async fn handle(&self, event: Value) -> Result<Outcome, DispatchError> {
        debug!("Received event: {event}");
        let event: ObjectCreatedEvent = self.schema.read(event)?;
        let record = event.single_record()?;
        let manifest = record.location();
        info!(
            "Processing {} in {}",
            manifest.key,
            record.s3.bucket.arn.as_deref().unwrap_or(manifest.bucket.as_str())
        );

        debug!(
            "{} ({} bytes)",
            record.event_name.as_deref().unwrap_or("ObjectCreated"),
            record.s3.object.size.unwrap_or_default()
        );

        if !self.is_manifest_key(&manifest.key) {
            warn!(
                "{} is outside {}*{}, ignoring upload",
                manifest.key, self.config.manifest_prefix, self.config.manifest_suffix
            );
            return Ok(Outcome::Skipped {
                reason: format!("{} is not a sample manifest", manifest.key),
                state: None,
            });
        }

        let local = self.local_path();
        let samples = match self.store.download(&manifest, &local).await? {
            Download::Saved => {
                info!("Downloaded manifest CSV to: {}", local.display());
                let samples = read_manifest(&local);
                remove_local(&local).await;
                samples?
            }
            Download::NotFound => {
                return Ok(Outcome::Skipped {
                    reason: format!("{manifest} does not exist"),
                    state: Some(PipelineState::Uploaded),
                });
            }
        };

        self.submit_all(&manifest, samples).await
    }

    /// Every sample is attempted even after a failure; nothing already submitted is rolled back
    async fn submit_all(&self, manifest: &S3Uri, samples: Vec<SampleParams>) -> Result<Outcome, DispatchError> {
        if samples.is_empty() {
            warn!("Manifest {} lists no samples", manifest);
            return Ok(Outcome::Skipped {
                reason: format!("{manifest} lists no samples"),
                state: Some(PipelineState::Uploaded),
            });
        }

        let mut submitted: Vec<String> = Vec::new();
        let mut error_count = 0;
        for sample in &samples {
            info!("Starting workflow for sample: {}", sample.sample_name);
            match self.submit(manifest, sample).await {
                Ok(run_id) => submitted.push(run_id),
                Err(err) => {
                    error!("Can't start workflow for sample {}: {}", sample.sample_name, err);
                    error_count += 1;
                }
            }
        }

        if error_count > 0 {
            error!("{} of {} workflow submissions failed", error_count, samples.len());
            return Err(DispatchError::PartialSubmission { submitted, failed: error_count });
        }

        let state = PipelineState::Uploaded.next(Transition::Submit).unwrap_or(PipelineState::Run1Submitted);
        info!("Started {} workflow run(s), pipeline state {}", submitted.len(), state);
        Ok(Outcome::Submitted { run_ids: submitted, state })
    }

    async fn submit(&self, manifest: &S3Uri, sample: &SampleParams) -> Result<String, DispatchError> {
        let request = self.run_request(manifest, sample);
        let response = self.engine.start_run(&request).await?;
        info!(
            "Workflow response: run {} {} ({})",
            response.id,
            response.arn.as_deref().unwrap_or_default(),
            response.status.as_deref().unwrap_or("unknown")
        );
        Ok(response.id)
    }

    fn run_request(&self, manifest: &S3Uri, sample: &SampleParams) -> StartRunRequest {
        let name = format!("Sample_{}_{}", sample.sample_name, Uuid::new_v4());
        let parameters = json!({
            "sample_name": sample.sample_name,
            "fastq_pairs": sample.fastq_pairs,
        });
        let tags = BTreeMap::from([
            ("SOURCE".to_string(), SOURCE_TAG.to_string()),
            ("RUN_NAME".to_string(), name.clone()),
            ("SAMPLE_MANIFEST".to_string(), manifest.to_string()),
        ]);

        StartRunRequest {
            workflow_type: WorkflowType::Ready2Run,
            workflow_id: self.config.run.workflow_id.clone(),
            name,
            role_arn: self.config.run.role_arn.clone(),
            parameters,
            output_uri: self.config.run.output_uri.clone(),
            log_level: self.config.run.log_level.clone(),
            tags,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    fn is_manifest_key(&self, key: &str) -> bool {
        key.starts_with(&self.config.manifest_prefix) && key.ends_with(&self.config.manifest_suffix)
    }

    fn local_path(&self) -> PathBuf {
        self.config.work_dir.join(format!("sample_manifest_{}.csv", Uuid::new_v4()))
    }
}

async fn remove_local(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        warn!("Can't remove local manifest {}: {}", path.display(), err);
    }
}
