use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::ChainedConfig;
use crate::dispatch::locate::{locate_artifact, sample_name, ARTIFACT_SUFFIX};
use crate::dispatch::{DispatchError, Outcome};
use crate::engine::{RunDescriptor, StartRunRequest, WorkflowEngine, WorkflowType};
use crate::event::run_status::{check_detail_type, RunStatus, RunStatusEvent};
use crate::event::schema::EventSchema;
use crate::pipeline::rule::ENGINE_SOURCE;
use crate::pipeline::{route, PipelineState, Target, Transition};
use crate::store::{ObjectStore, S3Uri};

static SOURCE_TAG: &str = "LAMBDA_POST_INITIAL_WORKFLOW";

/// Reacts to a completed upstream run by starting the downstream annotation workflow
///
/// Runs are correlated only by workflow id: any completed run of the configured upstream
/// workflow starts exactly one downstream run. Redelivered events are not deduplicated.
pub struct ChainedDispatcher {
    config: ChainedConfig,
    schema: EventSchema,
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn WorkflowEngine>,
}

impl ChainedDispatcher {
    pub fn new(
        config: ChainedConfig,
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn WorkflowEngine>,
    ) -> Result<ChainedDispatcher, DispatchError> {
        let schema = EventSchema::run_status_change()?;
        Ok(ChainedDispatcher { config, schema, store, engine })
    }

    pub async fn handle(&self, event: Value) -> Result<Outcome, DispatchError> {
        debug!("Received event: {event}");
        check_detail_type(&event)?;
        let event: RunStatusEvent = self.schema.read(event)?;
        if let Some(age) = event.age(Utc::now()) {
            debug!("Run status event emitted {age}s ago");
        }

        let run_id = event.run_id()?;
        info!("Run ID: {run_id}, status {}", event.detail.status);
        debug!(
            "Event resources {:?}, engine version {}",
            event.resources,
            event.detail.omics_version.as_deref().unwrap_or("unknown")
        );

        if !route(&event).contains(&Target::ChainedDispatch) {
            warn!(
                "Event from {} with status {} does not match the completed run rule",
                event.source.as_deref().unwrap_or("unknown source"),
                event.detail.status
            );
            if event.source.as_deref() != Some(ENGINE_SOURCE) {
                return Ok(skipped(format!("run {run_id} event is not from {ENGINE_SOURCE}"), None));
            }
            let state = match event.detail.status {
                RunStatus::Failed => self.failed_state(run_id).await,
                _ => None,
            };
            return Ok(skipped(format!("run {run_id} is {}", event.detail.status), state));
        }

        let run = self.engine.get_run(run_id).await?;
        if run.workflow_id != self.config.upstream_workflow_id {
            info!(
                "Expected input from workflow ({}), but received input from workflow ({})",
                self.config.upstream_workflow_id, run.workflow_id
            );
            // completions of our own downstream runs end the chain
            let state = self.finished_state(&run, RunStatus::Completed);
            return Ok(skipped(format!("run {run_id} belongs to workflow {}", run.workflow_id), state));
        }
        info!(
            "Workflow ID: {} matched, continue processing run {} ({})",
            run.workflow_id,
            run.id,
            run.status.as_deref().unwrap_or("unknown status")
        );
        let state = self
            .finished_state(&run, RunStatus::Completed)
            .unwrap_or(PipelineState::Run1Completed);

        let output_prefix = S3Uri::parse(&run.output_uri)?.folder(&run.id);
        let artifact = locate_artifact(self.store.as_ref(), &output_prefix, ARTIFACT_SUFFIX).await?;

        let request = self.run_request(&run, &artifact);
        let response = self.engine.start_run(&request).await?;
        let state = state.next(Transition::Submit).unwrap_or(PipelineState::Run2Submitted);
        info!(
            "Successfully started run ID: {} for sample: {}, pipeline state {}",
            response.id,
            sample_name(&artifact),
            state
        );

        Ok(Outcome::Submitted { run_ids: vec![response.id], state })
    }

    /// A failed run is labelled by the workflow it belongs to; a failed lookup only loses the label
    async fn failed_state(&self, run_id: &str) -> Option<PipelineState> {
        match self.engine.get_run(run_id).await {
            Ok(run) => self.finished_state(&run, RunStatus::Failed),
            Err(err) => {
                warn!("Can't look up failed run {run_id}: {err}");
                None
            }
        }
    }

    fn finished_state(&self, run: &RunDescriptor, status: RunStatus) -> Option<PipelineState> {
        let submitted = if run.workflow_id == self.config.upstream_workflow_id {
            PipelineState::Run1Submitted
        } else if run.workflow_id == self.config.run.workflow_id {
            PipelineState::Run2Submitted
        } else {
            return None;
        };
        submitted.next(Transition::Finish(status))
    }

    fn run_request(&self, parent: &RunDescriptor, artifact: &S3Uri) -> StartRunRequest {
        let sample = sample_name(artifact);
        let annotation = &self.config.annotation;
        let parameters = json!({
            "id": sample,
            "vcf": artifact.to_string(),
            "vep_species": annotation.species,
            "vep_genome": annotation.genome,
            "ecr_registry": self.config.ecr_registry,
            "vep_cache": annotation.cache_dir,
            "vep_cache_version": annotation.cache_version,
        });
        let tags = BTreeMap::from([
            ("SOURCE".to_string(), SOURCE_TAG.to_string()),
            ("PARENT_WORKFLOW_ID".to_string(), self.config.upstream_workflow_id.clone()),
            ("PARENT_WORKFLOW_RUN_ID".to_string(), parent.id.clone()),
            ("SAMPLE_NAME".to_string(), sample.to_string()),
            (
                "IDEMPOTENCY_KEY".to_string(),
                format!("{}:{}", parent.id, self.config.run.workflow_id),
            ),
        ]);

        StartRunRequest {
            workflow_type: WorkflowType::Private,
            workflow_id: self.config.run.workflow_id.clone(),
            name: format!("VEP Sample {} {}", sample, Uuid::new_v4()),
            role_arn: self.config.run.role_arn.clone(),
            parameters,
            output_uri: self.config.run.output_uri.clone(),
            log_level: self.config.run.log_level.clone(),
            tags,
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

fn skipped(reason: String, state: Option<PipelineState>) -> Outcome {
    info!("No workflow started: {reason}");
    if let Some(state) = state.filter(|s| s.is_terminal()) {
        info!("Pipeline reached terminal state {state}");
    }
    Outcome::Skipped { reason, state }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnnotationConfig, RunConfig};
    use crate::dispatch::ErrorKind;
    use crate::event::EventError;
    use crate::fake::{FakeEngine, FakeStore};

    static UPSTREAM: &str = "9500764";
    static DOWNSTREAM: &str = "4455667";

    fn config() -> ChainedConfig {
        ChainedConfig {
            run: RunConfig {
                workflow_id: DOWNSTREAM.to_string(),
                role_arn: "arn:aws:iam::000000000000:role/omics".to_string(),
                output_uri: "s3://omics-output/outputs".to_string(),
                log_level: "ALL".to_string(),
            },
            upstream_workflow_id: UPSTREAM.to_string(),
            ecr_registry: "000000000000.dkr.ecr.us-west-2.amazonaws.com".to_string(),
            annotation: AnnotationConfig {
                species: "homo_sapiens".to_string(),
                genome: "GRCh38".to_string(),
                cache_dir: "s3://aws-genomics-static-us-west-2/omics-tutorials/data/databases/vep/".to_string(),
                cache_version: "110".to_string(),
            },
        }
    }

    fn completed(run_id: &str) -> Value {
        status_change(run_id, "COMPLETED")
    }

    fn status_change(run_id: &str, status: &str) -> Value {
        let arn = format!("arn:aws:omics:us-west-2:000000000000:run/{run_id}");
        json!({
            "version": "0",
            "id": "4c338660-3a89-69ad-40d5-aakjhfjkaf",
            "detail-type": "Run Status Change",
            "source": "aws.omics",
            "account": "000000000000",
            "time": "2023-07-28T06:19:39Z",
            "region": "us-west-2",
            "resources": [arn],
            "detail": {"omicsVersion": "1.0.0", "arn": arn, "status": status}
        })
    }

    fn outputs() -> FakeStore {
        FakeStore::new()
            .with_object("s3://omics-output/outputs/1111111/out/a.txt", "")
            .with_object("s3://omics-output/outputs/1111111/out/sample42.vcf.gz", "")
            .with_object("s3://omics-output/outputs/1111111/out/b.bam", "")
    }

    fn dispatcher(store: FakeStore, engine: &Arc<FakeEngine>) -> ChainedDispatcher {
        ChainedDispatcher::new(config(), Arc::new(store), engine.clone()).unwrap()
    }

    #[tokio::test]
    async fn completed_upstream_run_starts_downstream_run() {
        let engine = Arc::new(FakeEngine::new().with_run("1111111", UPSTREAM, "s3://omics-output/outputs"));

        let outcome = dispatcher(outputs(), &engine).handle(completed("1111111")).await.unwrap();

        assert!(matches!(outcome, Outcome::Submitted { state: PipelineState::Run2Submitted, .. }));
        let submitted = engine.submitted();
        assert_eq!(submitted.len(), 1);
        let request = &submitted[0];
        assert_eq!(request.workflow_type, WorkflowType::Private);
        assert_eq!(request.workflow_id, DOWNSTREAM);
        assert!(request.name.starts_with("VEP Sample sample42 "));
        assert_eq!(request.parameters["id"], "sample42");
        assert_eq!(request.parameters["vcf"], "s3://omics-output/outputs/1111111/out/sample42.vcf.gz");
        assert_eq!(request.parameters["vep_species"], "homo_sapiens");
        assert_eq!(request.parameters["vep_genome"], "GRCh38");
        assert_eq!(request.parameters["vep_cache_version"], "110");
        assert_eq!(request.parameters["ecr_registry"], "000000000000.dkr.ecr.us-west-2.amazonaws.com");
        assert_eq!(request.tags["SOURCE"], "LAMBDA_POST_INITIAL_WORKFLOW");
        assert_eq!(request.tags["PARENT_WORKFLOW_ID"], UPSTREAM);
        assert_eq!(request.tags["PARENT_WORKFLOW_RUN_ID"], "1111111");
        assert_eq!(request.tags["SAMPLE_NAME"], "sample42");
    }

    #[tokio::test]
    async fn run_from_other_workflow_is_a_no_op() {
        let engine = Arc::new(FakeEngine::new().with_run("1111111", "8888888", "s3://omics-output/outputs"));

        let outcome = dispatcher(outputs(), &engine).handle(completed("1111111")).await.unwrap();

        assert!(matches!(outcome, Outcome::Skipped { state: None, .. }));
        assert_eq!(outcome.to_response()["runIds"], json!([]));
        assert_eq!(engine.attempts(), 0);
    }

    #[tokio::test]
    async fn completed_downstream_run_ends_the_chain() {
        let engine = Arc::new(FakeEngine::new().with_run("1111111", DOWNSTREAM, "s3://omics-output/outputs"));

        let outcome = dispatcher(outputs(), &engine).handle(completed("1111111")).await.unwrap();

        assert!(matches!(outcome, Outcome::Skipped { state: Some(PipelineState::Run2Completed), .. }));
        assert_eq!(engine.attempts(), 0);
    }

    #[tokio::test]
    async fn missing_artifact_is_fatal_and_submits_nothing() {
        let engine = Arc::new(FakeEngine::new().with_run("1111111", UPSTREAM, "s3://omics-output/outputs"));
        let store = FakeStore::new()
            .with_object("s3://omics-output/outputs/1111111/out/a.txt", "")
            .with_object("s3://omics-output/outputs/1111111/out/b.bam", "");

        let result = dispatcher(store, &engine).handle(completed("1111111")).await;

        match result {
            Err(err @ DispatchError::MissingArtifact(_)) => assert_eq!(err.kind(), ErrorKind::Fatal),
            other => panic!("expected missing artifact, got {other:?}"),
        }
        assert_eq!(engine.attempts(), 0);
    }

    #[tokio::test]
    async fn wrong_detail_type_is_rejected() {
        let engine = Arc::new(FakeEngine::new());
        let mut event = completed("1111111");
        event["detail-type"] = json!("Object Created");

        let result = dispatcher(outputs(), &engine).handle(event).await;

        assert!(matches!(result, Err(DispatchError::Event(EventError::UnexpectedDetailType(_)))));
        assert_eq!(engine.attempts(), 0);
    }

    #[tokio::test]
    async fn failed_status_is_not_chained() {
        let engine = Arc::new(FakeEngine::new().with_run("1111111", UPSTREAM, "s3://omics-output/outputs"));

        let outcome = dispatcher(outputs(), &engine).handle(status_change("1111111", "FAILED")).await.unwrap();

        assert!(matches!(outcome, Outcome::Skipped { state: Some(PipelineState::Run1Failed), .. }));
        assert_eq!(engine.attempts(), 0);
    }

    #[tokio::test]
    async fn failed_runs_are_labelled_by_their_workflow() {
        let engine = Arc::new(
            FakeEngine::new()
                .with_run("2222222", DOWNSTREAM, "s3://omics-output/outputs")
                .with_run("3333333", "8888888", "s3://omics-output/outputs"),
        );
        let dispatcher = dispatcher(outputs(), &engine);

        let downstream = dispatcher.handle(status_change("2222222", "FAILED")).await.unwrap();
        let unrelated = dispatcher.handle(status_change("3333333", "FAILED")).await.unwrap();
        let unknown = dispatcher.handle(status_change("4444444", "FAILED")).await.unwrap();

        assert!(matches!(downstream, Outcome::Skipped { state: Some(PipelineState::Run2Failed), .. }));
        assert!(matches!(unrelated, Outcome::Skipped { state: None, .. }));
        assert!(matches!(unknown, Outcome::Skipped { state: None, .. }));
        assert_eq!(engine.attempts(), 0);
    }

    #[tokio::test]
    async fn sibling_run_output_is_never_chained() {
        let engine = Arc::new(FakeEngine::new().with_run("1111111", UPSTREAM, "s3://omics-output/outputs"));
        let store = FakeStore::new()
            .with_object("s3://omics-output/outputs/1111111/out/a.txt", "")
            .with_object("s3://omics-output/outputs/11111112/out/other_sample.vcf.gz", "");

        let result = dispatcher(store, &engine).handle(completed("1111111")).await;

        assert!(matches!(result, Err(DispatchError::MissingArtifact(_))));
        assert_eq!(engine.attempts(), 0);
    }

    #[tokio::test]
    async fn submission_failure_is_surfaced() {
        let engine = Arc::new(
            FakeEngine::new()
                .with_run("1111111", UPSTREAM, "s3://omics-output/outputs")
                .failing_for("VEP Sample"),
        );

        let result = dispatcher(outputs(), &engine).handle(completed("1111111")).await;

        assert!(matches!(result, Err(DispatchError::Engine(_))));
        assert_eq!(engine.attempts(), 1);
    }

    #[tokio::test]
    async fn unknown_run_is_an_engine_error() {
        let engine = Arc::new(FakeEngine::new());

        let result = dispatcher(outputs(), &engine).handle(completed("1111111")).await;

        assert!(matches!(result, Err(DispatchError::Engine(_))));
    }

    #[tokio::test]
    async fn redelivered_event_submits_twice() {
        let engine = Arc::new(FakeEngine::new().with_run("1111111", UPSTREAM, "s3://omics-output/outputs"));
        let dispatcher = dispatcher(outputs(), &engine);

        dispatcher.handle(completed("1111111")).await.unwrap();
        dispatcher.handle(completed("1111111")).await.unwrap();

        let submitted = engine.submitted();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].tags["IDEMPOTENCY_KEY"], submitted[1].tags["IDEMPOTENCY_KEY"]);
        assert_ne!(submitted[0].request_id, submitted[1].request_id);
    }
}
