use std::sync::Arc;

use clap::Parser;
use lambda_runtime::{service_fn, LambdaEvent};
use log::{error, info};
use rusoto_core::Region;
use serde_json::Value;

use crate::config::{Args, StageConfig};
use crate::dispatch::chained::ChainedDispatcher;
use crate::dispatch::initial::InitialDispatcher;
use crate::dispatch::{DispatchError, Outcome};
use crate::engine::omics::OmicsClient;
use crate::engine::WorkflowEngine;
use crate::store::s3::S3Store;
use crate::store::ObjectStore;

mod config;
mod dispatch;
mod engine;
mod event;
mod manifest;
mod pipeline;
mod stage;
mod store;

#[cfg(test)]
mod fake;

/// The handler a process serves, built once and reused for every invocation
enum Handler {
    Initial(InitialDispatcher),
    Chained(ChainedDispatcher),
}

impl Handler {
    async fn handle(&self, event: Value) -> Result<Outcome, DispatchError> {
        match self {
            Handler::Initial(dispatcher) => dispatcher.handle(event).await,
            Handler::Chained(dispatcher) => dispatcher.handle(event).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    let args = Args::parse();
    env_logger::Builder::new().parse_filters(&args.log_level).init();
    info!("Starting {} stage handler", args.stage);

    let config = args.stage_config()?;
    let region = Region::default();
    let store: Arc<dyn ObjectStore> = Arc::new(S3Store::new(region.clone()));
    let engine: Arc<dyn WorkflowEngine> = Arc::new(OmicsClient::new(region)?);

    let handler = match config {
        StageConfig::Initial(config) => Handler::Initial(InitialDispatcher::new(config, store, engine)?),
        StageConfig::Chained(config) => Handler::Chained(ChainedDispatcher::new(config, store, engine)?),
    };
    let handler = Arc::new(handler);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = handler.clone();
        async move { invoke(&handler, event).await }
    }))
    .await
}

async fn invoke(handler: &Handler, event: LambdaEvent<Value>) -> Result<Value, lambda_runtime::Error> {
    info!("Invocation {} started", event.context.request_id);
    match handler.handle(event.payload).await {
        Ok(outcome) => Ok(outcome.to_response()),
        Err(err) => {
            error!("Invocation failed ({:?}): {}", err.kind(), err);
            Err(err.into())
        }
    }
}
