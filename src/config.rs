//! Environment backed configuration, checked once before the first invocation

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use crate::stage::Stage;
use crate::store::S3Uri;

/// Every value can be set as a flag for local use, but deployments set environment variables
#[derive(Parser, Debug)]
#[command(name = "omics-chain")]
#[command(about = "Start workflow runs from manifest uploads and chain them on run completion")]
pub struct Args {
    /// Which handler this process serves
    #[arg(long, env = "STAGE", value_enum)]
    pub stage: Stage,

    /// Output location for started runs (s3://bucket/prefix)
    #[arg(long, env = "OUTPUT_S3_LOCATION")]
    pub output_location: String,

    /// Role the engine assumes while executing runs
    #[arg(long, env = "OMICS_ROLE")]
    pub omics_role: String,

    /// Workflow started by this stage
    #[arg(long, env = "WORKFLOW_ID")]
    pub workflow_id: String,

    /// Container registry passed to the downstream workflow
    #[arg(long, env = "ECR_REGISTRY")]
    pub ecr_registry: String,

    /// Filter for the process logger, e.g. INFO or omics_chain=debug
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    pub log_level: String,

    /// Log level of the started runs inside the engine
    #[arg(long, env = "RUN_LOG_LEVEL", default_value = "ALL")]
    pub run_log_level: String,

    #[arg(long, env = "MANIFEST_PREFIX", default_value = "fastqs/")]
    pub manifest_prefix: String,

    #[arg(long, env = "MANIFEST_SUFFIX", default_value = ".csv")]
    pub manifest_suffix: String,

    /// Local ephemeral storage for downloaded manifests
    #[arg(long, env = "WORK_DIR", default_value = "/tmp")]
    pub work_dir: PathBuf,

    /// Completed runs of any other workflow are ignored by the chained stage
    #[arg(long, env = "UPSTREAM_WORKFLOW_ID")]
    pub upstream_workflow_id: Option<String>,

    #[arg(long, env = "SPECIES", default_value = "homo_sapiens")]
    pub species: String,

    #[arg(long, env = "GENOME", default_value = "GRCh38")]
    pub genome: String,

    /// Annotation cache location
    #[arg(long, env = "DIR_CACHE")]
    pub dir_cache: Option<String>,

    #[arg(long, env = "CACHE_VERSION", default_value = "110")]
    pub cache_version: String,
}

/// Settings shared by every run a stage starts
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub workflow_id: String,
    pub role_arn: String,
    pub output_uri: String,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct InitialConfig {
    pub run: RunConfig,
    pub manifest_prefix: String,
    pub manifest_suffix: String,
    pub work_dir: PathBuf,
}

/// Reference genome and annotation database settings of the downstream run
#[derive(Debug, Clone)]
pub struct AnnotationConfig {
    pub species: String,
    pub genome: String,
    pub cache_dir: String,
    pub cache_version: String,
}

#[derive(Debug, Clone)]
pub struct ChainedConfig {
    pub run: RunConfig,
    pub upstream_workflow_id: String,
    pub ecr_registry: String,
    pub annotation: AnnotationConfig,
}

#[derive(Debug, Clone)]
pub enum StageConfig {
    Initial(InitialConfig),
    Chained(ChainedConfig),
}

impl Args {
    pub fn stage_config(&self) -> Result<StageConfig> {
        S3Uri::parse(&self.output_location).context("OUTPUT_S3_LOCATION must be an s3:// URI")?;

        let run = RunConfig {
            workflow_id: self.workflow_id.clone(),
            role_arn: self.omics_role.clone(),
            output_uri: self.output_location.clone(),
            log_level: self.run_log_level.clone(),
        };

        match self.stage {
            Stage::Initial => Ok(StageConfig::Initial(InitialConfig {
                run,
                manifest_prefix: self.manifest_prefix.clone(),
                manifest_suffix: self.manifest_suffix.clone(),
                work_dir: self.work_dir.clone(),
            })),
            Stage::Chained => {
                let upstream_workflow_id = self
                    .upstream_workflow_id
                    .clone()
                    .ok_or_else(|| anyhow!("UPSTREAM_WORKFLOW_ID must be set for the {} stage", self.stage))?;
                let cache_dir = self
                    .dir_cache
                    .clone()
                    .ok_or_else(|| anyhow!("DIR_CACHE must be set for the {} stage", self.stage))?;
                Ok(StageConfig::Chained(ChainedConfig {
                    run,
                    upstream_workflow_id,
                    ecr_registry: self.ecr_registry.clone(),
                    annotation: AnnotationConfig {
                        species: self.species.clone(),
                        genome: self.genome.clone(),
                        cache_dir,
                        cache_version: self.cache_version.clone(),
                    },
                }))
            }
        }
    }
}
