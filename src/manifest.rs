//! Parse an uploaded sample manifest into one parameter group per sample
//!
//! The manifest is a comma separated text file with a fixed header:
//!
//! ```text
//! sample_name,read_group,fastq_1,fastq_2,platform
//! SampleX,RG1,s3://path/to/SampleX/RG1/001_R1.fastq.gz,s3://path/to/SampleX/RG1/001_R2.fastq.gz,solid
//! SampleX,RG2,s3://path/to/SampleX/RG2/001_R1.fastq.gz,s3://path/to/SampleX/RG2/001_R2.fastq.gz,solid
//! ```
//!
//! Rows are grouped by sample name. Each group becomes the `parameters` of exactly one
//! initial workflow run.

use std::fmt;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use serde::Serialize;

pub static MANIFEST_HEADER: &str = "sample_name,read_group,fastq_1,fastq_2,platform";

#[derive(Debug)]
pub enum ManifestError {
    ReadError(String),
    InvalidHeader(String),
    MalformedRow { line: usize, fields: usize },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ManifestError::ReadError(err) => write!(f, "can't read sample manifest: {err}"),
            ManifestError::InvalidHeader(header) => {
                write!(f, "invalid sample manifest CSV header: {header:?}")
            }
            ManifestError::MalformedRow { line, fields } => write!(
                f,
                "malformed sample manifest row at line {line}: expected 5 fields, found {fields}"
            ),
        }
    }
}

impl std::error::Error for ManifestError {}

/// One read group of a sample, serialised into the workflow `fastq_pairs` parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FastqPair {
    pub read_group: String,
    pub fastq_1: String,
    pub fastq_2: String,
    pub platform: String,
}

/// Every read group that shares a sample name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleParams {
    pub sample_name: String,
    pub fastq_pairs: Vec<FastqPair>,
}

impl SampleParams {
    fn new(sample_name: &str) -> SampleParams {
        SampleParams { sample_name: sample_name.to_string(), fastq_pairs: Vec::new() }
    }

    /// Repeated read groups keep their first position, but their fields are overwritten
    fn insert(&mut self, row: ManifestRow) {
        match self.fastq_pairs.iter_mut().find(|p| p.read_group == row.read_group) {
            Some(pair) => {
                debug!("Read group {} repeated for sample {}, overwriting", row.read_group, self.sample_name);
                pair.fastq_1 = row.fastq_1;
                pair.fastq_2 = row.fastq_2;
                pair.platform = row.platform;
            }
            None => self.fastq_pairs.push(FastqPair {
                read_group: row.read_group,
                fastq_1: row.fastq_1,
                fastq_2: row.fastq_2,
                platform: row.platform,
            }),
        }
    }
}

struct ManifestRow {
    sample_name: String,
    read_group: String,
    fastq_1: String,
    fastq_2: String,
    platform: String,
}

impl ManifestRow {
    fn parse(line: &str, line_number: usize) -> Result<ManifestRow, ManifestError> {
        let fields: Vec<&str> = line.split(',').collect();
        match fields.as_slice() {
            [sample_name, read_group, fastq_1, fastq_2, platform] => Ok(ManifestRow {
                sample_name: sample_name.to_string(),
                read_group: read_group.to_string(),
                fastq_1: fastq_1.to_string(),
                fastq_2: fastq_2.to_string(),
                platform: platform.to_string(),
            }),
            _ => Err(ManifestError::MalformedRow { line: line_number, fields: fields.len() }),
        }
    }
}

/// Read a downloaded manifest from local storage and group it by sample
pub fn read_manifest(path: &Path) -> Result<Vec<SampleParams>, ManifestError> {
    info!("Reading sample manifest at {}", path.display());
    let contents = fs::read_to_string(path).map_err(|err| {
        warn!("Can't read sample manifest at path {}: {}", path.display(), err);
        ManifestError::ReadError(err.to_string())
    })?;
    parse_manifest(&contents)
}

/// Groups are returned in order of first appearance of each sample name
pub fn parse_manifest(contents: &str) -> Result<Vec<SampleParams>, ManifestError> {
    let mut lines = contents.lines().enumerate();

    let header = lines.next().map(|(_, line)| line.trim()).unwrap_or_default();
    if header != MANIFEST_HEADER {
        return Err(ManifestError::InvalidHeader(header.to_string()));
    }

    let mut samples: Vec<SampleParams> = Vec::new();
    for (index, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = ManifestRow::parse(line, index + 1)?;
        let position = match samples.iter().position(|s| s.sample_name == row.sample_name) {
            Some(position) => position,
            None => {
                samples.push(SampleParams::new(&row.sample_name));
                samples.len() - 1
            }
        };
        samples[position].insert(row);
    }

    for sample in &samples {
        info!("Creating input payload for sample: {}", sample.sample_name);
    }

    Ok(samples)
}
