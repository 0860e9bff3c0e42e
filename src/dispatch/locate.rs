use log::{info, warn};

use crate::dispatch::DispatchError;
use crate::store::{ObjectStore, S3Uri};

/// Compressed variant calls written by the upstream workflow
pub static ARTIFACT_SUFFIX: &str = ".vcf.gz";

/// Page through a run's output prefix until a key with `suffix` turns up
///
/// The first match in listing order wins. Later matches on the same page are only logged,
/// and pages after the winning one are never requested.
pub async fn locate_artifact(
    store: &dyn ObjectStore,
    prefix: &S3Uri,
    suffix: &str,
) -> Result<S3Uri, DispatchError> {
    info!("Searching {} for a {} file", prefix, suffix);
    let mut continuation: Option<String> = None;

    loop {
        let page = store.list_page(&prefix.bucket, &prefix.key, continuation).await?;
        let mut matches = page.keys.iter().filter(|key| key.ends_with(suffix));

        if let Some(key) = matches.next() {
            let ignored: Vec<&String> = matches.collect();
            if !ignored.is_empty() {
                warn!("Found {} more {} files, ignoring {:?}", ignored.len(), suffix, ignored);
            }
            let artifact = S3Uri::new(&prefix.bucket, key);
            info!("Found output artifact {}", artifact);
            return Ok(artifact);
        }

        match page.next {
            Some(token) => continuation = Some(token),
            None => return Err(DispatchError::MissingArtifact(prefix.to_string())),
        }
    }
}

/// Sample identifier is the artifact basename up to the first `.`
pub fn sample_name(artifact: &S3Uri) -> &str {
    artifact.basename().split('.').next().unwrap_or_default()
}
