use std::path::Path;

use async_trait::async_trait;
use log::{info, warn};
use rusoto_core::{Region, RusotoError};
use rusoto_s3::{GetObjectError, GetObjectRequest, ListObjectsV2Request, S3Client, S3};
use tokio::fs::{self, File};
use tokio::io::{self, AsyncRead};

use crate::store::{Download, ListPage, ObjectStore, S3Uri, StoreError};

pub struct S3Store {
    client: S3Client,
}

impl S3Store {
    pub fn new(region: Region) -> S3Store {
        S3Store { client: S3Client::new(region) }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn download(&self, location: &S3Uri, dest: &Path) -> Result<Download, StoreError> {
        let request = GetObjectRequest {
            bucket: location.bucket.clone(),
            key: location.key.clone(),
            ..Default::default()
        };

        let output = match self.client.get_object(request).await {
            Ok(output) => output,
            Err(RusotoError::Service(GetObjectError::NoSuchKey(_))) => {
                warn!("The object {} does not exist", location);
                return Ok(Download::NotFound);
            }
            Err(RusotoError::Unknown(response)) if response.status == 404 => {
                warn!("The object {} does not exist", location);
                return Ok(Download::NotFound);
            }
            Err(err) => return Err(StoreError::DownloadError(format!("{location}: {err}"))),
        };

        let body = output
            .body
            .ok_or_else(|| StoreError::DownloadError(format!("{location}: empty response body")))?;
        let bytes = write_body(body.into_async_read(), location, dest).await?;

        info!("Downloaded {} ({} bytes) to {}", location, bytes, dest.display());
        Ok(Download::Saved)
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage, StoreError> {
        let request = ListObjectsV2Request {
            bucket: bucket.to_string(),
            prefix: Some(prefix.to_string()),
            continuation_token: continuation,
            ..Default::default()
        };

        let output = self
            .client
            .list_objects_v2(request)
            .await
            .map_err(|err| StoreError::ListError(format!("s3://{bucket}/{prefix}: {err}")))?;

        let keys = output
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| object.key)
            .collect();
        let next = match output.is_truncated {
            Some(true) => output.next_continuation_token,
            _ => None,
        };

        Ok(ListPage { keys, next })
    }
}

/// Copy an object body to `dest`. A body that breaks off midway leaves no file behind.
async fn write_body<R: AsyncRead>(reader: R, location: &S3Uri, dest: &Path) -> Result<u64, StoreError> {
    tokio::pin!(reader);
    let mut file = File::create(dest)
        .await
        .map_err(|err| StoreError::WriteError(format!("{}: {err}", dest.display())))?;

    match io::copy(&mut reader, &mut file).await {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            drop(file);
            if let Err(remove_err) = fs::remove_file(dest).await {
                warn!("Can't remove partial download {}: {}", dest.display(), remove_err);
            }
            Err(StoreError::DownloadError(format!("{location}: {err}")))
        }
    }
}
