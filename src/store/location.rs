use std::fmt;

use url::Url;

use crate::store::StoreError;

/// A bucket and key pair written as `s3://bucket/key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Uri {
    pub bucket: String,
    pub key: String,
}

impl S3Uri {
    pub fn new(bucket: &str, key: &str) -> S3Uri {
        S3Uri { bucket: bucket.to_string(), key: key.to_string() }
    }

    /// The key is taken verbatim after the bucket, so it is never percent-encoded
    pub fn parse(uri: &str) -> Result<S3Uri, StoreError> {
        let url = Url::parse(uri).map_err(|err| StoreError::InvalidUri(format!("{uri}: {err}")))?;
        if url.scheme() != "s3" {
            return Err(StoreError::InvalidUri(format!("{uri}: scheme is not s3")));
        }
        let bucket = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(StoreError::InvalidUri(format!("{uri}: missing bucket"))),
        };

        let key = uri
            .strip_prefix("s3://")
            .and_then(|rest| rest.split_once('/'))
            .map(|(_, key)| key.to_string())
            .unwrap_or_default();

        Ok(S3Uri { bucket, key })
    }

    /// Key prefix of a folder below this location, e.g. a run id under an output location
    ///
    /// The prefix always ends in `/` so listing it never reaches sibling folders that share
    /// a leading part of the name.
    pub fn folder(&self, segment: &str) -> S3Uri {
        let segment = segment.trim_matches('/');
        let key = match self.key.trim_end_matches('/') {
            "" => format!("{segment}/"),
            prefix => format!("{prefix}/{segment}/"),
        };
        S3Uri { bucket: self.bucket.clone(), key }
    }

    /// Object name after the last `/`
    pub fn basename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Display for S3Uri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
