use serde::Deserialize;
use url::form_urlencoded;

use crate::event::EventError;
use crate::store::S3Uri;

/// Object created notification delivered by the store
///
/// Batch operations can deliver more than one record per event, which is not supported.
#[derive(Debug, Deserialize)]
pub struct ObjectCreatedEvent {
    #[serde(rename = "Records")]
    pub records: Vec<ObjectRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
pub struct BucketEntity {
    pub name: String,
    pub arn: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
    pub size: Option<u64>,
}

impl ObjectCreatedEvent {
    pub fn single_record(&self) -> Result<&ObjectRecord, EventError> {
        match self.records.as_slice() {
            [record] => Ok(record),
            records => Err(EventError::RecordCount(records.len())),
        }
    }
}

impl ObjectRecord {
    pub fn location(&self) -> S3Uri {
        S3Uri::new(&self.s3.bucket.name, &self.s3.object.decoded_key())
    }
}

impl ObjectEntity {
    /// Notification keys are form encoded: a space arrives as `+` and `+` itself as `%2B`
    pub fn decoded_key(&self) -> String {
        form_urlencoded::parse(format!("key={}", self.key).as_bytes())
            .map(|(_, key)| key.into_owned())
            .next()
            .unwrap_or_default()
    }
}
