use jsonschema::JSONSchema;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::event::EventError;

/// included notification schemas
static OBJECT_CREATED: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/object_created.json"));
static RUN_STATUS_CHANGE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/run_status_change.json"));

/// A compiled JSON schema for one kind of incoming event
pub struct EventSchema {
    name: &'static str,
    compiled: JSONSchema,
}

impl EventSchema {
    pub fn object_created() -> Result<EventSchema, EventError> {
        EventSchema::compile("object created", OBJECT_CREATED)
    }

    pub fn run_status_change() -> Result<EventSchema, EventError> {
        EventSchema::compile("run status change", RUN_STATUS_CHANGE)
    }

    fn compile(name: &'static str, raw: &str) -> Result<EventSchema, EventError> {
        let schema: Value = serde_json::from_str(raw)
            .map_err(|err| EventError::SchemaError(format!("{name}: {err}")))?;
        let compiled = JSONSchema::compile(&schema)
            .map_err(|err| EventError::SchemaError(format!("{name}: {err}")))?;
        Ok(EventSchema { name, compiled })
    }

    /// Validate an untyped event, then deserialise it into a typed Rust object
    pub fn read<T: DeserializeOwned>(&self, event: Value) -> Result<T, EventError> {
        self.validate(&event)?;
        info!("Deserialising valid {} event into typed Rust object", self.name);
        serde_json::from_value::<T>(event).map_err(|err| EventError::DecodeError(err.to_string()))
    }

    fn validate(&self, event: &Value) -> Result<(), EventError> {
        self.compiled.validate(event).map_err(|errors| {
            let messages: Vec<String> = errors.map(|err| err.to_string()).collect();
            warn!("Event fails {} validation", self.name);
            EventError::InvalidEvent(messages.join("; "))
        })
    }
}
