use async_trait::async_trait;
use log::{debug, info};
use rusoto_core::signature::SignedRequest;
use rusoto_core::{Client, HttpClient, Region};
use rusoto_credential::DefaultCredentialsProvider;
use serde::de::DeserializeOwned;

use crate::engine::{EngineError, RunDescriptor, StartRunRequest, StartRunResponse, WorkflowEngine};

/// Signing name of the workflow service
static SERVICE: &str = "omics";

pub struct OmicsClient {
    client: Client,
    region: Region,
}

impl OmicsClient {
    pub fn new(region: Region) -> Result<OmicsClient, EngineError> {
        let credentials = DefaultCredentialsProvider::new()
            .map_err(|err| EngineError::ClientError(err.to_string()))?;
        let dispatcher = HttpClient::new().map_err(|err| EngineError::ClientError(err.to_string()))?;
        info!("Created workflow engine client for region {}", region.name());
        Ok(OmicsClient { client: Client::new_with(credentials, dispatcher), region })
    }

    fn request(&self, method: &str, path: &str) -> SignedRequest {
        let mut request = SignedRequest::new(method, SERVICE, &self.region, path);
        // custom regions carry their own endpoint
        if !matches!(self.region, Region::Custom { .. }) {
            request.set_hostname(Some(format!("workflows-omics.{}.amazonaws.com", self.region.name())));
        }
        request
    }

    async fn dispatch<T: DeserializeOwned>(&self, request: SignedRequest) -> Result<T, EngineError> {
        let mut response = self
            .client
            .sign_and_dispatch(request)
            .await
            .map_err(|err| EngineError::TransportError(format!("{err:?}")))?;
        let response = response
            .buffer()
            .await
            .map_err(|err| EngineError::TransportError(err.to_string()))?;

        if !response.status.is_success() {
            return Err(EngineError::ApiError {
                status: response.status.as_u16(),
                message: String::from_utf8_lossy(&response.body).to_string(),
            });
        }

        debug!("Engine response: {}", String::from_utf8_lossy(&response.body));
        serde_json::from_slice::<T>(&response.body).map_err(|err| EngineError::DecodeError(err.to_string()))
    }
}

#[async_trait]
impl WorkflowEngine for OmicsClient {
    async fn start_run(&self, request: &StartRunRequest) -> Result<StartRunResponse, EngineError> {
        let body = serde_json::to_vec(request).map_err(|err| EngineError::DecodeError(err.to_string()))?;
        let mut signed = self.request("POST", "/run");
        signed.set_content_type("application/json".to_string());
        signed.set_payload(Some(body));
        self.dispatch(signed).await
    }

    async fn get_run(&self, run_id: &str) -> Result<RunDescriptor, EngineError> {
        let signed = self.request("GET", &format!("/run/{run_id}"));
        self.dispatch(signed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn requests_target_the_workflows_endpoint() {
        let client = OmicsClient::new(Region::UsWest2).unwrap();

        let request = client.request("GET", "/run/1111111");

        assert_eq!(request.hostname(), "workflows-omics.us-west-2.amazonaws.com");
        assert_eq!(request.path(), "/run/1111111");
        assert_eq!(request.method(), "GET");
    }
}
