use async_trait::async_trait;
use log::{debug, trace, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::endpoints::Endpoint;
use super::types::*;
use crate::error_handling::types::TransportError;

/// Typed boundary over the backend REST API.
///
/// One method per endpoint. Read endpoints return the decoded response record,
/// write endpoints return `()` once the backend acknowledged with a 2xx status.
/// Implementations never retry and never cache.
#[async_trait]
pub trait Api: Send + Sync {
    async fn get_services(&self) -> Result<GetServicesResponse, TransportError>;

    async fn get_rules(&self) -> Result<GetRulesResponse, TransportError>;

    async fn upsert_service(&self, req: &UpsertServiceRequest) -> Result<(), TransportError>;

    async fn delete_service(&self, req: &DeleteServiceRequest) -> Result<(), TransportError>;

    async fn create_rule(&self, req: &RuleRequest) -> Result<(), TransportError>;

    async fn update_rule(&self, req: &RuleRequest) -> Result<(), TransportError>;

    async fn delete_rule(&self, req: &DeleteRuleRequest) -> Result<(), TransportError>;

    async fn delete_service_to_rules(
        &self,
        req: &DeleteServiceToRulesRequest,
    ) -> Result<(), TransportError>;

    async fn get_last_streams(
        &self,
        req: &GetLastStreamsRequest,
    ) -> Result<StreamsResponse, TransportError>;

    async fn get_streams_by_service_ids(
        &self,
        req: &GetStreamsByServiceIdsRequest,
    ) -> Result<StreamsResponse, TransportError>;
}

/// [`Api`] over HTTP using a shared `reqwest` connection pool.
///
/// Construct it once at startup and share it behind an `Arc<dyn Api>`.
#[derive(Clone)]
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        debug!("HttpApiClient targeting {}", base_url);
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute<B>(
        &self,
        endpoint: Endpoint,
        body: Option<&B>,
    ) -> Result<reqwest::Response, TransportError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = endpoint.url(&self.base_url);
        trace!("{} {}", endpoint.method(), url);

        let mut request = self.http.request(endpoint.method(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!("{} {} failed: {}", endpoint.method(), url, e);
            TransportError::Network(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .ok()
            .filter(|text| !text.trim().is_empty());
        warn!(
            "{} {} answered {}{}",
            endpoint.method(),
            url,
            status.as_u16(),
            body.as_deref()
                .map(|b| format!(": {}", b))
                .unwrap_or_default()
        );
        Err(TransportError::Http {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch<B, R>(&self, endpoint: Endpoint, body: Option<&B>) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let response = self.execute(endpoint, body).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Undecodable response from {}: {}", endpoint.path(), e);
            TransportError::Decode(e.to_string())
        })
    }

    async fn submit<B>(&self, endpoint: Endpoint, body: &B) -> Result<(), TransportError>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(endpoint, Some(body)).await.map(|_| ())
    }
}

#[async_trait]
impl Api for HttpApiClient {
    async fn get_services(&self) -> Result<GetServicesResponse, TransportError> {
        self.fetch::<(), _>(Endpoint::GetServices, None).await
    }

    async fn get_rules(&self) -> Result<GetRulesResponse, TransportError> {
        self.fetch::<(), _>(Endpoint::GetRules, None).await
    }

    async fn upsert_service(&self, req: &UpsertServiceRequest) -> Result<(), TransportError> {
        self.submit(Endpoint::UpsertService, req).await
    }

    async fn delete_service(&self, req: &DeleteServiceRequest) -> Result<(), TransportError> {
        self.submit(Endpoint::DeleteService, req).await
    }

    async fn create_rule(&self, req: &RuleRequest) -> Result<(), TransportError> {
        self.submit(Endpoint::CreateRule, req).await
    }

    async fn update_rule(&self, req: &RuleRequest) -> Result<(), TransportError> {
        self.submit(Endpoint::UpdateRule, req).await
    }

    async fn delete_rule(&self, req: &DeleteRuleRequest) -> Result<(), TransportError> {
        self.submit(Endpoint::DeleteRule, req).await
    }

    async fn delete_service_to_rules(
        &self,
        req: &DeleteServiceToRulesRequest,
    ) -> Result<(), TransportError> {
        self.submit(Endpoint::DeleteServiceToRules, req).await
    }

    async fn get_last_streams(
        &self,
        req: &GetLastStreamsRequest,
    ) -> Result<StreamsResponse, TransportError> {
        self.fetch(Endpoint::GetLastStreams, Some(req)).await
    }

    async fn get_streams_by_service_ids(
        &self,
        req: &GetStreamsByServiceIdsRequest,
    ) -> Result<StreamsResponse, TransportError> {
        self.fetch(Endpoint::GetStreamsByServiceIds, Some(req)).await
    }
}
