//! API Client
//!
//! Main client for the remote appliance, combining the session and the
//! HTTP wrapper. It is also the factory for per-resource interfaces.

use super::http::{HttpClient, RequestDescription};
use super::resource::{HttpResource, ResourceFactory};
use crate::config::SessionContext;
use crate::error::CliResult;
use crate::resource::ResourceDescriptor;
use reqwest::Method;
use serde_json::Value;

/// Main API client
#[derive(Clone)]
pub struct ApiClient {
    pub session: SessionContext,
    pub http: HttpClient,
}

impl ApiClient {
    pub fn new(session: SessionContext) -> CliResult<Self> {
        let http = HttpClient::new(session.verify_tls)?;
        Ok(Self { session, http })
    }

    /// Absolute URL for an API path such as `/api/load-balancers`
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.session.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn describe(&self, method: Method, path: &str) -> RequestDescription {
        RequestDescription::new(method, self.url(path))
    }

    /// Execute a described request with this session's credentials
    pub async fn execute(&self, request: &RequestDescription) -> CliResult<Value> {
        self.http
            .send(
                request,
                self.session.access_token.as_deref(),
                &self.session.request_id,
            )
            .await
    }
}

impl ResourceFactory for ApiClient {
    type Resource<'a> = HttpResource<'a>;

    fn resource<'a>(&'a self, descriptor: &'a ResourceDescriptor) -> Self::Resource<'a> {
        HttpResource::new(self, descriptor)
    }
}
