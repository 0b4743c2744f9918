//! Option source lookups
//!
//! Named choice lists are served by `GET /api/options/{source}`, which
//! answers `{"data": [{"name": ..., "value": ...}]}`.

use super::client::ApiClient;
use crate::error::CliResult;
use crate::options::{Choice, ChoiceProvider, ValueMap};
use crate::options::field::scalar_string;
use reqwest::Method;
use serde_json::Value;

pub struct ApiChoiceSource<'a> {
    client: &'a ApiClient,
}

impl<'a> ApiChoiceSource<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }
}

impl ChoiceProvider for ApiChoiceSource<'_> {
    async fn resolve(&self, source: &str, params: &ValueMap) -> CliResult<Vec<Choice>> {
        let query: Vec<(String, String)> = params
            .iter()
            .filter_map(|(k, v)| scalar_string(v).map(|v| (k.clone(), v)))
            .collect();
        let request = self
            .client
            .describe(Method::GET, &format!("/api/options/{}", urlencoding::encode(source)))
            .with_query(&query);
        let response = self.client.execute(&request).await?;
        Ok(parse_choices(&response))
    }
}

/// Read choices from an option source response. Entries without a name
/// fall back to their value as label.
pub fn parse_choices(response: &Value) -> Vec<Choice> {
    response
        .get("data")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let value = item.get("value")?.clone();
                    let label = item
                        .get("name")
                        .and_then(scalar_string)
                        .or_else(|| scalar_string(&value))
                        .unwrap_or_default();
                    Some(Choice { label, value })
                })
                .collect()
        })
        .unwrap_or_default()
}
