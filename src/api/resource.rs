//! Resource Interface
//!
//! The capability set the dispatcher needs from one resource type, and the
//! HTTP implementation driven by a [`ResourceDescriptor`].

use super::client::ApiClient;
use super::http::RequestDescription;
use crate::error::{CliError, CliResult};
use crate::resource::ResourceDescriptor;
use reqwest::Method;
use serde_json::Value;

/// Query string parameters, in order
pub type Query = Vec<(String, String)>;

/// One call against a resource, minus the parent scope
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    List { query: Query },
    Get { id: String, query: Query },
    Create { payload: Value },
    Update { id: String, payload: Value },
    Destroy { id: String, query: Query },
    Refresh { id: String, payload: Value },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Get { .. } => "get",
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Destroy { .. } => "destroy",
            Self::Refresh { .. } => "refresh",
        }
    }
}

/// CRUD capabilities of one resource type. `refresh` is optional and
/// reports [`CliError::Unsupported`] unless implemented.
#[allow(async_fn_in_trait)]
pub trait ResourceInterface {
    /// The request `operation` would send, without sending it
    fn describe(&self, parent_id: Option<&str>, operation: &Operation) -> CliResult<RequestDescription>;

    async fn list(&self, parent_id: Option<&str>, query: &Query) -> CliResult<Value>;

    async fn get(&self, parent_id: Option<&str>, id: &str, query: &Query) -> CliResult<Value>;

    async fn create(&self, parent_id: Option<&str>, payload: &Value) -> CliResult<Value>;

    async fn update(&self, parent_id: Option<&str>, id: &str, payload: &Value) -> CliResult<Value>;

    async fn destroy(&self, parent_id: Option<&str>, id: &str, query: &Query) -> CliResult<Value>;

    async fn refresh(&self, _parent_id: Option<&str>, _id: &str, _payload: &Value) -> CliResult<Value> {
        Err(CliError::Unsupported {
            resource: "resource".to_string(),
            verb: "refresh".to_string(),
        })
    }

    /// Run `operation` through the matching capability
    async fn call(&self, parent_id: Option<&str>, operation: &Operation) -> CliResult<Value> {
        match operation {
            Operation::List { query } => self.list(parent_id, query).await,
            Operation::Get { id, query } => self.get(parent_id, id, query).await,
            Operation::Create { payload } => self.create(parent_id, payload).await,
            Operation::Update { id, payload } => self.update(parent_id, id, payload).await,
            Operation::Destroy { id, query } => self.destroy(parent_id, id, query).await,
            Operation::Refresh { id, payload } => self.refresh(parent_id, id, payload).await,
        }
    }
}

/// Hands out a [`ResourceInterface`] per descriptor
pub trait ResourceFactory {
    type Resource<'a>: ResourceInterface
    where
        Self: 'a;

    fn resource<'a>(&'a self, descriptor: &'a ResourceDescriptor) -> Self::Resource<'a>;
}

/// REST implementation: collection/member paths from the descriptor
pub struct HttpResource<'a> {
    client: &'a ApiClient,
    descriptor: &'a ResourceDescriptor,
}

impl<'a> HttpResource<'a> {
    pub fn new(client: &'a ApiClient, descriptor: &'a ResourceDescriptor) -> Self {
        Self { client, descriptor }
    }
}

impl ResourceInterface for HttpResource<'_> {
    fn describe(&self, parent_id: Option<&str>, operation: &Operation) -> CliResult<RequestDescription> {
        let d = self.descriptor;
        let request = match operation {
            Operation::List { query } => self
                .client
                .describe(Method::GET, &d.collection_path(parent_id)?)
                .with_query(query),
            Operation::Get { id, query } => self
                .client
                .describe(Method::GET, &d.member_path(parent_id, id)?)
                .with_query(query),
            Operation::Create { payload } => self
                .client
                .describe(Method::POST, &d.collection_path(parent_id)?)
                .with_body(payload.clone()),
            Operation::Update { id, payload } => self
                .client
                .describe(Method::PUT, &d.member_path(parent_id, id)?)
                .with_body(payload.clone()),
            Operation::Destroy { id, query } => self
                .client
                .describe(Method::DELETE, &d.member_path(parent_id, id)?)
                .with_query(query),
            Operation::Refresh { id, payload } => {
                let path = format!("{}/refresh", d.member_path(parent_id, id)?);
                self.client
                    .describe(Method::POST, &path)
                    .with_body(payload.clone())
            }
        };
        Ok(request)
    }

    async fn list(&self, parent_id: Option<&str>, query: &Query) -> CliResult<Value> {
        let request = self.describe(parent_id, &Operation::List { query: query.clone() })?;
        self.client.execute(&request).await
    }

    async fn get(&self, parent_id: Option<&str>, id: &str, query: &Query) -> CliResult<Value> {
        let request = self.describe(
            parent_id,
            &Operation::Get {
                id: id.to_string(),
                query: query.clone(),
            },
        )?;
        self.client.execute(&request).await
    }

    async fn create(&self, parent_id: Option<&str>, payload: &Value) -> CliResult<Value> {
        tracing::info!("Creating {}", self.descriptor.display_name);
        let request = self.describe(
            parent_id,
            &Operation::Create {
                payload: payload.clone(),
            },
        )?;
        self.client.execute(&request).await
    }

    async fn update(&self, parent_id: Option<&str>, id: &str, payload: &Value) -> CliResult<Value> {
        tracing::info!("Updating {} {}", self.descriptor.display_name, id);
        let request = self.describe(
            parent_id,
            &Operation::Update {
                id: id.to_string(),
                payload: payload.clone(),
            },
        )?;
        self.client.execute(&request).await
    }

    async fn destroy(&self, parent_id: Option<&str>, id: &str, query: &Query) -> CliResult<Value> {
        tracing::info!("Deleting {} {}", self.descriptor.display_name, id);
        let request = self.describe(
            parent_id,
            &Operation::Destroy {
                id: id.to_string(),
                query: query.clone(),
            },
        )?;
        self.client.execute(&request).await
    }

    async fn refresh(&self, parent_id: Option<&str>, id: &str, payload: &Value) -> CliResult<Value> {
        if !self.descriptor.supports(crate::resource::Verb::Refresh) {
            return Err(CliError::Unsupported {
                resource: self.descriptor.display_name.clone(),
                verb: "refresh".to_string(),
            });
        }
        tracing::info!("Refreshing {} {}", self.descriptor.display_name, id);
        let request = self.describe(
            parent_id,
            &Operation::Refresh {
                id: id.to_string(),
                payload: payload.clone(),
            },
        )?;
        self.client.execute(&request).await
    }
}
