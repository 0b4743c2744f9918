//! Remote API interaction module
//!
//! This module provides the HTTP plumbing, the session-bound client and the
//! per-resource interfaces used by the dispatcher.
//!
//! # Module Structure
//!
//! - [`http`] - HTTP utilities, request descriptions and REST errors
//! - [`client`] - Main API client bound to a session
//! - [`resource`] - Resource Interface trait and its HTTP implementation
//! - [`options`] - Named option source lookups for select prompts
//!
//! # Example
//!
//! ```ignore
//! use cloudctl::api::{ApiClient, ResourceFactory, ResourceInterface};
//!
//! async fn example(client: &ApiClient) -> cloudctl::error::CliResult<()> {
//!     let descriptor = cloudctl::resource::get_resource("groups").unwrap();
//!     let groups = client.resource(descriptor).list(None, &Vec::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod options;
pub mod resource;

pub use client::ApiClient;
pub use http::RequestDescription;
pub use options::ApiChoiceSource;
pub use resource::{HttpResource, Operation, Query, ResourceFactory, ResourceInterface};
