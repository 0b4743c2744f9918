//! Resource abstraction layer
//!
//! Resource types are data, not code: each one is a [`ResourceDescriptor`]
//! loaded from JSON embedded at compile time. A single generic
//! [`CrudDispatcher`] runs every verb against every descriptor.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource descriptors from embedded JSON
//! - [`resolve`] - Turns positional ids or names into record ids
//! - [`dispatch`] - The per-invocation CRUD state machine
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`:
//! - `infrastructure.json` - groups, clouds, instances
//! - `network.json` - load balancers with their pools and virtual servers, network domains
//! - `admin.json` - tenants, users, key pairs

pub mod dispatch;
mod registry;
pub mod resolve;

pub use dispatch::{CrudDispatcher, Invocation, Phase};
pub use registry::*;
pub use resolve::{Resolution, Target};
