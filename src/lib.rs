//! cloudctl - command-line client core for a cloud-management REST API
//!
//! Two subsystems carry the weight:
//!
//! - [`options`] turns declarative field lists into prompts or non-interactive
//!   request bodies.
//! - [`resource`] runs the CRUD verbs of every resource type through one
//!   generic dispatcher, with dry-run, pagination and name resolution.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod options;
pub mod output;
pub mod resource;

pub use cli::{run, Cli};

/// Version injected at compile time via CLOUDCTL_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CLOUDCTL_VERSION") {
    Some(v) => v,
    None => "dev",
};
