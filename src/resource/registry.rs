//! Resource Registry - Load resource definitions from JSON
//!
//! This module loads all resource descriptors from embedded JSON files
//! and provides lookup functions for the rest of the application.

use crate::error::{CliError, CliResult};
use crate::options::prompt::checkbox_paths;
use crate::options::FieldSpec;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/infrastructure.json"),
    include_str!("../resources/network.json"),
    include_str!("../resources/admin.json"),
];

/// Placeholder for the parent id in scoped resource paths
pub const PARENT_ID_PLACEHOLDER: &str = "{parentId}";

/// CRUD verbs a resource may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    List,
    Get,
    Add,
    Update,
    Remove,
    Refresh,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Refresh => "refresh",
        }
    }

    /// Verbs that operate on one existing record
    pub fn needs_target(&self) -> bool {
        matches!(self, Self::Get | Self::Update | Self::Remove | Self::Refresh)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_verbs() -> Vec<Verb> {
    vec![Verb::List, Verb::Get, Verb::Add, Verb::Update, Verb::Remove]
}

/// How a positional identifier is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    /// Numeric ids; anything else is looked up by name
    #[default]
    Numeric,
    /// The name is the id and goes straight into the path
    Name,
}

/// Column definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDef {
    pub header: String,
    pub json_path: String,
}

impl ColumnDef {
    pub fn new(header: &str, json_path: &str) -> Self {
        Self {
            header: header.to_string(),
            json_path: json_path.to_string(),
        }
    }
}

/// Parent relationship for scoped resources
#[derive(Debug, Clone, Deserialize)]
pub struct ParentDef {
    /// Registry key of the parent resource
    pub resource: String,
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_name_field() -> String {
    "name".to_string()
}

fn default_flatten_contexts() -> Vec<String> {
    vec!["domain".to_string()]
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDescriptor {
    /// Registry key, filled in when the registry loads
    #[serde(skip)]
    pub key: String,
    pub display_name: String,
    pub plural_name: String,
    /// Collection path; scoped resources embed `{parentId}`
    pub path: String,
    /// Key wrapping a single record in requests and responses
    pub object_key: String,
    /// Key wrapping the record array in list responses
    pub list_key: String,
    #[serde(default)]
    pub identifier: IdentifierKind,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_name_field")]
    pub name_field: String,
    #[serde(default = "default_verbs")]
    pub verbs: Vec<Verb>,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub parent: Option<ParentDef>,
    /// Inputs prompted by `add` (and offered to `update`)
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default = "default_flatten_contexts")]
    pub flatten_contexts: Vec<String>,
}

impl ResourceDescriptor {
    pub fn supports(&self, verb: Verb) -> bool {
        self.verbs.contains(&verb)
    }

    /// Collection path with the parent id substituted
    pub fn collection_path(&self, parent_id: Option<&str>) -> CliResult<String> {
        if !self.path.contains(PARENT_ID_PLACEHOLDER) {
            return Ok(self.path.clone());
        }
        match parent_id {
            Some(parent_id) => Ok(self
                .path
                .replace(PARENT_ID_PLACEHOLDER, &urlencoding::encode(parent_id))),
            None => Err(CliError::MissingParent {
                resource: self.display_name.clone(),
                parent: self
                    .parent
                    .as_ref()
                    .map(|p| p.resource.clone())
                    .unwrap_or_else(|| "resource".to_string()),
            }),
        }
    }

    pub fn member_path(&self, parent_id: Option<&str>, id: &str) -> CliResult<String> {
        Ok(format!(
            "{}/{}",
            self.collection_path(parent_id)?,
            urlencoding::encode(id)
        ))
    }

    /// Checkbox locations inside the object body
    pub fn checkbox_paths(&self) -> Vec<Vec<String>> {
        checkbox_paths(&self.fields, &self.flatten_contexts)
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResourceRegistry {
    #[serde(default)]
    pub resources: HashMap<String, ResourceDescriptor>,
}

impl ResourceRegistry {
    /// Merge several JSON documents into one registry
    pub fn from_sources(sources: &[&str]) -> anyhow::Result<Self> {
        let mut registry = Self::default();
        for content in sources {
            let partial: ResourceRegistry = serde_json::from_str(content)?;
            registry.resources.extend(partial.resources);
        }
        for (key, descriptor) in registry.resources.iter_mut() {
            descriptor.key = key.clone();
        }
        Ok(registry)
    }

    pub fn get(&self, key: &str) -> Option<&ResourceDescriptor> {
        self.resources.get(key)
    }

    /// Descriptor of a resource's parent, if it has one
    pub fn parent_of(&self, descriptor: &ResourceDescriptor) -> CliResult<Option<&ResourceDescriptor>> {
        let Some(parent) = &descriptor.parent else {
            return Ok(None);
        };
        self.get(&parent.resource)
            .map(Some)
            .ok_or_else(|| CliError::Config(format!("unknown parent resource {}", parent.resource)))
    }

    /// Sorted resource keys
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.resources.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys
    }
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceRegistry> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceRegistry {
    REGISTRY.get_or_init(|| {
        ResourceRegistry::from_sources(RESOURCE_FILES)
            .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e))
    })
}

/// Get a resource definition by key
pub fn get_resource(key: &str) -> Option<&'static ResourceDescriptor> {
    get_registry().get(key)
}

/// Get all resource keys (for help output)
pub fn get_all_resource_keys() -> Vec<&'static str> {
    get_registry().keys()
}
