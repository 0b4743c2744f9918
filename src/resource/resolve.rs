//! Target resolution
//!
//! Positional arguments name a record either by id or by name. Names are
//! looked up through the resource's `list` capability with an exact-match
//! filter and must match exactly one record.

use super::registry::{IdentifierKind, ResourceDescriptor};
use crate::api::ResourceInterface;
use crate::error::CliResult;
use crate::options::field::scalar_string;
use serde_json::Value;

/// How a positional argument will be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Goes straight into the request path
    Id(String),
    /// Needs a lookup first
    Name(String),
}

impl Target {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Id(s) | Self::Name(s) => s,
        }
    }
}

/// Outcome of a lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(String),
    NotFound,
    /// More than one record carries the name
    Ambiguous(Vec<Value>),
}

/// Classify `arg` according to the descriptor's identifier kind
pub fn classify(descriptor: &ResourceDescriptor, arg: &str) -> Target {
    let arg = arg.trim();
    match descriptor.identifier {
        IdentifierKind::Name => Target::Id(arg.to_string()),
        IdentifierKind::Numeric if !arg.is_empty() && arg.chars().all(|c| c.is_ascii_digit()) => {
            Target::Id(arg.to_string())
        }
        IdentifierKind::Numeric => Target::Name(arg.to_string()),
    }
}

/// Records in a list response whose name field equals `name` exactly
pub fn exact_matches(descriptor: &ResourceDescriptor, response: &Value, name: &str) -> Vec<Value> {
    response
        .get(&descriptor.list_key)
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter(|row| {
                    row.get(&descriptor.name_field)
                        .and_then(Value::as_str)
                        .map(|n| n == name)
                        .unwrap_or(false)
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Look a record up by name through `list`
pub async fn find_by_name<R: ResourceInterface>(
    resource: &R,
    descriptor: &ResourceDescriptor,
    parent_id: Option<&str>,
    name: &str,
) -> CliResult<Resolution> {
    let query = vec![(descriptor.name_field.clone(), name.to_string())];
    tracing::debug!("Looking up {} by name '{}'", descriptor.display_name, name);
    let response = resource.list(parent_id, &query).await?;
    let mut matches = exact_matches(descriptor, &response, name);

    Ok(match matches.len() {
        0 => Resolution::NotFound,
        1 => {
            let record = matches.remove(0);
            match record.get(&descriptor.id_field).and_then(scalar_string) {
                Some(id) => Resolution::Found(id),
                None => Resolution::NotFound,
            }
        }
        _ => Resolution::Ambiguous(matches),
    })
}

/// Resolve `arg` to an id, querying only when it is a name
pub async fn resolve_target<R: ResourceInterface>(
    resource: &R,
    descriptor: &ResourceDescriptor,
    parent_id: Option<&str>,
    arg: &str,
) -> CliResult<Resolution> {
    match classify(descriptor, arg) {
        Target::Id(id) => Ok(Resolution::Found(id)),
        Target::Name(name) => find_by_name(resource, descriptor, parent_id, &name).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Operation, Query, RequestDescription};
    use crate::error::CliError;
    use crate::resource::get_resource;
    use serde_json::json;
    use std::cell::RefCell;

    struct ListOnly {
        response: Value,
        queries: RefCell<Vec<Query>>,
    }

    impl ResourceInterface for ListOnly {
        fn describe(&self, _parent_id: Option<&str>, _operation: &Operation) -> CliResult<RequestDescription> {
            Err(CliError::usage("not used"))
        }

        async fn list(&self, _parent_id: Option<&str>, query: &Query) -> CliResult<Value> {
            self.queries.borrow_mut().push(query.clone());
            Ok(self.response.clone())
        }

        async fn get(&self, _: Option<&str>, _: &str, _: &Query) -> CliResult<Value> {
            unreachable!()
        }

        async fn create(&self, _: Option<&str>, _: &Value) -> CliResult<Value> {
            unreachable!()
        }

        async fn update(&self, _: Option<&str>, _: &str, _: &Value) -> CliResult<Value> {
            unreachable!()
        }

        async fn destroy(&self, _: Option<&str>, _: &str, _: &Query) -> CliResult<Value> {
            unreachable!()
        }
    }

    fn lister(response: Value) -> ListOnly {
        ListOnly {
            response,
            queries: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_classify_numeric_and_names() {
        let lbs = get_resource("load-balancers").unwrap();
        assert_eq!(classify(lbs, "42"), Target::Id("42".to_string()));
        assert_eq!(classify(lbs, "edge-lb"), Target::Name("edge-lb".to_string()));
        assert_eq!(classify(lbs, "42a"), Target::Name("42a".to_string()));

        let keys = get_resource("key-pairs").unwrap();
        assert_eq!(classify(keys, "ops key"), Target::Id("ops key".to_string()));
    }

    #[tokio::test]
    async fn test_numeric_id_skips_lookup() {
        let lbs = get_resource("load-balancers").unwrap();
        let resource = lister(json!({}));
        let resolved = resolve_target(&resource, lbs, None, "7").await.unwrap();
        assert_eq!(resolved, Resolution::Found("7".to_string()));
        assert!(resource.queries.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_name_lookup_uses_exact_match() {
        let lbs = get_resource("load-balancers").unwrap();
        let resource = lister(json!({"loadBalancers": [
            {"id": 3, "name": "edge-lb-2"},
            {"id": 4, "name": "edge-lb"}
        ]}));
        let resolved = resolve_target(&resource, lbs, None, "edge-lb").await.unwrap();
        assert_eq!(resolved, Resolution::Found("4".to_string()));
        assert_eq!(
            resource.queries.borrow()[0],
            vec![("name".to_string(), "edge-lb".to_string())]
        );
    }

    #[tokio::test]
    async fn test_name_lookup_not_found_and_ambiguous() {
        let lbs = get_resource("load-balancers").unwrap();
        let empty = lister(json!({"loadBalancers": []}));
        assert_eq!(
            resolve_target(&empty, lbs, None, "nope").await.unwrap(),
            Resolution::NotFound
        );

        let twice = lister(json!({"loadBalancers": [
            {"id": 1, "name": "dup"},
            {"id": 2, "name": "dup"}
        ]}));
        match resolve_target(&twice, lbs, None, "dup").await.unwrap() {
            Resolution::Ambiguous(rows) => assert_eq!(rows.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_custom_name_field() {
        let users = get_resource("users").unwrap();
        let resource = lister(json!({"users": [{"id": 11, "username": "jdoe"}]}));
        let resolved = resolve_target(&resource, users, Some("2"), "jdoe").await.unwrap();
        assert_eq!(resolved, Resolution::Found("11".to_string()));
        assert_eq!(resource.queries.borrow()[0][0].0, "username");
    }
}
