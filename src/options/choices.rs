//! Choice resolution for select fields

use super::field::{scalar_string, Choice, ChoiceSource};
use super::payload::{get_path, ValueMap};
use crate::error::CliResult;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Backend for named choice lookups (usually the API's option endpoint)
#[allow(async_fn_in_trait)]
pub trait ChoiceProvider {
    async fn resolve(&self, source: &str, params: &ValueMap) -> CliResult<Vec<Choice>>;
}

/// Resolves choice lists for one prompt run.
///
/// Lookups are memoized by source and resolved parameters, so several fields
/// sharing a source cost a single request. The cache dies with the resolver.
pub struct ChoiceResolver<'a, P: ChoiceProvider> {
    provider: &'a P,
    /// Values available to `$name` parameter references besides the answers,
    /// e.g. `parentId`
    context: ValueMap,
    cache: HashMap<String, Vec<Choice>>,
}

impl<'a, P: ChoiceProvider> ChoiceResolver<'a, P> {
    pub fn new(provider: &'a P, context: ValueMap) -> Self {
        Self {
            provider,
            context,
            cache: HashMap::new(),
        }
    }

    pub async fn resolve(&mut self, source: &ChoiceSource, values: &ValueMap) -> CliResult<Vec<Choice>> {
        match source {
            ChoiceSource::Static(choices) => Ok(choices.clone()),
            ChoiceSource::Dynamic { name, params } => {
                let params = self.bind_params(params, values);
                let key = format!("{}?{}", name, Value::Object(params.clone()));
                if let Some(hit) = self.cache.get(&key) {
                    return Ok(hit.clone());
                }
                tracing::debug!("Resolving choices from source {}", name);
                let choices = self.provider.resolve(name, &params).await?;
                self.cache.insert(key, choices.clone());
                Ok(choices)
            }
            ChoiceSource::Callback { key, func } => {
                let key = format!("callback:{}", key);
                if let Some(hit) = self.cache.get(&key) {
                    return Ok(hit.clone());
                }
                let choices = func(values)?;
                self.cache.insert(key, choices.clone());
                Ok(choices)
            }
        }
    }

    /// Replace `$ref` parameters with known values; unresolved refs are dropped
    fn bind_params(&self, params: &ValueMap, values: &ValueMap) -> ValueMap {
        let mut bound = Map::new();
        for (name, param) in params {
            let resolved = match param.as_str().and_then(|s| s.strip_prefix('$')) {
                Some(reference) => self.lookup(reference, values),
                None => Some(param.clone()),
            };
            if let Some(value) = resolved.filter(|v| !v.is_null()) {
                bound.insert(name.clone(), value);
            }
        }
        bound
    }

    fn lookup(&self, reference: &str, values: &ValueMap) -> Option<Value> {
        let path: Vec<&str> = reference.split('.').collect();
        get_path(values, &path)
            .or_else(|| get_path(&self.context, &path))
            .cloned()
    }
}

/// Map an answer typed by the user or passed as an override onto a static
/// choice value. Returns `None` when nothing matches.
pub fn match_choice(choices: &[Choice], input: &Value) -> Option<Value> {
    let input = scalar_string(input)?;
    choices
        .iter()
        .find(|c| c.matches(&input))
        .map(|c| c.value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    struct CountingProvider {
        calls: RefCell<Vec<(String, ValueMap)>>,
    }

    impl ChoiceProvider for CountingProvider {
        async fn resolve(&self, source: &str, params: &ValueMap) -> CliResult<Vec<Choice>> {
            self.calls
                .borrow_mut()
                .push((source.to_string(), params.clone()));
            Ok(vec![Choice::new("One", 1)])
        }
    }

    fn provider() -> CountingProvider {
        CountingProvider {
            calls: RefCell::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_static_choices_returned_verbatim() {
        let p = provider();
        let mut resolver = ChoiceResolver::new(&p, Map::new());
        let source = ChoiceSource::Static(vec![Choice::new("B", "b"), Choice::new("A", "a")]);
        let choices = resolver.resolve(&source, &Map::new()).await.unwrap();
        assert_eq!(choices[0].label, "B");
        assert_eq!(choices[1].value, json!("a"));
        assert!(p.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_dynamic_lookup_is_memoized() {
        let p = provider();
        let mut resolver = ChoiceResolver::new(&p, Map::new());
        let source = ChoiceSource::dynamic("clouds");
        resolver.resolve(&source, &Map::new()).await.unwrap();
        resolver.resolve(&source, &Map::new()).await.unwrap();
        assert_eq!(p.calls.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_params_bind_answers_and_context() {
        let p = provider();
        let mut context = Map::new();
        context.insert("parentId".to_string(), json!(7));
        let mut resolver = ChoiceResolver::new(&p, context);

        let mut params = Map::new();
        params.insert("groupId".to_string(), json!("$group.id"));
        params.insert("loadBalancerId".to_string(), json!("$parentId"));
        params.insert("missing".to_string(), json!("$nope"));
        params.insert("type".to_string(), json!("vm"));
        let source = ChoiceSource::Dynamic {
            name: "instances".to_string(),
            params,
        };
        let values = json!({"group": {"id": 3}}).as_object().cloned().unwrap();
        resolver.resolve(&source, &values).await.unwrap();

        let calls = p.calls.borrow();
        assert_eq!(
            Value::Object(calls[0].1.clone()),
            json!({"groupId": 3, "loadBalancerId": 7, "type": "vm"})
        );
    }

    #[tokio::test]
    async fn test_different_params_are_separate_lookups() {
        let p = provider();
        let mut resolver = ChoiceResolver::new(&p, Map::new());
        let mut params = Map::new();
        params.insert("groupId".to_string(), json!("$group"));
        let source = ChoiceSource::Dynamic {
            name: "clouds".to_string(),
            params,
        };
        let first = json!({"group": 1}).as_object().cloned().unwrap();
        let second = json!({"group": 2}).as_object().cloned().unwrap();
        resolver.resolve(&source, &first).await.unwrap();
        resolver.resolve(&source, &second).await.unwrap();
        assert_eq!(p.calls.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_callback_receives_answers() {
        let p = provider();
        let mut resolver = ChoiceResolver::new(&p, Map::new());
        let source = ChoiceSource::callback("ports", |values| {
            let proto = values.get("protocol").and_then(|v| v.as_str()).unwrap_or("");
            Ok(match proto {
                "https" => vec![Choice::new("443", 443)],
                _ => vec![Choice::new("80", 80)],
            })
        });
        let values = json!({"protocol": "https"}).as_object().cloned().unwrap();
        let choices = resolver.resolve(&source, &values).await.unwrap();
        assert_eq!(choices[0].value, json!(443));
        assert!(p.calls.borrow().is_empty());
    }

    #[test]
    fn test_match_choice_by_label_or_value() {
        let choices = vec![Choice::new("Round Robin", "roundrobin"), Choice::new("Ten", 10)];
        assert_eq!(match_choice(&choices, &json!("Round Robin")), Some(json!("roundrobin")));
        assert_eq!(match_choice(&choices, &json!("10")), Some(json!(10)));
        assert_eq!(match_choice(&choices, &json!("nope")), None);
    }
}
