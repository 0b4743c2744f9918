//! Payload assembly
//!
//! Helpers for the nested JSON maps that make up a request body, and the
//! [`PayloadBuilder`] that layers prompt answers, `-O key=value` overrides
//! and a raw `--payload` file into the final body.
//!
//! Merge rules: nested maps merge key by key, arrays and scalars are replaced
//! by the higher-precedence side, and `null` entries are compacted away
//! before merging so an unset value never clobbers a set one.

use crate::error::{CliError, CliResult};
use serde_json::{Map, Value};
use std::path::Path;

pub type ValueMap = Map<String, Value>;

/// Merge `overlay` into `base`, returning the merged map
pub fn merge_nested(mut base: ValueMap, overlay: &ValueMap) -> ValueMap {
    for (key, value) in overlay {
        if value.is_null() {
            continue;
        }
        let merged = match (base.remove(key), compact(value.clone())) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                Value::Object(merge_nested(existing, &incoming))
            }
            (_, value) => value,
        };
        base.insert(key.clone(), merged);
    }
    base
}

/// Drop `null` entries from maps, recursively
pub fn compact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(compact_map(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(compact).collect()),
        other => other,
    }
}

pub fn compact_map(map: ValueMap) -> ValueMap {
    map.into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k, compact(v)))
        .collect()
}

pub fn get_path<'a, S: AsRef<str>>(map: &'a ValueMap, path: &[S]) -> Option<&'a Value> {
    let (last, parents) = path.split_last()?;
    let mut current = map;
    for segment in parents {
        current = current.get(segment.as_ref())?.as_object()?;
    }
    current.get(last.as_ref())
}

/// Insert `value` at `path`, creating intermediate maps. A scalar sitting
/// where a map is needed gets replaced.
pub fn set_path<S: AsRef<str>>(map: &mut ValueMap, path: &[S], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = map;
    for segment in parents {
        let entry = current
            .entry(segment.as_ref().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(inner) => inner,
            _ => return,
        };
    }
    current.insert(last.as_ref().to_string(), value);
}

/// Checkbox coercion: `"on"`, `"true"`, `"1"`, `"yes"` and `""` are true,
/// any other scalar is false. Arrays, maps and null pass through.
pub fn normalize_bool(value: &Value) -> Value {
    match value {
        Value::Bool(_) => value.clone(),
        Value::String(s) => {
            let s = s.trim().to_lowercase();
            Value::Bool(matches!(s.as_str(), "on" | "true" | "1" | "yes" | ""))
        }
        Value::Number(n) => Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        other => other.clone(),
    }
}

/// Normalize every checkbox path present in `map`
pub fn normalize_checkboxes(map: &mut ValueMap, paths: &[Vec<String>]) {
    for path in paths {
        if let Some(current) = get_path(map, path) {
            let normalized = normalize_bool(current);
            set_path(map, path, normalized);
        }
    }
}

/// Merge the contents of `map[context]` into `map` itself and drop the key
pub fn flatten_context(map: &mut ValueMap, context: &str) {
    if let Some(Value::Object(inner)) = map.remove(context) {
        let merged = merge_nested(std::mem::take(map), &inner);
        *map = merged;
    }
}

/// Parse repeated `key=value` arguments into a nested map. Dotted keys
/// build nested maps: `config.port=80` becomes `{"config": {"port": "80"}}`.
pub fn parse_overrides<S: AsRef<str>>(pairs: &[S]) -> CliResult<ValueMap> {
    let mut map = Map::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let Some((key, value)) = pair.split_once('=') else {
            return Err(CliError::usage(format!(
                "Invalid option '{}', expected key=value",
                pair
            )));
        };
        let path: Vec<&str> = key.trim().split('.').collect();
        if path.iter().any(|s| s.is_empty()) {
            return Err(CliError::usage(format!("Invalid option key '{}'", key)));
        }
        set_path(&mut map, &path, Value::String(value.to_string()));
    }
    Ok(map)
}

/// Read a raw request body from a JSON or YAML file
pub fn load_payload_file(path: &Path) -> CliResult<ValueMap> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::usage(format!("Unable to read payload file {}: {}", path.display(), e))
    })?;
    parse_payload(&content)
        .map_err(|e| CliError::usage(format!("Invalid payload in {}: {}", path.display(), e)))
}

/// Parse a payload document, trying JSON first and YAML second
pub fn parse_payload(content: &str) -> Result<ValueMap, String> {
    let value: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(json_err) => serde_yaml::from_str(content)
            .map_err(|yaml_err| format!("not JSON ({}) or YAML ({})", json_err, yaml_err))?,
    };
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err("payload must be an object".to_string()),
    }
}

/// Assemble the request body for one resource call
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    pub object_key: String,
    /// Checkbox paths relative to the object, normalized after merging
    pub checkbox_paths: Vec<Vec<String>>,
    /// Namespaces lifted out of `-O` overrides, as the prompt engine does
    pub flatten_contexts: Vec<String>,
}

impl PayloadBuilder {
    pub fn new(object_key: &str) -> Self {
        Self {
            object_key: object_key.to_string(),
            checkbox_paths: Vec::new(),
            flatten_contexts: Vec::new(),
        }
    }

    pub fn with_checkboxes(mut self, paths: Vec<Vec<String>>) -> Self {
        self.checkbox_paths = paths;
        self
    }

    pub fn with_flatten_contexts(mut self, contexts: Vec<String>) -> Self {
        self.flatten_contexts = contexts;
        self
    }

    /// Build the body. With a raw payload the prompt result is ignored.
    pub fn build(
        &self,
        raw_payload: Option<&ValueMap>,
        prompt_result: &ValueMap,
        cli_overrides: &ValueMap,
    ) -> ValueMap {
        let mut overrides = cli_overrides.clone();
        for context in &self.flatten_contexts {
            flatten_context(&mut overrides, context);
        }
        let mut payload = build_payload(raw_payload, prompt_result, &overrides, &self.object_key);
        if let Some(Value::Object(object)) = payload.get_mut(&self.object_key) {
            normalize_checkboxes(object, &self.checkbox_paths);
        }
        payload
    }
}

/// Layer the sources into a request body.
///
/// With a raw payload, `-O` overrides are merged on top of it and the prompt
/// answers are ignored. When the raw payload has no `object_key` entry it is
/// taken to be the object body itself.
///
/// Without one, overrides are merged first and the prompt answers on top:
/// the engine already folded (and type-coerced) every override that matches
/// a field, so only overrides for undeclared keys survive unchanged.
pub fn build_payload(
    raw_payload: Option<&ValueMap>,
    prompt_result: &ValueMap,
    cli_overrides: &ValueMap,
    object_key: &str,
) -> ValueMap {
    let mut payload = match raw_payload {
        Some(raw) if raw.contains_key(object_key) => compact_map(raw.clone()),
        Some(raw) => {
            let mut wrapped = Map::new();
            wrapped.insert(object_key.to_string(), Value::Object(compact_map(raw.clone())));
            wrapped
        }
        None => {
            let object = merge_nested(merge_nested(Map::new(), cli_overrides), prompt_result);
            let mut fresh = Map::new();
            fresh.insert(object_key.to_string(), Value::Object(object));
            return fresh;
        }
    };

    let object = match payload.remove(object_key) {
        Some(Value::Object(object)) => object,
        _ => Map::new(),
    };
    payload.insert(
        object_key.to_string(),
        Value::Object(merge_nested(object, cli_overrides)),
    );
    payload
}

/// An update body must carry at least one field
pub fn ensure_update_has_fields(payload: &ValueMap, object_key: &str) -> CliResult<()> {
    let object_empty = match payload.get(object_key) {
        Some(Value::Object(object)) => object.is_empty(),
        Some(_) => false,
        None => true,
    };
    let others_empty = payload.keys().all(|k| k == object_key);
    if object_empty && others_empty {
        return Err(CliError::EmptyUpdatePayload);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> ValueMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_nested_recurses_into_maps() {
        let base = map(json!({"config": {"port": 80, "protocol": "http"}, "name": "a"}));
        let overlay = map(json!({"config": {"port": 443}}));
        let merged = merge_nested(base, &overlay);
        assert_eq!(
            Value::Object(merged),
            json!({"config": {"port": 443, "protocol": "http"}, "name": "a"})
        );
    }

    #[test]
    fn test_merge_nested_replaces_arrays_and_scalars() {
        let base = map(json!({"tags": ["a", "b"], "config": {"x": 1}}));
        let overlay = map(json!({"tags": ["c"], "config": "none"}));
        let merged = merge_nested(base, &overlay);
        assert_eq!(Value::Object(merged), json!({"tags": ["c"], "config": "none"}));
    }

    #[test]
    fn test_merge_nested_skips_nulls() {
        let base = map(json!({"description": "keep", "config": {"a": 1}}));
        let overlay = map(json!({"description": null, "config": {"a": null, "b": 2}}));
        let merged = merge_nested(base, &overlay);
        assert_eq!(
            Value::Object(merged),
            json!({"description": "keep", "config": {"a": 1, "b": 2}})
        );
    }

    #[test]
    fn test_set_path_creates_and_replaces_intermediates() {
        let mut m = map(json!({"config": "scalar"}));
        set_path(&mut m, &["config", "port"], json!(80));
        set_path(&mut m, &["a", "b", "c"], json!(true));
        assert_eq!(
            Value::Object(m),
            json!({"config": {"port": 80}, "a": {"b": {"c": true}}})
        );
    }

    #[test]
    fn test_normalize_bool() {
        for truthy in ["on", "true", "1", "", "ON", "yes"] {
            assert_eq!(normalize_bool(&json!(truthy)), json!(true), "{truthy}");
        }
        for falsy in ["off", "false", "0", "no"] {
            assert_eq!(normalize_bool(&json!(falsy)), json!(false), "{falsy}");
        }
        assert_eq!(normalize_bool(&json!(true)), json!(true));
        assert_eq!(normalize_bool(&json!(0)), json!(false));
    }

    #[test]
    fn test_flatten_context_moves_keys_up() {
        let mut m = map(json!({"name": "web", "domain": {"id": 3, "name": "example.com"}}));
        flatten_context(&mut m, "domain");
        assert_eq!(Value::Object(m), json!({"name": "example.com", "id": 3}));
    }

    #[test]
    fn test_parse_overrides_builds_nested_map() {
        let parsed = parse_overrides(&["name=web", "config.port=8080", "config.ssl=on"]).unwrap();
        assert_eq!(
            Value::Object(parsed),
            json!({"name": "web", "config": {"port": "8080", "ssl": "on"}})
        );
    }

    #[test]
    fn test_parse_overrides_keeps_equals_in_value() {
        let parsed = parse_overrides(&["query=a=b"]).unwrap();
        assert_eq!(parsed["query"], json!("a=b"));
    }

    #[test]
    fn test_parse_overrides_rejects_bad_syntax() {
        assert!(matches!(parse_overrides(&["novalue"]), Err(CliError::Usage(_))));
        assert!(matches!(parse_overrides(&["a..b=1"]), Err(CliError::Usage(_))));
    }

    #[test]
    fn test_parse_payload_json_and_yaml() {
        let json_doc = parse_payload(r#"{"loadBalancer": {"name": "lb"}}"#).unwrap();
        assert_eq!(json_doc["loadBalancer"]["name"], json!("lb"));

        let yaml_doc = parse_payload("loadBalancer:\n  name: lb\n  port: 80\n").unwrap();
        assert_eq!(yaml_doc["loadBalancer"]["port"], json!(80));

        assert!(parse_payload("[1, 2]").is_err());
    }

    #[test]
    fn test_build_payload_raw_wins_over_prompt() {
        let raw = map(json!({"a": 1}));
        let prompt = map(json!({"b": 2}));
        let payload = build_payload(Some(&raw), &prompt, &Map::new(), "x");
        assert_eq!(Value::Object(payload), json!({"x": {"a": 1}}));
    }

    #[test]
    fn test_build_payload_overrides_on_top_of_raw() {
        let raw = map(json!({"a": 1}));
        let overrides = map(json!({"a": 2}));
        let payload = build_payload(Some(&raw), &Map::new(), &overrides, "x");
        assert_eq!(Value::Object(payload), json!({"x": {"a": 2}}));
    }

    #[test]
    fn test_build_payload_keeps_wrapped_raw_and_siblings() {
        let raw = map(json!({"x": {"a": 1}, "config": {"force": true}}));
        let overrides = map(json!({"b": "2"}));
        let payload = build_payload(Some(&raw), &Map::new(), &overrides, "x");
        assert_eq!(
            Value::Object(payload),
            json!({"x": {"a": 1, "b": "2"}, "config": {"force": true}})
        );
    }

    #[test]
    fn test_build_payload_from_prompt_and_overrides() {
        // The prompt answers carry the coerced form of matching overrides
        let prompt = map(json!({"name": "web", "config": {"port": 8080}}));
        let overrides = map(json!({"config": {"port": "8080", "extra": "y"}}));
        let payload = build_payload(None, &prompt, &overrides, "loadBalancer");
        assert_eq!(
            Value::Object(payload),
            json!({"loadBalancer": {"name": "web", "config": {"port": 8080, "extra": "y"}}})
        );
    }

    #[test]
    fn test_builder_normalizes_checkboxes_from_overrides() {
        let builder = PayloadBuilder::new("pool")
            .with_checkboxes(vec![vec!["enabled".to_string()]]);
        let overrides = map(json!({"enabled": "off"}));
        let payload = builder.build(None, &Map::new(), &overrides);
        assert_eq!(Value::Object(payload), json!({"pool": {"enabled": false}}));
    }

    #[test]
    fn test_builder_flattens_override_contexts() {
        let builder = PayloadBuilder::new("networkDomain")
            .with_checkboxes(vec![vec!["domainController".to_string()]])
            .with_flatten_contexts(vec!["domain".to_string()]);
        let overrides = map(json!({"name": "corp", "domain": {"domainController": "on"}}));
        let payload = builder.build(None, &Map::new(), &overrides);
        assert_eq!(
            Value::Object(payload),
            json!({"networkDomain": {"name": "corp", "domainController": true}})
        );
    }

    #[test]
    fn test_ensure_update_has_fields() {
        let empty = map(json!({"x": {}}));
        assert!(matches!(
            ensure_update_has_fields(&empty, "x"),
            Err(CliError::EmptyUpdatePayload)
        ));
        let filled = map(json!({"x": {"name": "a"}}));
        assert!(ensure_update_has_fields(&filled, "x").is_ok());
        let sibling = map(json!({"x": {}, "config": {"a": 1}}));
        assert!(ensure_update_has_fields(&sibling, "x").is_ok());
    }
}
