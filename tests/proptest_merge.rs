//! Property-based tests using proptest
//!
//! These tests verify the nested merge, compaction and checkbox
//! normalization rules that payload assembly relies on.

use cloudctl::options::payload::{compact, get_path, merge_nested, normalize_bool, parse_overrides, ValueMap};
use cloudctl::options::build_payload;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Scalar leaves, including null
fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z0-9 ]{0,12}".prop_map(Value::String),
    ]
}

/// Nested maps up to three levels deep with a small key space so that
/// base and overlay collide often
fn arb_map() -> impl Strategy<Value = ValueMap> {
    let leaf = arb_leaf();
    let tree = leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
            prop::collection::btree_map("[a-d]", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    });
    prop::collection::btree_map("[a-d]", tree, 0..5).prop_map(|m| m.into_iter().collect())
}

/// True if any map inside `value` still holds a null entry
fn has_null_entry(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.values().any(|v| v.is_null() || has_null_entry(v)),
        Value::Array(items) => items.iter().any(has_null_entry),
        _ => false,
    }
}

/// Every non-null leaf of `overlay` must be visible in `merged`
fn assert_overlay_wins(merged: &ValueMap, overlay: &ValueMap, prefix: &mut Vec<String>) -> Result<(), TestCaseError> {
    for (key, value) in overlay {
        prefix.push(key.clone());
        match value {
            Value::Null => {}
            Value::Object(inner) if !inner.is_empty() => assert_overlay_wins(merged, inner, prefix)?,
            Value::Object(_) => {
                prop_assert!(get_path(merged, prefix.as_slice()).map(Value::is_object).unwrap_or(false));
            }
            other => {
                prop_assert_eq!(get_path(merged, prefix.as_slice()), Some(&compact(other.clone())));
            }
        }
        prefix.pop();
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Higher-precedence values always survive the merge
    #[test]
    fn overlay_values_take_precedence(base in arb_map(), overlay in arb_map()) {
        let merged = merge_nested(base, &overlay);
        assert_overlay_wins(&merged, &overlay, &mut Vec::new())?;
    }

    /// Keys only present in the base are kept
    #[test]
    fn base_only_keys_survive(base in arb_map(), overlay in arb_map()) {
        let merged = merge_nested(base.clone(), &overlay);
        for (key, value) in &base {
            let overlay_set = overlay.get(key).map(|v| !v.is_null()).unwrap_or(false);
            if !overlay_set {
                prop_assert_eq!(merged.get(key), Some(value));
            }
        }
    }

    /// Merging into an empty map compacts the overlay
    #[test]
    fn merge_into_empty_is_compaction(overlay in arb_map()) {
        let merged = merge_nested(Map::new(), &overlay);
        let compacted = match compact(Value::Object(overlay.clone())) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        prop_assert!(!has_null_entry(&Value::Object(merged.clone())));
        prop_assert_eq!(merged, compacted);
    }

    /// Merging a map with itself changes nothing but nulls
    #[test]
    fn merge_is_idempotent(map in arb_map()) {
        let once = merge_nested(Map::new(), &map);
        let twice = merge_nested(once.clone(), &once);
        prop_assert_eq!(once, twice);
    }

    /// Checkbox normalization is idempotent and yields booleans for scalars
    #[test]
    fn normalize_bool_is_idempotent(leaf in arb_leaf()) {
        let once = normalize_bool(&leaf);
        prop_assert_eq!(normalize_bool(&once), once.clone());
        if !leaf.is_null() {
            prop_assert!(once.is_boolean());
        }
    }

    /// Overrides for keys the prompt did not answer end up under the object key
    #[test]
    fn overrides_land_in_object(key in "[e-z]{1,8}", value in "[a-z0-9]{0,8}", prompt in arb_map()) {
        let overrides = parse_overrides(&[format!("{}={}", key, value)]).unwrap();
        let payload = build_payload(None, &prompt, &overrides, "thing");
        prop_assert_eq!(payload.len(), 1);
        prop_assert_eq!(&payload["thing"][&key], &json!(value));
    }

    /// A raw payload is the base and overrides always win over it
    #[test]
    fn raw_payload_then_overrides(raw in arb_map(), prompt in arb_map(), overrides in arb_map()) {
        let payload = build_payload(Some(&raw), &prompt, &overrides, "thing");
        let object = payload["thing"].as_object().cloned().unwrap_or_default();
        assert_overlay_wins(&object, &overrides, &mut Vec::new())?;
    }
}
