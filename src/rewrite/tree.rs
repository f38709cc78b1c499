// src/rewrite/tree.rs
// =============================================================================
// Walks over nested JSON values (block attributes, page-builder data, widget
// settings).
//
// A serde_json::Value is already the tagged union we need:
//   String          -> a leaf we may transform
//   Null/Bool/Number -> a leaf we leave alone
//   Array / Object  -> recurse into every element / field
// =============================================================================

use serde_json::Value;

// Applies `f` to every string leaf, in place. Returns how many leaves changed.
pub fn map_strings(value: &mut Value, f: &dyn Fn(&str) -> String) -> usize {
    match value {
        Value::String(text) => {
            let mapped = f(text);
            if mapped != *text {
                *text = mapped;
                1
            } else {
                0
            }
        }
        Value::Array(items) => items.iter_mut().map(|item| map_strings(item, f)).sum(),
        Value::Object(fields) => fields.values_mut().map(|field| map_strings(field, f)).sum(),
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}

pub fn replace_in_value(value: &mut Value, old: &str, new: &str) -> usize {
    map_strings(value, &|text| text.replace(old, new))
}

// Collects every leaf stored under a key named "id" that reads as a
// non-negative integer (42 or "42"). Page builders reference media this way.
pub fn numeric_ids(value: &Value) -> Vec<u64> {
    let mut ids = Vec::new();
    collect_ids(value, &mut ids);
    ids
}

fn collect_ids(value: &Value, ids: &mut Vec<u64>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_ids(item, ids)),
        Value::Object(fields) => {
            for (key, field) in fields {
                if key == "id" {
                    if let Some(id) = as_id(field) {
                        ids.push(id);
                        continue;
                    }
                }
                collect_ids(field, ids);
            }
        }
        _ => {}
    }
}

fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_replace_reaches_every_depth() {
        let mut value = json!({
            "url": "http://old.test/a.png",
            "count": 3,
            "gallery": [
                {"src": "http://old.test/b.png", "alt": "b"},
                ["http://old.test/c.png", null, true]
            ],
            "nested": {"deeper": {"href": "see http://old.test/a.png"}}
        });

        let changed = replace_in_value(&mut value, "http://old.test", "https://new.test");

        assert_eq!(changed, 4);
        assert_eq!(value["url"], "https://new.test/a.png");
        assert_eq!(value["gallery"][0]["src"], "https://new.test/b.png");
        assert_eq!(value["gallery"][1][0], "https://new.test/c.png");
        assert_eq!(value["nested"]["deeper"]["href"], "see https://new.test/a.png");
        assert_eq!(value["count"], 3);
    }

    #[test]
    fn test_keys_are_not_rewritten() {
        let mut value = json!({"http://old.test": "x"});
        assert_eq!(replace_in_value(&mut value, "http://old.test", "y"), 0);
        assert!(value.get("http://old.test").is_some());
    }

    #[test]
    fn test_numeric_ids() {
        let data = json!([
            {"id": "a1b2", "settings": {"image": {"id": 17, "url": "x"}}},
            {"id": "c3", "elements": [{"settings": {"bg": {"id": "23"}}}]},
            {"settings": {"id": -4}}
        ]);
        assert_eq!(numeric_ids(&data), vec![17, 23]);
    }
}
