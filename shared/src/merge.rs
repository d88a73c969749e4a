use crate::protocol::Data;
use serde_json::Value;

/// Merges `patch` into `target` key by key.
///
/// Nested objects merge recursively; any other value (including arrays and
/// `null`) replaces whatever was stored at that key.
pub fn deep_merge(target: &mut Data, patch: &Data) {
    for (key, incoming) in patch {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) =
            (target.get_mut(key), incoming)
        {
            deep_merge(existing, incoming);
            continue;
        }
        target.insert(key.clone(), incoming.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Data {
        match value {
            Value::Object(map) => map,
            _ => panic!("test data must be an object"),
        }
    }

    #[test]
    fn test_merge_into_empty() {
        let mut record = Data::new();
        deep_merge(&mut record, &data(json!({"x": 1, "y": 2})));
        assert_eq!(Value::Object(record), json!({"x": 1, "y": 2}));
    }

    #[test]
    fn test_nested_merge_sequence() {
        let mut record = Data::new();
        deep_merge(&mut record, &data(json!({"pos": {"x": 1}})));
        deep_merge(&mut record, &data(json!({"pos": {"y": 2}})));
        assert_eq!(Value::Object(record.clone()), json!({"pos": {"x": 1, "y": 2}}));

        deep_merge(&mut record, &data(json!({"pos": {"x": 5}})));
        assert_eq!(Value::Object(record), json!({"pos": {"x": 5, "y": 2}}));
    }

    #[test]
    fn test_scalar_overwrites_object() {
        let mut record = data(json!({"pos": {"x": 1}}));
        deep_merge(&mut record, &data(json!({"pos": 3})));
        assert_eq!(Value::Object(record), json!({"pos": 3}));
    }

    #[test]
    fn test_object_overwrites_scalar() {
        let mut record = data(json!({"pos": "unknown"}));
        deep_merge(&mut record, &data(json!({"pos": {"x": 1}})));
        assert_eq!(Value::Object(record), json!({"pos": {"x": 1}}));
    }

    #[test]
    fn test_arrays_and_null_replace() {
        let mut record = data(json!({"tags": [1, 2, 3], "name": "a"}));
        deep_merge(&mut record, &data(json!({"tags": [9], "name": null})));
        assert_eq!(Value::Object(record), json!({"tags": [9], "name": null}));
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let mut record = data(json!({"x": 1}));
        deep_merge(&mut record, &Data::new());
        assert_eq!(Value::Object(record), json!({"x": 1}));
    }
}
