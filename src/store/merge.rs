use serde_json::Value;

/// Deep-merge `right` into `left`, `right` winning on conflicts
///
/// Nested objects merge key by key. Arrays and primitives are replaced as a
/// whole, never concatenated.
pub fn merge_deep_right(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Object(left_map), Value::Object(right_map)) => {
            let mut merged = left_map.clone();
            for (key, right_value) in right_map {
                let value = match left_map.get(key) {
                    Some(left_value) => merge_deep_right(left_value, right_value),
                    None => right_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        _ => right.clone(),
    }
}
