// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payload cleanup before writes.
//!
//! Unset `Option` fields serialize to `null`. Firestore would store those as
//! explicit null values and overwrite existing fields on a merge, so they are
//! removed before any create/update reaches the store.

use serde_json::Value;

/// Recursively drop `null` object fields and `null` array elements.
pub fn strip_unset(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_unset(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(strip_unset)
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_top_level_and_nested_unset() {
        let payload = json!({ "vin": null, "mileage": 1000, "nested": { "a": null, "b": 1 } });
        assert_eq!(
            strip_unset(payload),
            json!({ "mileage": 1000, "nested": { "b": 1 } })
        );
    }

    #[test]
    fn test_keeps_falsy_values() {
        let payload = json!({ "completed": false, "mileage": 0, "notes": "", "parts": [] });
        assert_eq!(strip_unset(payload.clone()), payload);
    }

    #[test]
    fn test_arrays_are_cleaned() {
        let payload = json!({ "partsUsed": ["filter", null, { "sku": null, "qty": 2 }] });
        assert_eq!(
            strip_unset(payload),
            json!({ "partsUsed": ["filter", { "qty": 2 }] })
        );
    }

    #[test]
    fn test_emptied_object_is_kept() {
        // Only unset values go; an object that becomes empty is still a value.
        assert_eq!(
            strip_unset(json!({ "nested": { "a": null } })),
            json!({ "nested": {} })
        );
    }
}
