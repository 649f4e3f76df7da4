//! Conversion between plain JSON and Firestore's typed value encoding.

use serde_json::{json, Map, Value};

/// Encode a JSON value as a Firestore `Value`.
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or(0.0) })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode every entry of a JSON object as a Firestore `fields` map.
pub fn encode_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), encode(v))).collect()
}

/// Decode a Firestore `Value` into plain JSON.
///
/// Timestamps decode to their RFC 3339 string; unknown value kinds decode to
/// null.
pub fn decode(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };

    if let Some(b) = obj.get("booleanValue") {
        return b.clone();
    }
    if let Some(i) = obj.get("integerValue") {
        return match i {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(s.clone())),
            other => other.clone(),
        };
    }
    if let Some(d) = obj.get("doubleValue") {
        return d.clone();
    }
    if let Some(s) = obj.get("stringValue") {
        return s.clone();
    }
    if let Some(t) = obj.get("timestampValue") {
        return t.clone();
    }
    if let Some(arr) = obj.get("arrayValue") {
        let items = arr["values"]
            .as_array()
            .map(|values| values.iter().map(decode).collect())
            .unwrap_or_default();
        return Value::Array(items);
    }
    if let Some(map) = obj.get("mapValue") {
        return Value::Object(decode_fields(&map["fields"]));
    }
    Value::Null
}

/// Decode a Firestore `fields` map into a JSON object.
pub fn decode_fields(fields: &Value) -> Map<String, Value> {
    fields
        .as_object()
        .map(|m| m.iter().map(|(k, v)| (k.clone(), decode(v))).collect())
        .unwrap_or_default()
}
