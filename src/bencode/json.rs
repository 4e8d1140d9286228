use serde_json::{Value, json};
use super::{BKind, BValue};

/// Convert a `BValue` into JSON (using Serde JSON `Value`).
/// 
/// - `Integer(i)` => JSON number
/// - `ByteString(bytes)` => UTF-8 text when possible, otherwise hex in `"_bytes_hex"`.
/// - `List(...)` => JSON array
/// - `Dict(...)` => JSON object
pub fn bvalue_to_json(bv: &BValue) -> Value {
	match bv.kind() {
        BKind::Integer(i) => json!(i),

        BKind::ByteString(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => json!({ "_bytes_hex": hex::encode(bytes) }),
        },

		BKind::List(list_items) => {
            Value::Array(list_items.iter().map(bvalue_to_json).collect())
        }

        BKind::Dict(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                json_map.insert(k.clone(), bvalue_to_json(v));
            }
            Value::Object(json_map)
        }
	}
}
