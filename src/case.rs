//! Key case conversion between record bodies (camelCase) and columns (snake_case).

use serde_json::{Map, Value};

/// e.g. "date_brewed" -> "dateBrewed"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// e.g. "originalGravity" -> "original_gravity"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Record body -> column map.
pub fn keys_to_snake_case(obj: Map<String, Value>) -> Map<String, Value> {
    obj.into_iter().map(|(k, v)| (to_snake_case(&k), v)).collect()
}

/// Row -> record body.
pub fn keys_to_camel_case(obj: Map<String, Value>) -> Map<String, Value> {
    obj.into_iter().map(|(k, v)| (to_camel_case(&k), v)).collect()
}
