use serde_json::Value;
use url::form_urlencoded;

/// Serialise an object into a query string, including the leading `?`.
///
/// Keys come out sorted. Strings are used verbatim, arrays repeat the key
/// once per element, `null` yields an empty value and anything else is
/// written as JSON. Non-objects and empty objects yield an empty string.
pub fn object_to_query(query: &Value) -> String {
    let map = match query {
        Value::Object(map) if !map.is_empty() => map,
        _ => return String::new(),
    };

    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for key in keys {
        match &map[key] {
            Value::Array(items) => {
                for item in items {
                    serializer.append_pair(key, &query_value(item));
                }
            }
            value => {
                serializer.append_pair(key, &query_value(value));
            }
        }
    }

    format!("?{}", serializer.finish())
}

fn query_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
