use rhai::{Array, Blob, Dynamic, Map, FLOAT, INT};
use serde_json::Value;

/// Convert a serde_json::Value to a Rhai Dynamic.
pub fn json_to_dynamic(val: &Value) -> Dynamic {
    match val {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::from(n.to_string())
            }
        }
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(arr) => {
            let rhai_arr: Array = arr.iter().map(json_to_dynamic).collect();
            Dynamic::from(rhai_arr)
        }
        Value::Object(obj) => {
            let mut map = Map::new();
            for (k, v) in obj {
                map.insert(k.clone().into(), json_to_dynamic(v));
            }
            Dynamic::from(map)
        }
    }
}

/// Convert a Rhai Dynamic to JSON. Returns `None` when the value, or anything
/// nested inside it, has no JSON counterpart (function pointers, timestamps,
/// custom types, NaN and infinities).
pub fn dynamic_to_json(val: &Dynamic) -> Option<Value> {
    convert(val, &|_| None)
}

/// Like [`dynamic_to_json`] but never fails: values without a JSON
/// counterpart become their display string.
pub fn dynamic_to_json_lossy(val: &Dynamic) -> Value {
    convert(val, &|v| Some(Value::String(v.to_string()))).unwrap_or(Value::Null)
}

fn convert(val: &Dynamic, fallback: &dyn Fn(&Dynamic) -> Option<Value>) -> Option<Value> {
    if val.is_unit() {
        Some(Value::Null)
    } else if val.is::<bool>() {
        val.as_bool().ok().map(Value::Bool)
    } else if val.is::<INT>() {
        val.as_int().ok().map(|i| Value::Number(i.into()))
    } else if val.is::<FLOAT>() {
        match val.as_float().ok().and_then(serde_json::Number::from_f64) {
            Some(n) => Some(Value::Number(n)),
            None => fallback(val),
        }
    } else if val.is::<char>() {
        val.as_char().ok().map(|c| Value::String(c.to_string()))
    } else if val.is::<String>() {
        val.clone().into_string().ok().map(Value::String)
    } else if val.is::<Array>() {
        let arr = val.clone().into_array().ok()?;
        arr.iter()
            .map(|item| convert(item, fallback))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array)
    } else if val.is::<Blob>() {
        let blob = val.clone().try_cast::<Blob>()?;
        Some(Value::Array(blob.into_iter().map(Value::from).collect()))
    } else if val.is::<Map>() {
        let map = val.clone().try_cast::<Map>()?;
        let mut obj = serde_json::Map::new();
        for (k, v) in map {
            obj.insert(k.to_string(), convert(&v, fallback)?);
        }
        Some(Value::Object(obj))
    } else {
        fallback(val)
    }
}
