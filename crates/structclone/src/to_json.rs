//! Host adapter: converts decoded values into `serde_json::Value` trees.
//!
//! JSON is smaller than the JS value space, so the mapping is lossy at the
//! edges: non-finite numbers become `null`, binary data becomes a base64
//! data URI, and a reference cycle is cut with `null` at the point where it
//! would close.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{Map, Number, Value as JsonValue};

use crate::value::{JsArrayBufferView, Value};

/// Converts a decoded [`Value`] into a native JSON tree.
pub fn to_json(value: &Value) -> JsonValue {
    convert(value, &mut Vec::new())
}

/// `path` holds the container allocations on the current descent; hitting
/// one again means the graph cycles back.
fn convert(value: &Value, path: &mut Vec<*const ()>) -> JsonValue {
    match value {
        Value::Undefined | Value::Null | Value::Hole => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int32(n) => JsonValue::Number((*n).into()),
        Value::Uint32(n) => JsonValue::Number((*n).into()),
        Value::Double(f) => float_to_json(*f),
        Value::BigInt(n) => match i64::try_from(n) {
            Ok(n) => JsonValue::Number(n.into()),
            Err(_) => JsonValue::String(n.to_string()),
        },
        Value::Str(s) => JsonValue::String(s.to_string()),
        Value::Date(ms) => float_to_json(*ms),
        Value::RegExp(re) => JsonValue::String(format!("/{}/{}", re.source, re.flags)),

        Value::Object(obj) => {
            with_cycle_check(path, handle_ptr(obj), |path| {
                let mut map = Map::new();
                for (key, val) in &obj.borrow().properties {
                    map.insert(key.to_string(), convert(val, path));
                }
                JsonValue::Object(map)
            })
        }

        Value::DenseArray(arr) | Value::SparseArray(arr) => {
            with_cycle_check(path, handle_ptr(arr), |path| {
                JsonValue::Array(
                    arr.borrow()
                        .elements
                        .iter()
                        .map(|elem| convert(elem, path))
                        .collect(),
                )
            })
        }

        Value::Map(map) => with_cycle_check(path, handle_ptr(map), |path| {
            let inner = map.borrow();
            if inner.entries.iter().all(|(k, _)| matches!(k, Value::Str(_))) {
                let mut obj = Map::new();
                for (key, val) in &inner.entries {
                    if let Value::Str(key) = key {
                        obj.insert(key.to_string(), convert(val, path));
                    }
                }
                JsonValue::Object(obj)
            } else {
                JsonValue::Array(
                    inner
                        .entries
                        .iter()
                        .map(|(k, v)| JsonValue::Array(vec![convert(k, path), convert(v, path)]))
                        .collect(),
                )
            }
        }),

        Value::Set(set) => with_cycle_check(path, handle_ptr(set), |path| {
            JsonValue::Array(
                set.borrow()
                    .values
                    .iter()
                    .map(|val| convert(val, path))
                    .collect(),
            )
        }),

        Value::ArrayBuffer(buf) => data_uri(&buf.borrow().data),
        Value::ArrayBufferView(view) => data_uri(&view_window(view)),

        Value::Error(error) => {
            let mut obj = Map::new();
            obj.insert("name".into(), error.kind.name().into());
            obj.insert("message".into(), error.message.to_string().into());
            if !error.stack.is_empty() {
                obj.insert("stack".into(), error.stack.to_string().into());
            }
            if let Some(cause) = &error.cause {
                obj.insert("cause".into(), convert(cause, path));
            }
            JsonValue::Object(obj)
        }

        Value::Boxed(boxed) => convert(&boxed.inner, path),
    }
}

fn with_cycle_check(
    path: &mut Vec<*const ()>,
    ptr: *const (),
    convert: impl FnOnce(&mut Vec<*const ()>) -> JsonValue,
) -> JsonValue {
    if path.contains(&ptr) {
        return JsonValue::Null;
    }
    path.push(ptr);
    let result = convert(path);
    path.pop();
    result
}

fn handle_ptr<T>(handle: &std::rc::Rc<T>) -> *const () {
    std::rc::Rc::as_ptr(handle) as *const ()
}

fn float_to_json(f: f64) -> JsonValue {
    Number::from_f64(f)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn view_window(view: &JsArrayBufferView) -> Vec<u8> {
    let buffer = view.buffer.borrow();
    buffer
        .data
        .get(view.byte_offset..view.byte_offset + view.byte_length)
        .unwrap_or(&[])
        .to_vec()
}

fn data_uri(bytes: &[u8]) -> JsonValue {
    JsonValue::String(format!(
        "data:application/octet-stream;base64,{}",
        BASE64.encode(bytes)
    ))
}
