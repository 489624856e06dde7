//! Loosely typed attribute records exchanged with the directory and the remote API.

use serde_json::{Map, Value};

/// An attribute record: string keys to JSON values, possibly nested.
pub type Record = Map<String, Value>;

/// Field the engine fills in once a record's remote id is known.
pub const ID_FIELD: &str = "id";

/// Boolean set by the directory source on user records that belong to teachers.
pub const IS_TEACHER_FIELD: &str = "is_teacher";

/// String value of a field, if it holds a string.
pub fn str_field<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Integer value of a field. Numeric strings are accepted since directory
/// attributes always arrive as text.
pub fn i64_field(record: &Record, key: &str) -> Option<i64> {
    match record.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Boolean value of a field. Accepts JSON booleans, `"true"`/`"false"`
/// (any case), `"1"`/`"0"` and the integers 1 and 0.
pub fn bool_field(record: &Record, key: &str) -> Option<bool> {
    match record.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Whether the record is marked as a teacher. Absent means student.
pub fn is_teacher(record: &Record) -> bool {
    bool_field(record, IS_TEACHER_FIELD).unwrap_or(false)
}

/// Extract a numeric id from either a bare number or an object carrying `id`.
pub fn id_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(obj) => obj.get(ID_FIELD).and_then(id_of),
        _ => None,
    }
}
