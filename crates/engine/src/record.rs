use serde_json::{Map as JsonMap, Value};

/// One imported record: field name to value.
pub type Record = JsonMap<String, Value>;

/// Opaque value handed to every transformer of an import.
pub type Context = Value;

/// Build a record from an iterator of field/value pairs.
pub fn record_from<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fields.into_iter().map(|(key, value)| (key.into(), value.into())).collect()
}
