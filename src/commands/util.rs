use nu_protocol::{LabeledError, ListStream, PipelineData, Record, Signals, Span, Value};
use serde_json::{Map, Number, Value as Json};

/// Collect pipeline input as JSON rows. A single record becomes one row;
/// nothing becomes no rows.
pub fn input_rows(input: PipelineData) -> Vec<Json> {
    match input {
        PipelineData::Value(Value::List { vals, .. }, _) => vals.iter().map(to_json).collect(),
        PipelineData::Value(Value::Nothing { .. }, _) => vec![],
        PipelineData::Value(value, _) => vec![to_json(&value)],
        other => other.into_iter().map(|v| to_json(&v)).collect(),
    }
}

/// Stream JSON rows back out as a nu list.
pub fn output_rows(rows: Json, head: Span) -> PipelineData {
    let values: Vec<Value> = match rows {
        Json::Array(items) => items.iter().map(|v| from_json(v, head)).collect(),
        Json::Null => vec![],
        single => vec![from_json(&single, head)],
    };
    if values.is_empty() {
        return PipelineData::Value(Value::list(vec![], head), None);
    }
    ListStream::new(values.into_iter(), head, Signals::empty()).into()
}

pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Nothing { .. } => Json::Null,
        Value::Bool { val, .. } => Json::Bool(*val),
        Value::Int { val, .. } => Json::Number((*val).into()),
        Value::Float { val, .. } => Number::from_f64(*val).map(Json::Number).unwrap_or(Json::Null),
        Value::String { val, .. } => Json::String(val.clone()),
        Value::Date { val, .. } => Json::String(val.format("%Y-%m-%d %H:%M:%S").to_string()),
        Value::List { vals, .. } => Json::Array(vals.iter().map(to_json).collect()),
        Value::Record { val, .. } => {
            let mut obj = Map::new();
            for (k, v) in val.iter() {
                obj.insert(k.clone(), to_json(v));
            }
            Json::Object(obj)
        }
        other => other
            .coerce_string()
            .map(Json::String)
            .unwrap_or(Json::Null),
    }
}

pub fn from_json(value: &Json, span: Span) -> Value {
    match value {
        Json::Null => Value::nothing(span),
        Json::Bool(b) => Value::bool(*b, span),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::int(i, span),
            None => Value::float(n.as_f64().unwrap_or_default(), span),
        },
        Json::String(s) => Value::string(s.clone(), span),
        Json::Array(items) => Value::list(items.iter().map(|v| from_json(v, span)).collect(), span),
        Json::Object(map) => {
            let mut record = Record::new();
            for (k, v) in map {
                record.push(k.clone(), from_json(v, span));
            }
            Value::record(record, span)
        }
    }
}

pub fn labeled(err: crate::Error) -> LabeledError {
    LabeledError::new(err.to_string())
}
