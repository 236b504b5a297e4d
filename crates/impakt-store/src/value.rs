//! Untyped field values and row records.
//!
//! [`Value`] is the single-column currency between JSON bodies, query strings,
//! SQL bind parameters and result rows. [`Record`] is an ordered set of named
//! values; every operation validates records against an [`EntitySchema`]
//! before any SQL is rendered.

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;

use crate::errors::{Result, StoreError};
use crate::schema::{EntitySchema, FieldDef, FieldType};

/// Canonical text form of a timestamp (`2024-03-01T09:30:00`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// SQL NULL.
    #[default]
    Null,
    /// 64-bit integer.
    Integer(i64),
    /// Text, including enum variants.
    Text(String),
    /// Naive date-time.
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Text(_) => "string",
            Value::Timestamp(_) => "timestamp",
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert a JSON value into a field value of the declared type.
    ///
    /// Only the shape is checked here; nullability and enum membership are
    /// enforced by [`Value::check`].
    pub fn from_json(field: &FieldDef, json: &serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;

        match (field.ty, json) {
            (_, Json::Null) => Ok(Value::Null),
            (FieldType::Integer, Json::Number(n)) => n
                .as_i64()
                .map(Value::Integer)
                .ok_or_else(|| mismatch(field, &n.to_string())),
            (FieldType::Text | FieldType::Enum(_), Json::String(s)) => Ok(Value::Text(s.clone())),
            (FieldType::Timestamp, Json::String(s)) => parse_timestamp(field, s),
            (_, other) => Err(StoreError::Validation(format!(
                "field `{}` expects {}, got {}",
                field.name,
                field.ty.name(),
                json_type_name(other)
            ))),
        }
    }

    /// Parse a raw string (path segment or query parameter) as the declared type.
    pub fn parse_str(field: &FieldDef, raw: &str) -> Result<Self> {
        match field.ty {
            FieldType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| mismatch(field, raw)),
            FieldType::Text | FieldType::Enum(_) => Ok(Value::Text(raw.to_string())),
            FieldType::Timestamp => parse_timestamp(field, raw),
        }
    }

    /// Check this value against a field's type, nullability and enum variants.
    pub fn check(&self, entity: &str, field: &FieldDef) -> Result<()> {
        match (self, field.ty) {
            (Value::Null, _) if field.nullable => Ok(()),
            (Value::Null, _) => Err(StoreError::Validation(format!(
                "field `{}` of {entity} must not be null",
                field.name
            ))),
            (Value::Integer(_), FieldType::Integer)
            | (Value::Text(_), FieldType::Text)
            | (Value::Timestamp(_), FieldType::Timestamp) => Ok(()),
            (Value::Text(s), FieldType::Enum(variants)) => {
                if variants.contains(&s.as_str()) {
                    Ok(())
                } else {
                    Err(StoreError::Validation(format!(
                        "field `{}` of {entity} must be one of {}, got `{s}`",
                        field.name,
                        variants.join(", ")
                    )))
                }
            }
            (other, ty) => Err(StoreError::Validation(format!(
                "field `{}` of {entity} expects {}, got {}",
                field.name,
                ty.name(),
                other.type_name()
            ))),
        }
    }

    /// JSON representation.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(n) => serde_json::Value::from(*n),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(ts) => {
                serde_json::Value::String(ts.format(TIMESTAMP_FORMAT).to_string())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

fn mismatch(field: &FieldDef, raw: &str) -> StoreError {
    StoreError::Validation(format!(
        "field `{}` expects {}, got `{raw}`",
        field.name,
        field.ty.name()
    ))
}

fn json_type_name(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Accepts `T`- or space-separated date-times and bare dates (as midnight).
fn parse_timestamp(field: &FieldDef, raw: &str) -> Result<Value> {
    let raw = raw.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Ok(Value::Timestamp(ts));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Value::Timestamp(ts));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Value::Timestamp)
        .ok_or_else(|| mismatch(field, raw))
}

// ─────────────────────────────────────────────────────────────────────────────
// Record
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered field-name → value map; the untyped form of a row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Record::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Whether the record names `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from a JSON object, validating names and values.
    ///
    /// Fields come out in schema declaration order regardless of the order
    /// of keys in the object.
    pub fn from_json(schema: &EntitySchema, json: &serde_json::Value) -> Result<Self> {
        let Some(object) = json.as_object() else {
            return Err(StoreError::Validation(format!(
                "{} body must be a JSON object, got {}",
                schema.name,
                json_type_name(json)
            )));
        };

        if let Some(unknown) = object.keys().find(|k| schema.field(k).is_none()) {
            return Err(unknown_field(schema, unknown));
        }

        let mut record = Record::new();
        for field in schema.fields {
            if let Some(raw) = object.get(field.name) {
                let value = Value::from_json(field, raw)?;
                value.check(schema.name, field)?;
                record.fields.push((field.name.to_string(), value));
            }
        }
        Ok(record)
    }

    /// JSON object representation.
    pub fn to_json(&self) -> serde_json::Value {
        let object = self
            .fields
            .iter()
            .map(|(n, v)| (n.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(object)
    }

    /// Materialise a typed entity from a stored row.
    pub fn into_entity<E: DeserializeOwned>(self, schema: &'static EntitySchema) -> Result<E> {
        serde_json::from_value(self.to_json()).map_err(|e| StoreError::CorruptRow {
            table: schema.name,
            column: "*",
            detail: e.to_string(),
        })
    }

    /// Every name is a declared field and every value fits its field.
    pub fn validate(&self, schema: &EntitySchema) -> Result<()> {
        for (name, value) in &self.fields {
            let field = schema
                .field(name)
                .ok_or_else(|| unknown_field(schema, name))?;
            value.check(schema.name, field)?;
        }
        Ok(())
    }

    /// [`Record::validate`] plus presence of every required field.
    ///
    /// Generated keys are assigned by the database and may not be supplied.
    pub fn validate_for_create(&self, schema: &EntitySchema) -> Result<()> {
        self.validate(schema)?;
        if let Some(generated) = schema
            .fields
            .iter()
            .find(|f| f.generated && self.contains(f.name))
        {
            return Err(StoreError::Validation(format!(
                "field `{}` of {} is assigned by the database",
                generated.name, schema.name
            )));
        }
        if let Some(missing) = schema.required_fields().find(|f| !self.contains(f.name)) {
            return Err(StoreError::Validation(format!(
                "{} requires field `{}`",
                schema.name, missing.name
            )));
        }
        Ok(())
    }

    /// [`Record::validate`] plus at least one field to change.
    pub fn validate_for_update(&self, schema: &EntitySchema) -> Result<()> {
        if self.is_empty() {
            return Err(StoreError::Validation(format!(
                "update of {} names no fields",
                schema.name
            )));
        }
        self.validate(schema)
    }
}

pub(crate) fn unknown_field(schema: &EntitySchema, name: &str) -> StoreError {
    StoreError::Validation(format!("unknown field `{name}` for {}", schema.name))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
