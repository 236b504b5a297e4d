//! Static schema metadata for persisted entities.
//!
//! Every entity declares one [`EntitySchema`] constant: its table name, the
//! ordered field list, the primary-key subset and its foreign keys. The
//! generic CRUD layer reads nothing else, so adding an entity means adding a
//! schema constant and a typed struct, never new operation code.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::Result;
use crate::value::Record;

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 64-bit signed integer.
    Integer,
    /// UTF-8 text.
    Text,
    /// Naive (zone-less) date and time.
    Timestamp,
    /// Text restricted to a fixed set of variants.
    Enum(&'static [&'static str]),
}

impl FieldType {
    /// Human-readable type name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Text => "string",
            FieldType::Timestamp => "timestamp",
            FieldType::Enum(_) => "enum",
        }
    }
}

/// One declared field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name.
    pub name: &'static str,
    /// Semantic type.
    pub ty: FieldType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the storage engine assigns a value when none is supplied.
    pub generated: bool,
}

impl FieldDef {
    /// A non-nullable field the caller must supply.
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            generated: false,
        }
    }

    /// A nullable field.
    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            generated: false,
        }
    }

    /// A non-nullable integer key assigned by the storage engine.
    pub const fn generated_key(name: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::Integer,
            nullable: false,
            generated: true,
        }
    }

    /// Whether `create` must be given a value for this field.
    pub fn is_required(&self) -> bool {
        !self.nullable && !self.generated
    }
}

/// A foreign-key relationship `(field) → target(target_field)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referencing field on this entity.
    pub field: &'static str,
    /// Referenced entity (table) name.
    pub target: &'static str,
    /// Referenced field on the target.
    pub target_field: &'static str,
}

/// Complete static description of an entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// Entity and table name (e.g. `"Company"`).
    pub name: &'static str,
    /// URL path segment the entity is exposed under (e.g. `"companies"`).
    pub resource: &'static str,
    /// Declared fields, in column order.
    pub fields: &'static [FieldDef],
    /// Names of the fields that form the primary key, in key order.
    pub primary_key: &'static [&'static str],
    /// Foreign keys declared on this entity.
    pub foreign_keys: &'static [ForeignKey],
}

impl EntitySchema {
    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is part of the primary key.
    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key.contains(&name)
    }

    /// The primary-key field definitions, in key order.
    pub fn primary_key_fields(&self) -> impl Iterator<Item = &'static FieldDef> + '_ {
        self.primary_key.iter().filter_map(|name| self.field(name))
    }

    /// Fields `create` must be given (non-nullable, not engine-assigned).
    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldDef> {
        self.fields.iter().filter(|f| f.is_required())
    }

    /// Foreign keys declared on `field`, if any.
    pub fn foreign_key(&self, field: &str) -> Option<&'static ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.field == field)
    }
}

/// A typed Rust struct bound to a static schema.
///
/// Rows travel between the database and the struct as a [`Record`]; the
/// struct's serde representation must use the schema's field names.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Schema metadata for this entity.
    const SCHEMA: &'static EntitySchema;

    /// Materialise the typed entity from a row record.
    fn from_record(record: Record) -> Result<Self> {
        record.into_entity(Self::SCHEMA)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
