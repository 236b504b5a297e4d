//! SQL rendering for the generic CRUD operations.
//!
//! Statements are rendered from static schema metadata plus a validated
//! [`Record`] or [`Filter`]. Every value travels as a typed [`Bind`], never
//! spliced into the SQL text; identifiers are always double-quoted.

use std::fmt::Write as _;

use crate::errors::Result;
use crate::filter::Filter;
use crate::schema::{EntitySchema, FieldType};
use crate::value::{Record, Value, unknown_field};

/// SQL dialect of the connected backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `SQLite` (`?N` placeholders).
    Sqlite,
    /// `PostgreSQL` (`$N` placeholders).
    Postgres,
}

impl Dialect {
    /// Positional placeholder for the 1-based parameter `n`.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Sqlite => format!("?{n}"),
            Dialect::Postgres => format!("${n}"),
        }
    }

    /// Backend name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// A bind parameter with the declared type of the column it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind {
    /// Declared column type, used to pick a typed NULL.
    pub ty: FieldType,
    /// The value.
    pub value: Value,
}

/// Rendered SQL plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Parameters, `params[0]` binding placeholder 1.
    pub params: Vec<Bind>,
}

struct Builder<'s> {
    dialect: Dialect,
    schema: &'s EntitySchema,
    sql: String,
    params: Vec<Bind>,
}

impl<'s> Builder<'s> {
    fn new(dialect: Dialect, schema: &'s EntitySchema) -> Self {
        Self {
            dialect,
            schema,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a bind for `field` and return its placeholder.
    fn bind(&mut self, field: &str, value: &Value) -> Result<String> {
        let def = self
            .schema
            .field(field)
            .ok_or_else(|| unknown_field(self.schema, field))?;
        self.params.push(Bind {
            ty: def.ty,
            value: value.clone(),
        });
        Ok(self.dialect.placeholder(self.params.len()))
    }

    fn push_where(&mut self, filter: &Filter) -> Result<()> {
        if filter.is_empty() {
            return Ok(());
        }
        self.sql.push_str(" WHERE ");
        for (i, (field, value)) in filter.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(" AND ");
            }
            if value.is_null() {
                let def = self
                    .schema
                    .field(field)
                    .ok_or_else(|| unknown_field(self.schema, field))?;
                let _ = write!(self.sql, "{} IS NULL", quote_ident(def.name));
            } else {
                let placeholder = self.bind(field, value)?;
                let _ = write!(self.sql, "{} = {placeholder}", quote_ident(field));
            }
        }
        Ok(())
    }

    fn push_returning(&mut self) {
        self.sql.push_str(" RETURNING ");
        self.sql.push_str(&column_list(self.schema));
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

fn column_list(schema: &EntitySchema) -> String {
    schema
        .fields
        .iter()
        .map(|f| quote_ident(f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `INSERT … RETURNING <all columns>`.
pub fn insert(dialect: Dialect, schema: &EntitySchema, record: &Record) -> Result<Statement> {
    let mut b = Builder::new(dialect, schema);
    let _ = write!(b.sql, "INSERT INTO {}", quote_ident(schema.name));
    if record.is_empty() {
        b.sql.push_str(" DEFAULT VALUES");
    } else {
        let mut columns = Vec::with_capacity(record.len());
        let mut placeholders = Vec::with_capacity(record.len());
        for (name, value) in record.iter() {
            columns.push(quote_ident(name));
            placeholders.push(b.bind(name, value)?);
        }
        let _ = write!(
            b.sql,
            " ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
    }
    b.push_returning();
    Ok(b.finish())
}

/// `SELECT <all columns> … ORDER BY <primary key> [LIMIT n]`.
pub fn select(
    dialect: Dialect,
    schema: &EntitySchema,
    filter: &Filter,
    limit: Option<u32>,
) -> Result<Statement> {
    let mut b = Builder::new(dialect, schema);
    let _ = write!(
        b.sql,
        "SELECT {} FROM {}",
        column_list(schema),
        quote_ident(schema.name)
    );
    b.push_where(filter)?;
    let order = schema
        .primary_key
        .iter()
        .map(|pk| quote_ident(pk))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = write!(b.sql, " ORDER BY {order}");
    if let Some(limit) = limit {
        let _ = write!(b.sql, " LIMIT {limit}");
    }
    Ok(b.finish())
}

/// `UPDATE … SET … WHERE <pk> RETURNING <all columns>`.
pub fn update(
    dialect: Dialect,
    schema: &EntitySchema,
    pk: &Filter,
    changes: &Record,
) -> Result<Statement> {
    let mut b = Builder::new(dialect, schema);
    let _ = write!(b.sql, "UPDATE {} SET ", quote_ident(schema.name));
    let mut assignments = Vec::with_capacity(changes.len());
    for (name, value) in changes.iter() {
        let placeholder = b.bind(name, value)?;
        assignments.push(format!("{} = {placeholder}", quote_ident(name)));
    }
    b.sql.push_str(&assignments.join(", "));
    b.push_where(pk)?;
    b.push_returning();
    Ok(b.finish())
}

/// `DELETE … WHERE <pk> RETURNING <all columns>`.
pub fn delete(dialect: Dialect, schema: &EntitySchema, pk: &Filter) -> Result<Statement> {
    let mut b = Builder::new(dialect, schema);
    let _ = write!(b.sql, "DELETE FROM {}", quote_ident(schema.name));
    b.push_where(pk)?;
    b.push_returning();
    Ok(b.finish())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
