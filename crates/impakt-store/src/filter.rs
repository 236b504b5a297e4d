//! Row filters.
//!
//! A [`Filter`] is a conjunction of equality predicates. Other predicate
//! kinds (ranges, `IN`, disjunctions) would be added here as new variants of
//! the predicate type; the SQL renderer is the only other place that would
//! need to learn about them.

use crate::errors::{Result, StoreError};
use crate::schema::EntitySchema;
use crate::value::{Value, unknown_field};

/// Conjunction of `field = value` predicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filter {
    predicates: Vec<(String, Value)>,
}

impl Filter {
    /// Filter matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `field = value`. A [`Value::Null`] matches rows where the field is NULL.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push((field.into(), value.into()));
        self
    }

    /// Predicates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.predicates.iter().map(|(f, v)| (f.as_str(), v))
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Whether the filter has no predicates.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Build a filter from raw string pairs, parsing each value as its field's type.
    pub fn from_strings<'a, I>(schema: &EntitySchema, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Filter::new();
        for (name, raw) in pairs {
            let field = schema
                .field(name)
                .ok_or_else(|| unknown_field(schema, name))?;
            filter = filter.eq(name, Value::parse_str(field, raw)?);
        }
        Ok(filter)
    }

    /// Every predicate names a declared field with a value of the right type.
    pub fn validate(&self, schema: &EntitySchema) -> Result<()> {
        for (name, value) in &self.predicates {
            let field = schema
                .field(name)
                .ok_or_else(|| unknown_field(schema, name))?;
            if !value.is_null() {
                value.check(schema.name, field)?;
            }
        }
        Ok(())
    }

    /// Like [`Filter::validate`], and the predicates name exactly the primary key.
    pub fn validate_primary_key(&self, schema: &EntitySchema) -> Result<()> {
        self.validate(schema)?;
        let covers_key = self.len() == schema.primary_key.len()
            && schema
                .primary_key
                .iter()
                .all(|pk| self.predicates.iter().any(|(name, _)| name == pk));
        if !covers_key {
            return Err(StoreError::Validation(format!(
                "{} is identified by ({}), got ({})",
                schema.name,
                schema.primary_key.join(", "),
                self.predicates
                    .iter()
                    .map(|(n, _)| n.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        if let Some((name, _)) = self.predicates.iter().find(|(_, v)| v.is_null()) {
            return Err(StoreError::Validation(format!(
                "primary key field `{name}` of {} must not be null",
                schema.name
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{COMPANY, COMPANY_DESCRIPTION};
    use assert_matches::assert_matches;

    #[test]
    fn builder_keeps_order() {
        let f = Filter::new().eq("name", "Acme").eq("website", Value::Null);
        let names: Vec<_> = f.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["name", "website"]);
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn from_strings_parses_types() {
        let f = Filter::from_strings(&COMPANY, [("id", "5"), ("name", "Acme")]).unwrap();
        let values: Vec<_> = f.iter().map(|(_, v)| v.clone()).collect();
        assert_eq!(values, vec![Value::Integer(5), Value::from("Acme")]);
    }

    #[test]
    fn from_strings_rejects_unknown_field() {
        assert_matches!(
            Filter::from_strings(&COMPANY, [("colour", "red")]),
            Err(StoreError::Validation(_))
        );
    }

    #[test]
    fn null_predicate_on_required_field_is_allowed() {
        assert!(Filter::new().eq("name", Value::Null).validate(&COMPANY).is_ok());
    }

    #[test]
    fn primary_key_must_match_exactly() {
        assert!(Filter::new().eq("id", 1).validate_primary_key(&COMPANY).is_ok());
        assert_matches!(
            Filter::new().eq("name", "Acme").validate_primary_key(&COMPANY),
            Err(StoreError::Validation(_))
        );
        assert_matches!(
            Filter::new()
                .eq("id", 1)
                .eq("name", "Acme")
                .validate_primary_key(&COMPANY),
            Err(StoreError::Validation(_))
        );
    }

    #[test]
    fn composite_primary_key() {
        let partial = Filter::new().eq("company_id", 1);
        let err = partial.validate_primary_key(&COMPANY_DESCRIPTION).unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: CompanyDescription is identified by (company_id, description), got (company_id)"
        );
        let full = partial.eq("description", "Makes anvils");
        assert!(full.validate_primary_key(&COMPANY_DESCRIPTION).is_ok());
    }

    #[test]
    fn null_primary_key_rejected() {
        assert_matches!(
            Filter::new().eq("id", Value::Null).validate_primary_key(&COMPANY),
            Err(StoreError::Validation(_))
        );
    }
}
