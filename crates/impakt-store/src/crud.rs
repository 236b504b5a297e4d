//! Generic CRUD operations.
//!
//! Every function is generic over `E: Entity` and takes an explicit session.
//! Inputs are validated against `E::SCHEMA` before any SQL runs. Writes run
//! in their own transaction and are rolled back before an error surfaces.

use tracing::debug;

use crate::errors::{Result, StoreError};
use crate::filter::Filter;
use crate::schema::Entity;
use crate::session::{Session, in_transaction};
use crate::sql;
use crate::value::Record;

/// Insert a new row and return it as persisted, generated keys included.
pub fn create<E, S>(session: &mut S, fields: Record) -> Result<E>
where
    E: Entity,
    S: Session + ?Sized,
{
    let schema = E::SCHEMA;
    fields.validate_for_create(schema)?;
    let stmt = sql::insert(session.dialect(), schema, &fields)?;
    debug!(entity = schema.name, op = "create", "persisting");

    let row = in_transaction(session, |s| {
        s.query(schema, &stmt)?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound {
                entity: schema.name,
            })
    })?;
    E::from_record(row)
}

/// Fetch the first row (by primary key order) matching every predicate.
pub fn get<E, S>(session: &mut S, filter: &Filter) -> Result<E>
where
    E: Entity,
    S: Session + ?Sized,
{
    let schema = E::SCHEMA;
    if filter.is_empty() {
        return Err(StoreError::Validation(format!(
            "get on {} needs at least one predicate",
            schema.name
        )));
    }
    filter.validate(schema)?;
    let stmt = sql::select(session.dialect(), schema, filter, Some(1))?;
    debug!(entity = schema.name, op = "get", predicates = filter.len(), "querying");

    let row = session
        .query(schema, &stmt)?
        .into_iter()
        .next()
        .ok_or(StoreError::NotFound {
            entity: schema.name,
        })?;
    E::from_record(row)
}

/// Fetch every row ordered by primary key. An empty table is `NotFound`.
pub fn get_all<E, S>(session: &mut S) -> Result<Vec<E>>
where
    E: Entity,
    S: Session + ?Sized,
{
    let schema = E::SCHEMA;
    let stmt = sql::select(session.dialect(), schema, &Filter::new(), None)?;
    debug!(entity = schema.name, op = "get_all", "querying");

    let rows = session.query(schema, &stmt)?;
    if rows.is_empty() {
        return Err(StoreError::NotFound {
            entity: schema.name,
        });
    }
    rows.into_iter().map(E::from_record).collect()
}

/// Change the named fields of the row identified by `pk`; returns the updated row.
pub fn update<E, S>(session: &mut S, pk: &Filter, fields: Record) -> Result<E>
where
    E: Entity,
    S: Session + ?Sized,
{
    let schema = E::SCHEMA;
    pk.validate_primary_key(schema)?;
    fields.validate_for_update(schema)?;
    let stmt = sql::update(session.dialect(), schema, pk, &fields)?;
    debug!(entity = schema.name, op = "update", fields = fields.len(), "persisting");

    let row = in_transaction(session, |s| {
        s.query(schema, &stmt)?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound {
                entity: schema.name,
            })
    })?;
    E::from_record(row)
}

/// Remove the row identified by `pk`; returns the deleted row.
pub fn delete<E, S>(session: &mut S, pk: &Filter) -> Result<E>
where
    E: Entity,
    S: Session + ?Sized,
{
    let schema = E::SCHEMA;
    pk.validate_primary_key(schema)?;
    let stmt = sql::delete(session.dialect(), schema, pk)?;
    debug!(entity = schema.name, op = "delete", "persisting");

    let row = in_transaction(session, |s| {
        s.query(schema, &stmt)?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound {
                entity: schema.name,
            })
    })?;
    E::from_record(row)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{AnySession, Database};
    use crate::entities::{Company, CompanyDescription, Sdg, SubSdg};
    use crate::migrations::run_migrations;
    use crate::value::Value;
    use assert_matches::assert_matches;

    fn migrated() -> AnySession {
        let db = Database::sqlite_in_memory().unwrap();
        let mut session = db.session().unwrap();
        let _ = run_migrations(&mut session).unwrap();
        session
    }

    fn acme(session: &mut AnySession) -> Company {
        create(session, Record::new().with("name", "Acme").with("stock_ticker", "ACME")).unwrap()
    }

    #[test]
    fn create_assigns_generated_key() {
        let mut s = migrated();
        let company = acme(&mut s);
        assert_eq!(company.id, 1);
        assert_eq!(company.name, "Acme");
        assert_eq!(company.stock_ticker.as_deref(), Some("ACME"));
        assert_eq!(company.website, None);
    }

    #[test]
    fn create_rejects_missing_required_field() {
        let mut s = migrated();
        let result: Result<Company> = create(&mut s, Record::new().with("website", "acme.io"));
        assert_matches!(result, Err(StoreError::Validation(_)));
    }

    #[test]
    fn create_rejects_explicit_generated_key() {
        let mut s = migrated();
        let result: Result<Sdg> =
            create(&mut s, Record::new().with("id", 13).with("name", "Climate action"));
        assert_matches!(result, Err(StoreError::Validation(_)));
        assert_matches!(get_all::<Sdg, _>(&mut s), Err(StoreError::NotFound { .. }));

        // The sequence still starts at one.
        let sdg: Sdg = create(&mut s, Record::new().with("name", "No poverty")).unwrap();
        assert_eq!(sdg.id, 1);
    }

    #[test]
    fn create_duplicate_key_is_resource_exists() {
        let mut s = migrated();
        let company = acme(&mut s);
        let fields = Record::new()
            .with("company_id", company.id)
            .with("description", "Makes anvils");
        let _: CompanyDescription = create(&mut s, fields.clone()).unwrap();
        let second: Result<CompanyDescription> = create(&mut s, fields);
        assert_matches!(
            second,
            Err(StoreError::ResourceExists { entity: "CompanyDescription", .. })
        );
    }

    #[test]
    fn create_with_missing_parent_is_foreign_key_violation() {
        let mut s = migrated();
        let result: Result<SubSdg> =
            create(&mut s, Record::new().with("sdg_id", 99).with("name", "1.1"));
        assert_matches!(
            result,
            Err(StoreError::ForeignKeyViolation { entity: "SubSdg", .. })
        );
        // The failed write left nothing behind.
        assert_matches!(get_all::<SubSdg, _>(&mut s), Err(StoreError::NotFound { .. }));
    }

    #[test]
    fn get_by_field_and_by_key() {
        let mut s = migrated();
        let created = acme(&mut s);
        let by_name: Company = get(&mut s, &Filter::new().eq("name", "Acme")).unwrap();
        let by_key: Company = get(&mut s, &Filter::new().eq("id", created.id)).unwrap();
        assert_eq!(by_name, created);
        assert_eq!(by_key, created);
    }

    #[test]
    fn get_returns_lowest_key_on_multiple_matches() {
        let mut s = migrated();
        let first = acme(&mut s);
        let _second = acme(&mut s);
        let found: Company = get(&mut s, &Filter::new().eq("name", "Acme")).unwrap();
        assert_eq!(found.id, first.id);
    }

    #[test]
    fn get_null_predicate_matches_missing_values() {
        let mut s = migrated();
        let created = acme(&mut s);
        let found: Company = get(&mut s, &Filter::new().eq("website", Value::Null)).unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn get_missing_is_not_found() {
        let mut s = migrated();
        let result: Result<Company> = get(&mut s, &Filter::new().eq("id", 404));
        assert_matches!(result, Err(StoreError::NotFound { entity: "Company" }));
    }

    #[test]
    fn get_with_empty_filter_is_rejected() {
        let mut s = migrated();
        let result: Result<Company> = get(&mut s, &Filter::new());
        assert_matches!(result, Err(StoreError::Validation(_)));
    }

    #[test]
    fn get_all_empty_table_is_not_found() {
        let mut s = migrated();
        assert_matches!(
            get_all::<Company, _>(&mut s),
            Err(StoreError::NotFound { entity: "Company" })
        );
    }

    #[test]
    fn get_all_orders_by_primary_key() {
        let mut s = migrated();
        for name in ["Zeta", "Alpha", "Mid"] {
            let _: Company = create(&mut s, Record::new().with("name", name)).unwrap();
        }
        let all: Vec<Company> = get_all(&mut s).unwrap();
        let ids: Vec<_> = all.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn update_changes_only_named_fields() {
        let mut s = migrated();
        let created = acme(&mut s);
        let pk = Filter::new().eq("id", created.id);
        let updated: Company =
            update(&mut s, &pk, Record::new().with("website", "acme.example")).unwrap();
        assert_eq!(updated.website.as_deref(), Some("acme.example"));
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.stock_ticker, created.stock_ticker);

        let again: Company =
            update(&mut s, &pk, Record::new().with("website", "acme.example")).unwrap();
        assert_eq!(again, updated);
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let mut s = migrated();
        let result: Result<Company> = update(
            &mut s,
            &Filter::new().eq("id", 7),
            Record::new().with("name", "Ghost"),
        );
        assert_matches!(result, Err(StoreError::NotFound { .. }));
    }

    #[test]
    fn update_with_missing_parent_is_foreign_key_violation() {
        let mut s = migrated();
        let sdg: Sdg = create(&mut s, Record::new().with("name", "Climate action")).unwrap();
        let sub: SubSdg = create(
            &mut s,
            Record::new().with("sdg_id", sdg.id).with("name", "13.1"),
        )
        .unwrap();
        let pk = Filter::new().eq("id", sub.id);

        let result: Result<SubSdg> = update(&mut s, &pk, Record::new().with("sdg_id", 999));
        assert_matches!(
            result,
            Err(StoreError::ForeignKeyViolation { entity: "SubSdg", .. })
        );

        let unchanged: SubSdg = get(&mut s, &pk).unwrap();
        assert_eq!(unchanged.sdg_id, sdg.id);
    }

    #[test]
    fn update_to_duplicate_key_is_resource_exists() {
        let mut s = migrated();
        let first: Sdg = create(&mut s, Record::new().with("name", "No poverty")).unwrap();
        let second: Sdg = create(&mut s, Record::new().with("name", "Zero hunger")).unwrap();

        let result: Result<Sdg> = update(
            &mut s,
            &Filter::new().eq("id", second.id),
            Record::new().with("id", first.id),
        );
        assert_matches!(result, Err(StoreError::ResourceExists { entity: "Sdg", .. }));

        let kept: Sdg = get(&mut s, &Filter::new().eq("id", second.id)).unwrap();
        assert_eq!(kept.name, "Zero hunger");
    }

    #[test]
    fn update_requires_exact_primary_key() {
        let mut s = migrated();
        let _ = acme(&mut s);
        let result: Result<Company> = update(
            &mut s,
            &Filter::new().eq("name", "Acme"),
            Record::new().with("website", "x"),
        );
        assert_matches!(result, Err(StoreError::Validation(_)));
    }

    #[test]
    fn delete_returns_removed_row() {
        let mut s = migrated();
        let created = acme(&mut s);
        let pk = Filter::new().eq("id", created.id);
        let deleted: Company = delete(&mut s, &pk).unwrap();
        assert_eq!(deleted, created);
        assert_matches!(
            delete::<Company, _>(&mut s, &pk),
            Err(StoreError::NotFound { .. })
        );
    }

    #[test]
    fn composite_key_round_trip() {
        let mut s = migrated();
        let company = acme(&mut s);
        let description: CompanyDescription = create(
            &mut s,
            Record::new()
                .with("company_id", company.id)
                .with("description", "Makes anvils"),
        )
        .unwrap();
        let pk = Filter::new()
            .eq("company_id", company.id)
            .eq("description", "Makes anvils");
        let fetched: CompanyDescription = get(&mut s, &pk).unwrap();
        assert_eq!(fetched, description);
        let _: CompanyDescription = delete(&mut s, &pk).unwrap();
        assert_matches!(
            get::<CompanyDescription, _>(&mut s, &pk),
            Err(StoreError::NotFound { .. })
        );
    }

    #[test]
    fn deleting_referenced_parent_is_foreign_key_violation() {
        let mut s = migrated();
        let company = acme(&mut s);
        let _: CompanyDescription = create(
            &mut s,
            Record::new()
                .with("company_id", company.id)
                .with("description", "Makes anvils"),
        )
        .unwrap();
        let result = delete::<Company, _>(&mut s, &Filter::new().eq("id", company.id));
        assert_matches!(result, Err(StoreError::ForeignKeyViolation { .. }));
        let still_there: Company = get(&mut s, &Filter::new().eq("id", company.id)).unwrap();
        assert_eq!(still_there, company);
    }
}
