//! The session abstraction every persistence operation runs on.
//!
//! A session wraps one pooled connection. Callers obtain it from
//! [`crate::Database::session`], pass it explicitly to each operation and drop
//! it when done; dropping a session with an open transaction rolls it back.

use crate::errors::Result;
use crate::schema::EntitySchema;
use crate::sql::{Dialect, Statement};
use crate::value::Record;

/// A unit of work over one database connection.
pub trait Session {
    /// SQL dialect spoken by this session.
    fn dialect(&self) -> Dialect;

    /// Start a transaction.
    fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Run a statement whose result rows have the columns of `schema`.
    ///
    /// Constraint violations surface as the domain variants of
    /// [`crate::StoreError`], attributed to `schema`.
    fn query(&mut self, schema: &'static EntitySchema, stmt: &Statement) -> Result<Vec<Record>>;

    /// Run parameterless SQL, possibly several statements.
    fn execute_batch(&mut self, sql: &str) -> Result<()>;

    /// Run a parameterless query returning at most one integer.
    fn query_i64(&mut self, sql: &str) -> Result<Option<i64>>;
}

/// Run `f` inside a transaction: commit on success, roll back on error.
///
/// The closure's error is returned even if the rollback itself fails.
pub fn in_transaction<S, T, F>(session: &mut S, f: F) -> Result<T>
where
    S: Session + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    session.begin()?;
    match f(session) {
        Ok(value) => {
            session.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = session.rollback() {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_rollback: bool,
    }

    impl Session for Recorder {
        fn dialect(&self) -> Dialect {
            Dialect::Sqlite
        }
        fn begin(&mut self) -> Result<()> {
            self.calls.push("begin");
            Ok(())
        }
        fn commit(&mut self) -> Result<()> {
            self.calls.push("commit");
            Ok(())
        }
        fn rollback(&mut self) -> Result<()> {
            self.calls.push("rollback");
            if self.fail_rollback {
                Err(StoreError::Validation("connection gone".into()))
            } else {
                Ok(())
            }
        }
        fn query(&mut self, _: &'static EntitySchema, _: &Statement) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }
        fn execute_batch(&mut self, _: &str) -> Result<()> {
            Ok(())
        }
        fn query_i64(&mut self, _: &str) -> Result<Option<i64>> {
            Ok(None)
        }
    }

    #[test]
    fn commits_on_success() {
        let mut s = Recorder::default();
        let out = in_transaction(&mut s, |_| Ok(5)).unwrap();
        assert_eq!(out, 5);
        assert_eq!(s.calls, vec!["begin", "commit"]);
    }

    #[test]
    fn rolls_back_on_error() {
        let mut s = Recorder::default();
        let err = in_transaction(&mut s, |_| -> Result<()> {
            Err(StoreError::NotFound { entity: "Company" })
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(s.calls, vec!["begin", "rollback"]);
    }

    #[test]
    fn closure_error_survives_failed_rollback() {
        let mut s = Recorder {
            fail_rollback: true,
            ..Recorder::default()
        };
        let err = in_transaction(&mut s, |_| -> Result<()> {
            Err(StoreError::NotFound { entity: "Sdg" })
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "Sdg" }));
    }
}
