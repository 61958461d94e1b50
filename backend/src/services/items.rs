//! Individually tracked item records and their lifecycle transitions
//!
//! Every function here runs inside the coordinator's transaction. Lookups
//! that precede a state change take a `FOR UPDATE` row lock, so concurrent
//! operations against the same barcode serialize: the second caller observes
//! the committed status and fails its guard.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use shared::ItemStatus;

use crate::error::{AppError, AppResult};

/// An individually tracked physical unit
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrackedItem {
    pub id: Uuid,
    pub barcode: String,
    pub inventory_type_id: Uuid,
    pub status: String,
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub distribution_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub usage_date: Option<DateTime<Utc>>,
    pub current_department_id: Option<Uuid>,
    pub current_user_id: Option<Uuid>,
    pub recipient_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedItem {
    /// Lifecycle status as a typed enum. The column carries a CHECK
    /// constraint, so an unknown value cannot come back from the store.
    pub fn item_status(&self) -> ItemStatus {
        ItemStatus::from_str(&self.status).unwrap_or(ItemStatus::Lost)
    }
}

/// Fields for a first distribution of a new barcode
#[derive(Debug)]
pub(crate) struct NewItem<'a> {
    pub barcode: &'a str,
    pub inventory_type_id: Uuid,
    pub lot_number: Option<&'a str>,
    pub expiry_date: Option<NaiveDate>,
    pub department_id: Uuid,
    pub user_id: Uuid,
    pub recipient_name: &'a str,
    pub notes: Option<&'a str>,
}

const ITEM_COLUMNS: &str = "id, barcode, inventory_type_id, status, lot_number, expiry_date, \
     distribution_date, return_date, usage_date, current_department_id, current_user_id, \
     recipient_name, notes, created_at, updated_at";

/// Look up an item by barcode, taking a row lock for a pending state change
pub(crate) async fn lock_by_barcode(
    conn: &mut PgConnection,
    barcode: &str,
) -> AppResult<Option<TrackedItem>> {
    let item = sqlx::query_as::<_, TrackedItem>(&format!(
        "SELECT {} FROM tracked_items WHERE barcode = $1 FOR UPDATE",
        ITEM_COLUMNS
    ))
    .bind(barcode)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

/// First distribution: create the record for a barcode never seen before.
///
/// Two concurrent first distributions of the same barcode both pass the
/// `lock_by_barcode` lookup (there is no row to lock yet); the UNIQUE
/// constraint on `barcode` decides the race, and the loser reports the
/// winner's committed state instead of a storage failure.
pub(crate) async fn insert_distributed(
    conn: &mut PgConnection,
    new: NewItem<'_>,
) -> AppResult<TrackedItem> {
    let item = sqlx::query_as::<_, TrackedItem>(&format!(
        r#"
        INSERT INTO tracked_items
            (barcode, inventory_type_id, status, lot_number, expiry_date,
             distribution_date, current_department_id, current_user_id, recipient_name, notes)
        VALUES ($1, $2, 'distributed', $3, $4, now(), $5, $6, $7, $8)
        RETURNING {}
        "#,
        ITEM_COLUMNS
    ))
    .bind(new.barcode)
    .bind(new.inventory_type_id)
    .bind(new.lot_number)
    .bind(new.expiry_date)
    .bind(new.department_id)
    .bind(new.user_id)
    .bind(new.recipient_name)
    .bind(new.notes)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| classify_duplicate_barcode(e, new.barcode))?;

    tracing::debug!(barcode = %item.barcode, type_id = %item.inventory_type_id, "Created tracked item");
    Ok(item)
}

/// Map a unique-violation on `tracked_items.barcode` to the lifecycle error
/// the caller would have seen had the competing insert committed first.
fn classify_duplicate_barcode(err: sqlx::Error, barcode: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::InvalidStateTransition {
                barcode: barcode.to_string(),
                status: ItemStatus::Distributed,
                attempted: "distributed",
            }
        }
        _ => AppError::from(err),
    }
}

/// Re-distribution: reuse the existing record of a returned unit.
///
/// Overwrites department/recipient/notes and the distribution timestamp,
/// clears the return timestamp, and keeps the recorded lot/expiry.
pub(crate) async fn redistribute(
    conn: &mut PgConnection,
    item: &TrackedItem,
    department_id: Uuid,
    user_id: Uuid,
    recipient_name: &str,
    notes: Option<&str>,
) -> AppResult<TrackedItem> {
    let status = item.item_status();
    if !status.can_distribute() {
        return Err(AppError::InvalidStateTransition {
            barcode: item.barcode.clone(),
            status,
            attempted: "distributed",
        });
    }

    let updated = sqlx::query_as::<_, TrackedItem>(&format!(
        r#"
        UPDATE tracked_items
        SET status = 'distributed', distribution_date = now(), return_date = NULL,
            current_department_id = $1, current_user_id = $2, recipient_name = $3,
            notes = COALESCE($4, notes), updated_at = now()
        WHERE id = $5
        RETURNING {}
        "#,
        ITEM_COLUMNS
    ))
    .bind(department_id)
    .bind(user_id)
    .bind(recipient_name)
    .bind(notes)
    .bind(item.id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(updated)
}

/// Return a distributed unit to stock.
///
/// The holder fields (department, user, recipient) describe who currently
/// has the unit, so they are cleared here; the caller captures them from the
/// pre-transition record for the audit trail.
pub(crate) async fn mark_returned(
    conn: &mut PgConnection,
    item: &TrackedItem,
    notes: Option<&str>,
) -> AppResult<TrackedItem> {
    let status = item.item_status();
    if !status.can_return() {
        return Err(AppError::InvalidStateTransition {
            barcode: item.barcode.clone(),
            status,
            attempted: "returned",
        });
    }

    let updated = sqlx::query_as::<_, TrackedItem>(&format!(
        r#"
        UPDATE tracked_items
        SET status = 'returned', return_date = now(),
            current_department_id = NULL, current_user_id = NULL, recipient_name = NULL,
            notes = COALESCE($1, notes), updated_at = now()
        WHERE id = $2
        RETURNING {}
        "#,
        ITEM_COLUMNS
    ))
    .bind(notes)
    .bind(item.id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(updated)
}

/// Mark a distributed unit as consumed; it does not come back to stock
pub(crate) async fn mark_used(
    conn: &mut PgConnection,
    item: &TrackedItem,
    notes: Option<&str>,
) -> AppResult<TrackedItem> {
    let status = item.item_status();
    if !status.can_mark_used() {
        return Err(AppError::InvalidStateTransition {
            barcode: item.barcode.clone(),
            status,
            attempted: "marked as used",
        });
    }

    let updated = sqlx::query_as::<_, TrackedItem>(&format!(
        r#"
        UPDATE tracked_items
        SET status = 'used', usage_date = now(),
            notes = COALESCE($1, notes), updated_at = now()
        WHERE id = $2
        RETURNING {}
        "#,
        ITEM_COLUMNS
    ))
    .bind(notes)
    .bind(item.id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct StubDbError {
        unique: bool,
    }

    impl fmt::Display for StubDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "database error")
        }
    }

    impl StdError for StubDbError {}

    impl sqlx::error::DatabaseError for StubDbError {
        fn message(&self) -> &str {
            "database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            if self.unique {
                Some("23505".into())
            } else {
                None
            }
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.unique {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::Other
            }
        }
    }

    // Two first-distributions of the same barcode race on the UNIQUE
    // constraint; the loser must see the winner's committed state, as a
    // recoverable lifecycle error, not a storage failure.
    #[test]
    fn test_duplicate_barcode_reports_winner_state() {
        let err = sqlx::Error::Database(Box::new(StubDbError { unique: true }));
        let mapped = classify_duplicate_barcode(err, "AR1234567");
        assert!(mapped.is_recoverable());
        match mapped {
            AppError::InvalidStateTransition {
                barcode,
                status,
                attempted,
            } => {
                assert_eq!(barcode, "AR1234567");
                assert_eq!(status, ItemStatus::Distributed);
                assert_eq!(attempted, "distributed");
            }
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn test_other_database_errors_stay_fatal() {
        let err = sqlx::Error::Database(Box::new(StubDbError { unique: false }));
        let mapped = classify_duplicate_barcode(err, "AR1234567");
        assert!(matches!(mapped, AppError::StorageError(_)));
        assert!(!mapped.is_recoverable());
    }
}
