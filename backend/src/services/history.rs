//! Append-only audit ledger and unattributed scan log

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use shared::HistoryAction;

use crate::error::AppResult;

/// History service for querying the audit trail
#[derive(Clone)]
pub struct HistoryService {
    db: PgPool,
}

/// One immutable audit entry. Written once, never updated or deleted.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub action: String,
    pub inventory_type_id: Uuid,
    pub tracked_item_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub department_id: Option<Uuid>,
    pub user_id: Uuid,
    pub recipient_name: Option<String>,
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A barcode scanned for return that matched nothing. Created, never mutated.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UnattributedScan {
    pub id: Uuid,
    pub barcode: String,
    pub scan_time: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Fields for a new ledger entry
#[derive(Debug)]
pub(crate) struct NewHistoryRecord<'a> {
    pub action: HistoryAction,
    pub inventory_type_id: Uuid,
    pub tracked_item_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub department_id: Option<Uuid>,
    pub user_id: Uuid,
    pub recipient_name: Option<&'a str>,
    pub lot_number: Option<&'a str>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<&'a str>,
}

/// Filters for querying the ledger
#[derive(Debug, Default, Deserialize)]
pub struct HistoryFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub inventory_type_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub lot_number: Option<String>,
}

const HISTORY_COLUMNS: &str = "id, action, inventory_type_id, tracked_item_id, quantity, \
     department_id, user_id, recipient_name, lot_number, expiry_date, notes, created_at";

/// Append one entry to the ledger, inside the caller's transaction
pub(crate) async fn append(
    conn: &mut PgConnection,
    record: NewHistoryRecord<'_>,
) -> AppResult<HistoryRecord> {
    let inserted = sqlx::query_as::<_, HistoryRecord>(&format!(
        r#"
        INSERT INTO history_records
            (action, inventory_type_id, tracked_item_id, quantity, department_id,
             user_id, recipient_name, lot_number, expiry_date, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {}
        "#,
        HISTORY_COLUMNS
    ))
    .bind(record.action.as_str())
    .bind(record.inventory_type_id)
    .bind(record.tracked_item_id)
    .bind(record.quantity)
    .bind(record.department_id)
    .bind(record.user_id)
    .bind(record.recipient_name)
    .bind(record.lot_number)
    .bind(record.expiry_date)
    .bind(record.notes)
    .fetch_one(&mut *conn)
    .await?;

    Ok(inserted)
}

/// Record a barcode that failed resolution during a return attempt.
///
/// Runs on its own connection and commits even though the enclosing return
/// operation reports an error; the scan must survive for reconciliation.
pub(crate) async fn log_unattributed_scan(
    db: &PgPool,
    barcode: &str,
    user_id: Option<Uuid>,
    notes: Option<&str>,
) -> AppResult<UnattributedScan> {
    let scan = sqlx::query_as::<_, UnattributedScan>(
        r#"
        INSERT INTO unattributed_scans (barcode, user_id, notes)
        VALUES ($1, $2, $3)
        RETURNING id, barcode, scan_time, user_id, notes
        "#,
    )
    .bind(barcode)
    .bind(user_id)
    .bind(notes)
    .fetch_one(db)
    .await?;

    tracing::warn!(barcode = %barcode, "Logged unattributed scan");
    Ok(scan)
}

impl HistoryService {
    /// Create a new HistoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Query the ledger, newest first
    pub async fn get_history(&self, filter: HistoryFilter) -> AppResult<Vec<HistoryRecord>> {
        let records = sqlx::query_as::<_, HistoryRecord>(&format!(
            r#"
            SELECT {}
            FROM history_records
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at <= $2)
              AND ($3::uuid IS NULL OR inventory_type_id = $3)
              AND ($4::uuid IS NULL OR department_id = $4)
              AND ($5::text IS NULL OR lot_number = $5)
            ORDER BY created_at DESC
            "#,
            HISTORY_COLUMNS
        ))
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.inventory_type_id)
        .bind(filter.department_id)
        .bind(filter.lot_number)
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }

    /// All barcodes that failed resolution during returns, newest first
    pub async fn list_unattributed_scans(&self) -> AppResult<Vec<UnattributedScan>> {
        let scans = sqlx::query_as::<_, UnattributedScan>(
            r#"
            SELECT id, barcode, scan_time, user_id, notes
            FROM unattributed_scans
            ORDER BY scan_time DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(scans)
    }

    /// Active items whose expiry date falls within the next `within_days` days
    pub async fn expiring_items(
        &self,
        within_days: i32,
    ) -> AppResult<Vec<crate::services::items::TrackedItem>> {
        let items = sqlx::query_as::<_, crate::services::items::TrackedItem>(
            r#"
            SELECT id, barcode, inventory_type_id, status, lot_number, expiry_date,
                   distribution_date, return_date, usage_date, current_department_id,
                   current_user_id, recipient_name, notes, created_at, updated_at
            FROM tracked_items
            WHERE expiry_date IS NOT NULL
              AND expiry_date <= CURRENT_DATE + $1::int
              AND status IN ('distributed', 'returned')
            ORDER BY expiry_date ASC
            "#,
        )
        .bind(within_days)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }
}
