//! Distribution coordinator: import, distribute, return and mark-used
//!
//! Each operation is one atomic transaction spanning the catalog read, the
//! stock/item mutation and the history append; it commits or rolls back as a
//! unit. The single sanctioned exception is the unattributed-scan log written
//! when a return fails to resolve, which is committed on its own even though
//! the return itself is rejected.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::{validate_barcode, validate_expiry_date, validate_quantity, validate_recipient_name, HistoryAction};

use crate::error::{AppError, AppResult};
use crate::services::catalog::{self, InventoryType, ResolvedType};
use crate::services::history::{self, HistoryRecord, NewHistoryRecord};
use crate::services::items::{self, NewItem, TrackedItem};
use crate::services::{departments, stock};

/// Coordinator for the four inventory operations
#[derive(Clone)]
pub struct DistributionService {
    db: PgPool,
}

/// Input for importing stock
#[derive(Debug, Deserialize)]
pub struct ImportStockInput {
    pub inventory_type_id: Uuid,
    pub quantity: i32,
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub user_id: Uuid,
}

/// Input for distributing against a scanned barcode
#[derive(Debug, Deserialize)]
pub struct DistributeInput {
    pub barcode: String,
    pub department_id: Uuid,
    pub recipient_name: String,
    /// Required for bulk types, ignored for item-tracked scans
    pub quantity: Option<i32>,
    /// Fallback when the barcode matches no registered prefix
    pub inventory_type_id: Option<Uuid>,
    /// Required on first distribution of a lot-tracked unit
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Resubmission acknowledging an advisory expiry warning
    #[serde(default)]
    pub accept_warning: bool,
    pub user_id: Uuid,
}

/// Input for returning or marking a unit as used
#[derive(Debug, Deserialize)]
pub struct ScanActionInput {
    pub barcode: String,
    pub notes: Option<String>,
    pub user_id: Uuid,
}

/// Result of a distribution call
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributeOutcome {
    /// Bulk quantity deducted from the type's counter
    Bulk {
        inventory_type: InventoryType,
        distributed_quantity: i32,
    },
    /// An individually tracked unit went out
    Item { item: TrackedItem },
    /// Advisory warning; nothing was committed. Resubmit with
    /// `accept_warning` to proceed.
    RequiresConfirmation { warning: ExpiryWarning },
}

/// Advisory warning: stock of the same type with a shorter expiry is waiting
#[derive(Debug, Clone, Serialize)]
pub struct ExpiryWarning {
    pub inventory_type_id: Uuid,
    pub type_name: String,
    pub earliest_import_expiry: NaiveDate,
    pub unit_expiry: NaiveDate,
    pub message_en: String,
    pub message_vi: String,
}

impl DistributionService {
    /// Create a new DistributionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Import stock for a type.
    ///
    /// Bulk imports raise the on-hand counter; item-tracked imports raise the
    /// not-yet-distributed counter without creating item records (those are
    /// created lazily on first distribution). Lot-tracked types require lot
    /// number and a non-expired expiry date.
    pub async fn import_stock(&self, input: ImportStockInput) -> AppResult<HistoryRecord> {
        if let Err(msg) = validate_quantity(input.quantity) {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
                message_vi: "Số lượng phải lớn hơn 0".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let ty = catalog::fetch_type(&mut *tx, input.inventory_type_id).await?;

        if ty.requires_lot {
            let lot = input.lot_number.as_deref().filter(|l| !l.trim().is_empty());
            let (Some(_), Some(expiry)) = (lot, input.expiry_date) else {
                return Err(AppError::Validation {
                    field: "lot_number".to_string(),
                    message: "Lot number and expiry date are required for this type".to_string(),
                    message_vi: "Vui lòng cung cấp số lô và hạn sử dụng".to_string(),
                });
            };
            if let Err(msg) = validate_expiry_date(expiry, Utc::now().date_naive()) {
                return Err(AppError::Validation {
                    field: "expiry_date".to_string(),
                    message: msg.to_string(),
                    message_vi: "Hạn sử dụng không hợp lệ hoặc đã hết hạn".to_string(),
                });
            }
        }

        stock::increase(&mut tx, ty.id, input.quantity).await?;

        let record = history::append(
            &mut tx,
            NewHistoryRecord {
                action: HistoryAction::Import,
                inventory_type_id: ty.id,
                tracked_item_id: None,
                quantity: Some(input.quantity),
                department_id: None,
                user_id: input.user_id,
                recipient_name: None,
                lot_number: input.lot_number.as_deref(),
                expiry_date: input.expiry_date,
                notes: input.notes.as_deref(),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            type_id = %ty.id,
            name = %ty.name,
            quantity = input.quantity,
            "Imported stock"
        );
        Ok(record)
    }

    /// Distribute against a scanned barcode.
    ///
    /// Resolves the barcode to a type (exact bulk match first, then
    /// item-tracked prefix match); bulk goes out by explicit quantity,
    /// item-tracked by transitioning the unit's lifecycle.
    pub async fn distribute(&self, input: DistributeInput) -> AppResult<DistributeOutcome> {
        if validate_barcode(&input.barcode).is_err() {
            return Err(AppError::Validation {
                field: "barcode".to_string(),
                message: "Barcode must not be empty".to_string(),
                message_vi: "Vui lòng cung cấp mã vạch".to_string(),
            });
        }
        if validate_recipient_name(&input.recipient_name).is_err() {
            return Err(AppError::Validation {
                field: "recipient_name".to_string(),
                message: "Recipient name must not be empty".to_string(),
                message_vi: "Vui lòng cung cấp tên người nhận".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        departments::ensure_exists(&mut tx, input.department_id).await?;

        let resolved = match catalog::resolve_for_distribution(&mut tx, &input.barcode).await {
            Ok(ResolvedType::Bulk(ty)) => {
                return self.distribute_bulk(tx, ty, input).await;
            }
            Ok(ResolvedType::Prefix(ty)) => Some(ty),
            // An unresolved prefix can still be an existing item's barcode,
            // or the caller may have named the type explicitly.
            Err(AppError::TypeNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        self.distribute_item(tx, resolved, input).await
    }

    async fn distribute_bulk(
        &self,
        mut tx: sqlx::Transaction<'_, sqlx::Postgres>,
        ty: InventoryType,
        input: DistributeInput,
    ) -> AppResult<DistributeOutcome> {
        let Some(quantity) = input.quantity else {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: format!("{} is quantity-tracked; a quantity is required", ty.name),
                message_vi: "Vui lòng cung cấp số lượng cho loại vật tư này".to_string(),
            });
        };
        if let Err(msg) = validate_quantity(quantity) {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
                message_vi: "Số lượng phải lớn hơn 0".to_string(),
            });
        }

        stock::decrease(&mut tx, ty.id, &ty.name, quantity).await?;

        history::append(
            &mut tx,
            NewHistoryRecord {
                action: HistoryAction::Distribute,
                inventory_type_id: ty.id,
                tracked_item_id: None,
                quantity: Some(quantity),
                department_id: Some(input.department_id),
                user_id: input.user_id,
                recipient_name: Some(&input.recipient_name),
                lot_number: None,
                expiry_date: None,
                notes: input.notes.as_deref(),
            },
        )
        .await?;

        // Re-read so the caller sees the post-decrement counter
        let updated = catalog::fetch_type(&mut tx, ty.id).await?;

        tx.commit().await?;

        tracing::info!(
            type_id = %updated.id,
            name = %updated.name,
            quantity,
            department_id = %input.department_id,
            "Distributed bulk stock"
        );
        Ok(DistributeOutcome::Bulk {
            inventory_type: updated,
            distributed_quantity: quantity,
        })
    }

    async fn distribute_item(
        &self,
        mut tx: sqlx::Transaction<'_, sqlx::Postgres>,
        resolved: Option<InventoryType>,
        input: DistributeInput,
    ) -> AppResult<DistributeOutcome> {
        if let Some(existing) = items::lock_by_barcode(&mut tx, &input.barcode).await? {
            // Known barcode: only a returned unit can go out again, reusing
            // the same record.
            let ty = catalog::fetch_type(&mut tx, existing.inventory_type_id).await?;
            let item = items::redistribute(
                &mut tx,
                &existing,
                input.department_id,
                input.user_id,
                &input.recipient_name,
                input.notes.as_deref(),
            )
            .await?;

            stock::decrease(&mut tx, ty.id, &ty.name, 1).await?;

            history::append(
                &mut tx,
                NewHistoryRecord {
                    action: HistoryAction::Distribute,
                    inventory_type_id: ty.id,
                    tracked_item_id: Some(item.id),
                    quantity: None,
                    department_id: Some(input.department_id),
                    user_id: input.user_id,
                    recipient_name: Some(&input.recipient_name),
                    lot_number: item.lot_number.as_deref(),
                    expiry_date: item.expiry_date,
                    notes: input.notes.as_deref(),
                },
            )
            .await?;

            tx.commit().await?;

            tracing::info!(barcode = %item.barcode, type_id = %ty.id, "Redistributed tracked item");
            return Ok(DistributeOutcome::Item { item });
        }

        // First distribution of a new barcode
        let ty = match resolved {
            Some(ty) => ty,
            None => match input.inventory_type_id {
                Some(id) => catalog::fetch_type(&mut tx, id).await?,
                None => return Err(AppError::TypeNotFound(input.barcode.clone())),
            },
        };

        let (lot_number, expiry_date) = if ty.requires_lot {
            let lot = input
                .lot_number
                .as_deref()
                .filter(|l| !l.trim().is_empty());
            let (Some(lot), Some(expiry)) = (lot, input.expiry_date) else {
                return Err(AppError::Validation {
                    field: "lot_number".to_string(),
                    message: "Lot number and expiry date are required for a new unit of this type"
                        .to_string(),
                    message_vi: "Vui lòng cung cấp số lô và hạn sử dụng".to_string(),
                });
            };

            if !input.accept_warning {
                if let Some(warning) =
                    check_expiry_warning(&mut tx, &ty, expiry).await?
                {
                    // Advisory only: commit nothing, let the caller confirm
                    return Ok(DistributeOutcome::RequiresConfirmation { warning });
                }
            }

            (Some(lot.to_string()), Some(expiry))
        } else {
            (None, None)
        };

        stock::decrease(&mut tx, ty.id, &ty.name, 1).await?;

        let item = items::insert_distributed(
            &mut tx,
            NewItem {
                barcode: &input.barcode,
                inventory_type_id: ty.id,
                lot_number: lot_number.as_deref(),
                expiry_date,
                department_id: input.department_id,
                user_id: input.user_id,
                recipient_name: &input.recipient_name,
                notes: input.notes.as_deref(),
            },
        )
        .await?;

        history::append(
            &mut tx,
            NewHistoryRecord {
                action: HistoryAction::Distribute,
                inventory_type_id: ty.id,
                tracked_item_id: Some(item.id),
                quantity: None,
                department_id: Some(input.department_id),
                user_id: input.user_id,
                recipient_name: Some(&input.recipient_name),
                lot_number: item.lot_number.as_deref(),
                expiry_date: item.expiry_date,
                notes: input.notes.as_deref(),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(barcode = %item.barcode, type_id = %ty.id, "Distributed new tracked item");
        Ok(DistributeOutcome::Item { item })
    }

    /// Return a distributed unit to stock.
    ///
    /// When the barcode resolves to no distributed unit, the scan is logged
    /// as unattributed (and that log survives) while the return itself is
    /// rejected.
    pub async fn return_item(&self, input: ScanActionInput) -> AppResult<TrackedItem> {
        if validate_barcode(&input.barcode).is_err() {
            return Err(AppError::Validation {
                field: "barcode".to_string(),
                message: "Barcode must not be empty".to_string(),
                message_vi: "Vui lòng cung cấp mã vạch".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let failure = match items::lock_by_barcode(&mut tx, &input.barcode).await? {
            Some(existing) if existing.item_status().can_return() => {
                let item = items::mark_returned(&mut tx, &existing, input.notes.as_deref()).await?;
                let ty = catalog::fetch_type(&mut tx, item.inventory_type_id).await?;

                stock::increase(&mut tx, ty.id, 1).await?;

                history::append(
                    &mut tx,
                    NewHistoryRecord {
                        action: HistoryAction::Return,
                        inventory_type_id: ty.id,
                        tracked_item_id: Some(item.id),
                        quantity: None,
                        // The update clears the holder fields; record where
                        // it came back from and who had it from the
                        // pre-transition row
                        department_id: existing.current_department_id,
                        user_id: input.user_id,
                        recipient_name: existing.recipient_name.as_deref(),
                        lot_number: item.lot_number.as_deref(),
                        expiry_date: item.expiry_date,
                        notes: input.notes.as_deref(),
                    },
                )
                .await?;

                tx.commit().await?;

                tracing::info!(barcode = %item.barcode, type_id = %ty.id, "Returned tracked item");
                return Ok(item);
            }
            Some(existing) => AppError::InvalidStateTransition {
                barcode: existing.barcode.clone(),
                status: existing.item_status(),
                attempted: "returned",
            },
            None => AppError::ItemNotFound(input.barcode.clone()),
        };

        // Roll back the lookup transaction, then persist the scan on its own
        drop(tx);

        let scan_notes = match input.notes.as_deref() {
            Some(n) if !n.trim().is_empty() => {
                format!("Scanned during return process. {}", n.trim())
            }
            _ => "Scanned during return process.".to_string(),
        };
        history::log_unattributed_scan(
            &self.db,
            &input.barcode,
            Some(input.user_id),
            Some(&scan_notes),
        )
        .await?;

        Err(failure)
    }

    /// Mark a distributed lot-tracked unit as used; it does not return to
    /// stock.
    pub async fn mark_used(&self, input: ScanActionInput) -> AppResult<TrackedItem> {
        if validate_barcode(&input.barcode).is_err() {
            return Err(AppError::Validation {
                field: "barcode".to_string(),
                message: "Barcode must not be empty".to_string(),
                message_vi: "Vui lòng cung cấp mã vạch".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let existing = items::lock_by_barcode(&mut tx, &input.barcode)
            .await?
            .ok_or_else(|| AppError::ItemNotFound(input.barcode.clone()))?;

        let ty = catalog::fetch_type(&mut tx, existing.inventory_type_id).await?;
        if !ty.requires_lot {
            return Err(AppError::ValidationError(
                "Mark-used is only available for lot-tracked items".to_string(),
            ));
        }

        let item = items::mark_used(&mut tx, &existing, input.notes.as_deref()).await?;

        history::append(
            &mut tx,
            NewHistoryRecord {
                action: HistoryAction::MarkUsed,
                inventory_type_id: ty.id,
                tracked_item_id: Some(item.id),
                quantity: None,
                department_id: item.current_department_id,
                user_id: input.user_id,
                recipient_name: item.recipient_name.as_deref(),
                lot_number: item.lot_number.as_deref(),
                expiry_date: item.expiry_date,
                notes: input.notes.as_deref(),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(barcode = %item.barcode, type_id = %ty.id, "Marked tracked item as used");
        Ok(item)
    }
}

/// Check whether earlier imports of the type carry a strictly shorter expiry
/// than the unit being distributed. Read-only.
async fn check_expiry_warning(
    conn: &mut PgConnection,
    ty: &InventoryType,
    unit_expiry: NaiveDate,
) -> AppResult<Option<ExpiryWarning>> {
    let earliest = sqlx::query_scalar::<_, NaiveDate>(
        r#"
        SELECT expiry_date FROM history_records
        WHERE inventory_type_id = $1
          AND action = 'import'
          AND expiry_date IS NOT NULL
          AND expiry_date < $2
        ORDER BY expiry_date ASC
        LIMIT 1
        "#,
    )
    .bind(ty.id)
    .bind(unit_expiry)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(earliest.map(|earliest_import_expiry| ExpiryWarning {
        inventory_type_id: ty.id,
        type_name: ty.name.clone(),
        earliest_import_expiry,
        unit_expiry,
        message_en: format!(
            "Stock of {} with a shorter expiry date ({}) is still waiting; distribute it first or resubmit to confirm",
            ty.name, earliest_import_expiry
        ),
        message_vi: format!(
            "Còn {} với hạn sử dụng ngắn hơn ({}) trong kho",
            ty.name, earliest_import_expiry
        ),
    }))
}
