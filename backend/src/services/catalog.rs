//! Inventory type catalog: type definitions and barcode resolution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use shared::{resolve_barcode, BarcodeKeyed, BarcodeMatch, TrackingMode};

use crate::error::{AppError, AppResult};

/// Catalog service for managing inventory type definitions
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// An inventory type (supply category)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryType {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub tracking_mode: String,
    pub barcode_key: Option<String>,
    pub requires_lot: bool,
    pub stock_quantity: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryType {
    /// Tracking mode as a typed enum. The column carries a CHECK constraint,
    /// so an unknown value cannot come back from the store.
    pub fn mode(&self) -> TrackingMode {
        TrackingMode::from_str(&self.tracking_mode).unwrap_or(TrackingMode::Bulk)
    }
}

impl BarcodeKeyed for InventoryType {
    fn tracking_mode(&self) -> TrackingMode {
        self.mode()
    }

    fn barcode_key(&self) -> Option<&str> {
        self.barcode_key.as_deref()
    }
}

/// A resolved scan: which type the barcode identifies and how it matched
#[derive(Debug, Clone)]
pub enum ResolvedType {
    /// Exact match on a bulk type's representative code
    Bulk(InventoryType),
    /// Prefix match on an item-tracked type's prefix code
    Prefix(InventoryType),
}

impl ResolvedType {
    pub fn inventory_type(&self) -> &InventoryType {
        match self {
            ResolvedType::Bulk(ty) | ResolvedType::Prefix(ty) => ty,
        }
    }
}

/// Input for creating an inventory type
#[derive(Debug, Deserialize)]
pub struct CreateTypeInput {
    pub name: String,
    pub unit: String,
    pub tracking_mode: TrackingMode,
    pub barcode_key: Option<String>,
    pub requires_lot: Option<bool>,
    pub description: Option<String>,
}

/// Input for updating an inventory type.
///
/// `None` fields keep their current value. A barcode key can be replaced but
/// never cleared through this input: scanners in the field keep resolving
/// against the registered key until a new one takes over.
#[derive(Debug, Deserialize)]
pub struct UpdateTypeInput {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub barcode_key: Option<String>,
    pub description: Option<String>,
}

/// Current stock counter for one type, as exposed to dashboards
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockSnapshotEntry {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub tracking_mode: String,
    pub stock_quantity: i32,
}

const TYPE_COLUMNS: &str = "id, name, unit, tracking_mode, barcode_key, requires_lot, \
     stock_quantity, description, created_at, updated_at";

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all inventory types, ordered by name
    pub async fn list_types(&self) -> AppResult<Vec<InventoryType>> {
        let types = sqlx::query_as::<_, InventoryType>(&format!(
            "SELECT {} FROM inventory_types ORDER BY name ASC",
            TYPE_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(types)
    }

    /// Get a single inventory type
    pub async fn get_type(&self, id: Uuid) -> AppResult<InventoryType> {
        let mut conn = self.db.acquire().await?;
        fetch_type(&mut conn, id).await
    }

    /// Current stock counters across all types
    pub async fn get_stock_snapshot(&self) -> AppResult<Vec<StockSnapshotEntry>> {
        let snapshot = sqlx::query_as::<_, StockSnapshotEntry>(
            r#"
            SELECT id, name, unit, tracking_mode, stock_quantity
            FROM inventory_types
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(snapshot)
    }

    /// Create a new inventory type
    pub async fn create_type(&self, input: CreateTypeInput) -> AppResult<InventoryType> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Type name must not be empty".to_string(),
                message_vi: "Vui lòng nhập tên loại vật tư".to_string(),
            });
        }
        if input.unit.trim().is_empty() {
            return Err(AppError::Validation {
                field: "unit".to_string(),
                message: "Unit must not be empty".to_string(),
                message_vi: "Vui lòng nhập đơn vị tính".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let name_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inventory_types WHERE name = $1)",
        )
        .bind(&input.name)
        .fetch_one(&mut *tx)
        .await?;

        if name_taken {
            return Err(AppError::DuplicateKey {
                field: "name".to_string(),
                value: input.name,
            });
        }

        if let Some(key) = &input.barcode_key {
            ensure_key_free(&mut tx, input.tracking_mode, key, None).await?;
        }

        let ty = sqlx::query_as::<_, InventoryType>(&format!(
            r#"
            INSERT INTO inventory_types (name, unit, tracking_mode, barcode_key, requires_lot, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            TYPE_COLUMNS
        ))
        .bind(&input.name)
        .bind(&input.unit)
        .bind(input.tracking_mode.as_str())
        .bind(&input.barcode_key)
        .bind(input.requires_lot.unwrap_or(false))
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(type_id = %ty.id, name = %ty.name, mode = %ty.tracking_mode, "Created inventory type");
        Ok(ty)
    }

    /// Update an inventory type's descriptive fields and barcode key
    pub async fn update_type(&self, id: Uuid, input: UpdateTypeInput) -> AppResult<InventoryType> {
        let mut tx = self.db.begin().await?;

        let existing = fetch_type(&mut *tx, id).await?;

        let name = input.name.unwrap_or_else(|| existing.name.clone());
        let unit = input.unit.unwrap_or_else(|| existing.unit.clone());
        let barcode_key = input.barcode_key.or_else(|| existing.barcode_key.clone());

        if name != existing.name {
            let name_taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM inventory_types WHERE name = $1 AND id <> $2)",
            )
            .bind(&name)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if name_taken {
                return Err(AppError::DuplicateKey {
                    field: "name".to_string(),
                    value: name,
                });
            }
        }

        if let Some(key) = &barcode_key {
            if existing.barcode_key.as_deref() != Some(key.as_str()) {
                ensure_key_free(&mut tx, existing.mode(), key, Some(id)).await?;
            }
        }

        let ty = sqlx::query_as::<_, InventoryType>(&format!(
            r#"
            UPDATE inventory_types
            SET name = $1, unit = $2, barcode_key = $3, description = $4, updated_at = now()
            WHERE id = $5
            RETURNING {}
            "#,
            TYPE_COLUMNS
        ))
        .bind(&name)
        .bind(&unit)
        .bind(&barcode_key)
        .bind(input.description.or(existing.description))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ty)
    }

    /// Delete an inventory type.
    ///
    /// Refused while any tracked item or history record still references the
    /// type: catalog entries are never deleted out from under history.
    pub async fn delete_type(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let existing = fetch_type(&mut *tx, id).await?;

        let item_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tracked_items WHERE inventory_type_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let history_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM history_records WHERE inventory_type_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if item_count > 0 || history_count > 0 {
            return Err(AppError::TypeInUse(existing.name));
        }

        sqlx::query("DELETE FROM inventory_types WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(type_id = %id, name = %existing.name, "Deleted inventory type");
        Ok(())
    }
}

/// Fetch a type by id, inside the caller's connection/transaction
pub(crate) async fn fetch_type(conn: &mut PgConnection, id: Uuid) -> AppResult<InventoryType> {
    sqlx::query_as::<_, InventoryType>(&format!(
        "SELECT {} FROM inventory_types WHERE id = $1",
        TYPE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Inventory type".to_string()))
}

/// Resolve a scanned barcode to an inventory type inside the caller's
/// transaction.
///
/// Exact match against bulk representative codes wins; otherwise the first
/// registered item-tracked type whose prefix the barcode starts with.
pub(crate) async fn resolve_for_distribution(
    conn: &mut PgConnection,
    barcode: &str,
) -> AppResult<ResolvedType> {
    // Registration order is the tie-break for prefix matches
    let types = sqlx::query_as::<_, InventoryType>(&format!(
        "SELECT {} FROM inventory_types ORDER BY created_at ASC",
        TYPE_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    match resolve_barcode(barcode, &types) {
        BarcodeMatch::Bulk(ty) => Ok(ResolvedType::Bulk(ty.clone())),
        BarcodeMatch::Prefix(ty) => Ok(ResolvedType::Prefix(ty.clone())),
        BarcodeMatch::NoMatch => Err(AppError::TypeNotFound(barcode.to_string())),
    }
}

async fn ensure_key_free(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    mode: TrackingMode,
    key: &str,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let taken = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM inventory_types
            WHERE tracking_mode = $1 AND barcode_key = $2 AND ($3::uuid IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(mode.as_str())
    .bind(key)
    .bind(exclude)
    .fetch_one(&mut **tx)
    .await?;

    if taken {
        return Err(AppError::DuplicateKey {
            field: "barcode_key".to_string(),
            value: key.to_string(),
        });
    }
    Ok(())
}
