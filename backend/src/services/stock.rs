//! Atomic stock counter updates
//!
//! The counter mutation is a single guarded UPDATE inside the caller's
//! transaction, never a read-then-write, so concurrent decrements against the
//! same type serialize on the row and can never jointly overdraw stock.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Increase a type's stock counter
pub(crate) async fn increase(
    conn: &mut PgConnection,
    type_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE inventory_types SET stock_quantity = stock_quantity + $1, updated_at = now() WHERE id = $2",
    )
    .bind(quantity)
    .bind(type_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Inventory type".to_string()));
    }

    Ok(())
}

/// Decrease a type's stock counter, failing without any partial decrement
/// when the counter would go negative.
pub(crate) async fn decrease(
    conn: &mut PgConnection,
    type_id: Uuid,
    type_name: &str,
    quantity: i32,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_types
        SET stock_quantity = stock_quantity - $1, updated_at = now()
        WHERE id = $2 AND stock_quantity >= $1
        "#,
    )
    .bind(quantity)
    .bind(type_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let available =
            sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM inventory_types WHERE id = $1")
                .bind(type_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| AppError::NotFound("Inventory type".to_string()))?;

        tracing::warn!(
            type_id = %type_id,
            requested = quantity,
            available,
            "Rejected stock decrement"
        );

        return Err(AppError::InsufficientStock {
            name: type_name.to_string(),
            requested: quantity,
            available,
        });
    }

    Ok(())
}
