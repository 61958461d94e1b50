//! Department lookups
//!
//! Departments are owned by an external collaborator; the core only needs an
//! existence check when recording where stock went.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Department lookup service
#[derive(Clone)]
pub struct DepartmentService {
    db: PgPool,
}

/// A hospital department receiving supplies
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl DepartmentService {
    /// Create a new DepartmentService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a department by id
    pub async fn get(&self, id: Uuid) -> AppResult<Department> {
        sqlx::query_as::<_, Department>(
            "SELECT id, name, code, created_at FROM departments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Department".to_string()))
    }
}

/// Existence check, inside the caller's transaction
pub(crate) async fn ensure_exists(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM departments WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

    if !exists {
        return Err(AppError::NotFound("Department".to_string()));
    }
    Ok(())
}
