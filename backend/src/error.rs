//! Error handling for the Hospital Supply Tracking Platform
//!
//! Provides consistent, renderable error details in English and Vietnamese.
//! The embedding HTTP shell maps `ErrorDetail` onto its wire format; the
//! suggested status code is carried alongside so the mapping stays in one
//! place.

use serde::Serialize;
use shared::ItemStatus;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_vi: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    // Catalog errors
    #[error("No inventory type matches barcode {0}")]
    TypeNotFound(String),

    #[error("Duplicate {field}: {value}")]
    DuplicateKey { field: String, value: String },

    #[error("Inventory type {0} is referenced by items or history")]
    TypeInUse(String),

    // Stock errors
    #[error("Insufficient stock of {name}: requested {requested}, available {available}")]
    InsufficientStock {
        name: String,
        requested: i32,
        available: i32,
    },

    // Item lifecycle errors
    #[error("Item {barcode} is {status:?} and cannot be {attempted}")]
    InvalidStateTransition {
        barcode: String,
        status: ItemStatus,
        attempted: &'static str,
    },

    #[error("No tracked item with barcode {0}")]
    ItemNotFound(String),

    // Collaborator lookups (departments, users)
    #[error("Resource not found: {0}")]
    NotFound(String),

    // Fatal errors
    #[error("Storage error: {0}")]
    StorageError(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias used by all services
pub type AppResult<T> = Result<T, AppError>;

/// Error response structure for the embedding shell
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Structured, renderable error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_vi: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    /// Whether the error is an expected domain outcome (transaction rolled
    /// back, system consistent) as opposed to a fatal failure.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            AppError::StorageError(_) | AppError::Configuration(_) | AppError::Internal(_)
        )
    }

    /// Suggested HTTP status code plus renderable detail
    pub fn status_and_detail(&self) -> (u16, ErrorDetail) {
        match self {
            AppError::Validation {
                field,
                message,
                message_vi,
            } => (
                400,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_vi: message_vi.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                400,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_vi: format!("Dữ liệu không hợp lệ: {}", msg),
                    field: None,
                },
            ),
            AppError::TypeNotFound(barcode) => (
                404,
                ErrorDetail {
                    code: "TYPE_NOT_FOUND".to_string(),
                    message_en: format!("No inventory type matches barcode {}", barcode),
                    message_vi: format!(
                        "Không tìm thấy loại vật tư phù hợp với mã vạch {}",
                        barcode
                    ),
                    field: None,
                },
            ),
            AppError::DuplicateKey { field, value } => (
                409,
                ErrorDetail {
                    code: "DUPLICATE_KEY".to_string(),
                    message_en: format!("A type with {} {} already exists", field, value),
                    message_vi: format!("Đã tồn tại loại vật tư với {} {}", field, value),
                    field: Some(field.clone()),
                },
            ),
            AppError::TypeInUse(name) => (
                409,
                ErrorDetail {
                    code: "TYPE_IN_USE".to_string(),
                    message_en: format!(
                        "Type {} cannot be deleted: items or history still reference it",
                        name
                    ),
                    message_vi: format!(
                        "Không thể xóa loại {} vì đã có vật tư hoặc lịch sử trong hệ thống",
                        name
                    ),
                    field: None,
                },
            ),
            AppError::InsufficientStock {
                name,
                requested,
                available,
            } => (
                422,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message_en: format!(
                        "Insufficient stock of {}: requested {}, available {}",
                        name, requested, available
                    ),
                    message_vi: format!(
                        "Số lượng tồn kho của {} không đủ (cần {}, còn {})",
                        name, requested, available
                    ),
                    field: None,
                },
            ),
            AppError::InvalidStateTransition {
                barcode,
                status,
                attempted,
            } => (
                422,
                ErrorDetail {
                    code: "INVALID_STATE_TRANSITION".to_string(),
                    message_en: format!(
                        "Item {} is {} and cannot be {}",
                        barcode,
                        status.describe_en(),
                        attempted
                    ),
                    message_vi: format!(
                        "Vật tư {} {} và không thể {}",
                        barcode,
                        status.describe_vi(),
                        attempted_vi(attempted)
                    ),
                    field: None,
                },
            ),
            AppError::ItemNotFound(barcode) => (
                404,
                ErrorDetail {
                    code: "ITEM_NOT_FOUND".to_string(),
                    message_en: format!("No tracked item with barcode {}", barcode),
                    message_vi: format!("Không tìm thấy vật tư với mã vạch {}", barcode),
                    field: None,
                },
            ),
            AppError::NotFound(resource) => (
                404,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_vi: format!("Không tìm thấy {}", resource),
                    field: None,
                },
            ),
            AppError::StorageError(_) => (
                500,
                ErrorDetail {
                    code: "STORAGE_ERROR".to_string(),
                    message_en: "A storage error occurred; the operation was not applied"
                        .to_string(),
                    message_vi: "Lỗi lưu trữ; thao tác chưa được thực hiện".to_string(),
                    field: None,
                },
            ),
            AppError::Configuration(msg) => (
                500,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message_en: format!("Configuration error: {}", msg),
                    message_vi: "Lỗi cấu hình hệ thống".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(_) => (
                500,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "Internal server error".to_string(),
                    message_vi: "Lỗi máy chủ nội bộ".to_string(),
                    field: None,
                },
            ),
        }
    }
}

fn attempted_vi(attempted: &str) -> &str {
    match attempted {
        "distributed" => "phân phối lại",
        "returned" => "trả lại",
        "marked as used" => "đánh dấu là đã sử dụng",
        _ => attempted,
    }
}
