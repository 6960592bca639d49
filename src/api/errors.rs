//! # Errores de la API
//!
//! Traduce los errores del motor de pedidos a respuestas HTTP. El cuerpo
//! lleva un `code` estable para que el terminal muestre el mensaje adecuado.

use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use super::middleware::log_error_chain;
use crate::orders::OrderError;

/// Tipos de error de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    /// Error de validación con campo específico
    #[error("Error de validación en campo '{field}': {message}")]
    ValidationWithField { field: String, message: String },

    /// Error de autorización simple
    #[error("No autorizado: {0}")]
    Unauthorized(String),

    /// Error del motor de pedidos
    #[error(transparent)]
    Order(#[from] OrderError),
}

impl AppError {
    /// Crea un error de validación con campo específico
    pub fn validation_field(field: &str, message: &str) -> Self {
        Self::ValidationWithField {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationWithField { .. } => "INVALID_INPUT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Order(error) => error.code(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = |error: &str| ErrorResponse {
            error: error.to_string(),
            code: self.code(),
            message: self.to_string(),
        };

        match self {
            Self::ValidationWithField { field, message } => {
                tracing::warn!(
                    field = %field,
                    message = %message,
                    "Validation error"
                );
                HttpResponse::BadRequest().json(body("Error de validación"))
            }
            Self::Unauthorized(reason) => {
                tracing::warn!(reason = %reason, "Unauthorized access attempt");
                HttpResponse::Unauthorized().json(body("No autorizado"))
            }
            Self::Order(error) => match error {
                OrderError::NotFound { entity, id } => {
                    tracing::info!(resource_type = %entity, id = %id, "Resource not found");
                    HttpResponse::NotFound().json(body("No encontrado"))
                }
                OrderError::InvalidInput(message) => {
                    tracing::warn!(message = %message, "Validation error");
                    HttpResponse::BadRequest().json(body("Error de validación"))
                }
                OrderError::InvalidState { .. }
                | OrderError::TableUnavailable { .. }
                | OrderError::Unavailable { .. }
                | OrderError::OutOfStock { .. }
                | OrderError::Discontinued { .. } => {
                    tracing::info!(code = error.code(), error = %error, "Order refused");
                    HttpResponse::UnprocessableEntity().json(body("Pedido no disponible"))
                }
                OrderError::InvalidTransition { .. } | OrderError::NothingToPay { .. } => {
                    tracing::info!(code = error.code(), error = %error, "Order conflict");
                    HttpResponse::Conflict().json(body("Conflicto"))
                }
                OrderError::Persistence(source) => {
                    log_error_chain(source, Some("Database error occurred"));
                    HttpResponse::InternalServerError().json(ErrorResponse {
                        error: "Error de base de datos".to_string(),
                        code: self.code(),
                        message: "Error interno del servidor".to_string(),
                    })
                }
            },
        }
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub message: String,
}

pub type AppResult<T> = Result<T, AppError>;
