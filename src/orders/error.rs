use thiserror::Error;

use crate::db::{OrderStatus, StoreError};

/// Errores del motor de pedidos
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{entity} con ID '{id}' no encontrado")]
    NotFound { entity: &'static str, id: i64 },

    /// El invitado perdió su mesa (se borró después del check-in)
    #[error("La mesa del invitado {guest_id} fue eliminada, elija otro invitado")]
    InvalidState { guest_id: i64 },

    #[error("La mesa {table_number} del invitado está oculta, elija otro invitado")]
    TableUnavailable { table_number: i64 },

    #[error("La entrada de menú {menu_item_id} no está visible en el menú")]
    Unavailable { menu_item_id: i64 },

    #[error("La entrada de menú {menu_item_id} está agotada temporalmente")]
    OutOfStock { menu_item_id: i64 },

    #[error("El plato '{dish_name}' (entrada de menú {menu_item_id}) ya no se sirve")]
    Discontinued { menu_item_id: i64, dish_name: String },

    #[error("El pedido {order_id} en estado {from} no admite {change}")]
    InvalidTransition {
        order_id: i64,
        from: OrderStatus,
        change: String,
    },

    #[error("El invitado {guest_id} no tiene pedidos pendientes de pago")]
    NothingToPay { guest_id: i64 },

    #[error("Datos inválidos: {0}")]
    InvalidInput(String),

    #[error("Error de persistencia: {0}")]
    Persistence(#[from] StoreError),
}

impl OrderError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Código estable para que el cliente elija el mensaje a mostrar.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::TableUnavailable { .. } => "TABLE_UNAVAILABLE",
            Self::Unavailable { .. } => "UNAVAILABLE",
            Self::OutOfStock { .. } => "OUT_OF_STOCK",
            Self::Discontinued { .. } => "DISCONTINUED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NothingToPay { .. } => "NOTHING_TO_PAY",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
