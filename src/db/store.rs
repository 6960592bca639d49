//! # Contrato de almacenamiento
//!
//! El motor de pedidos solo habla con estos dos traits. `Store` cubre las
//! lecturas fuera de transacción y abre unidades de trabajo; `Transaction`
//! agrupa todas las lecturas y escrituras de una operación, que se confirma
//! una única vez con [`Transaction::commit`]. Una transacción que se suelta
//! sin confirmar se descarta.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{
    Account, DishSnapshot, Guest, MenuItemWithDish, NewDishSnapshot, NewOrder, Order, OrderFilter,
    OrderUpdate, Table,
};

/// Fallos del backend de persistencia
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Error de base de datos en operación '{operation}': {source}")]
    Database {
        operation: String,
        #[source]
        source: mongodb::error::Error,
    },

    /// Escritura concurrente sobre la misma fila
    #[error("Conflicto de escritura: {0}")]
    Conflict(String),

    #[error("Error interno de almacenamiento: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn database(operation: &str, source: mongodb::error::Error) -> Self {
        Self::Database {
            operation: operation.to_string(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: Transaction;

    /// Abre una unidad de trabajo atómica.
    async fn begin(&self) -> StoreResult<Self::Tx>;

    async fn guest(&self, id: i64) -> StoreResult<Option<Guest>>;

    async fn table(&self, number: i64) -> StoreResult<Option<Table>>;

    /// Identificador de la conexión en vivo del invitado, si tiene una.
    async fn socket_for_guest(&self, guest_id: i64) -> StoreResult<Option<String>>;

    async fn find_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;

    async fn snapshot(&self, id: i64) -> StoreResult<Option<DishSnapshot>>;

    async fn snapshots(&self, ids: &[i64]) -> StoreResult<Vec<DishSnapshot>>;

    async fn guests(&self, ids: &[i64]) -> StoreResult<Vec<Guest>>;

    async fn accounts(&self, ids: &[i64]) -> StoreResult<Vec<Account>>;
}

#[async_trait]
pub trait Transaction: Send {
    async fn menu_item_with_dish(&mut self, id: i64) -> StoreResult<Option<MenuItemWithDish>>;

    async fn order(&mut self, id: i64) -> StoreResult<Option<Order>>;

    async fn snapshot(&mut self, id: i64) -> StoreResult<Option<DishSnapshot>>;

    async fn insert_snapshot(&mut self, snapshot: NewDishSnapshot) -> StoreResult<DishSnapshot>;

    async fn insert_order(&mut self, order: NewOrder) -> StoreResult<Order>;

    async fn update_order(&mut self, id: i64, update: OrderUpdate) -> StoreResult<Option<Order>>;

    /// Marca como `Paid` los pedidos de `ids` que sigan en un estado pagable.
    /// Devuelve cuántos cambió.
    async fn mark_paid(&mut self, ids: &[i64], order_handler_id: i64) -> StoreResult<u64>;

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}
