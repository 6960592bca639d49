//! # Ciclo de vida de pedidos
//!
//! - [`availability`] - Comprueba que una entrada de menú se puede pedir
//! - [`snapshot`] - Instantáneas inmutables de platos
//! - [`status`] - Tabla de transiciones de estado
//! - [`engine`] - Operaciones transaccionales sobre pedidos

pub mod availability;
pub mod engine;
pub mod error;
pub mod snapshot;
pub mod status;


pub use engine::{OrderBatch, OrderEngine, OrderLine, OrderPatch, UpdatedOrder};
pub use error::{OrderError, OrderResult};
