//! # POS Orders
//!
//! Backend de pedidos para el TPV de un restaurante: convierte lo que pide
//! un invitado en pedidos duraderos con instantáneas de precio, y gestiona
//! su estado hasta el cobro.
//!
//! ```text
//! Terminales / invitados
//!     ↓ HTTP/JSON
//! API REST (Actix Web)          api::
//!     ↓
//! Motor de pedidos              orders::
//!     ↓ Store / Transaction
//! MongoDB | memoria             db::
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod orders;
