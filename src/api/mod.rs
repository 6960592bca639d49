//! # Módulo API
//!
//! Rutas HTTP sobre el motor de pedidos.
//!
//! ## Módulos principales
//!
//! - [`order`] - Crear, listar, actualizar y cobrar pedidos
//! - [`errors`] - Manejo de errores de la aplicación

pub mod errors;
mod middleware;
pub mod order;

// Re-exportar tipos comunes para facilitar su uso
pub use errors::{AppError, AppResult, ErrorResponse};

use actix_web::{web, HttpResponse};

use crate::db::Store;

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Configura todas las rutas de la API
///
/// ## Rutas configuradas
///
/// - `/orders/*` - Ver [`order::routes`]
/// - `/health` - Comprobación de vida
///
/// # Ejemplo
///
/// ```no_run
/// use actix_web::{web, App};
/// use pos_orders::{api, db::MemoryStore, orders::OrderEngine};
///
/// let app = App::new()
///     .app_data(web::Data::new(OrderEngine::new(MemoryStore::new())))
///     .configure(api::init_routes::<MemoryStore>);
/// ```
pub fn init_routes<S: Store>(cfg: &mut web::ServiceConfig) {
    order::routes::<S>(cfg);
    cfg.route("/health", web::get().to(health));
}
