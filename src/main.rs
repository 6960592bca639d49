//! # POS Orders Server
//!
//! Servidor de pedidos para el TPV de un restaurante, con Actix Web y MongoDB.
//!
//! ## Configuración
//!
//! Variables de entorno (archivo `.env`), ver [`pos_orders::config`]:
//!
//! ```env
//! STORE_BACKEND=mongodb
//! MONGODB_URI=mongodb://localhost:27017/?replicaSet=rs0
//! MONGODB_DATABASE=pos_orders
//! BIND_ADDRESS=0.0.0.0:8080
//! RUST_LOG=debug,mongodb=info
//! ```
//!
//! ## Ejecución
//!
//! ```bash
//! # Las transacciones necesitan un replica set
//! docker run -d --name mongo -p 27017:27017 mongo:latest --replSet rs0
//! docker exec mongo mongosh --eval 'rs.initiate()'
//!
//! cargo run
//!
//! # Sin MongoDB, con un catálogo de ejemplo en memoria
//! STORE_BACKEND=memory cargo run
//! ```

use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::EnvFilter;

use pos_orders::api;
use pos_orders::config::{Backend, Config};
use pos_orders::db::{MemoryStore, MongoRepo, Store};
use pos_orders::orders::OrderEngine;

fn io_error(message: String) -> std::io::Error {
    std::io::Error::other(message)
}

/// Levanta el servidor HTTP sobre el backend elegido
async fn serve<S: Store>(store: S, bind_address: &str) -> std::io::Result<()> {
    let engine = web::Data::new(OrderEngine::new(store));

    tracing::info!("Servidor iniciando en {}", bind_address);
    HttpServer::new(move || {
        App::new()
            .app_data(engine.clone())
            .wrap(Logger::default())
            .configure(api::init_routes::<S>)
    })
    .bind(bind_address)?
    .run()
    .await
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    // Configurar sistema de logging con tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pos_orders=debug,mongodb=info,actix_web=info")),
        )
        .init();

    let config = Config::from_env().map_err(|e| {
        tracing::error!("Configuración inválida: {}", e);
        io_error(e.to_string())
    })?;

    tracing::info!(backend = ?config.backend, "Iniciando POS Orders Server");

    match config.backend {
        Backend::MongoDb => {
            let repo = MongoRepo::init(&config.mongo).await.map_err(|e| {
                tracing::error!("Error conectando a MongoDB: {}", e);
                io_error(format!("Error de MongoDB: {}", e))
            })?;

            // Intentar crear índices para optimizar consultas
            if let Err(e) = repo.create_indexes().await {
                tracing::warn!("Advertencia creando índices: {}", e);
                // No es un error fatal, continuamos sin índices
            }

            serve(repo, &config.bind_address).await
        }
        Backend::Memory => {
            tracing::warn!("Usando almacenamiento en memoria: los pedidos se pierden al parar");
            serve(MemoryStore::with_demo_catalog().await, &config.bind_address).await
        }
    }
}
