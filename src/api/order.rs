//! # API de Pedidos
//!
//! Adaptador HTTP sobre [`OrderEngine`]:
//! - Crear pedidos de un invitado
//! - Listar pedidos por rango de fechas
//! - Consultar y actualizar un pedido
//! - Cobrar todos los pedidos abiertos de un invitado
//!
//! El miembro del personal que actúa llega en la cabecera `X-Handler-Id`.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AppError, AppResult};
use crate::db::Store;
use crate::orders::{OrderEngine, OrderLine, OrderPatch};

/// Cuerpo de `POST /orders`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrdersBody {
    guest_id: i64,
    orders: Vec<OrderLine>,
}

/// Cuerpo de `POST /orders/pay`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayOrdersBody {
    guest_id: i64,
}

/// Parámetros de consulta para listar pedidos (RFC 3339, ambos inclusivos)
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderRangeQuery {
    from_date: Option<DateTime<Utc>>,
    to_date: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ApiResponse<T> {
    message: &'static str,
    data: T,
}

fn ok<T: Serialize>(message: &'static str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse { message, data })
}

/// Extrae el id del miembro del personal de la cabecera `X-Handler-Id`
///
/// # Errores
/// - `Unauthorized`: Si falta la cabecera o no es un entero
fn extract_handler_id(req: &HttpRequest) -> AppResult<i64> {
    let header = req
        .headers()
        .get("x-handler-id")
        .ok_or_else(|| AppError::Unauthorized("Falta header X-Handler-Id".to_string()))?;

    header
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| AppError::Unauthorized("Header X-Handler-Id inválido".to_string()))
}

async fn create_orders<S: Store>(
    engine: web::Data<OrderEngine<S>>,
    body: web::Json<CreateOrdersBody>,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    let handler_id = extract_handler_id(&req)?;
    let batch = engine
        .create_orders(body.guest_id, handler_id, &body.orders)
        .await?;
    Ok(ok("Pedidos creados correctamente", batch))
}

async fn list_orders<S: Store>(
    engine: web::Data<OrderEngine<S>>,
    query: web::Query<OrderRangeQuery>,
) -> AppResult<HttpResponse> {
    if let (Some(from), Some(to)) = (query.from_date, query.to_date) {
        if from > to {
            return Err(AppError::validation_field(
                "fromDate",
                "debe ser anterior o igual a toDate",
            ));
        }
    }
    let orders = engine.list_orders(query.from_date, query.to_date).await?;
    Ok(ok("Pedidos obtenidos correctamente", orders))
}

async fn order_detail<S: Store>(
    engine: web::Data<OrderEngine<S>>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let detail = engine.order_detail(path.into_inner()).await?;
    Ok(ok("Pedido obtenido correctamente", detail))
}

async fn update_order<S: Store>(
    engine: web::Data<OrderEngine<S>>,
    path: web::Path<i64>,
    body: web::Json<OrderPatch>,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    let handler_id = extract_handler_id(&req)?;
    let updated = engine
        .update_order(path.into_inner(), &body, handler_id)
        .await?;
    Ok(ok("Pedido actualizado correctamente", updated))
}

async fn pay_orders<S: Store>(
    engine: web::Data<OrderEngine<S>>,
    body: web::Json<PayOrdersBody>,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    let handler_id = extract_handler_id(&req)?;
    let batch = engine.pay_orders(body.guest_id, handler_id).await?;
    Ok(ok("Pedidos cobrados correctamente", batch))
}

async fn snapshot_history<S: Store>(
    engine: web::Data<OrderEngine<S>>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let history = engine.snapshot_history(path.into_inner()).await?;
    Ok(ok("Historial de instantáneas obtenido correctamente", history))
}

/// Configura las rutas relacionadas con pedidos
///
/// # Rutas disponibles
/// - `POST /orders` - Crear pedidos de un invitado
/// - `GET /orders` - Listar pedidos (`fromDate`, `toDate` opcionales)
/// - `POST /orders/pay` - Cobrar los pedidos abiertos de un invitado
/// - `GET /orders/{id}` - Detalle de un pedido
/// - `PUT /orders/{id}` - Cambiar estado, plato o cantidad
/// - `GET /orders/{id}/snapshots` - Instantáneas por las que pasó el pedido
pub fn routes<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(create_orders::<S>))
            .route("", web::get().to(list_orders::<S>))
            .route("/pay", web::post().to(pay_orders::<S>))
            .route("/{id}", web::get().to(order_detail::<S>))
            .route("/{id}", web::put().to(update_order::<S>))
            .route("/{id}/snapshots", web::get().to(snapshot_history::<S>)),
    );
}
