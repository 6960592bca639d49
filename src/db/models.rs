//! Registros del dominio del TPV.
//!
//! `Guest`, `Table`, `MenuItem`, `Dish`, `Account` y `Socket` pertenecen a
//! otros sistemas y aquí solo se leen. `DishSnapshot` y `Order` son los
//! únicos registros que escribe el motor de pedidos.

use serde::{Deserialize, Serialize};

use crate::orders::status;

/// Grupo de comensales sentado en una mesa.
///
/// `table_number` queda en `None` cuando la mesa se borró después del
/// check-in; las filas de invitado sobreviven a su mesa.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: i64,
    pub name: String,
    pub table_number: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Active,
    Hidden,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub number: i64,
    pub capacity: i32,
    pub status: TableStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MenuItemStatus {
    Available,
    Hidden,
    OutOfStock,
}

/// Entrada de un menú concreto: el precio aquí es el del menú, no el base del plato.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: i64,
    pub menu_id: i64,
    pub dish_id: i64,
    pub price: i64,
    pub status: MenuItemStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DishStatus {
    Active,
    Hidden,
    Discontinued,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: String,
    pub price: i64,
    pub status: DishStatus,
}

/// Resultado de `GetMenuItemWithDish`: la entrada del menú con su plato.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItemWithDish {
    pub item: MenuItem,
    pub dish: Dish,
}

/// Miembro del personal que gestiona pedidos.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub name: String,
}

/// Conexión en vivo de un invitado, como máximo una por invitado.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Socket {
    pub guest_id: i64,
    pub socket_id: String,
}

/// Copia inmutable de un plato en el momento del pedido.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DishSnapshot {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: String,
    pub price: i64,
    pub status: MenuItemStatus,
    pub menu_item_id: i64,
    pub previous_snapshot_id: Option<i64>,
    pub created_at: i64,
}

/// Datos de una instantánea antes de que el almacén le asigne id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDishSnapshot {
    pub name: String,
    pub description: String,
    pub image: String,
    pub price: i64,
    pub status: MenuItemStatus,
    pub menu_item_id: i64,
    pub previous_snapshot_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Processing,
    Delivered,
    Paid,
    Rejected,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Delivered,
        OrderStatus::Paid,
        OrderStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Paid => "Paid",
            OrderStatus::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Una línea de pedido de un invitado.
///
/// `table_number` se copia del invitado al crear el pedido para que el
/// pedido sobreviva a cambios posteriores del invitado o de la mesa.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub guest_id: i64,
    pub table_number: i64,
    pub dish_snapshot_id: i64,
    pub quantity: i32,
    pub order_handler_id: i64,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub guest_id: i64,
    pub table_number: i64,
    pub dish_snapshot_id: i64,
    pub quantity: i32,
    pub order_handler_id: i64,
    pub status: OrderStatus,
}

/// Cambios aplicados en una sola escritura por `UpdateOrder`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub quantity: Option<i32>,
    pub dish_snapshot_id: i64,
    pub order_handler_id: i64,
}

/// Filtros de consulta de pedidos; los resultados van por `created_at` descendente.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderFilter {
    Ids(Vec<i64>),
    Payable { guest_id: i64 },
    CreatedBetween { from: Option<i64>, to: Option<i64> },
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        match self {
            OrderFilter::Ids(ids) => ids.contains(&order.id),
            OrderFilter::Payable { guest_id } => {
                order.guest_id == *guest_id && status::is_payable(order.status)
            }
            OrderFilter::CreatedBetween { from, to } => {
                from.map_or(true, |from| order.created_at >= from)
                    && to.map_or(true, |to| order.created_at <= to)
            }
        }
    }
}

/// Pedido expandido para respuestas: instantánea, invitado y encargado.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub dish_snapshot: DishSnapshot,
    pub guest: Option<Guest>,
    pub order_handler: Option<Account>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub view: OrderView,
    pub table: Option<Table>,
}

pub fn current_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
