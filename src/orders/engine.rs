//! # Motor de pedidos
//!
//! Crea pedidos con sus instantáneas, cambia su estado y cobra en lote los
//! pedidos abiertos de un invitado. Cada operación que escribe lo hace en
//! una única transacción: o se aplican todas sus escrituras o ninguna.
//!
//! Entre la comprobación de disponibilidad y el commit no se bloquea la
//! entrada de menú. Dos pedidos simultáneos pueden confirmarse aunque un
//! operador la marque como agotada entre medias.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::availability;
use super::error::{OrderError, OrderResult};
use super::snapshot;
use super::status;
use crate::db::models::{NewOrder, OrderFilter, OrderUpdate};
use crate::db::{
    DishSnapshot, Order, OrderDetail, OrderStatus, OrderView, Store, StoreError, TableStatus,
    Transaction,
};

/// Una línea de `CreateOrders`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub menu_item_id: i64,
    pub quantity: i32,
}

/// Cambios opcionales de `UpdateOrder`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub menu_item_id: Option<i64>,
    pub quantity: Option<i32>,
}

impl OrderPatch {
    fn is_empty(&self) -> bool {
        self.status.is_none() && self.menu_item_id.is_none() && self.quantity.is_none()
    }
}

/// Pedidos afectados y la conexión del invitado a la que avisar.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBatch {
    pub orders: Vec<OrderView>,
    pub socket_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedOrder {
    pub order: OrderView,
    pub socket_id: Option<String>,
}

fn ensure_quantity(quantity: i32) -> OrderResult<()> {
    if quantity < 1 {
        return Err(OrderError::InvalidInput(format!(
            "La cantidad debe ser mayor a 0 (recibido {})",
            quantity
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct OrderEngine<S> {
    store: S,
}

impl<S: Store> OrderEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registra todas las líneas de un invitado o ninguna.
    pub async fn create_orders(
        &self,
        guest_id: i64,
        order_handler_id: i64,
        lines: &[OrderLine],
    ) -> OrderResult<OrderBatch> {
        if lines.is_empty() {
            return Err(OrderError::InvalidInput(
                "Se requiere al menos una línea de pedido".to_string(),
            ));
        }
        for line in lines {
            ensure_quantity(line.quantity)?;
        }

        let guest = self
            .store
            .guest(guest_id)
            .await?
            .ok_or_else(|| OrderError::not_found("Invitado", guest_id))?;
        let table_number = guest
            .table_number
            .ok_or(OrderError::InvalidState { guest_id })?;
        let table = self
            .store
            .table(table_number)
            .await?
            .ok_or_else(|| OrderError::not_found("Mesa", table_number))?;
        if table.status == TableStatus::Hidden {
            return Err(OrderError::TableUnavailable { table_number });
        }

        let mut tx = self.store.begin().await?;
        let result =
            Self::insert_lines(&mut tx, guest_id, table_number, order_handler_id, lines).await;
        let rows = finish(tx, result).await?;

        tracing::info!(
            guest_id,
            table_number,
            handler_id = order_handler_id,
            count = rows.len(),
            "Pedidos creados"
        );

        let orders = self.views(rows).await;
        let socket_id = self.socket_for(guest_id).await;
        Ok(OrderBatch { orders, socket_id })
    }

    async fn insert_lines(
        tx: &mut S::Tx,
        guest_id: i64,
        table_number: i64,
        order_handler_id: i64,
        lines: &[OrderLine],
    ) -> OrderResult<Vec<(Order, DishSnapshot)>> {
        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            let entry = availability::check_menu_item(tx, line.menu_item_id).await?;
            let snapshot = snapshot::capture(tx, &entry, None).await?;
            let order = tx
                .insert_order(NewOrder {
                    guest_id,
                    table_number,
                    dish_snapshot_id: snapshot.id,
                    quantity: line.quantity,
                    order_handler_id,
                    status: OrderStatus::Pending,
                })
                .await?;
            rows.push((order, snapshot));
        }
        Ok(rows)
    }

    /// Cambia estado, cantidad o plato de un pedido.
    ///
    /// Un pedido `Rejected` o `Paid` no admite ningún cambio, ni siquiera uno
    /// mal formado: el error es siempre `InvalidTransition`. Cambiar de plato
    /// crea una instantánea nueva; la anterior se conserva.
    pub async fn update_order(
        &self,
        order_id: i64,
        patch: &OrderPatch,
        order_handler_id: i64,
    ) -> OrderResult<UpdatedOrder> {
        let mut tx = self.store.begin().await?;
        let result = Self::apply_patch(&mut tx, order_id, patch, order_handler_id).await;
        let (order, snapshot) = finish(tx, result).await?;

        tracing::info!(
            order_id,
            status = %order.status,
            handler_id = order_handler_id,
            "Pedido actualizado"
        );

        let guest_id = order.guest_id;
        let order = self
            .views(vec![(order, snapshot)])
            .await
            .pop()
            .ok_or_else(|| OrderError::not_found("Pedido", order_id))?;
        let socket_id = self.socket_for(guest_id).await;
        Ok(UpdatedOrder { order, socket_id })
    }

    async fn apply_patch(
        tx: &mut S::Tx,
        order_id: i64,
        patch: &OrderPatch,
        order_handler_id: i64,
    ) -> OrderResult<(Order, DishSnapshot)> {
        let order = tx
            .order(order_id)
            .await?
            .ok_or_else(|| OrderError::not_found("Pedido", order_id))?;

        if status::is_terminal(order.status) {
            return Err(OrderError::InvalidTransition {
                order_id,
                from: order.status,
                change: "más cambios".to_string(),
            });
        }
        if patch.is_empty() {
            return Err(OrderError::InvalidInput(
                "No hay cambios que aplicar al pedido".to_string(),
            ));
        }
        if let Some(quantity) = patch.quantity {
            ensure_quantity(quantity)?;
        }
        if let Some(to) = patch.status {
            status::check_update(order_id, order.status, to)?;
        }

        let current = Self::current_snapshot(tx, &order).await?;

        let mut dish_snapshot = current;
        if let Some(menu_item_id) = patch.menu_item_id {
            if menu_item_id != dish_snapshot.menu_item_id {
                let entry = availability::check_menu_item(tx, menu_item_id).await?;
                dish_snapshot = snapshot::capture(tx, &entry, Some(dish_snapshot.id)).await?;
            }
        }

        let updated = tx
            .update_order(
                order_id,
                OrderUpdate {
                    status: patch.status,
                    quantity: patch.quantity,
                    dish_snapshot_id: dish_snapshot.id,
                    order_handler_id,
                },
            )
            .await?
            .ok_or_else(|| OrderError::not_found("Pedido", order_id))?;
        Ok((updated, dish_snapshot))
    }

    /// Cobra todos los pedidos abiertos del invitado.
    ///
    /// Solo se tocan los ids seleccionados que sigan abiertos al escribir;
    /// los que pasaron a `Paid` o `Rejected` entre medias se quedan como están.
    pub async fn pay_orders(&self, guest_id: i64, order_handler_id: i64) -> OrderResult<OrderBatch> {
        let ids: Vec<i64> = self
            .store
            .find_orders(&OrderFilter::Payable { guest_id })
            .await?
            .into_iter()
            .map(|order| order.id)
            .collect();
        if ids.is_empty() {
            return Err(OrderError::NothingToPay { guest_id });
        }

        let mut tx = self.store.begin().await?;
        let result = Self::settle(&mut tx, guest_id, &ids, order_handler_id).await;
        let (modified, rows) = finish(tx, result).await?;

        tracing::info!(
            guest_id,
            handler_id = order_handler_id,
            selected = ids.len(),
            paid = modified,
            "Pedidos cobrados"
        );

        let orders = self.views(rows).await;
        let socket_id = self.socket_for(guest_id).await;
        Ok(OrderBatch { orders, socket_id })
    }

    /// Marca los pedidos como pagados y los vuelve a leer dentro de la
    /// misma transacción, en el orden de `ids`.
    async fn settle(
        tx: &mut S::Tx,
        guest_id: i64,
        ids: &[i64],
        order_handler_id: i64,
    ) -> OrderResult<(u64, Vec<(Order, DishSnapshot)>)> {
        let modified = tx.mark_paid(ids, order_handler_id).await?;
        if modified == 0 {
            return Err(OrderError::NothingToPay { guest_id });
        }

        let mut rows = Vec::with_capacity(ids.len());
        for &id in ids {
            let order = tx
                .order(id)
                .await?
                .ok_or_else(|| OrderError::not_found("Pedido", id))?;
            let snapshot = Self::current_snapshot(tx, &order).await?;
            rows.push((order, snapshot));
        }
        Ok((modified, rows))
    }

    async fn current_snapshot(tx: &mut S::Tx, order: &Order) -> OrderResult<DishSnapshot> {
        let snapshot = tx.snapshot(order.dish_snapshot_id).await?.ok_or_else(|| {
            StoreError::Internal(format!(
                "El pedido {} apunta a la instantánea inexistente {}",
                order.id, order.dish_snapshot_id
            ))
        })?;
        Ok(snapshot)
    }

    /// Pedidos creados en `[from, to]`, más recientes primero.
    pub async fn list_orders(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> OrderResult<Vec<OrderView>> {
        let filter = OrderFilter::CreatedBetween {
            from: from.map(|date| date.timestamp_millis()),
            to: to.map(|date| date.timestamp_millis()),
        };
        let orders = self.store.find_orders(&filter).await?;
        self.load_views(orders).await
    }

    pub async fn order_detail(&self, order_id: i64) -> OrderResult<OrderDetail> {
        let order = self.find_order(order_id).await?;
        let table = self.store.table(order.table_number).await?;
        let view = self
            .load_views(vec![order])
            .await?
            .pop()
            .ok_or_else(|| OrderError::not_found("Pedido", order_id))?;
        Ok(OrderDetail { view, table })
    }

    /// Instantáneas por las que pasó un pedido, la actual primero.
    pub async fn snapshot_history(&self, order_id: i64) -> OrderResult<Vec<DishSnapshot>> {
        let order = self.find_order(order_id).await?;
        snapshot::history(&self.store, order.dish_snapshot_id).await
    }

    async fn find_order(&self, order_id: i64) -> OrderResult<Order> {
        self.store
            .find_orders(&OrderFilter::Ids(vec![order_id]))
            .await?
            .pop()
            .ok_or_else(|| OrderError::not_found("Pedido", order_id))
    }

    /// Lee la instantánea de cada pedido y los expande con [`Self::views`].
    async fn load_views(&self, orders: Vec<Order>) -> OrderResult<Vec<OrderView>> {
        let snapshot_ids: Vec<i64> = orders
            .iter()
            .map(|order| order.dish_snapshot_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let snapshots: HashMap<i64, DishSnapshot> = self
            .store
            .snapshots(&snapshot_ids)
            .await?
            .into_iter()
            .map(|snapshot| (snapshot.id, snapshot))
            .collect();

        let rows = orders
            .into_iter()
            .map(|order| -> OrderResult<(Order, DishSnapshot)> {
                let snapshot = snapshots.get(&order.dish_snapshot_id).cloned().ok_or_else(|| {
                    StoreError::Internal(format!(
                        "El pedido {} apunta a la instantánea inexistente {}",
                        order.id, order.dish_snapshot_id
                    ))
                })?;
                Ok((order, snapshot))
            })
            .collect::<OrderResult<Vec<_>>>()?;

        Ok(self.views(rows).await)
    }

    /// Añade invitado y encargado a cada pedido.
    ///
    /// Se llama también después de confirmar, así que un fallo de lectura
    /// deja esos campos vacíos en vez de devolver error.
    async fn views(&self, rows: Vec<(Order, DishSnapshot)>) -> Vec<OrderView> {
        let guest_ids: Vec<i64> = rows
            .iter()
            .map(|(order, _)| order.guest_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let handler_ids: Vec<i64> = rows
            .iter()
            .map(|(order, _)| order.order_handler_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let guests: HashMap<_, _> = match self.store.guests(&guest_ids).await {
            Ok(guests) => guests.into_iter().map(|guest| (guest.id, guest)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "No se pudieron leer los invitados de los pedidos");
                HashMap::new()
            }
        };
        let handlers: HashMap<_, _> = match self.store.accounts(&handler_ids).await {
            Ok(accounts) => accounts
                .into_iter()
                .map(|account| (account.id, account))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "No se pudieron leer los encargados de los pedidos");
                HashMap::new()
            }
        };

        rows.into_iter()
            .map(|(order, dish_snapshot)| OrderView {
                guest: guests.get(&order.guest_id).cloned(),
                order_handler: handlers.get(&order.order_handler_id).cloned(),
                dish_snapshot,
                order,
            })
            .collect()
    }

    /// Fuera de transacción; un fallo aquí no deshace lo ya confirmado.
    async fn socket_for(&self, guest_id: i64) -> Option<String> {
        match self.store.socket_for_guest(guest_id).await {
            Ok(socket_id) => socket_id,
            Err(e) => {
                tracing::warn!(guest_id, error = %e, "No se pudo resolver el socket del invitado");
                None
            }
        }
    }
}

/// Confirma si `result` es `Ok`, si no aborta y devuelve el error original.
async fn finish<T, X>(tx: X, result: OrderResult<T>) -> OrderResult<T>
where
    X: Transaction,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(error = %rollback_error, "Fallo al abortar la transacción");
            }
            tracing::debug!(code = e.code(), error = %e, "Transacción abortada");
            Err(e)
        }
    }
}
