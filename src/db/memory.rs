//! Backend en memoria.
//!
//! Cada transacción trabaja sobre una copia del estado y la publica entera
//! al confirmar, así que los lectores nunca ven escrituras a medias. Las
//! transacciones se serializan con el candado del estado.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::models::{
    current_timestamp_millis, Account, Dish, DishSnapshot, DishStatus, Guest, MenuItem,
    MenuItemStatus, MenuItemWithDish, NewDishSnapshot, NewOrder, Order, OrderFilter, OrderStatus,
    OrderUpdate, Table, TableStatus,
};
use super::store::{Store, StoreError, StoreResult, Transaction};
use crate::orders::status;

#[derive(Debug, Default, Clone)]
struct MemoryState {
    guests: BTreeMap<i64, Guest>,
    tables: BTreeMap<i64, Table>,
    menu_items: BTreeMap<i64, MenuItem>,
    dishes: BTreeMap<i64, Dish>,
    accounts: BTreeMap<i64, Account>,
    sockets: BTreeMap<i64, String>,
    snapshots: BTreeMap<i64, DishSnapshot>,
    orders: BTreeMap<i64, Order>,
    last_snapshot_id: i64,
    last_order_id: i64,
}

impl MemoryState {
    fn sorted_orders(&self, filter: &OrderFilter) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catálogo mínimo para arrancar el servidor sin MongoDB.
    pub async fn with_demo_catalog() -> Self {
        let store = Self::new();
        store
            .insert_table(Table { number: 1, capacity: 4, status: TableStatus::Active })
            .await;
        store
            .insert_guest(Guest {
                id: 1,
                name: "Mesa 1".to_string(),
                table_number: Some(1),
                created_at: current_timestamp_millis(),
            })
            .await;
        store.insert_account(Account { id: 1, name: "Encargado".to_string() }).await;
        store
            .insert_dish(Dish {
                id: 1,
                name: "Pho".to_string(),
                description: "Sopa de fideos con ternera".to_string(),
                image: "/static/pho.jpg".to_string(),
                price: 50,
                status: DishStatus::Active,
            })
            .await;
        store
            .insert_menu_item(MenuItem {
                id: 1,
                menu_id: 1,
                dish_id: 1,
                price: 60,
                status: MenuItemStatus::Available,
            })
            .await;
        store
    }

    pub async fn insert_guest(&self, guest: Guest) {
        self.state.lock().await.guests.insert(guest.id, guest);
    }

    pub async fn insert_table(&self, table: Table) {
        self.state.lock().await.tables.insert(table.number, table);
    }

    pub async fn remove_table(&self, number: i64) {
        self.state.lock().await.tables.remove(&number);
    }

    pub async fn insert_dish(&self, dish: Dish) {
        self.state.lock().await.dishes.insert(dish.id, dish);
    }

    pub async fn insert_menu_item(&self, item: MenuItem) {
        self.state.lock().await.menu_items.insert(item.id, item);
    }

    pub async fn insert_account(&self, account: Account) {
        self.state.lock().await.accounts.insert(account.id, account);
    }

    pub async fn set_socket(&self, guest_id: i64, socket_id: &str) {
        self.state
            .lock()
            .await
            .sockets
            .insert(guest_id, socket_id.to_string());
    }

    /// Edita un plato del catálogo como lo haría el sistema de gestión del menú.
    pub async fn edit_dish(&self, id: i64, edit: impl FnOnce(&mut Dish)) {
        if let Some(dish) = self.state.lock().await.dishes.get_mut(&id) {
            edit(dish);
        }
    }

    pub async fn set_menu_item_status(&self, id: i64, status: MenuItemStatus) {
        if let Some(item) = self.state.lock().await.menu_items.get_mut(&id) {
            item.status = status;
        }
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn snapshot_count(&self) -> usize {
        self.state.lock().await.snapshots.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }

    async fn guest(&self, id: i64) -> StoreResult<Option<Guest>> {
        Ok(self.state.lock().await.guests.get(&id).cloned())
    }

    async fn table(&self, number: i64) -> StoreResult<Option<Table>> {
        Ok(self.state.lock().await.tables.get(&number).cloned())
    }

    async fn socket_for_guest(&self, guest_id: i64) -> StoreResult<Option<String>> {
        Ok(self.state.lock().await.sockets.get(&guest_id).cloned())
    }

    async fn find_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        Ok(self.state.lock().await.sorted_orders(filter))
    }

    async fn snapshot(&self, id: i64) -> StoreResult<Option<DishSnapshot>> {
        Ok(self.state.lock().await.snapshots.get(&id).cloned())
    }

    async fn snapshots(&self, ids: &[i64]) -> StoreResult<Vec<DishSnapshot>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.snapshots.get(id).cloned()).collect())
    }

    async fn guests(&self, ids: &[i64]) -> StoreResult<Vec<Guest>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.guests.get(id).cloned()).collect())
    }

    async fn accounts(&self, ids: &[i64]) -> StoreResult<Vec<Account>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.accounts.get(id).cloned()).collect())
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl Transaction for MemoryTx {
    async fn menu_item_with_dish(&mut self, id: i64) -> StoreResult<Option<MenuItemWithDish>> {
        let Some(item) = self.working.menu_items.get(&id).cloned() else {
            return Ok(None);
        };
        let dish = self.working.dishes.get(&item.dish_id).cloned().ok_or_else(|| {
            StoreError::Internal(format!(
                "La entrada de menú {} apunta al plato inexistente {}",
                item.id, item.dish_id
            ))
        })?;
        Ok(Some(MenuItemWithDish { item, dish }))
    }

    async fn order(&mut self, id: i64) -> StoreResult<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn snapshot(&mut self, id: i64) -> StoreResult<Option<DishSnapshot>> {
        Ok(self.working.snapshots.get(&id).cloned())
    }

    async fn insert_snapshot(&mut self, snapshot: NewDishSnapshot) -> StoreResult<DishSnapshot> {
        self.working.last_snapshot_id += 1;
        let record = DishSnapshot {
            id: self.working.last_snapshot_id,
            name: snapshot.name,
            description: snapshot.description,
            image: snapshot.image,
            price: snapshot.price,
            status: snapshot.status,
            menu_item_id: snapshot.menu_item_id,
            previous_snapshot_id: snapshot.previous_snapshot_id,
            created_at: current_timestamp_millis(),
        };
        self.working.snapshots.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_order(&mut self, order: NewOrder) -> StoreResult<Order> {
        if !self.working.snapshots.contains_key(&order.dish_snapshot_id) {
            return Err(StoreError::Internal(format!(
                "Instantánea {} inexistente",
                order.dish_snapshot_id
            )));
        }
        self.working.last_order_id += 1;
        let now = current_timestamp_millis();
        let record = Order {
            id: self.working.last_order_id,
            guest_id: order.guest_id,
            table_number: order.table_number,
            dish_snapshot_id: order.dish_snapshot_id,
            quantity: order.quantity,
            order_handler_id: order.order_handler_id,
            status: order.status,
            created_at: now,
            updated_at: now,
        };
        self.working.orders.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_order(&mut self, id: i64, update: OrderUpdate) -> StoreResult<Option<Order>> {
        let Some(order) = self.working.orders.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(status) = update.status {
            order.status = status;
        }
        if let Some(quantity) = update.quantity {
            order.quantity = quantity;
        }
        order.dish_snapshot_id = update.dish_snapshot_id;
        order.order_handler_id = update.order_handler_id;
        order.updated_at = current_timestamp_millis();
        Ok(Some(order.clone()))
    }

    async fn mark_paid(&mut self, ids: &[i64], order_handler_id: i64) -> StoreResult<u64> {
        let now = current_timestamp_millis();
        let mut modified = 0;
        for id in ids {
            if let Some(order) = self.working.orders.get_mut(id) {
                if status::is_payable(order.status) {
                    order.status = OrderStatus::Paid;
                    order.order_handler_id = order_handler_id;
                    order.updated_at = now;
                    modified += 1;
                }
            }
        }
        Ok(modified)
    }

    async fn commit(mut self) -> StoreResult<()> {
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_snapshot() -> NewDishSnapshot {
        NewDishSnapshot {
            name: "Pho".to_string(),
            description: String::new(),
            image: String::new(),
            price: 60,
            status: MenuItemStatus::Available,
            menu_item_id: 1,
            previous_snapshot_id: None,
        }
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_snapshot(new_snapshot()).await.unwrap();
        }
        assert_eq!(store.snapshot_count().await, 0);
    }

    #[tokio::test]
    async fn commit_publishes_all_writes() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let snapshot = tx.insert_snapshot(new_snapshot()).await.unwrap();
        tx.insert_order(NewOrder {
            guest_id: 1,
            table_number: 5,
            dish_snapshot_id: snapshot.id,
            quantity: 1,
            order_handler_id: 1,
            status: OrderStatus::Pending,
        })
        .await
        .unwrap();
        assert!(store.state.try_lock().is_err());
        tx.commit().await.unwrap();

        assert_eq!(store.snapshot_count().await, 1);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn order_needs_existing_snapshot() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let result = tx
            .insert_order(NewOrder {
                guest_id: 1,
                table_number: 5,
                dish_snapshot_id: 99,
                quantity: 1,
                order_handler_id: 1,
                status: OrderStatus::Pending,
            })
            .await;
        assert!(matches!(result, Err(StoreError::Internal(_))));
    }

    #[tokio::test]
    async fn mark_paid_skips_terminal_orders() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let snapshot = tx.insert_snapshot(new_snapshot()).await.unwrap();
        let mut ids = Vec::new();
        for status in [OrderStatus::Pending, OrderStatus::Rejected, OrderStatus::Paid] {
            let order = tx
                .insert_order(NewOrder {
                    guest_id: 1,
                    table_number: 5,
                    dish_snapshot_id: snapshot.id,
                    quantity: 1,
                    order_handler_id: 1,
                    status,
                })
                .await
                .unwrap();
            ids.push(order.id);
        }

        let modified = tx.mark_paid(&ids, 7).await.unwrap();
        assert_eq!(modified, 1);
        let rejected = tx.order(ids[1]).await.unwrap().unwrap();
        assert_eq!(rejected.status, OrderStatus::Rejected);
        assert_eq!(rejected.order_handler_id, 1);
    }
}
