use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::error::TRANSIENT_TRANSACTION_ERROR;
use mongodb::options::ReturnDocument;
use mongodb::{Client, ClientSession, Collection, Database};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::models::{
    current_timestamp_millis, Account, Dish, DishSnapshot, Guest, MenuItem, MenuItemWithDish,
    NewDishSnapshot, NewOrder, Order, OrderFilter, OrderStatus, OrderUpdate, Socket, Table,
};
use super::store::{Store, StoreError, StoreResult, Transaction};
use crate::config::MongoConfig;
use crate::orders::status;

/// Contador de ids enteros, uno por colección escrita aquí.
#[derive(Debug, Serialize, Deserialize)]
struct Counter {
    #[serde(rename = "_id")]
    name: String,
    seq: i64,
}

fn db_error(operation: &str, error: mongodb::error::Error) -> StoreError {
    if error.contains_label(TRANSIENT_TRANSACTION_ERROR) {
        StoreError::Conflict(format!("{}: {}", operation, error))
    } else {
        StoreError::database(operation, error)
    }
}

fn order_filter_document(filter: &OrderFilter) -> Document {
    match filter {
        OrderFilter::Ids(ids) => doc! { "id": { "$in": ids.clone() } },
        OrderFilter::Payable { guest_id } => doc! {
            "guestId": *guest_id,
            "status": { "$in": payable_statuses() }
        },
        OrderFilter::CreatedBetween { from, to } => {
            let mut range = Document::new();
            if let Some(from) = from {
                range.insert("$gte", *from);
            }
            if let Some(to) = to {
                range.insert("$lte", *to);
            }
            if range.is_empty() {
                Document::new()
            } else {
                doc! { "createdAt": range }
            }
        }
    }
}

fn payable_statuses() -> Vec<&'static str> {
    status::payable_statuses()
        .into_iter()
        .map(|status| status.as_str())
        .collect()
}

/// Pedidos de `ids` que siguen abiertos en el momento de escribir.
fn paid_filter_document(ids: &[i64]) -> Document {
    doc! {
        "id": { "$in": ids.to_vec() },
        "status": { "$in": payable_statuses() }
    }
}

#[derive(Debug, Clone)]
pub struct MongoRepo {
    pub client: Client,
    pub database: Database,
}

impl MongoRepo {
    pub async fn init(config: &MongoConfig) -> StoreResult<MongoRepo> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| StoreError::database("conectar a MongoDB", e))?;

        let database = client.database(&config.database);

        // Test connection
        database
            .run_command(doc! {"ping": 1})
            .await
            .map_err(|e| StoreError::database("validar conexión MongoDB", e))?;

        tracing::info!(database = %config.database, "Conexión a MongoDB establecida exitosamente");

        Ok(MongoRepo { client, database })
    }

    pub fn guests(&self) -> Collection<Guest> {
        self.database.collection("guests")
    }

    pub fn tables(&self) -> Collection<Table> {
        self.database.collection("tables")
    }

    pub fn menu_items(&self) -> Collection<MenuItem> {
        self.database.collection("menu_items")
    }

    pub fn dishes(&self) -> Collection<Dish> {
        self.database.collection("dishes")
    }

    pub fn accounts(&self) -> Collection<Account> {
        self.database.collection("accounts")
    }

    pub fn sockets(&self) -> Collection<Socket> {
        self.database.collection("sockets")
    }

    pub fn dish_snapshots(&self) -> Collection<DishSnapshot> {
        self.database.collection("dish_snapshots")
    }

    pub fn orders(&self) -> Collection<Order> {
        self.database.collection("orders")
    }

    fn counters(&self) -> Collection<Counter> {
        self.database.collection("counters")
    }

    pub async fn create_indexes(&self) -> StoreResult<()> {
        use mongodb::{options::IndexOptions, IndexModel};

        let unique_id = || {
            IndexModel::builder()
                .keys(doc! { "id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };

        self.orders()
            .create_indexes(vec![
                unique_id(),
                IndexModel::builder()
                    .keys(doc! { "guestId": 1, "status": 1 })
                    .build(),
                IndexModel::builder()
                    .keys(doc! { "createdAt": -1 })
                    .build(),
            ])
            .await
            .map_err(|e| StoreError::database("crear índices de orders", e))?;

        self.dish_snapshots()
            .create_indexes(vec![unique_id()])
            .await
            .map_err(|e| StoreError::database("crear índices de dish_snapshots", e))?;

        self.sockets()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "guestId": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await
            .map_err(|e| StoreError::database("crear índices de sockets", e))?;

        tracing::info!("Índices MongoDB creados exitosamente");
        Ok(())
    }

    /// Reserva el siguiente id de `name` fuera de cualquier transacción.
    ///
    /// Un id reservado por una transacción abortada se pierde; la secuencia
    /// puede tener huecos. Dentro de una sesión, el contador sería un
    /// documento que escriben todas las transacciones a la vez.
    async fn next_id(&self, name: &str) -> StoreResult<i64> {
        let counter = self
            .counters()
            .find_one_and_update(doc! { "_id": name }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| db_error("incrementar contador", e))?;

        counter
            .map(|counter| counter.seq)
            .ok_or_else(|| StoreError::Internal(format!("Contador '{}' sin valor", name)))
    }

    async fn find_by_ids<T>(&self, collection: Collection<T>, ids: &[i64]) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut cursor = collection
            .find(doc! { "id": { "$in": ids.to_vec() } })
            .await
            .map_err(|e| db_error("buscar por ids", e))?;

        let mut results = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|e| db_error("iterar cursor", e))?
        {
            results.push(
                cursor
                    .deserialize_current()
                    .map_err(|e| db_error("deserializar documento", e))?,
            );
        }
        Ok(results)
    }
}

#[async_trait]
impl Store for MongoRepo {
    type Tx = MongoTx;

    async fn begin(&self) -> StoreResult<MongoTx> {
        let mut session = self
            .client
            .start_session()
            .await
            .map_err(|e| db_error("iniciar sesión", e))?;
        session
            .start_transaction()
            .await
            .map_err(|e| db_error("iniciar transacción", e))?;
        Ok(MongoTx {
            session,
            repo: self.clone(),
        })
    }

    async fn guest(&self, id: i64) -> StoreResult<Option<Guest>> {
        self.guests()
            .find_one(doc! { "id": id })
            .await
            .map_err(|e| db_error("buscar invitado", e))
    }

    async fn table(&self, number: i64) -> StoreResult<Option<Table>> {
        self.tables()
            .find_one(doc! { "number": number })
            .await
            .map_err(|e| db_error("buscar mesa", e))
    }

    async fn socket_for_guest(&self, guest_id: i64) -> StoreResult<Option<String>> {
        let socket = self
            .sockets()
            .find_one(doc! { "guestId": guest_id })
            .await
            .map_err(|e| db_error("buscar socket", e))?;
        Ok(socket.map(|socket| socket.socket_id))
    }

    async fn find_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let mut cursor = self
            .orders()
            .find(order_filter_document(filter))
            .sort(doc! { "createdAt": -1, "id": -1 })
            .await
            .map_err(|e| db_error("buscar pedidos", e))?;

        let mut results = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|e| db_error("iterar cursor", e))?
        {
            results.push(
                cursor
                    .deserialize_current()
                    .map_err(|e| db_error("deserializar pedido", e))?,
            );
        }
        Ok(results)
    }

    async fn snapshot(&self, id: i64) -> StoreResult<Option<DishSnapshot>> {
        self.dish_snapshots()
            .find_one(doc! { "id": id })
            .await
            .map_err(|e| db_error("buscar instantánea", e))
    }

    async fn snapshots(&self, ids: &[i64]) -> StoreResult<Vec<DishSnapshot>> {
        self.find_by_ids(self.dish_snapshots(), ids).await
    }

    async fn guests(&self, ids: &[i64]) -> StoreResult<Vec<Guest>> {
        self.find_by_ids(self.guests(), ids).await
    }

    async fn accounts(&self, ids: &[i64]) -> StoreResult<Vec<Account>> {
        self.find_by_ids(self.accounts(), ids).await
    }
}

/// Transacción multi-documento sobre una sesión de cliente.
///
/// Requiere un replica set o un clúster fragmentado. Dos transacciones solo
/// chocan si escriben el mismo pedido, por ejemplo un `UpdateOrder` y un
/// `PayOrders` simultáneos sobre el mismo invitado; la perdedora aborta con
/// [`StoreError::Conflict`].
pub struct MongoTx {
    session: ClientSession,
    repo: MongoRepo,
}

#[async_trait]
impl Transaction for MongoTx {
    async fn menu_item_with_dish(&mut self, id: i64) -> StoreResult<Option<MenuItemWithDish>> {
        let item = self
            .repo
            .menu_items()
            .find_one(doc! { "id": id })
            .session(&mut self.session)
            .await
            .map_err(|e| db_error("buscar entrada de menú", e))?;
        let Some(item) = item else {
            return Ok(None);
        };

        let dish = self
            .repo
            .dishes()
            .find_one(doc! { "id": item.dish_id })
            .session(&mut self.session)
            .await
            .map_err(|e| db_error("buscar plato", e))?
            .ok_or_else(|| {
                StoreError::Internal(format!(
                    "La entrada de menú {} apunta al plato inexistente {}",
                    item.id, item.dish_id
                ))
            })?;

        Ok(Some(MenuItemWithDish { item, dish }))
    }

    async fn order(&mut self, id: i64) -> StoreResult<Option<Order>> {
        self.repo
            .orders()
            .find_one(doc! { "id": id })
            .session(&mut self.session)
            .await
            .map_err(|e| db_error("buscar pedido", e))
    }

    async fn snapshot(&mut self, id: i64) -> StoreResult<Option<DishSnapshot>> {
        self.repo
            .dish_snapshots()
            .find_one(doc! { "id": id })
            .session(&mut self.session)
            .await
            .map_err(|e| db_error("buscar instantánea", e))
    }

    async fn insert_snapshot(&mut self, snapshot: NewDishSnapshot) -> StoreResult<DishSnapshot> {
        let record = DishSnapshot {
            id: self.repo.next_id("dish_snapshots").await?,
            name: snapshot.name,
            description: snapshot.description,
            image: snapshot.image,
            price: snapshot.price,
            status: snapshot.status,
            menu_item_id: snapshot.menu_item_id,
            previous_snapshot_id: snapshot.previous_snapshot_id,
            created_at: current_timestamp_millis(),
        };

        self.repo
            .dish_snapshots()
            .insert_one(&record)
            .session(&mut self.session)
            .await
            .map_err(|e| db_error("guardar instantánea", e))?;

        Ok(record)
    }

    async fn insert_order(&mut self, order: NewOrder) -> StoreResult<Order> {
        let now = current_timestamp_millis();
        let record = Order {
            id: self.repo.next_id("orders").await?,
            guest_id: order.guest_id,
            table_number: order.table_number,
            dish_snapshot_id: order.dish_snapshot_id,
            quantity: order.quantity,
            order_handler_id: order.order_handler_id,
            status: order.status,
            created_at: now,
            updated_at: now,
        };

        self.repo
            .orders()
            .insert_one(&record)
            .session(&mut self.session)
            .await
            .map_err(|e| db_error("guardar pedido", e))?;

        Ok(record)
    }

    async fn update_order(&mut self, id: i64, update: OrderUpdate) -> StoreResult<Option<Order>> {
        let mut set = doc! {
            "dishSnapshotId": update.dish_snapshot_id,
            "orderHandlerId": update.order_handler_id,
            "updatedAt": current_timestamp_millis(),
        };
        if let Some(status) = update.status {
            set.insert("status", status.as_str());
        }
        if let Some(quantity) = update.quantity {
            set.insert("quantity", quantity);
        }

        self.repo
            .orders()
            .find_one_and_update(doc! { "id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .session(&mut self.session)
            .await
            .map_err(|e| db_error("actualizar pedido", e))
    }

    async fn mark_paid(&mut self, ids: &[i64], order_handler_id: i64) -> StoreResult<u64> {
        let result = self
            .repo
            .orders()
            .update_many(
                paid_filter_document(ids),
                doc! {
                    "$set": {
                        "status": OrderStatus::Paid.as_str(),
                        "orderHandlerId": order_handler_id,
                        "updatedAt": current_timestamp_millis(),
                    }
                },
            )
            .session(&mut self.session)
            .await
            .map_err(|e| db_error("pagar pedidos", e))?;

        Ok(result.modified_count)
    }

    async fn commit(mut self) -> StoreResult<()> {
        self.session
            .commit_transaction()
            .await
            .map_err(|e| db_error("confirmar transacción", e))
    }

    async fn rollback(mut self) -> StoreResult<()> {
        self.session
            .abort_transaction()
            .await
            .map_err(|e| db_error("abortar transacción", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_filter_matches_the_id_field() {
        let filter = order_filter_document(&OrderFilter::Ids(vec![3, 8]));
        assert_eq!(filter, doc! { "id": { "$in": [3_i64, 8_i64] } });
    }

    #[test]
    fn payable_filter_lists_open_statuses() {
        let filter = order_filter_document(&OrderFilter::Payable { guest_id: 4 });
        assert_eq!(
            filter,
            doc! {
                "guestId": 4_i64,
                "status": { "$in": ["Pending", "Processing", "Delivered"] }
            }
        );
    }

    #[test]
    fn created_range_is_inclusive_on_both_ends() {
        let filter = order_filter_document(&OrderFilter::CreatedBetween {
            from: Some(1_000),
            to: Some(2_000),
        });
        assert_eq!(
            filter,
            doc! { "createdAt": { "$gte": 1_000_i64, "$lte": 2_000_i64 } }
        );

        let from_only = order_filter_document(&OrderFilter::CreatedBetween {
            from: Some(1_000),
            to: None,
        });
        assert_eq!(from_only, doc! { "createdAt": { "$gte": 1_000_i64 } });
    }

    #[test]
    fn open_range_matches_everything() {
        let filter = order_filter_document(&OrderFilter::CreatedBetween {
            from: None,
            to: None,
        });
        assert_eq!(filter, Document::new());
    }

    #[test]
    fn paid_filter_rechecks_status_on_selected_ids() {
        assert_eq!(
            paid_filter_document(&[5, 6]),
            doc! {
                "id": { "$in": [5_i64, 6_i64] },
                "status": { "$in": ["Pending", "Processing", "Delivered"] }
            }
        );
    }
}
