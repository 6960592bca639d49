// src/db/mod.rs
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod store;

pub use self::memory::MemoryStore;
pub use self::mongodb::MongoRepo;
pub use models::{
    Account, Dish, DishSnapshot, DishStatus, Guest, MenuItem, MenuItemStatus, MenuItemWithDish,
    Order, OrderDetail, OrderStatus, OrderView, Table, TableStatus,
};
pub use store::{Store, StoreError, StoreResult, Transaction};
