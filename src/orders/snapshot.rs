//! Instantáneas de platos.
//!
//! Solo se crean, nunca se editan ni se comparten entre pedidos. Cambiar el
//! plato de un pedido crea una instantánea nueva enlazada a la anterior.

use std::collections::HashSet;

use super::error::{OrderError, OrderResult};
use crate::db::models::NewDishSnapshot;
use crate::db::{DishSnapshot, MenuItemWithDish, Store, StoreError, Transaction};

/// Copia el estado actual de la entrada de menú y su plato.
///
/// El precio es el del menú, no el precio base del plato.
pub(crate) async fn capture<T>(
    tx: &mut T,
    entry: &MenuItemWithDish,
    previous_snapshot_id: Option<i64>,
) -> OrderResult<DishSnapshot>
where
    T: Transaction + ?Sized,
{
    let snapshot = tx
        .insert_snapshot(NewDishSnapshot {
            name: entry.dish.name.clone(),
            description: entry.dish.description.clone(),
            image: entry.dish.image.clone(),
            price: entry.item.price,
            status: entry.item.status,
            menu_item_id: entry.item.id,
            previous_snapshot_id,
        })
        .await?;

    tracing::debug!(
        snapshot_id = snapshot.id,
        menu_item_id = entry.item.id,
        price = snapshot.price,
        "Instantánea de plato creada"
    );
    Ok(snapshot)
}

/// Recorre la cadena desde `current_id` hacia atrás, la más reciente primero.
pub(crate) async fn history<S: Store>(store: &S, current_id: i64) -> OrderResult<Vec<DishSnapshot>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(current_id);

    while let Some(id) = next {
        if !seen.insert(id) {
            return Err(OrderError::Persistence(StoreError::Internal(format!(
                "Ciclo en la cadena de instantáneas en {}",
                id
            ))));
        }
        let snapshot = store
            .snapshot(id)
            .await?
            .ok_or_else(|| StoreError::Internal(format!("Instantánea {} inexistente", id)))?;
        next = snapshot.previous_snapshot_id;
        chain.push(snapshot);
    }

    Ok(chain)
}
