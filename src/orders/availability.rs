//! Comprobación de disponibilidad de una entrada de menú.
//!
//! Se llama dentro de la misma transacción que la escritura que depende de
//! ella, tanto al crear pedidos como al cambiar el plato de uno existente.

use super::error::{OrderError, OrderResult};
use crate::db::{DishStatus, MenuItemStatus, MenuItemWithDish, Transaction};

/// Busca la entrada de menú con su plato y comprueba que se puede pedir.
pub async fn check_menu_item<T>(tx: &mut T, menu_item_id: i64) -> OrderResult<MenuItemWithDish>
where
    T: Transaction + ?Sized,
{
    let entry = tx
        .menu_item_with_dish(menu_item_id)
        .await?
        .ok_or_else(|| OrderError::not_found("Entrada de menú", menu_item_id))?;

    ensure_orderable(&entry)?;
    Ok(entry)
}

/// Reglas en orden: oculta, agotada, plato retirado.
pub fn ensure_orderable(entry: &MenuItemWithDish) -> OrderResult<()> {
    let menu_item_id = entry.item.id;

    match entry.item.status {
        MenuItemStatus::Hidden => return Err(OrderError::Unavailable { menu_item_id }),
        MenuItemStatus::OutOfStock => return Err(OrderError::OutOfStock { menu_item_id }),
        MenuItemStatus::Available => {}
    }

    if entry.dish.status == DishStatus::Discontinued {
        return Err(OrderError::Discontinued {
            menu_item_id,
            dish_name: entry.dish.name.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Dish, MenuItem, MemoryStore, Store};

    fn entry(item_status: MenuItemStatus, dish_status: DishStatus) -> MenuItemWithDish {
        MenuItemWithDish {
            item: MenuItem {
                id: 3,
                menu_id: 1,
                dish_id: 9,
                price: 60,
                status: item_status,
            },
            dish: Dish {
                id: 9,
                name: "Pho".to_string(),
                description: String::new(),
                image: String::new(),
                price: 50,
                status: dish_status,
            },
        }
    }

    #[test]
    fn available_item_of_active_dish_is_orderable() {
        assert!(ensure_orderable(&entry(MenuItemStatus::Available, DishStatus::Active)).is_ok());
        // Un plato oculto sigue pudiéndose pedir desde un menú que lo muestre
        assert!(ensure_orderable(&entry(MenuItemStatus::Available, DishStatus::Hidden)).is_ok());
    }

    #[test]
    fn hidden_item_is_checked_first() {
        let err = ensure_orderable(&entry(MenuItemStatus::Hidden, DishStatus::Discontinued))
            .unwrap_err();
        assert!(matches!(err, OrderError::Unavailable { menu_item_id: 3 }));
    }

    #[test]
    fn out_of_stock_before_discontinued() {
        let err = ensure_orderable(&entry(MenuItemStatus::OutOfStock, DishStatus::Discontinued))
            .unwrap_err();
        assert!(matches!(err, OrderError::OutOfStock { menu_item_id: 3 }));
    }

    #[test]
    fn discontinued_dish_names_the_dish() {
        let err = ensure_orderable(&entry(MenuItemStatus::Available, DishStatus::Discontinued))
            .unwrap_err();
        match err {
            OrderError::Discontinued { menu_item_id, dish_name } => {
                assert_eq!(menu_item_id, 3);
                assert_eq!(dish_name, "Pho");
            }
            other => panic!("error inesperado: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_menu_item_is_not_found() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = check_menu_item(&mut tx, 42).await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound { id: 42, .. }));
    }
}
