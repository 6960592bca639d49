//! Máquina de estados de un pedido.
//!
//! Toda transición permitida está en [`TRANSITIONS`]; añadir un estado es
//! editar esa tabla.

use super::error::{OrderError, OrderResult};
use crate::db::OrderStatus;
use OrderStatus::*;

/// Operación que solicita el cambio de estado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    /// `UpdateOrder` desde un terminal del personal
    Update,
    /// Lote de `PayOrders`
    Payment,
}

pub const TRANSITIONS: &[(OrderStatus, OrderStatus, Via)] = &[
    (Pending, Processing, Via::Update),
    (Processing, Delivered, Via::Update),
    (Pending, Rejected, Via::Update),
    (Processing, Rejected, Via::Update),
    (Delivered, Rejected, Via::Update),
    (Pending, Paid, Via::Payment),
    (Processing, Paid, Via::Payment),
    (Delivered, Paid, Via::Payment),
];

/// Un estado es terminal si ninguna transición sale de él.
pub fn is_terminal(status: OrderStatus) -> bool {
    !TRANSITIONS.iter().any(|(from, _, _)| *from == status)
}

pub fn is_allowed(from: OrderStatus, to: OrderStatus, via: Via) -> bool {
    TRANSITIONS
        .iter()
        .any(|entry| *entry == (from, to, via))
}

/// Un pedido entra en un lote de pago si la tabla permite pasarlo a `Paid`.
pub fn is_payable(status: OrderStatus) -> bool {
    is_allowed(status, Paid, Via::Payment)
}

pub fn payable_statuses() -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|status| is_payable(*status))
        .collect()
}

/// Valida el cambio de estado pedido por `UpdateOrder`.
///
/// Repetir el estado actual de un pedido no terminal no es un cambio.
pub fn check_update(order_id: i64, from: OrderStatus, to: OrderStatus) -> OrderResult<()> {
    if from == to && !is_terminal(from) {
        return Ok(());
    }
    if is_allowed(from, to, Via::Update) {
        return Ok(());
    }
    Err(OrderError::InvalidTransition {
        order_id,
        from,
        change: format!("el cambio a {}", to),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(is_terminal(Paid));
        assert!(is_terminal(Rejected));
        for status in [Pending, Processing, Delivered] {
            assert!(!is_terminal(status), "{} no debería ser terminal", status);
        }
    }

    #[test]
    fn forward_path_is_allowed() {
        assert!(check_update(1, Pending, Processing).is_ok());
        assert!(check_update(1, Processing, Delivered).is_ok());
    }

    #[test]
    fn skipping_or_going_back_is_rejected() {
        assert!(check_update(1, Pending, Delivered).is_err());
        assert!(check_update(1, Delivered, Processing).is_err());
        assert!(check_update(1, Processing, Pending).is_err());
    }

    #[test]
    fn any_open_state_can_be_rejected() {
        for from in [Pending, Processing, Delivered] {
            assert!(check_update(1, from, Rejected).is_ok());
        }
    }

    #[test]
    fn paid_only_through_payment() {
        for from in [Pending, Processing, Delivered] {
            assert!(check_update(1, from, Paid).is_err());
            assert!(is_allowed(from, Paid, Via::Payment));
        }
    }

    #[test]
    fn nothing_leaves_a_terminal_state() {
        for from in [Paid, Rejected] {
            for to in OrderStatus::ALL {
                let err = check_update(7, from, to).unwrap_err();
                assert!(matches!(
                    err,
                    OrderError::InvalidTransition { order_id: 7, .. }
                ));
                assert!(!is_allowed(from, to, Via::Payment));
            }
        }
    }

    #[test]
    fn payable_statuses_follow_the_payment_rows() {
        assert_eq!(payable_statuses(), vec![Pending, Processing, Delivered]);
        assert!(!is_payable(Paid));
        assert!(!is_payable(Rejected));
    }

    #[test]
    fn same_status_is_a_no_op_for_open_orders() {
        assert!(check_update(1, Processing, Processing).is_ok());
    }
}
