//! Authorization predicates for the order flows.
//!
//! Pure functions over the actor and the resources involved; the orchestrator calls these at the top of each
//! operation, so they can be tested without any transport framework.

use crate::{
    api::errors::{ErrorCode, OrderFlowError},
    db_types::{Actor, Order, OrderStatusType, Restaurant, Role},
};

/// Whether the actor may drive this restaurant's fulfillment workflow: its owner, or an admin.
pub fn can_manage_restaurant(actor: &Actor, restaurant: &Restaurant) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Owner => restaurant.owner_id == actor.user_id,
        Role::Student => false,
    }
}

pub fn authorize_status_update(actor: &Actor, restaurant: &Restaurant) -> Result<(), OrderFlowError> {
    if can_manage_restaurant(actor, restaurant) {
        Ok(())
    } else {
        Err(OrderFlowError::forbidden(format!(
            "Only the owner of {} or an admin may update this order's status",
            restaurant.name
        )))
    }
}

/// The cancellation permission matrix. A customer may cancel only their own order, and only while the restaurant
/// has not started on it (`PENDIENTE`); an owner may cancel any non-terminal order at their own restaurant; an
/// admin may cancel any non-terminal order. Terminal-state guards run before this, in the state machine.
pub fn authorize_cancel(actor: &Actor, order: &Order, restaurant: &Restaurant) -> Result<(), OrderFlowError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Owner => {
            if restaurant.owner_id == actor.user_id {
                Ok(())
            } else {
                Err(OrderFlowError::forbidden("Only the owning restaurant may cancel this order"))
            }
        },
        Role::Student => {
            if order.customer_id != actor.user_id {
                return Err(OrderFlowError::forbidden("Customers may only cancel their own orders"));
            }
            if order.status != OrderStatusType::Pendiente {
                return Err(OrderFlowError::rule(
                    ErrorCode::OrderCancelInvalidStatus,
                    "The restaurant has already started on this order; ask them to cancel it",
                ));
            }
            Ok(())
        },
    }
}

/// Read access: admins see everything, customers their own orders, owners their restaurant's orders.
pub fn authorize_view(actor: &Actor, order: &Order, restaurant: &Restaurant) -> Result<(), OrderFlowError> {
    let allowed = match actor.role {
        Role::Admin => true,
        Role::Owner => restaurant.owner_id == actor.user_id,
        Role::Student => order.customer_id == actor.user_id,
    };
    if allowed {
        Ok(())
    } else {
        Err(OrderFlowError::forbidden("You may not view this order"))
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use comanda_common::Pesos;

    use super::*;
    use crate::db_types::OrderNumber;

    fn restaurant(owner: &str) -> Restaurant {
        Restaurant { id: 7, owner_id: owner.to_string(), name: "La Arepa Dorada".to_string(), active: true }
    }

    fn order(customer: &str, status: OrderStatusType) -> Order {
        let now = Utc::now();
        Order {
            id: 1,
            order_number: OrderNumber::new_unchecked("#AB1-2C3"),
            customer_id: customer.to_string(),
            restaurant_id: 7,
            subtotal: Pesos::from(30_000),
            service_fee: Pesos::from(1_500),
            total: Pesos::from(31_500),
            status,
            estimate_minutes: None,
            placed_at: now,
            accepted_at: None,
            ready_at: None,
            delivered_at: None,
            customer_comments: None,
            restaurant_comments: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_owner_or_admin_manage_the_workflow() {
        let r = restaurant("owner-1");
        assert!(can_manage_restaurant(&Actor::new("owner-1", Role::Owner), &r));
        assert!(can_manage_restaurant(&Actor::new("staff-9", Role::Admin), &r));
        assert!(!can_manage_restaurant(&Actor::new("owner-2", Role::Owner), &r));
        assert!(!can_manage_restaurant(&Actor::new("cust-1", Role::Student), &r));
    }

    #[test]
    fn student_cancels_only_their_own_pending_order() {
        let r = restaurant("owner-1");
        let me = Actor::new("cust-1", Role::Student);
        authorize_cancel(&me, &order("cust-1", OrderStatusType::Pendiente), &r).unwrap();

        let err = authorize_cancel(&me, &order("cust-2", OrderStatusType::Pendiente), &r).unwrap_err();
        assert!(matches!(err, OrderFlowError::Forbidden(_)));

        let err = authorize_cancel(&me, &order("cust-1", OrderStatusType::Aceptado), &r).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::OrderCancelInvalidStatus));
    }

    #[test]
    fn owner_cancels_any_state_at_their_own_restaurant_only() {
        let r = restaurant("owner-1");
        let owner = Actor::new("owner-1", Role::Owner);
        for status in [OrderStatusType::Pendiente, OrderStatusType::Aceptado, OrderStatusType::Listo] {
            authorize_cancel(&owner, &order("cust-1", status), &r).unwrap();
        }
        let stranger = Actor::new("owner-2", Role::Owner);
        let err = authorize_cancel(&stranger, &order("cust-1", OrderStatusType::Pendiente), &r).unwrap_err();
        assert!(matches!(err, OrderFlowError::Forbidden(_)));
    }

    #[test]
    fn admin_cancels_anywhere() {
        let r = restaurant("owner-1");
        let admin = Actor::new("staff-9", Role::Admin);
        for status in [OrderStatusType::Pendiente, OrderStatusType::Preparando, OrderStatusType::Listo] {
            authorize_cancel(&admin, &order("cust-1", status), &r).unwrap();
        }
    }

    #[test]
    fn view_access_follows_ownership() {
        let r = restaurant("owner-1");
        let o = order("cust-1", OrderStatusType::Pendiente);
        authorize_view(&Actor::new("cust-1", Role::Student), &o, &r).unwrap();
        authorize_view(&Actor::new("owner-1", Role::Owner), &o, &r).unwrap();
        authorize_view(&Actor::new("staff-9", Role::Admin), &o, &r).unwrap();
        assert!(authorize_view(&Actor::new("cust-2", Role::Student), &o, &r).is_err());
        assert!(authorize_view(&Actor::new("owner-2", Role::Owner), &o, &r).is_err());
    }
}
