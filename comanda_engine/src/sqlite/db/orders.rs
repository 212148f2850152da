use chrono::Utc;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Milestone, NewOrder, NewOrderItem, Order, OrderItem, OrderNumber, OrderStatusType},
    order_objects::OrderQueryFilter,
    traits::{StatusChange, StorageError},
};

/// Inserts the order row in `PENDIENTE` with the placed timestamp set now and all milestones null. This is not
/// atomic with the item inserts; embed both in a transaction and pass `&mut *tx` as the connection.
///
/// Unique violations are turned into typed errors: a taken order number means the caller should regenerate and
/// retry; a pending-order violation means another request won the one-open-cart race.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, StorageError> {
    let persisted = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (
                order_number,
                customer_id,
                restaurant_id,
                subtotal,
                service_fee,
                total,
                status,
                customer_comments,
                placed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(order.order_number.as_str())
    .bind(&order.customer_id)
    .bind(order.restaurant_id)
    .bind(order.subtotal.value())
    .bind(order.service_fee.value())
    .bind(order.total.value())
    .bind(OrderStatusType::Pendiente.to_string())
    .bind(&order.customer_comments)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_insert_error(e, &order.order_number))?;
    Ok(persisted)
}

fn map_insert_error(e: sqlx::Error, number: &OrderNumber) -> StorageError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains("order_number") {
                return StorageError::DuplicateOrderNumber(number.to_string());
            }
            if message.contains("idx_orders_one_pending") {
                return StorageError::DuplicatePendingOrder;
            }
        }
    }
    StorageError::Database(e.to_string())
}

pub async fn insert_items(
    order_id: i64,
    items: &[NewOrderItem],
    conn: &mut SqliteConnection,
) -> Result<(), StorageError> {
    for item in items {
        let toppings = item
            .toppings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Database(format!("Unserializable toppings: {e}")))?;
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, dish_id, dish_name, quantity, unit_price, line_total, toppings, comment)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8);
            "#,
        )
        .bind(order_id)
        .bind(item.dish_id)
        .bind(&item.dish_name)
        .bind(item.quantity)
        .bind(item.unit_price.value())
        .bind(item.line_total.value())
        .bind(toppings)
        .bind(&item.comment)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(number.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_order_items(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

pub async fn order_number_exists(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE order_number = $1")
        .bind(number.as_str())
        .fetch_one(conn)
        .await?;
    Ok(count.0 > 0)
}

pub async fn has_pending_order(
    customer_id: &str,
    restaurant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders WHERE customer_id = $1 AND restaurant_id = $2 AND status = 'PENDIENTE'",
    )
    .bind(customer_id)
    .bind(restaurant_id)
    .fetch_one(conn)
    .await?;
    Ok(count.0 > 0)
}

pub(crate) async fn apply_status_change(
    id: i64,
    change: StatusChange,
    conn: &mut SqliteConnection,
) -> Result<Order, StorageError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, status = ");
    builder.push_bind(change.new_status.to_string());
    if let Some(milestone) = change.milestone {
        let column = match milestone {
            Milestone::AcceptedAt => "accepted_at",
            Milestone::ReadyAt => "ready_at",
            Milestone::DeliveredAt => "delivered_at",
        };
        builder.push(format!(", {column} = "));
        builder.push_bind(Utc::now());
    }
    if let Some(estimate) = change.estimate_minutes {
        builder.push(", estimate_minutes = ");
        builder.push_bind(estimate);
    }
    if let Some(comment) = change.restaurant_comment {
        builder.push(", restaurant_comments = ");
        builder.push_bind(comment);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let result: Option<Order> = builder.build_query_as().fetch_optional(conn).await?;
    result.ok_or(StorageError::OrderIdNotFound(id))
}

pub(crate) async fn cancel_order(
    id: i64,
    reason: &str,
    restaurant_comment: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Order, StorageError> {
    let result: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'CANCELADO',
                cancel_reason = $1,
                restaurant_comments = COALESCE($2, restaurant_comments),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(restaurant_comment)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(StorageError::OrderIdNotFound(id))
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, ordered by `placed_at` ascending.
pub async fn search_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if let Some(rid) = query.restaurant_id {
        where_clause.push("restaurant_id = ");
        where_clause.push_bind_unseparated(rid);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let statuses =
            query.status.unwrap().iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(since) = query.since {
        where_clause.push("placed_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("placed_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY placed_at ASC");
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}
