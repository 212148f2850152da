use sqlx::SqliteConnection;

use crate::db_types::{Dish, Restaurant};

pub async fn fetch_restaurant(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Restaurant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM restaurants WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_dish(id: i64, conn: &mut SqliteConnection) -> Result<Option<Dish>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM dishes WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// A dish that does not exist (or hangs off another restaurant) is simply not available.
pub async fn dish_is_available(
    dish_id: i64,
    restaurant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let row: Option<(bool,)> =
        sqlx::query_as("SELECT available FROM dishes WHERE id = $1 AND restaurant_id = $2")
            .bind(dish_id)
            .bind(restaurant_id)
            .fetch_optional(conn)
            .await?;
    Ok(row.map(|r| r.0).unwrap_or(false))
}
