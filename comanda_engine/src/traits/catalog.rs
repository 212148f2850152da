use crate::{
    db_types::{Dish, Restaurant},
    traits::StorageError,
};

/// Read access to the restaurant/dish catalog. Catalog CRUD lives in another service; the engine only validates
/// against the current state.
#[allow(async_fn_in_trait)]
pub trait CatalogAccess {
    async fn fetch_restaurant(&self, id: i64) -> Result<Option<Restaurant>, StorageError>;

    async fn fetch_dish(&self, id: i64) -> Result<Option<Dish>, StorageError>;
}

/// Reports whether a dish can be ordered from a restaurant right now.
#[allow(async_fn_in_trait)]
pub trait AvailabilityChecker {
    async fn is_available(&self, dish_id: i64, restaurant_id: i64) -> Result<bool, StorageError>;
}
