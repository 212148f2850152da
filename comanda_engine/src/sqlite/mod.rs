mod db;
mod sqlite_impl;

pub use db::{db_url, new_pool};
pub use sqlite_impl::SqliteDatabase;
