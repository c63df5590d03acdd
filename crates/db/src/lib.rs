//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - The `tokens` entity definition
//! - [`TokenRepository`], the PostgreSQL token store
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::TokenRepository;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
