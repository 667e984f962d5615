//! Persistence layer for mindplan: connection config, pool, migrations and
//! the `todos` table.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
