//! Command implementations.

pub mod postgres;

pub use postgres::PostgresCommand;
