//! Database module for PostgreSQL connection pools
//!
//! One pool per database name, built from `Settings`.

pub mod connection;

pub use connection::init_pool;
