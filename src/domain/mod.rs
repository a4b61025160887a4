pub mod connection;
pub mod error;
pub mod field;
pub mod resolved;
