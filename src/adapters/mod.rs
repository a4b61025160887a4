pub mod catalog;
pub mod factory;
pub mod field_strategy;
pub mod pagination;
pub mod resolution;
pub mod sequence_registry;

#[cfg(test)]
mod factory_test;
