//! Command implementations.

pub mod catalog;
pub mod train;
pub mod validate;
