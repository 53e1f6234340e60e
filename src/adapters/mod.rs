// Adapters layer: concrete implementations of the domain ports.

pub mod cql;
pub mod memory;
pub mod process;
