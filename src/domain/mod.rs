// Domain layer: column types, model declarations and the ports implemented by adapters.

pub mod model;
pub mod ports;
pub mod types;
