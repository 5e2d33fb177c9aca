// Domain layer: unit models and capability ports.

pub mod model;
pub mod ports;
