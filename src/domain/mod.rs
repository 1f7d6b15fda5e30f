// Domain layer: models and the ports the engine talks to. No I/O here.

pub mod model;
pub mod ports;
