// Domain layer: trip models and ports (interfaces) to the LLM, media and storage.

pub mod model;
pub mod ports;
