//! Infrastructure adapters: gateway backends.

pub mod gateway;

pub use gateway::ManualGateway;
pub use gateway::SpawnerGateway;
