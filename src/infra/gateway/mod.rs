//! Gateway backends.

pub mod manual;
pub mod spawner;

pub use manual::ManualGateway;
pub use spawner::SpawnerGateway;
