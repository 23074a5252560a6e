//! Core dispatch abstractions: messages, resources, the scheduler, and the
//! gateway boundary.

pub mod audit;
pub mod error;
pub mod gateway;
pub mod message;
pub mod resource;
pub mod scheduler;

pub use audit::{build_event, AuditSink, DispatchEvent, InMemoryAuditSink};
pub use error::{AppResult, DispatchError};
pub use gateway::{Gateway, WorkHandler};
pub use message::Message;
pub use resource::Resource;
pub use scheduler::Scheduler;
