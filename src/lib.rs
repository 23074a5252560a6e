//! # Group Dispatch
//!
//! An in-process, group-affine message dispatch engine.
//!
//! The engine assigns a stream of group-tagged messages to a pool of
//! interchangeable resources, preserving group affinity while supporting
//! mid-flight cancellation and group termination. Actual execution is
//! delegated to an external gateway that reports completion asynchronously,
//! on whatever threads it likes; the engine's job is the dispatch decision
//! itself.
//!
//! ## Scheduling rule
//!
//! - Once any message of a group has completed, later messages of that group
//!   are drained ahead of groups with no completion history.
//! - Groups with no history fall back to strict FIFO.
//! - Cancellation is lazy: queued messages of a cancelled group are dropped
//!   when they would otherwise be selected; in-flight work is never recalled.
//! - A dispatched termination message irrevocably closes its group; anything
//!   queued behind it for the same group is discarded.
//!
//! ## Concurrency
//!
//! Submission (`Scheduler::receive`) and the gateway's completion callbacks
//! converge on the same dispatch loop. One `parking_lot::Mutex` per scheduler
//! serializes them; a full drain pass — pairing eligible messages with free
//! resources until no pairing is possible — is atomic. No operation blocks
//! waiting for capacity: an empty queue or busy roster simply ends the pass.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use group_dispatch::core::{Message, Resource, Scheduler};
//! use group_dispatch::infra::ManualGateway;
//! use group_dispatch::util::ids::{MessageId, ResourceId};
//!
//! let gateway = Arc::new(ManualGateway::new());
//! let scheduler = Arc::new(Scheduler::new(gateway.clone()));
//! scheduler.register_resource(Resource::new(ResourceId(1), &scheduler));
//!
//! scheduler.receive(vec![
//!     Message::new(MessageId(1), "orders"),
//!     Message::new(MessageId(2), "fills"),
//! ])?;
//!
//! gateway.finish_all()?;
//! assert_eq!(scheduler.sent_messages().len(), 2);
//! # Ok::<(), group_dispatch::core::DispatchError>(())
//! ```
//!
//! For production use, back the scheduler with
//! [`infra::SpawnerGateway`] and a [`runtime::TokioSpawner`]; see
//! `tests/concurrency_test.rs` for a complete wiring.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

/// Core dispatch abstractions: scheduler, messages, resources, gateway.
pub mod core;
/// Configuration models for the engine.
pub mod config;
/// Builders to construct engine components from configuration.
pub mod builders;
/// Infrastructure adapters: gateway backends.
pub mod infra;
/// Runtime adapters for spawning gateway work.
pub mod runtime;
/// Shared utilities.
pub mod util;
