//! # tracker-core
//!
//! Core types and the realtime notification engine for the issue tracker.
//!
//! The engine is made of four pieces that are wired together explicitly:
//! a [`ConnectionRegistry`] of live sinks per user, an [`EventDispatcher`]
//! that writes serialized [`Event`]s to those sinks, a [`MembershipResolver`]
//! that computes project audiences, and the [`EventEmitter`] that mutation
//! handlers call after each committed write.

pub mod audience;
pub mod defaults;
pub mod dispatcher;
pub mod emitter;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod registry;
pub mod traits;

// Re-export commonly used types at crate root
pub use audience::{Audience, MembershipResolver};
pub use dispatcher::{DeliveryReport, EventDispatcher};
pub use emitter::EventEmitter;
pub use error::{Error, Result};
pub use events::{Event, EventKind};
pub use models::*;
pub use registry::{ConnectionRegistry, Frame, LiveSink, SinkError, SinkId};
pub use traits::*;
