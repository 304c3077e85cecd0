//! Receding stack of spectrum slices: building, scrolling and eviction.

mod buffer;
mod builder;
mod engine;
mod scheduler;
mod slice;

// Re-export public types
pub use buffer::TraceBuffer;
pub use builder::{compress, SliceBuilder};
pub use engine::{ScrollEngine, TickReport};
pub use scheduler::TickScheduler;
pub use slice::{Outline, Slice};
