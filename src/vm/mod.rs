//! Arithmetization of control-flow walks.
//!
//! Provides the shadow call stack, execution trace recording and the
//! constraint system of both trace encodings. Designed to be deterministic:
//! the same graph, path and nonce always produce the same trace.

pub mod constraints;
pub mod digest;
pub mod layout;
pub mod stack;
pub mod trace;

pub use constraints::{BoundaryConstraint, TransitionConstraint};
pub use layout::{Encoding, RegisterLayout};
pub use stack::ReturnPolicy;
pub use trace::{ExecutionTrace, TraceBuilder, build_trace};
