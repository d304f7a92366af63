//! Error type shared by the arithmetization and the proof engine.
//!
//! Every variant is a deterministic validation failure on malformed input.
//! A path that is well-formed but does not walk the graph is not an error:
//! it yields a trace that violates the constraints and a proof that does not
//! verify.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttestError {
    /// A node was queried (or visited) that the CFG does not declare.
    #[error("unknown node {node}{}", step_suffix(.step))]
    UnknownNode { node: u64, step: Option<usize> },

    /// An edge points at a node that has no successor line of its own.
    #[error("edge {node} -> {destination} targets an undefined node")]
    UndefinedDestination { node: u64, destination: u64 },

    #[error("execution path has no steps")]
    EmptyPath,

    #[error("malformed execution path at step {step}: {reason}")]
    MalformedPath { step: usize, reason: &'static str },

    /// Register count does not match the layout derived from the graph shape.
    #[error("register count {register_count} does not match the layout (expected {expected})")]
    InvalidGeometry {
        register_count: usize,
        expected: usize,
    },

    /// Raised only under [`ReturnPolicy::Strict`](crate::vm::stack::ReturnPolicy).
    #[error("return at step {step} to node {node} does not match shadow stack top {expected:?}")]
    StackMismatch {
        step: usize,
        node: u64,
        expected: Option<u64>,
    },

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("conflicting boundary values for register {register} at row {row}")]
    ConflictingBoundary { row: usize, register: usize },

    #[error("trace row {row} has width {found}, expected {expected}")]
    TraceShape {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("proof serialization failed: {0}")]
    Serialization(#[from] ark_serialize::SerializationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn step_suffix(step: &Option<usize>) -> String {
    match step {
        Some(step) => format!(" at step {step}"),
        None => String::new(),
    }
}

pub type Result<T, E = AttestError> = core::result::Result<T, E>;
