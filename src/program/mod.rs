//! Program-side inputs of an attestation: the execution path witness.

pub mod path;

pub use path::{ExecutionPath, Step, StepKind};
