//! Control-flow attestation over a STARK.
//!
//! A prover replays an execution path through a control-flow graph, records
//! it as a fixed-width execution trace and proves that the trace satisfies an
//! AIR encoding the graph's adjacency, a shadow call stack and the claimed
//! endpoints. See [`attestation::Attestation`] for the end-to-end flow.

use sha2::{Digest, Sha256};

pub mod attestation;
pub mod cfg;
pub mod error;
pub mod hash;
pub mod math;
pub mod merkle;
pub mod program;
pub mod prover;
pub mod stark;
pub mod transcript;
pub mod verifier;
pub mod vm;

pub use attestation::{Attestation, AttestationConfig, Statement, Strategy};
pub use cfg::Cfg;
pub use error::{AttestError, Result};
pub use program::{ExecutionPath, Step, StepKind};
pub use stark::{Stark, StarkConfig, StarkGeometry};

pub fn digest_sha2(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
