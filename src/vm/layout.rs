//! Register layouts of the two trace encodings.
//!
//! Neighbor-list encoding:
//! `[nonce, current, next, neighbors[0..m), call_stack_top, call, return, initial, terminal]`
//!
//! Edge-digest encoding:
//! `[nonce, current, next, digest, call_stack_top, call, return, initial, terminal]`

use std::ops::Range;

use ark_ff::PrimeField;
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::{AttestError, Result};

/// Registers shared by every row before the encoding-specific block.
const HEAD: usize = 3;
/// Stack top, call, return, initial and terminal registers.
const TAIL: usize = 5;

/// How adjacency is carried by the trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// Padded successor list of the current node in every row.
    #[default]
    NeighborList,
    /// One register holding the packed `(current, next)` edge digest.
    EdgeDigest,
}

/// Named register positions for one trace geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLayout {
    encoding: Encoding,
    max_adjacency: usize,
}

impl RegisterLayout {
    pub const NONCE: usize = 0;
    pub const CURRENT: usize = 1;
    pub const NEXT: usize = 2;

    pub fn neighbor_list(max_adjacency: usize) -> Self {
        Self {
            encoding: Encoding::NeighborList,
            max_adjacency,
        }
    }

    pub fn edge_digest() -> Self {
        Self {
            encoding: Encoding::EdgeDigest,
            max_adjacency: 0,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn max_adjacency(&self) -> usize {
        self.max_adjacency
    }

    fn block(&self) -> usize {
        match self.encoding {
            Encoding::NeighborList => self.max_adjacency,
            Encoding::EdgeDigest => 1,
        }
    }

    /// Neighbor slots; empty for the digest encoding.
    pub fn neighbors(&self) -> Range<usize> {
        match self.encoding {
            Encoding::NeighborList => HEAD..HEAD + self.max_adjacency,
            Encoding::EdgeDigest => HEAD..HEAD,
        }
    }

    pub fn digest(&self) -> Option<usize> {
        (self.encoding == Encoding::EdgeDigest).then_some(HEAD)
    }

    pub fn call_stack_top(&self) -> usize {
        HEAD + self.block()
    }

    pub fn call(&self) -> usize {
        self.call_stack_top() + 1
    }

    pub fn ret(&self) -> usize {
        self.call_stack_top() + 2
    }

    pub fn initial(&self) -> usize {
        self.call_stack_top() + 3
    }

    pub fn terminal(&self) -> usize {
        self.call_stack_top() + 4
    }

    /// Number of registers per row.
    pub fn width(&self) -> usize {
        HEAD + self.block() + TAIL
    }

    /// Fails with [`AttestError::InvalidGeometry`] unless `register_count`
    /// equals [`width`](Self::width).
    pub fn check(&self, register_count: usize) -> Result<()> {
        if register_count != self.width() {
            return Err(AttestError::InvalidGeometry {
                register_count,
                expected: self.width(),
            });
        }
        Ok(())
    }

    /// Column headers, in register order.
    pub fn names(&self) -> Vec<String> {
        let mut names = vec!["nonce".to_string(), "current".into(), "next".into()];
        match self.encoding {
            Encoding::NeighborList => {
                names.extend((0..self.max_adjacency).map(|i| format!("nbr{i}")));
            }
            Encoding::EdgeDigest => names.push("digest".into()),
        }
        names.extend(["stack", "call", "ret", "initial", "terminal"].map(String::from));
        names
    }
}

/// Recovers a node id from a field element, if it fits in a `u64`.
pub fn node_of<F: PrimeField>(value: F) -> Option<u64> {
    let value: BigUint = value.into();
    value.to_u64()
}
