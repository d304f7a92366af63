//! Algebraic hash over the proof field.
//!
//! A MiMC-style permutation `x -> (x + c_i)^5` iterated over a fixed number of
//! rounds, wrapped in a Miyaguchi-Preneel chain so that it absorbs any number
//! of field elements. Round constants are expanded from a seed with SHA-256 in
//! counter mode.

use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};

use crate::digest_sha2;

pub const DEFAULT_ROUNDS: usize = 110;
pub const DEFAULT_SEED: &[u8] = b"cfa-stark/mimc5";

/// Parameters from which the round constants are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashParams {
    pub seed: Vec<u8>,
    pub rounds: usize,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED.to_vec(),
            rounds: DEFAULT_ROUNDS,
        }
    }
}

impl HashParams {
    /// `c_i = SHA-256(seed || i) mod p` for `i` in `0..rounds`.
    pub fn round_constants<F: PrimeField>(&self) -> Vec<F> {
        (0..self.rounds as u64)
            .map(|i| {
                let mut input = self.seed.clone();
                input.extend_from_slice(&i.to_le_bytes());
                F::from_le_bytes_mod_order(&digest_sha2(&input))
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct AlgebraicHasher<F: PrimeField> {
    round_constants: Vec<F>,
}

impl<F: PrimeField> Default for AlgebraicHasher<F> {
    fn default() -> Self {
        Self::new(&HashParams::default())
    }
}

impl<F: PrimeField> AlgebraicHasher<F> {
    pub fn new(params: &HashParams) -> Self {
        Self {
            round_constants: params.round_constants(),
        }
    }

    fn permute(&self, mut x: F) -> F {
        for c in &self.round_constants {
            let t = x + c;
            let t2 = t.square();
            x = t2.square() * t;
        }
        x
    }

    pub fn hash(&self, x: F) -> F {
        self.hash_many(&[x])
    }

    pub fn hash_pair(&self, left: F, right: F) -> F {
        self.hash_many(&[left, right])
    }

    /// Chains every input through the permutation, then the input length, so
    /// that inputs differing only by trailing zeros hash differently.
    pub fn hash_many(&self, inputs: &[F]) -> F {
        inputs
            .iter()
            .copied()
            .chain(std::iter::once(F::from(inputs.len() as u64)))
            .fold(F::zero(), |state, input| {
                let s = state + input;
                self.permute(s) + s
            })
    }
}
