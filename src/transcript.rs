use std::collections::BTreeSet;
use std::marker::PhantomData;

use ark_ff::{BigInteger, PrimeField};

use crate::digest_sha2;

/// Fiat-Shamir transcript for deriving verifier challenges deterministically.
/// Both prover and verifier build identical transcripts to get the same challenges.
pub struct FiatShamirTranscript<F: PrimeField> {
    state: Vec<u8>,
    _field: PhantomData<F>,
}

impl<F: PrimeField> Default for FiatShamirTranscript<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: PrimeField> FiatShamirTranscript<F> {
    pub fn new() -> Self {
        Self {
            state: b"cfa-stark-v1".to_vec(),
            _field: PhantomData,
        }
    }

    /// Absorb raw bytes into the transcript.
    pub fn absorb(&mut self, data: &[u8]) {
        self.state.extend_from_slice(&(data.len() as u64).to_le_bytes());
        self.state.extend_from_slice(data);
    }

    pub fn absorb_u64(&mut self, value: u64) {
        self.absorb(&value.to_le_bytes());
    }

    /// Absorb a field element as its little-endian canonical integer.
    pub fn absorb_field(&mut self, value: &F) {
        self.absorb(&value.into_bigint().to_bytes_le());
    }

    pub fn absorb_fields(&mut self, values: &[F]) {
        self.absorb_u64(values.len() as u64);
        for value in values {
            self.absorb_field(value);
        }
    }

    /// Absorb a Merkle root.
    pub fn absorb_commitment(&mut self, root: &[u8]) {
        self.absorb(root);
    }

    fn squeeze_bytes(&mut self) -> [u8; 32] {
        let hash = digest_sha2(&self.state);
        // Feed the hash back into state so subsequent squeezes differ
        self.state = hash.to_vec();
        hash
    }

    /// Squeeze a field challenge from the transcript.
    pub fn squeeze_challenge(&mut self) -> F {
        F::from_le_bytes_mod_order(&self.squeeze_bytes())
    }

    /// Squeeze `count` distinct query indices in `[0, max)`, in ascending
    /// order. `count` is capped at `max`.
    pub fn squeeze_indices(&mut self, count: usize, max: usize) -> Vec<usize> {
        let count = count.min(max);
        let mut seen = BTreeSet::new();
        while seen.len() < count {
            let hash = self.squeeze_bytes();
            let mut word = [0u8; 8];
            word.copy_from_slice(&hash[..8]);
            seen.insert((u64::from_le_bytes(word) % max as u64) as usize);
        }
        seen.into_iter().collect()
    }
}
