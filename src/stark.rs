//! STARK engine setup.
//!
//! A [`Stark`] fixes the domains for one trace geometry:
//! 1. the trace domain, a subgroup of size `N = next_pow2(num_cycles)`
//! 2. the FRI domain, a coset `g * <eta>` of size `(max_degree + 1) * expansion`,
//!    with `eta^(L / N)` equal to the trace generator
//!
//! Proving lives in [`crate::prover`], verification in [`crate::verifier`].

use ark_ff::{BigInteger, PrimeField};
use ark_poly::EvaluationDomain;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};

use crate::error::{AttestError, Result};
use crate::hash::{AlgebraicHasher, HashParams};
use crate::math::composition::air_fingerprint;
use crate::math::domain::{coset_evaluate, get_domain};
use crate::math::fri::{Fri, FriProof, field_leaf};
use crate::math::polynomial::Polynomial;
use crate::merkle::{MerkleProof, MerkleTree, sha_digest};
use crate::transcript::FiatShamirTranscript;
use crate::vm::constraints::{BoundaryConstraint, TransitionConstraint};

/// Security parameters of the proof system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarkConfig {
    /// Blowup of the FRI domain over the maximum degree, a power of two >= 4
    pub expansion_factor: usize,
    /// Number of FRI queries, at least 1
    pub num_queries: usize,
}

impl Default for StarkConfig {
    fn default() -> Self {
        Self {
            expansion_factor: 4,
            num_queries: 16,
        }
    }
}

impl StarkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.expansion_factor < 4 || !self.expansion_factor.is_power_of_two() {
            return Err(AttestError::InvalidConfig(format!(
                "expansion factor must be a power of two >= 4, got {}",
                self.expansion_factor
            )));
        }
        if self.num_queries == 0 {
            return Err(AttestError::InvalidConfig("at least one FRI query is required".into()));
        }
        Ok(())
    }
}

/// Shape of the traces a [`Stark`] proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarkGeometry {
    pub num_registers: usize,
    /// Trace rows, prelude included
    pub num_cycles: usize,
    /// Largest total degree among the transition constraints
    pub transition_degree: usize,
}

/// Transition zerofier and its commitment, shared by prover and verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed<F: PrimeField> {
    /// `prod_{i < n-1} (X - omega^i)`
    pub zerofier: Polynomial<F>,
    /// `zerofier` over the FRI domain
    pub zerofier_codeword: Vec<F>,
    pub zerofier_root: Vec<u8>,
}

/// Openings of one FRI first-layer position.
#[derive(Debug, Clone, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct RowOpening<F: PrimeField> {
    pub row: Vec<F>,
    pub row_path: MerkleProof,
    /// Row at the position one trace step ahead
    pub next_row: Vec<F>,
    pub next_path: MerkleProof,
    pub zerofier: F,
    pub zerofier_path: MerkleProof,
}

#[derive(Debug, Clone, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct StarkProof<F: PrimeField> {
    pub trace_root: Vec<u8>,
    pub fri: FriProof<F>,
    pub openings: Vec<RowOpening<F>>,
}

impl<F: PrimeField> StarkProof<F> {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.compressed_size());
        self.serialize_compressed(&mut bytes)?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::deserialize_compressed(bytes)?)
    }
}

/// Leaf content of one LDE row.
pub(crate) fn row_leaf<F: PrimeField>(row: &[F]) -> Vec<u8> {
    let bytes: Vec<u8> = row
        .iter()
        .flat_map(|value| value.into_bigint().to_bytes_le())
        .collect();
    sha_digest(&bytes)
}

/// STARK instance for one geometry.
#[derive(Debug, Clone)]
pub struct Stark<F: PrimeField> {
    config: StarkConfig,
    geometry: StarkGeometry,
    trace_length: usize,
    omega: F,
    fri_domain_length: usize,
    fri_offset: F,
    fri_omega: F,
    max_degree: usize,
    hasher: AlgebraicHasher<F>,
}

impl<F: PrimeField> Stark<F> {
    /// Fixes the trace and FRI domains for `geometry`.
    ///
    /// # Errors
    ///
    /// [`AttestError::InvalidConfig`] for an invalid `config`, an empty
    /// geometry, or a FRI domain the field cannot host.
    pub fn new(config: StarkConfig, geometry: StarkGeometry) -> Result<Self> {
        config.validate()?;
        if geometry.num_cycles < 2 || geometry.num_registers == 0 {
            return Err(AttestError::InvalidConfig(format!(
                "degenerate trace geometry {geometry:?}"
            )));
        }

        let trace_length = geometry.num_cycles.next_power_of_two();
        let transition_quotient = (geometry.transition_degree.max(1) * (trace_length - 1))
            .saturating_sub(geometry.num_cycles - 1);
        let max_degree = (transition_quotient.max(trace_length - 1) + 1).next_power_of_two() - 1;
        let fri_domain_length = (max_degree + 1) * config.expansion_factor;

        let trace_domain = get_domain::<F>(trace_length)?;
        let fri_domain = get_domain::<F>(fri_domain_length)?;
        let omega = trace_domain.group_gen();
        let fri_omega = fri_domain.group_gen();
        if fri_omega.pow([(fri_domain_length / trace_length) as u64]) != omega {
            return Err(AttestError::InvalidConfig(
                "FRI domain does not extend the trace domain".into(),
            ));
        }

        tracing::debug!(
            trace_length,
            max_degree,
            fri_domain_length,
            "STARK domains fixed"
        );
        Ok(Self {
            config,
            geometry,
            trace_length,
            omega,
            fri_domain_length,
            fri_offset: F::GENERATOR,
            fri_omega,
            max_degree,
            hasher: AlgebraicHasher::default(),
        })
    }

    /// Replaces the parameters of the hash that fingerprints the AIR.
    pub fn with_hash_params(mut self, params: &HashParams) -> Self {
        self.hasher = AlgebraicHasher::new(params);
        self
    }

    pub fn config(&self) -> &StarkConfig {
        &self.config
    }

    pub fn geometry(&self) -> &StarkGeometry {
        &self.geometry
    }

    /// Padded trace length `N`.
    pub fn trace_length(&self) -> usize {
        self.trace_length
    }

    /// Generator of the trace domain.
    pub fn omega(&self) -> F {
        self.omega
    }

    pub fn fri_domain_length(&self) -> usize {
        self.fri_domain_length
    }

    /// Degree bound the combination codeword is tested against.
    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    /// Distance between a FRI domain position and the position of the next
    /// trace row.
    pub(crate) fn next_row_step(&self) -> usize {
        self.fri_domain_length / self.trace_length
    }

    pub(crate) fn fri_offset(&self) -> F {
        self.fri_offset
    }

    pub(crate) fn fri_point(&self, position: usize) -> F {
        self.fri_offset * self.fri_omega.pow([position as u64])
    }

    pub(crate) fn fri(&self) -> Fri<F> {
        Fri::new(
            self.fri_offset,
            self.fri_omega,
            self.fri_domain_length,
            self.config.expansion_factor,
            self.config.num_queries,
        )
    }

    pub(crate) fn fri_domain(&self) -> Result<ark_poly::GeneralEvaluationDomain<F>> {
        get_domain(self.fri_domain_length)
    }

    /// Computes the transition zerofier over the FRI domain and commits to it.
    pub fn preprocess(&self) -> Result<Preprocessed<F>> {
        let transitions = self.geometry.num_cycles - 1;
        let roots: Vec<F> = std::iter::successors(Some(F::one()), |x| Some(*x * self.omega))
            .take(transitions)
            .collect();
        let zerofier = Polynomial::zerofier(&roots);
        let zerofier_codeword = coset_evaluate(&zerofier, &self.fri_domain()?, self.fri_offset);
        let zerofier_root = MerkleTree::new(zerofier_codeword.iter().map(field_leaf).collect())
            .root()
            .unwrap_or_default();

        Ok(Preprocessed {
            zerofier,
            zerofier_codeword,
            zerofier_root,
        })
    }

    /// Absorbs the public statement: geometry, parameters, the AIR and the
    /// zerofier commitment.
    pub(crate) fn absorb_statement(
        &self,
        transcript: &mut FiatShamirTranscript<F>,
        transition: &[TransitionConstraint<F>],
        boundary: &[BoundaryConstraint<F>],
        zerofier_root: &[u8],
    ) {
        for value in [
            self.geometry.num_registers,
            self.geometry.num_cycles,
            self.geometry.transition_degree,
            self.trace_length,
            self.fri_domain_length,
            self.max_degree,
            self.config.expansion_factor,
            self.config.num_queries,
        ] {
            transcript.absorb_u64(value as u64);
        }
        transcript.absorb_field(&air_fingerprint(transition, boundary, &self.hasher));
        transcript.absorb_commitment(zerofier_root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::Fr;
    use ark_ff::Field;

    fn geometry(num_cycles: usize, transition_degree: usize) -> StarkGeometry {
        StarkGeometry {
            num_registers: 10,
            num_cycles,
            transition_degree,
        }
    }

    #[test]
    fn config_validation() {
        StarkConfig::default().validate().unwrap();
        for config in [
            StarkConfig {
                expansion_factor: 2,
                num_queries: 16,
            },
            StarkConfig {
                expansion_factor: 12,
                num_queries: 16,
            },
            StarkConfig {
                expansion_factor: 4,
                num_queries: 0,
            },
        ] {
            assert!(matches!(config.validate(), Err(AttestError::InvalidConfig(_))));
        }
    }

    #[test]
    fn domains_follow_geometry() {
        let stark = Stark::<Fr>::new(StarkConfig::default(), geometry(5, 3)).unwrap();
        assert_eq!(stark.trace_length(), 8);
        // 3 * 7 - 4 = 17 -> 31
        assert_eq!(stark.max_degree(), 31);
        assert_eq!(stark.fri_domain_length(), 128);
        assert_eq!(stark.fri_point(stark.next_row_step()), stark.fri_point(0) * stark.omega());
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        assert!(Stark::<Fr>::new(StarkConfig::default(), geometry(1, 3)).is_err());
    }

    #[test]
    fn zerofier_vanishes_on_transition_rows() {
        let stark = Stark::<Fr>::new(StarkConfig::default(), geometry(5, 2)).unwrap();
        let pre = stark.preprocess().unwrap();
        assert_eq!(pre.zerofier.degree(), 4);
        for i in 0..4u64 {
            assert_eq!(pre.zerofier.evaluate(stark.omega().pow([i])), Fr::from(0u64));
        }
        assert_ne!(pre.zerofier.evaluate(stark.omega().pow([4])), Fr::from(0u64));
        assert_eq!(pre.zerofier_codeword.len(), stark.fri_domain_length());
        assert_eq!(pre.zerofier_codeword[3], pre.zerofier.evaluate(stark.fri_point(3)));
        assert_eq!(pre.zerofier_root.len(), 32);
    }

    #[test]
    fn proof_bytes_round_trip() {
        let tree = MerkleTree::new((0..4u64).map(|i| field_leaf(&Fr::from(i))).collect());
        let path = tree.get_proof(1).unwrap();
        let proof = StarkProof {
            trace_root: tree.root().unwrap(),
            fri: FriProof {
                roots: vec![tree.root().unwrap()],
                last_codeword: vec![Fr::from(5u64), Fr::from(6u64)],
                queries: vec![],
            },
            openings: vec![RowOpening {
                row: vec![Fr::from(1u64), Fr::from(2u64)],
                row_path: path.clone(),
                next_row: vec![Fr::from(3u64), Fr::from(4u64)],
                next_path: path.clone(),
                zerofier: Fr::from(7u64),
                zerofier_path: path,
            }],
        };
        let bytes = proof.to_bytes().unwrap();
        assert_eq!(StarkProof::<Fr>::from_bytes(&bytes).unwrap(), proof);
        assert!(matches!(
            StarkProof::<Fr>::from_bytes(&bytes[..bytes.len() - 1]),
            Err(AttestError::Serialization(_))
        ));
    }
}
