//! FRI low-degree test.
//!
//! Split-and-fold over a coset `offset * <omega>`. Every layer except the last
//! is committed with a Merkle tree; the last codeword is sent in the clear and
//! interpolated by the verifier to check its degree.

use ark_ff::{BigInteger, PrimeField};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::error::{AttestError, Result};
use crate::math::domain::{coset_interpolate, get_domain};
use crate::merkle::{MerkleProof, MerkleTree, sha_digest, verify_merkle_proof};
use crate::transcript::FiatShamirTranscript;

/// `(a + b)/2 + (a - b)/2 * beta / x`, folding `f(x)` and `f(-x)` onto `x^2`.
pub fn fold_pair<F: PrimeField>(a: F, b: F, x: F, beta: F) -> Option<F> {
    let half_inv = F::from(2u64).inverse()?;
    let avg = (a + b) * half_inv;
    let diff = (a - b) * half_inv;
    Some(avg + diff * beta * x.inverse()?)
}

/// Folds a codeword in half. `xs` are the points of the first half of its
/// domain; `evals[i + half]` is the value at `-xs[i]`.
pub fn fri_fold<F: PrimeField>(evals: &[F], xs: &[F], beta: F) -> Option<Vec<F>> {
    if evals.len() % 2 != 0 {
        return None;
    }
    let half = evals.len() / 2;
    (0..half)
        .map(|i| fold_pair(evals[i], evals[i + half], *xs.get(i)?, beta))
        .collect()
}

/// Leaf content of one codeword value.
pub fn field_leaf<F: PrimeField>(value: &F) -> Vec<u8> {
    sha_digest(&value.into_bigint().to_bytes_le())
}

/// Both openings of one query in one round.
#[derive(Debug, Clone, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct FriQuery<F: PrimeField> {
    pub a: F,
    pub b: F,
    pub a_path: MerkleProof,
    pub b_path: MerkleProof,
}

#[derive(Debug, Clone, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct FriProof<F: PrimeField> {
    /// Merkle roots of the committed layers
    pub roots: Vec<Vec<u8>>,
    /// Final layer, sent in the clear
    pub last_codeword: Vec<F>,
    /// `queries[round][query]`
    pub queries: Vec<Vec<FriQuery<F>>>,
}

/// FRI parameters for one codeword domain.
#[derive(Debug, Clone, Copy)]
pub struct Fri<F: PrimeField> {
    offset: F,
    omega: F,
    domain_length: usize,
    expansion_factor: usize,
    num_queries: usize,
}

impl<F: PrimeField> Fri<F> {
    pub fn new(
        offset: F,
        omega: F,
        domain_length: usize,
        expansion_factor: usize,
        num_queries: usize,
    ) -> Self {
        Self {
            offset,
            omega,
            domain_length,
            expansion_factor,
            num_queries,
        }
    }

    pub fn domain_length(&self) -> usize {
        self.domain_length
    }

    /// Number of folds. Folding stops once the codeword is no longer than
    /// the expansion factor or too short to serve every query.
    pub fn num_rounds(&self) -> usize {
        let mut codeword_length = self.domain_length;
        let mut rounds = 0;
        while codeword_length > self.expansion_factor && 4 * self.num_queries < codeword_length {
            codeword_length /= 2;
            rounds += 1;
        }
        rounds
    }

    /// Domain of round `round`: `(offset^(2^round), omega^(2^round))`.
    fn round_domain(&self, round: usize) -> (F, F) {
        (0..round).fold((self.offset, self.omega), |(o, w), _| (o.square(), w.square()))
    }

    fn round_points(&self, round: usize) -> Vec<F> {
        let (offset, omega) = self.round_domain(round);
        let length = self.domain_length >> round;
        std::iter::successors(Some(offset), |x| Some(*x * omega))
            .take(length)
            .collect()
    }

    /// Positions opened on the first layer for the top-level `indices`.
    fn first_layer_positions(&self, indices: &[usize]) -> Vec<usize> {
        let half = self.domain_length / 2;
        indices
            .iter()
            .flat_map(|&idx| [idx % half, idx % half + half])
            .collect()
    }

    /// Runs the commit and query phases on `codeword`.
    ///
    /// Returns the proof and the first-layer positions the caller must open
    /// its own commitments at, in the order [`verify`](Self::verify) reports
    /// them.
    pub fn prove(
        &self,
        codeword: Vec<F>,
        transcript: &mut FiatShamirTranscript<F>,
    ) -> Result<(FriProof<F>, Vec<usize>)> {
        if codeword.len() != self.domain_length {
            return Err(AttestError::InvalidConfig(format!(
                "codeword length {} does not match FRI domain {}",
                codeword.len(),
                self.domain_length
            )));
        }

        let rounds = self.num_rounds();
        let mut codewords = Vec::with_capacity(rounds + 1);
        let mut trees = Vec::with_capacity(rounds);
        let mut roots = Vec::with_capacity(rounds);
        let mut current = codeword;

        for round in 0..rounds {
            let tree = MerkleTree::new(current.iter().map(field_leaf).collect());
            let root = tree.root().unwrap_or_default();
            transcript.absorb_commitment(&root);
            let alpha = transcript.squeeze_challenge();

            let points = self.round_points(round);
            let next = fri_fold(&current, &points[..current.len() / 2], alpha)
                .ok_or_else(|| AttestError::InvalidConfig("FRI domain contains zero".into()))?;

            roots.push(root);
            trees.push(tree);
            codewords.push(std::mem::replace(&mut current, next));
        }

        transcript.absorb_fields(&current);
        let indices = transcript.squeeze_indices(self.num_queries, self.domain_length / 2);

        let mut queries = Vec::with_capacity(rounds);
        for (round, (codeword, tree)) in codewords.iter().zip(&trees).enumerate() {
            let half = codeword.len() / 2;
            let round_queries = indices
                .iter()
                .map(|&idx| {
                    let a = idx % half;
                    let b = a + half;
                    let a_path = tree.get_proof(a);
                    let b_path = tree.get_proof(b);
                    match (a_path, b_path) {
                        (Some(a_path), Some(b_path)) => Ok(FriQuery {
                            a: codeword[a],
                            b: codeword[b],
                            a_path,
                            b_path,
                        }),
                        _ => Err(AttestError::InvalidConfig(format!(
                            "query index {idx} outside FRI round {round}"
                        ))),
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            queries.push(round_queries);
        }

        tracing::debug!(rounds, last = current.len(), queries = indices.len(), "FRI committed");
        let positions = self.first_layer_positions(&indices);
        Ok((
            FriProof {
                roots,
                last_codeword: current,
                queries,
            },
            positions,
        ))
    }

    /// Checks `proof` against the transcript.
    ///
    /// # Returns
    ///
    /// The opened `(position, value)` pairs of the first layer, or `None` if
    /// any check fails.
    pub fn verify(
        &self,
        proof: &FriProof<F>,
        transcript: &mut FiatShamirTranscript<F>,
    ) -> Option<Vec<(usize, F)>> {
        let rounds = self.num_rounds();
        if proof.roots.len() != rounds || proof.queries.len() != rounds {
            tracing::warn!(rounds = proof.roots.len(), expected = rounds, "FRI round count mismatch");
            return None;
        }

        let alphas: Vec<F> = proof
            .roots
            .iter()
            .map(|root| {
                transcript.absorb_commitment(root);
                transcript.squeeze_challenge()
            })
            .collect();

        let last = &proof.last_codeword;
        let last_length = self.domain_length >> rounds;
        if last.len() != last_length {
            tracing::warn!(length = last.len(), expected = last_length, "last FRI codeword has wrong length");
            return None;
        }
        transcript.absorb_fields(last);

        // low degree check on the final layer
        let (last_offset, _) = self.round_domain(rounds);
        let domain = get_domain::<F>(last_length).ok()?;
        let poly = coset_interpolate(last, &domain, last_offset);
        let bound = last_length / self.expansion_factor;
        if poly.coefficients().len() > bound {
            tracing::warn!(degree = poly.degree(), bound, "last FRI codeword is not low degree");
            return None;
        }

        let indices = transcript.squeeze_indices(self.num_queries, self.domain_length / 2);

        for round in 0..rounds {
            let queries = &proof.queries[round];
            if queries.len() != indices.len() {
                return None;
            }
            let half = (self.domain_length >> round) / 2;
            let (offset, omega) = self.round_domain(round);

            for (q, (&idx, query)) in indices.iter().zip(queries).enumerate() {
                let a = idx % half;
                let b = a + half;
                let root = &proof.roots[round];
                if !verify_merkle_proof(&field_leaf(&query.a), a, &query.a_path, root)
                    || !verify_merkle_proof(&field_leaf(&query.b), b, &query.b_path, root)
                {
                    tracing::warn!(round, index = a, "FRI Merkle path rejected");
                    return None;
                }

                let x = offset * omega.pow([a as u64]);
                let folded = fold_pair(query.a, query.b, x, alphas[round])?;

                let expected = if round + 1 < rounds {
                    let next = &proof.queries[round + 1][q];
                    if a < half / 2 { next.a } else { next.b }
                } else {
                    *last.get(a)?
                };
                if folded != expected {
                    tracing::warn!(round, index = a, "FRI folding inconsistent");
                    return None;
                }
            }
        }

        let positions = self.first_layer_positions(&indices);
        let values: Vec<F> = if rounds == 0 {
            positions.iter().map(|&p| last.get(p).copied()).collect::<Option<_>>()?
        } else {
            proof.queries[0].iter().flat_map(|q| [q.a, q.b]).collect()
        };
        Some(positions.into_iter().zip(values).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::domain::coset_evaluate;
    use crate::math::polynomial::Polynomial;
    use ark_bls12_381::Fr;
    use ark_ff::{FftField, Field, UniformRand};
    use ark_poly::EvaluationDomain;
    use ark_std::test_rng;

    fn setup(length: usize, expansion: usize, queries: usize) -> Fri<Fr> {
        let domain = get_domain::<Fr>(length).unwrap();
        Fri::new(Fr::GENERATOR, domain.group_gen(), length, expansion, queries)
    }

    fn codeword(fri: &Fri<Fr>, degree: usize) -> Vec<Fr> {
        let mut rng = test_rng();
        let poly = Polynomial::new((0..=degree).map(|_| Fr::rand(&mut rng)).collect());
        let domain = get_domain::<Fr>(fri.domain_length()).unwrap();
        coset_evaluate(&poly, &domain, Fr::GENERATOR)
    }

    #[test]
    fn fold_halves_degree() {
        let fri = setup(16, 4, 1);
        let evals = codeword(&fri, 3);
        let points = fri.round_points(0);
        let folded = fri_fold(&evals, &points[..8], Fr::from(5u64)).unwrap();
        let domain = get_domain::<Fr>(8).unwrap();
        let poly = coset_interpolate(&folded, &domain, Fr::GENERATOR.square());
        assert!(poly.degree() <= 1);
    }

    #[test]
    fn honest_codeword_verifies() {
        let fri = setup(256, 4, 8);
        assert_eq!(fri.num_rounds(), 3);
        let evals = codeword(&fri, 63);

        let (proof, positions) = fri.prove(evals.clone(), &mut FiatShamirTranscript::new()).unwrap();
        let opened = fri.verify(&proof, &mut FiatShamirTranscript::new()).unwrap();
        assert_eq!(opened.len(), positions.len());
        for ((p, v), q) in opened.iter().zip(&positions) {
            assert_eq!(p, q);
            assert_eq!(*v, evals[*p]);
        }
    }

    #[test]
    fn high_degree_codeword_is_rejected() {
        let fri = setup(256, 4, 8);
        let evals = codeword(&fri, 200);
        let (proof, _) = fri.prove(evals, &mut FiatShamirTranscript::new()).unwrap();
        assert!(fri.verify(&proof, &mut FiatShamirTranscript::new()).is_none());
    }

    #[test]
    fn zero_round_fri_reads_the_last_codeword() {
        let fri = setup(16, 4, 8);
        assert_eq!(fri.num_rounds(), 0);
        let evals = codeword(&fri, 3);
        let (proof, _) = fri.prove(evals.clone(), &mut FiatShamirTranscript::new()).unwrap();
        assert!(proof.roots.is_empty());
        let opened = fri.verify(&proof, &mut FiatShamirTranscript::new()).unwrap();
        assert!(opened.iter().all(|(p, v)| evals[*p] == *v));
    }

    #[test]
    fn tampered_query_is_rejected() {
        let fri = setup(256, 4, 8);
        let evals = codeword(&fri, 63);
        let (mut proof, _) = fri.prove(evals, &mut FiatShamirTranscript::new()).unwrap();
        proof.queries[1][0].a += Fr::from(1u64);
        assert!(fri.verify(&proof, &mut FiatShamirTranscript::new()).is_none());
    }
}
