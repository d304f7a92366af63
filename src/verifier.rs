use ark_ff::PrimeField;
use tracing::instrument;

use crate::math::composition::{Composition, boundary_terms, transition_bounds};
use crate::math::fri::field_leaf;
use crate::merkle::verify_merkle_proof;
use crate::stark::{Stark, StarkProof, row_leaf};
use crate::transcript::FiatShamirTranscript;
use crate::vm::constraints::{BoundaryConstraint, TransitionConstraint};

impl<F: PrimeField> Stark<F> {
    /// Verifies a serialized proof against the AIR.
    ///
    /// The verification process:
    /// 1. Replays the transcript from the statement and the trace commitment
    /// 2. Runs the FRI verifier, which yields the queried combination values
    /// 3. Checks every row opening against the trace and zerofier roots
    /// 4. Recomputes the combination from the opened rows
    ///
    /// # Arguments
    ///
    /// * `proof` - Bytes produced by [`Stark::prove`]
    /// * `transition` - Transition constraints
    /// * `boundary` - Boundary constraints
    /// * `zerofier_root` - Commitment from [`Stark::preprocess`]
    ///
    /// # Returns
    ///
    /// `true` if the proof is valid, `false` otherwise
    #[instrument(skip_all, fields(bytes = proof.len()))]
    pub fn verify(
        &self,
        proof: &[u8],
        transition: &[TransitionConstraint<F>],
        boundary: &[BoundaryConstraint<F>],
        zerofier_root: &[u8],
    ) -> bool {
        match self.check(proof, transition, boundary, zerofier_root) {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!(reason, "proof rejected");
                false
            }
        }
    }

    fn check(
        &self,
        proof: &[u8],
        transition: &[TransitionConstraint<F>],
        boundary: &[BoundaryConstraint<F>],
        zerofier_root: &[u8],
    ) -> Result<(), &'static str> {
        let proof = StarkProof::<F>::from_bytes(proof).map_err(|_| "malformed proof bytes")?;
        let geometry = *self.geometry();
        let length = self.fri_domain_length();
        let step = self.next_row_step();

        let mut transcript = FiatShamirTranscript::new();
        self.absorb_statement(&mut transcript, transition, boundary, zerofier_root);
        transcript.absorb_commitment(&proof.trace_root);

        let weights: Vec<F> = (0..Composition::<F>::num_weights(
            transition.len(),
            geometry.num_registers,
        ))
            .map(|_| transcript.squeeze_challenge())
            .collect();
        let boundary = boundary_terms(boundary, geometry.num_registers, self.omega(), self.trace_length())
            .map_err(|_| "invalid boundary constraints")?;
        let composition = Composition::new(
            transition,
            transition_bounds(
                transition,
                geometry.num_registers,
                self.trace_length(),
                geometry.num_cycles,
            ),
            boundary,
            weights,
            self.max_degree(),
        )
        .map_err(|_| "constraints exceed the degree bound")?;

        let values = self
            .fri()
            .verify(&proof.fri, &mut transcript)
            .ok_or("FRI rejected the combination codeword")?;
        if values.len() != proof.openings.len() {
            return Err("opening count does not match the FRI queries");
        }

        for ((position, value), opening) in values.into_iter().zip(&proof.openings) {
            if opening.row.len() != geometry.num_registers
                || opening.next_row.len() != geometry.num_registers
            {
                return Err("opened row has the wrong width");
            }
            let next = (position + step) % length;
            if !verify_merkle_proof(&row_leaf(&opening.row), position, &opening.row_path, &proof.trace_root)
                || !verify_merkle_proof(&row_leaf(&opening.next_row), next, &opening.next_path, &proof.trace_root)
            {
                return Err("trace opening does not match the commitment");
            }
            if !verify_merkle_proof(
                &field_leaf(&opening.zerofier),
                position,
                &opening.zerofier_path,
                zerofier_root,
            ) {
                return Err("zerofier opening does not match the commitment");
            }

            let expected = composition
                .evaluate(self.fri_point(position), &opening.row, &opening.next_row, opening.zerofier)
                .ok_or("opened point is a zerofier root")?;
            if expected != value {
                return Err("combination does not match the opened rows");
            }
        }
        Ok(())
    }
}
