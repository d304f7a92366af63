use ark_ff::PrimeField;
use ark_poly::Evaluations;
use tracing::{info_span, instrument};

use crate::error::{AttestError, Result};
use crate::math::composition::{Composition, boundary_terms, transition_bounds};
use crate::math::domain::{coset_evaluate, get_domain};
use crate::math::fri::field_leaf;
use crate::math::polynomial::Polynomial;
use crate::merkle::MerkleTree;
use crate::stark::{RowOpening, Stark, StarkProof, row_leaf};
use crate::transcript::FiatShamirTranscript;
use crate::vm::constraints::{BoundaryConstraint, TransitionConstraint};
use crate::vm::trace::ExecutionTrace;

impl<F: PrimeField> Stark<F> {
    /// Generates a proof that `trace` satisfies the AIR.
    ///
    /// The prover:
    /// 1. Interpolates every register over the trace domain and extends it to
    ///    the FRI coset
    /// 2. Commits to the extended rows
    /// 3. Combines all quotients with transcript weights
    /// 4. Runs FRI on the combination and opens the rows FRI queried
    ///
    /// Satisfaction is not checked here: a trace that violates the AIR yields
    /// a proof the verifier rejects.
    ///
    /// # Arguments
    ///
    /// * `trace` - The execution trace, `num_cycles` rows of `num_registers`
    /// * `transition` - Transition constraints
    /// * `boundary` - Boundary constraints
    /// * `zerofier` - Transition zerofier from [`Stark::preprocess`]
    /// * `zerofier_codeword` - The zerofier over the FRI domain
    ///
    /// # Errors
    ///
    /// * [`AttestError::InvalidGeometry`] or [`AttestError::InvalidConfig`]
    ///   if the trace or the preprocessed data do not fit this instance
    /// * [`AttestError::ConflictingBoundary`] if a cell is pinned twice
    #[instrument(skip_all, fields(cycles = trace.len(), registers = trace.width()))]
    pub fn prove(
        &self,
        trace: &ExecutionTrace<F>,
        transition: &[TransitionConstraint<F>],
        boundary: &[BoundaryConstraint<F>],
        zerofier: &Polynomial<F>,
        zerofier_codeword: &[F],
    ) -> Result<Vec<u8>> {
        let geometry = *self.geometry();
        if trace.width() != geometry.num_registers {
            return Err(AttestError::InvalidGeometry {
                register_count: trace.width(),
                expected: geometry.num_registers,
            });
        }
        if trace.len() != geometry.num_cycles {
            return Err(AttestError::InvalidConfig(format!(
                "trace has {} rows, the instance expects {}",
                trace.len(),
                geometry.num_cycles
            )));
        }
        if zerofier.degree() + 1 != geometry.num_cycles
            || zerofier_codeword.len() != self.fri_domain_length()
        {
            return Err(AttestError::InvalidConfig(
                "preprocessed zerofier does not match the instance".into(),
            ));
        }

        let length = self.fri_domain_length();
        let step = self.next_row_step();

        let rows = info_span!("extend").in_scope(|| -> Result<Vec<Vec<F>>> {
            let trace_domain = get_domain::<F>(self.trace_length())?;
            let fri_domain = self.fri_domain()?;
            let columns: Vec<Vec<F>> = (0..geometry.num_registers)
                .map(|register| {
                    let mut column = trace.column(register);
                    column.resize(self.trace_length(), F::zero());
                    let poly = Polynomial::from_dense_poly(
                        Evaluations::from_vec_and_domain(column, trace_domain).interpolate(),
                    );
                    coset_evaluate(&poly, &fri_domain, self.fri_offset())
                })
                .collect();
            Ok((0..length)
                .map(|j| columns.iter().map(|column| column[j]).collect())
                .collect())
        })?;

        let trace_tree = MerkleTree::new(rows.iter().map(|row| row_leaf(row)).collect());
        let trace_root = trace_tree.root().unwrap_or_default();
        let zerofier_tree = MerkleTree::new(zerofier_codeword.iter().map(field_leaf).collect());

        let mut transcript = FiatShamirTranscript::new();
        self.absorb_statement(
            &mut transcript,
            transition,
            boundary,
            &zerofier_tree.root().unwrap_or_default(),
        );
        transcript.absorb_commitment(&trace_root);

        let weights: Vec<F> = (0..Composition::<F>::num_weights(
            transition.len(),
            geometry.num_registers,
        ))
            .map(|_| transcript.squeeze_challenge())
            .collect();
        let composition = Composition::new(
            transition,
            transition_bounds(
                transition,
                geometry.num_registers,
                self.trace_length(),
                geometry.num_cycles,
            ),
            boundary_terms(boundary, geometry.num_registers, self.omega(), self.trace_length())?,
            weights,
            self.max_degree(),
        )?;

        let codeword = info_span!("compose").in_scope(|| {
            (0..length)
                .map(|j| {
                    composition
                        .evaluate(
                            self.fri_point(j),
                            &rows[j],
                            &rows[(j + step) % length],
                            zerofier_codeword[j],
                        )
                        .ok_or_else(|| {
                            AttestError::InvalidConfig("FRI domain meets a zerofier root".into())
                        })
                })
                .collect::<Result<Vec<F>>>()
        })?;

        let (fri, positions) =
            info_span!("fri").in_scope(|| self.fri().prove(codeword, &mut transcript))?;

        let openings = positions
            .into_iter()
            .map(|position| {
                let next = (position + step) % length;
                let paths = (
                    trace_tree.get_proof(position),
                    trace_tree.get_proof(next),
                    zerofier_tree.get_proof(position),
                );
                match paths {
                    (Some(row_path), Some(next_path), Some(zerofier_path)) => Ok(RowOpening {
                        row: rows[position].clone(),
                        row_path,
                        next_row: rows[next].clone(),
                        next_path,
                        zerofier: zerofier_codeword[position],
                        zerofier_path,
                    }),
                    _ => Err(AttestError::InvalidConfig(format!(
                        "FRI position {position} outside the trace commitment"
                    ))),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let bytes = StarkProof {
            trace_root,
            fri,
            openings,
        }
        .to_bytes()?;
        tracing::info!(bytes = bytes.len(), "proof generated");
        Ok(bytes)
    }
}
