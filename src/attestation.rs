//! End-to-end attestation of a control-flow walk.
//!
//! [`Attestation`] drives the whole pipeline for one CFG:
//! trace building, AIR generation, STARK setup, preprocessing, proving and
//! verification. The verifier side only needs the public [`Statement`].

use ark_ff::PrimeField;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cfg::Cfg;
use crate::error::Result;
use crate::hash::HashParams;
use crate::program::ExecutionPath;
use crate::stark::{Stark, StarkConfig, StarkGeometry};
use crate::vm::constraints::{
    BoundaryConstraint, TransitionConstraint, boundary_constraints, max_degree,
    neighbor_binding_constraints, transition_constraints,
};
use crate::vm::digest::digest_transition_constraints;
use crate::vm::layout::{Encoding, RegisterLayout};
use crate::vm::stack::ReturnPolicy;
use crate::vm::trace::{ExecutionTrace, TraceBuilder};

/// Which trace encoding proves adjacency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    #[default]
    NeighborList,
    EdgeDigest,
}

impl Strategy {
    pub fn encoding(self) -> Encoding {
        match self {
            Strategy::NeighborList => Encoding::NeighborList,
            Strategy::EdgeDigest => Encoding::EdgeDigest,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationConfig {
    pub strategy: Strategy,
    pub policy: ReturnPolicy,
    /// Add the neighbor binding constraints to the neighbor-list AIR
    pub bind_neighbors: bool,
    pub stark: StarkConfig,
    pub hash: HashParams,
}

/// Public inputs of an attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement<F: PrimeField> {
    pub nonce: F,
    pub start: u64,
    pub end: u64,
    /// Trace rows, prelude included
    pub num_cycles: usize,
}

impl<F: PrimeField> Statement<F> {
    /// Statement a prover claims for `path`.
    pub fn for_path(nonce: F, path: &ExecutionPath) -> Self {
        Self {
            nonce,
            start: path.start,
            end: path.end,
            num_cycles: path.len() + 1,
        }
    }
}

/// Constraint system of one statement.
#[derive(Debug, Clone)]
pub struct Air<F: PrimeField> {
    pub transition: Vec<TransitionConstraint<F>>,
    pub boundary: Vec<BoundaryConstraint<F>>,
    pub layout: RegisterLayout,
}

impl<F: PrimeField> Air<F> {
    /// Largest total degree among the transition constraints.
    pub fn transition_degree(&self) -> usize {
        max_degree(&self.transition)
    }
}

/// Draws a nonce from `rng`.
pub fn random_nonce<F: PrimeField, R: Rng + ?Sized>(rng: &mut R) -> F {
    F::rand(rng)
}

/// Draws a nonce from the thread-local generator.
pub fn fresh_nonce<F: PrimeField>() -> F {
    random_nonce(&mut rand::thread_rng())
}

#[derive(Debug, Clone)]
pub struct Attestation<'a> {
    cfg: &'a Cfg,
    config: AttestationConfig,
}

impl<'a> Attestation<'a> {
    pub fn new(cfg: &'a Cfg) -> Self {
        Self::with_config(cfg, AttestationConfig::default())
    }

    pub fn with_config(cfg: &'a Cfg, config: AttestationConfig) -> Self {
        Self { cfg, config }
    }

    pub fn config(&self) -> &AttestationConfig {
        &self.config
    }

    pub fn layout(&self) -> RegisterLayout {
        match self.config.strategy {
            Strategy::NeighborList => RegisterLayout::neighbor_list(self.cfg.max_adjacency()),
            Strategy::EdgeDigest => RegisterLayout::edge_digest(),
        }
    }

    pub fn build_trace<F: PrimeField>(
        &self,
        nonce: F,
        path: &ExecutionPath,
    ) -> Result<ExecutionTrace<F>> {
        TraceBuilder::new(self.cfg)
            .with_policy(self.config.policy)
            .with_encoding(self.config.strategy.encoding())
            .build(nonce, path)
    }

    /// Boundary and transition constraints for `statement`.
    pub fn generate_constraints<F: PrimeField>(&self, statement: &Statement<F>) -> Result<Air<F>> {
        let layout = self.layout();
        let transition = match self.config.strategy {
            Strategy::NeighborList => {
                let mut constraints =
                    transition_constraints(layout.width(), self.cfg.max_adjacency())?;
                if self.config.bind_neighbors {
                    constraints.extend(neighbor_binding_constraints(self.cfg)?);
                }
                constraints
            }
            Strategy::EdgeDigest => digest_transition_constraints(layout.width(), self.cfg)?,
        };
        let boundary = boundary_constraints(
            statement.nonce,
            statement.start,
            statement.end,
            statement.num_cycles,
            &layout,
        );
        tracing::debug!(
            transition = transition.len(),
            boundary = boundary.len(),
            degree = max_degree(&transition),
            "generated AIR"
        );
        Ok(Air {
            transition,
            boundary,
            layout,
        })
    }

    /// STARK instance sized for `air` over `num_cycles` rows.
    pub fn stark<F: PrimeField>(&self, air: &Air<F>, num_cycles: usize) -> Result<Stark<F>> {
        let geometry = StarkGeometry {
            num_registers: air.layout.width(),
            num_cycles,
            transition_degree: air.transition_degree(),
        };
        Ok(Stark::new(self.config.stark, geometry)?.with_hash_params(&self.config.hash))
    }

    /// Proves that `path` walks the CFG from `path.start` to `path.end`.
    ///
    /// Returns the public statement and the proof bytes. A path that does
    /// not walk the graph still yields bytes; they do not verify.
    #[instrument(skip_all, fields(strategy = ?self.config.strategy, steps = path.len()))]
    pub fn prove<F: PrimeField>(
        &self,
        nonce: F,
        path: &ExecutionPath,
    ) -> Result<(Statement<F>, Vec<u8>)> {
        let trace = self.build_trace(nonce, path)?;
        let statement = Statement::for_path(nonce, path);
        let air = self.generate_constraints(&statement)?;
        let stark = self.stark(&air, statement.num_cycles)?;
        let preprocessed = stark.preprocess()?;
        let proof = stark.prove(
            &trace,
            &air.transition,
            &air.boundary,
            &preprocessed.zerofier,
            &preprocessed.zerofier_codeword,
        )?;
        Ok((statement, proof))
    }

    /// Checks `proof` against `statement`.
    #[instrument(skip_all, fields(strategy = ?self.config.strategy, cycles = statement.num_cycles))]
    pub fn verify<F: PrimeField>(&self, statement: &Statement<F>, proof: &[u8]) -> bool {
        let setup = self.generate_constraints(statement).and_then(|air| {
            let stark = self.stark(&air, statement.num_cycles)?;
            let preprocessed = stark.preprocess()?;
            Ok((air, stark, preprocessed.zerofier_root))
        });
        match setup {
            Ok((air, stark, zerofier_root)) => {
                stark.verify(proof, &air.transition, &air.boundary, &zerofier_root)
            }
            Err(err) => {
                tracing::warn!(%err, "statement cannot be verified");
                false
            }
        }
    }
}
