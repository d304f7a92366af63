//! Edge-digest encoding.
//!
//! Instead of carrying the padded successor list, each row carries a single
//! digest `current * K + next` of the edge it takes, with `K = max_node + 1`.
//! Membership of that digest in the CFG's edge set is enforced by a vanishing
//! polynomial over every edge digest, and both node ids are kept inside the
//! node set so the packing stays injective. A graph that declares node
//! `u64::MAX` has no packing base and cannot use this encoding.

use std::collections::BTreeSet;

use ark_ff::PrimeField;

use crate::cfg::Cfg;
use crate::error::{AttestError, Result};
use crate::hash::AlgebraicHasher;
use crate::math::multivariate::MPolynomial;
use crate::math::polynomial::Polynomial;
use crate::vm::constraints::{TransitionConstraint, TransitionVariables, common_constraints, node_zerofier};
use crate::vm::layout::RegisterLayout;

/// Packing base `K`: one more than the largest node id.
///
/// # Errors
///
/// [`AttestError::InvalidConfig`] if the largest node id is `u64::MAX`.
pub fn packing_base(cfg: &Cfg) -> Result<u64> {
    match cfg.max_node() {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            AttestError::InvalidConfig(format!("node {max} leaves no edge-digest packing base"))
        }),
    }
}

pub fn edge_digest<F: PrimeField>(current: u64, next: u64, base: u64) -> F {
    F::from(current) * F::from(base) + F::from(next)
}

fn packed_edges(cfg: &Cfg, base: u64) -> Vec<u128> {
    let base = base as u128;
    let mut packed: Vec<u128> = cfg
        .edges()
        .map(|(src, dest)| src as u128 * base + dest as u128)
        .collect();
    packed.sort_unstable();
    packed.dedup();
    packed
}

/// Digests of every distinct CFG edge, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDigestSet<F: PrimeField> {
    base: u64,
    digests: Vec<F>,
}

impl<F: PrimeField> EdgeDigestSet<F> {
    pub fn from_cfg(cfg: &Cfg) -> Result<Self> {
        let base = packing_base(cfg)?;
        Ok(Self {
            base,
            digests: packed_edges(cfg, base).into_iter().map(F::from).collect(),
        })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn digests(&self) -> &[F] {
        &self.digests
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn contains(&self, digest: F) -> bool {
        self.digests.contains(&digest)
    }

    /// `Z_E`, vanishing exactly on the edge digests.
    pub fn zerofier(&self) -> Polynomial<F> {
        Polynomial::zerofier(&self.digests)
    }

    /// Algebraic-hash commitment to the edge set.
    pub fn fingerprint(&self, hasher: &AlgebraicHasher<F>) -> F {
        let mut inputs = Vec::with_capacity(self.digests.len() + 1);
        inputs.push(F::from(self.base));
        inputs.extend_from_slice(&self.digests);
        hasher.hash_many(&inputs)
    }
}

/// Transition constraints of the edge-digest encoding.
///
/// Link, nonce continuity and stack consistency as for the neighbor-list
/// encoding, plus digest binding, edge membership and node membership of
/// both `prev.current` and `prev.next`.
///
/// # Errors
///
/// [`AttestError::InvalidGeometry`](crate::error::AttestError::InvalidGeometry)
/// unless `register_count` is 9, [`AttestError::InvalidConfig`] if the graph
/// has no packing base.
pub fn digest_transition_constraints<F: PrimeField>(
    register_count: usize,
    cfg: &Cfg,
) -> Result<Vec<TransitionConstraint<F>>> {
    let layout = RegisterLayout::edge_digest();
    layout.check(register_count)?;

    let vars = TransitionVariables::new(register_count);
    let prev = &vars.prev;
    let active = vars.active(&layout);
    let edges = EdgeDigestSet::<F>::from_cfg(cfg)?;
    let digest = layout.digest().unwrap_or(RegisterLayout::NEXT + 1);

    let base = MPolynomial::constant(F::from(edges.base()));
    let packed = &(&prev[RegisterLayout::CURRENT] * &base) + &prev[RegisterLayout::NEXT];
    let binding = &(&prev[digest] - &packed) * &active;

    let edge_membership = &MPolynomial::lift(&edges.zerofier(), 1 + digest) * &active;

    let nodes = node_zerofier::<F>(cfg);
    let current_membership =
        &MPolynomial::lift(&nodes, 1 + RegisterLayout::CURRENT) * &active;
    let next_membership = &MPolynomial::lift(&nodes, 1 + RegisterLayout::NEXT) * &active;

    let mut constraints = common_constraints(&vars, &layout);
    constraints.extend([
        TransitionConstraint::new("digest_binding", binding),
        TransitionConstraint::new("edge_membership", edge_membership),
        TransitionConstraint::new("current_membership", current_membership),
        TransitionConstraint::new("next_membership", next_membership),
    ]);
    Ok(constraints)
}

/// Declared degree of the edge-digest transition constraints.
pub fn digest_transition_degree(cfg: &Cfg) -> usize {
    let distinct: BTreeSet<(u64, u64)> = cfg.edges().collect();
    (distinct.len().max(cfg.len()) + 1).max(2)
}
