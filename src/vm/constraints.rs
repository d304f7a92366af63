//! Constraint generation for the attestation AIR.
//!
//! Boundary constraints pin single cells of the trace. Transition constraints
//! are multivariate polynomials over `1 + 2R` variables laid out as
//! `[x, prev[0..R), next[0..R)]`; they vanish on every consecutive row pair of
//! a valid trace.

use ark_ff::PrimeField;

use crate::cfg::Cfg;
use crate::error::{AttestError, Result};
use crate::math::multivariate::MPolynomial;
use crate::math::polynomial::Polynomial;
use crate::vm::layout::RegisterLayout;
use crate::vm::trace::ExecutionTrace;

/// Cell `(row, register)` must equal `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryConstraint<F: PrimeField> {
    pub row: usize,
    pub register: usize,
    pub value: F,
}

impl<F: PrimeField> BoundaryConstraint<F> {
    pub fn new(row: usize, register: usize, value: F) -> Self {
        Self {
            row,
            register,
            value,
        }
    }

    /// False when the cell differs or lies outside the trace.
    pub fn is_satisfied(&self, trace: &ExecutionTrace<F>) -> bool {
        trace
            .rows()
            .get(self.row)
            .and_then(|row| row.get(self.register))
            .is_some_and(|cell| *cell == self.value)
    }
}

/// Constraint between consecutive execution trace rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionConstraint<F: PrimeField> {
    /// Constraint name for debugging
    pub name: String,
    /// Polynomial over `[x, prev.., next..]`
    pub polynomial: MPolynomial<F>,
}

impl<F: PrimeField> TransitionConstraint<F> {
    pub fn new(name: impl Into<String>, polynomial: MPolynomial<F>) -> Self {
        Self {
            name: name.into(),
            polynomial,
        }
    }

    pub fn evaluate(&self, x: F, prev: &[F], next: &[F]) -> F {
        let mut point = Vec::with_capacity(1 + prev.len() + next.len());
        point.push(x);
        point.extend_from_slice(prev);
        point.extend_from_slice(next);
        self.polynomial.evaluate(&point)
    }

    pub fn degree(&self) -> usize {
        self.polynomial.degree()
    }
}

/// Register variables of a transition polynomial. Variable 0, the cycle
/// point `x`, is not used by the attestation AIR.
pub(crate) struct TransitionVariables<F: PrimeField> {
    pub prev: Vec<MPolynomial<F>>,
    pub next: Vec<MPolynomial<F>>,
}

impl<F: PrimeField> TransitionVariables<F> {
    pub fn new(register_count: usize) -> Self {
        let mut vars = MPolynomial::variables(1 + 2 * register_count);
        let next = vars.split_off(1 + register_count);
        let prev = vars.split_off(1);
        Self { prev, next }
    }

    /// `1 - prev.initial`: zero on the prelude row, one elsewhere.
    pub fn active(&self, layout: &RegisterLayout) -> MPolynomial<F> {
        &MPolynomial::constant(F::one()) - &self.prev[layout.initial()]
    }
}

/// Boundary constraints for a trace of `num_cycles` rows (prelude included).
///
/// * row 0: every register zero except `initial = 1`
/// * row 1: `nonce` and `current = start`
/// * last row: `current = end`, `next = 0`, `terminal = 1`
pub fn boundary_constraints<F: PrimeField>(
    nonce: F,
    start: u64,
    end: u64,
    num_cycles: usize,
    layout: &RegisterLayout,
) -> Vec<BoundaryConstraint<F>> {
    let mut constraints: Vec<BoundaryConstraint<F>> = (0..layout.width())
        .map(|register| {
            let value = if register == layout.initial() {
                F::one()
            } else {
                F::zero()
            };
            BoundaryConstraint::new(0, register, value)
        })
        .collect();

    constraints.push(BoundaryConstraint::new(1, RegisterLayout::NONCE, nonce));
    constraints.push(BoundaryConstraint::new(1, RegisterLayout::CURRENT, F::from(start)));

    let last = num_cycles.saturating_sub(1);
    constraints.push(BoundaryConstraint::new(last, RegisterLayout::CURRENT, F::from(end)));
    constraints.push(BoundaryConstraint::new(last, RegisterLayout::NEXT, F::zero()));
    constraints.push(BoundaryConstraint::new(last, layout.terminal(), F::one()));
    constraints
}

/// Constraints shared by both encodings: sequential link, nonce continuity
/// and stack consistency.
pub(crate) fn common_constraints<F: PrimeField>(
    vars: &TransitionVariables<F>,
    layout: &RegisterLayout,
) -> Vec<TransitionConstraint<F>> {
    let (prev, next) = (&vars.prev, &vars.next);
    let active = vars.active(layout);

    let link = &(&prev[RegisterLayout::NEXT] - &next[RegisterLayout::CURRENT]) * &active;
    let nonce = &(&prev[RegisterLayout::NONCE] - &next[RegisterLayout::NONCE]) * &active;
    // prev.top * next.ret - prev.next * next.ret
    let stack = &(&prev[layout.call_stack_top()] - &prev[RegisterLayout::NEXT]) * &next[layout.ret()];

    vec![
        TransitionConstraint::new("link", link),
        TransitionConstraint::new("nonce", nonce),
        TransitionConstraint::new("stack", stack),
    ]
}

/// Transition constraints of the neighbor-list encoding.
///
/// # Errors
///
/// [`AttestError::InvalidGeometry`]
/// unless `register_count == 8 + max_adjacency`.
pub fn transition_constraints<F: PrimeField>(
    register_count: usize,
    max_adjacency: usize,
) -> Result<Vec<TransitionConstraint<F>>> {
    let layout = RegisterLayout::neighbor_list(max_adjacency);
    layout.check(register_count)?;

    let vars = TransitionVariables::new(register_count);
    let prev = &vars.prev;
    let candidates: Vec<MPolynomial<F>> = layout
        .neighbors()
        .map(|slot| &prev[slot] - &prev[RegisterLayout::NEXT])
        .collect();
    let adjacency = &MPolynomial::product(&candidates) * &vars.active(&layout);

    let mut constraints = common_constraints(&vars, &layout);
    constraints.insert(1, TransitionConstraint::new("adjacency", adjacency));
    Ok(constraints)
}

/// Constraints binding the neighbor registers to the CFG itself.
///
/// For each slot `i`, `prev.neighbors[i] = P_i(prev.current)` where `P_i`
/// interpolates slot `i` of the padded successor lists over all nodes, plus
/// `Z_V(prev.current) = 0` where `Z_V` vanishes exactly on the node set.
pub fn neighbor_binding_constraints<F: PrimeField>(cfg: &Cfg) -> Result<Vec<TransitionConstraint<F>>> {
    let layout = RegisterLayout::neighbor_list(cfg.max_adjacency());
    let vars = TransitionVariables::new(layout.width());
    let active = vars.active(&layout);
    let current = RegisterLayout::CURRENT + 1;

    let nodes: Vec<u64> = cfg.nodes().collect();
    let xs: Vec<F> = nodes.iter().map(|&n| F::from(n)).collect();
    let padded = nodes
        .iter()
        .map(|&n| cfg.neighbors(n))
        .collect::<Result<Vec<_>>>()?;

    let mut constraints = Vec::with_capacity(layout.max_adjacency() + 1);
    for (i, slot) in layout.neighbors().enumerate() {
        let ys: Vec<F> = padded.iter().map(|nbrs| F::from(nbrs[i])).collect();
        let interpolant = Polynomial::lagrange_interpolate(&xs, &ys).ok_or_else(|| {
            AttestError::InvalidConfig("node ids must be distinct field elements".into())
        })?;
        let interpolant = MPolynomial::lift(&interpolant, current);
        let binding = &(&vars.prev[slot] - &interpolant) * &active;
        constraints.push(TransitionConstraint::new(format!("binding[{i}]"), binding));
    }

    let membership = &MPolynomial::lift(&node_zerofier(cfg), current) * &active;
    constraints.push(TransitionConstraint::new("node_membership", membership));
    Ok(constraints)
}

/// Vanishing polynomial of the CFG's node set.
pub fn node_zerofier<F: PrimeField>(cfg: &Cfg) -> Polynomial<F> {
    let nodes: Vec<F> = cfg.nodes().map(F::from).collect();
    Polynomial::zerofier(&nodes)
}

/// Declared degree of the neighbor-list transition constraints.
pub fn transition_degree(max_adjacency: usize) -> usize {
    (max_adjacency + 1).max(2)
}

/// Largest total degree among `constraints`.
pub fn max_degree<F: PrimeField>(constraints: &[TransitionConstraint<F>]) -> usize {
    constraints.iter().map(TransitionConstraint::degree).max().unwrap_or(0)
}

/// `(row, name)` of every transition constraint that does not vanish on the
/// row pair `(row, row + 1)`.
///
/// The `x` variable is bound to the row index.
pub fn transition_violations<'c, F: PrimeField>(
    constraints: &'c [TransitionConstraint<F>],
    trace: &ExecutionTrace<F>,
) -> Vec<(usize, &'c str)> {
    trace
        .rows()
        .windows(2)
        .enumerate()
        .flat_map(|(row, pair)| {
            let x = F::from(row as u64);
            constraints
                .iter()
                .filter(move |c| !c.evaluate(x, &pair[0], &pair[1]).is_zero())
                .map(move |c| (row, c.name.as_str()))
        })
        .collect()
}

/// Boundary constraints the trace does not satisfy.
pub fn boundary_violations<'c, F: PrimeField>(
    constraints: &'c [BoundaryConstraint<F>],
    trace: &ExecutionTrace<F>,
) -> Vec<&'c BoundaryConstraint<F>> {
    constraints.iter().filter(|c| !c.is_satisfied(trace)).collect()
}

/// True when every boundary and transition constraint holds on `trace`.
pub fn is_satisfied<F: PrimeField>(
    transition: &[TransitionConstraint<F>],
    boundary: &[BoundaryConstraint<F>],
    trace: &ExecutionTrace<F>,
) -> bool {
    boundary_violations(boundary, trace).is_empty()
        && transition_violations(transition, trace).is_empty()
}
