//! Composition of boundary and transition quotients.
//!
//! Prover and verifier evaluate the same combination
//! `sum_k w_2k * q_k(x) + w_2k+1 * x^(D - d_k) * q_k(x)` at FRI domain points,
//! where `q_k` are the quotients, `d_k` their degree bounds and `D` the
//! maximum degree the FRI domain admits. The prover does it on every point,
//! the verifier on the opened ones.

use std::collections::BTreeMap;

use ark_ff::PrimeField;

use crate::error::{AttestError, Result};
use crate::hash::AlgebraicHasher;
use crate::math::polynomial::Polynomial;
use crate::vm::constraints::{BoundaryConstraint, TransitionConstraint};

/// Boundary points of one register, interpolated over the trace domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryTerm<F: PrimeField> {
    /// Vanishes on the constrained rows
    pub zerofier: Polynomial<F>,
    /// Takes the constrained values on those rows
    pub interpolant: Polynomial<F>,
    /// Degree bound of `(T(X) - I(X)) / Z(X)`
    pub bound: usize,
}

/// One boundary term per register.
///
/// # Arguments
///
/// * `boundary` - The boundary constraints
/// * `num_registers` - Trace width
/// * `omega` - Generator of the trace domain
/// * `trace_length` - Padded trace length, a power of two
///
/// # Errors
///
/// * [`AttestError::ConflictingBoundary`] if a cell is pinned to two values
/// * [`AttestError::InvalidConfig`] if a constraint lies outside the trace
pub fn boundary_terms<F: PrimeField>(
    boundary: &[BoundaryConstraint<F>],
    num_registers: usize,
    omega: F,
    trace_length: usize,
) -> Result<Vec<BoundaryTerm<F>>> {
    let mut points: Vec<BTreeMap<usize, F>> = vec![BTreeMap::new(); num_registers];
    for c in boundary {
        if c.register >= num_registers || c.row >= trace_length {
            return Err(AttestError::InvalidConfig(format!(
                "boundary constraint ({}, {}) outside a {trace_length} x {num_registers} trace",
                c.row, c.register
            )));
        }
        match points[c.register].insert(c.row, c.value) {
            Some(previous) if previous != c.value => {
                return Err(AttestError::ConflictingBoundary {
                    row: c.row,
                    register: c.register,
                });
            }
            _ => {}
        }
    }

    points
        .into_iter()
        .map(|register_points| {
            let xs: Vec<F> = register_points
                .keys()
                .map(|&row| omega.pow([row as u64]))
                .collect();
            let ys: Vec<F> = register_points.values().copied().collect();
            let interpolant = Polynomial::lagrange_interpolate(&xs, &ys).ok_or_else(|| {
                AttestError::InvalidConfig("trace domain points are not distinct".into())
            })?;
            Ok(BoundaryTerm {
                zerofier: Polynomial::zerofier(&xs),
                interpolant,
                bound: trace_length.saturating_sub(1 + xs.len()),
            })
        })
        .collect()
}

/// Degree bound of each transition quotient for a trace of `trace_length`
/// padded rows, `num_cycles` of which are real.
pub fn transition_bounds<F: PrimeField>(
    transition: &[TransitionConstraint<F>],
    num_registers: usize,
    trace_length: usize,
    num_cycles: usize,
) -> Vec<usize> {
    let mut max_degrees = vec![trace_length.saturating_sub(1); 1 + 2 * num_registers];
    max_degrees[0] = 1;
    transition
        .iter()
        .map(|c| {
            c.polynomial
                .symbolic_degree_bound(&max_degrees)
                .saturating_sub(num_cycles.saturating_sub(1))
        })
        .collect()
}

/// Weighted, degree-adjusted sum of all quotients.
#[derive(Debug)]
pub struct Composition<'a, F: PrimeField> {
    transition: &'a [TransitionConstraint<F>],
    transition_bounds: Vec<usize>,
    boundary: Vec<BoundaryTerm<F>>,
    weights: Vec<F>,
    max_degree: usize,
}

impl<'a, F: PrimeField> Composition<'a, F> {
    /// Number of weights a composition over these constraints draws.
    pub fn num_weights(transition: usize, registers: usize) -> usize {
        2 * (transition + registers)
    }

    /// # Errors
    ///
    /// [`AttestError::InvalidConfig`] if the weight count is wrong or a
    /// quotient bound exceeds `max_degree`.
    pub fn new(
        transition: &'a [TransitionConstraint<F>],
        transition_bounds: Vec<usize>,
        boundary: Vec<BoundaryTerm<F>>,
        weights: Vec<F>,
        max_degree: usize,
    ) -> Result<Self> {
        if weights.len() != Self::num_weights(transition.len(), boundary.len()) {
            return Err(AttestError::InvalidConfig(format!(
                "expected {} composition weights, got {}",
                Self::num_weights(transition.len(), boundary.len()),
                weights.len()
            )));
        }
        let worst = transition_bounds
            .iter()
            .chain(boundary.iter().map(|b| &b.bound))
            .copied()
            .max()
            .unwrap_or(0);
        if worst > max_degree {
            return Err(AttestError::InvalidConfig(format!(
                "quotient degree {worst} exceeds the FRI bound {max_degree}"
            )));
        }
        Ok(Self {
            transition,
            transition_bounds,
            boundary,
            weights,
            max_degree,
        })
    }

    /// Evaluates the combination at `x`.
    ///
    /// # Arguments
    ///
    /// * `x` - FRI domain point
    /// * `row` - Trace polynomials at `x`
    /// * `next_row` - Trace polynomials at `omega * x`
    /// * `zerofier` - Transition zerofier at `x`
    ///
    /// # Returns
    ///
    /// `None` if `x` is a root of a zerofier.
    pub fn evaluate(&self, x: F, row: &[F], next_row: &[F], zerofier: F) -> Option<F> {
        let zerofier_inv = zerofier.inverse()?;
        let transition = self
            .transition
            .iter()
            .zip(&self.transition_bounds)
            .map(|(c, &bound)| Some((c.evaluate(x, row, next_row) * zerofier_inv, bound)));
        let boundary = self.boundary.iter().enumerate().map(|(register, term)| {
            let numerator = *row.get(register)? - term.interpolant.evaluate(x);
            Some((numerator * term.zerofier.evaluate(x).inverse()?, term.bound))
        });

        let mut acc = F::zero();
        for (k, quotient) in transition.chain(boundary).enumerate() {
            let (q, bound) = quotient?;
            let shift = x.pow([(self.max_degree - bound) as u64]);
            acc += self.weights[2 * k] * q + self.weights[2 * k + 1] * shift * q;
        }
        Some(acc)
    }
}

/// Algebraic-hash commitment to an AIR: every transition term and every
/// boundary triple.
pub fn air_fingerprint<F: PrimeField>(
    transition: &[TransitionConstraint<F>],
    boundary: &[BoundaryConstraint<F>],
    hasher: &AlgebraicHasher<F>,
) -> F {
    let mut inputs = vec![F::from(transition.len() as u64)];
    for c in transition {
        inputs.push(F::from(c.polynomial.num_terms() as u64));
        for (exponents, coeff) in c.polynomial.terms() {
            inputs.push(F::from(exponents.len() as u64));
            inputs.extend(exponents.iter().map(|&e| F::from(e as u64)));
            inputs.push(*coeff);
        }
    }
    inputs.push(F::from(boundary.len() as u64));
    for c in boundary {
        inputs.extend([F::from(c.row as u64), F::from(c.register as u64), c.value]);
    }
    hasher.hash_many(&inputs)
}
