//! Sparse multivariate polynomials.
//!
//! Transition constraints are polynomials in `1 + 2R` variables: the cycle
//! index `x`, the registers of the current row and the registers of the next
//! row. They are stored as a map from exponent vectors to coefficients.

use std::collections::BTreeMap;
use std::ops::{Add, Mul, Neg, Sub};

use ark_ff::Field;

use crate::math::polynomial::Polynomial;

/// Multivariate polynomial over `F`.
///
/// # Invariants
///
/// * No stored coefficient is zero
/// * Exponent vectors carry no trailing zeros, so equal monomials compare equal
///   regardless of the number of variables they were built with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MPolynomial<F: Field> {
    terms: BTreeMap<Vec<usize>, F>,
}

fn trim(mut exponents: Vec<usize>) -> Vec<usize> {
    while exponents.last() == Some(&0) {
        exponents.pop();
    }
    exponents
}

impl<F: Field> MPolynomial<F> {
    pub fn zero() -> Self {
        Self {
            terms: BTreeMap::new(),
        }
    }

    pub fn constant(value: F) -> Self {
        let mut poly = Self::zero();
        poly.insert(Vec::new(), value);
        poly
    }

    /// The monomial `variables[index]`.
    pub fn variable(index: usize) -> Self {
        let mut exponents = vec![0; index + 1];
        exponents[index] = 1;
        let mut poly = Self::zero();
        poly.insert(exponents, F::one());
        poly
    }

    /// The `count` variables `X_0, ..., X_{count-1}`.
    pub fn variables(count: usize) -> Vec<Self> {
        (0..count).map(Self::variable).collect()
    }

    /// Embeds a univariate polynomial as a polynomial in variable `index`.
    pub fn lift(poly: &Polynomial<F>, index: usize) -> Self {
        let x = Self::variable(index);
        poly.coefficients()
            .iter()
            .rev()
            .fold(Self::zero(), |acc, coeff| &(&acc * &x) + &Self::constant(*coeff))
    }

    fn insert(&mut self, exponents: Vec<usize>, coeff: F) {
        let key = trim(exponents);
        let sum = self.terms.get(&key).copied().unwrap_or(F::zero()) + coeff;
        if sum.is_zero() {
            self.terms.remove(&key);
        } else {
            self.terms.insert(key, sum);
        }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// `(exponents, coefficient)` pairs in a canonical order.
    pub fn terms(&self) -> impl Iterator<Item = (&[usize], &F)> + '_ {
        self.terms.iter().map(|(exponents, coeff)| (exponents.as_slice(), coeff))
    }

    /// Number of non-zero terms.
    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Total degree; 0 for constants and the zero polynomial.
    pub fn degree(&self) -> usize {
        self.terms
            .keys()
            .map(|exponents| exponents.iter().sum())
            .max()
            .unwrap_or(0)
    }

    /// Largest variable index used, plus one.
    pub fn num_variables(&self) -> usize {
        self.terms.keys().map(Vec::len).max().unwrap_or(0)
    }

    /// Degree of the univariate polynomial obtained by substituting, for each
    /// variable `i`, a polynomial of degree `max_degrees[i]`.
    ///
    /// Variables beyond `max_degrees` count as degree 0.
    pub fn symbolic_degree_bound(&self, max_degrees: &[usize]) -> usize {
        self.terms
            .keys()
            .map(|exponents| {
                exponents
                    .iter()
                    .zip(max_degrees)
                    .map(|(e, d)| e * d)
                    .sum::<usize>()
            })
            .max()
            .unwrap_or(0)
    }

    /// Evaluates at `point`. Missing coordinates are treated as zero.
    pub fn evaluate(&self, point: &[F]) -> F {
        self.terms
            .iter()
            .map(|(exponents, coeff)| {
                exponents
                    .iter()
                    .enumerate()
                    .fold(*coeff, |acc, (i, &e)| {
                        let base = point.get(i).copied().unwrap_or(F::zero());
                        acc * base.pow([e as u64])
                    })
            })
            .sum()
    }

    /// Product of `factors`; the constant one for an empty slice.
    pub fn product(factors: &[Self]) -> Self {
        factors
            .iter()
            .fold(Self::constant(F::one()), |acc, factor| &acc * factor)
    }

    /// Multiplies every coefficient by `factor`.
    pub fn scale(&self, factor: F) -> Self {
        let mut out = Self::zero();
        for (exponents, coeff) in &self.terms {
            out.insert(exponents.clone(), *coeff * factor);
        }
        out
    }
}

impl<F: Field> Add for &MPolynomial<F> {
    type Output = MPolynomial<F>;

    fn add(self, rhs: Self) -> MPolynomial<F> {
        let mut out = self.clone();
        for (exponents, coeff) in &rhs.terms {
            out.insert(exponents.clone(), *coeff);
        }
        out
    }
}

impl<F: Field> Sub for &MPolynomial<F> {
    type Output = MPolynomial<F>;

    fn sub(self, rhs: Self) -> MPolynomial<F> {
        self + &(-rhs)
    }
}

impl<F: Field> Neg for &MPolynomial<F> {
    type Output = MPolynomial<F>;

    fn neg(self) -> MPolynomial<F> {
        self.scale(-F::one())
    }
}

impl<F: Field> Mul for &MPolynomial<F> {
    type Output = MPolynomial<F>;

    fn mul(self, rhs: Self) -> MPolynomial<F> {
        let mut out = MPolynomial::zero();
        for (lhs_exp, lhs_coeff) in &self.terms {
            for (rhs_exp, rhs_coeff) in &rhs.terms {
                let len = lhs_exp.len().max(rhs_exp.len());
                let exponents = (0..len)
                    .map(|i| lhs_exp.get(i).unwrap_or(&0) + rhs_exp.get(i).unwrap_or(&0))
                    .collect();
                out.insert(exponents, *lhs_coeff * rhs_coeff);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::Fr;
    use ark_ff::{One, UniformRand};
    use ark_std::test_rng;

    #[test]
    fn arithmetic_matches_pointwise_evaluation() {
        let mut rng = test_rng();
        let v = MPolynomial::<Fr>::variables(3);
        // (x0 - x1) * (x2 + 3) - x0^2
        let three = MPolynomial::constant(Fr::from(3u64));
        let p = &(&(&v[0] - &v[1]) * &(&v[2] + &three)) - &(&v[0] * &v[0]);

        let point: Vec<Fr> = (0..3).map(|_| Fr::rand(&mut rng)).collect();
        let expected =
            (point[0] - point[1]) * (point[2] + Fr::from(3u64)) - point[0] * point[0];
        assert_eq!(p.evaluate(&point), expected);
        assert_eq!(p.degree(), 2);
    }

    #[test]
    fn cancellation_drops_terms() {
        let v = MPolynomial::<Fr>::variables(2);
        let p = &(&v[0] + &v[1]) - &v[1];
        assert_eq!(p, v[0]);
        assert!((&p - &v[0]).is_zero());
    }

    #[test]
    fn lift_agrees_with_univariate_evaluation() {
        let u = Polynomial::new(vec![Fr::from(2u64), Fr::from(0u64), Fr::from(5u64)]);
        let lifted = MPolynomial::lift(&u, 2);
        let point = [Fr::from(9u64), Fr::from(8u64), Fr::from(7u64)];
        assert_eq!(lifted.evaluate(&point), u.evaluate(Fr::from(7u64)));
        assert_eq!(lifted.num_variables(), 3);
    }

    #[test]
    fn symbolic_degree_bound_weights_each_variable() {
        let v = MPolynomial::<Fr>::variables(3);
        // x0 * x1^2 + x2
        let p = &(&v[0] * &(&v[1] * &v[1])) + &v[2];
        assert_eq!(p.symbolic_degree_bound(&[1, 7, 7]), 1 + 14);
        assert_eq!(p.symbolic_degree_bound(&[0, 7, 20]), 20);
    }

    #[test]
    fn empty_product_is_one() {
        let p = MPolynomial::<Fr>::product(&[]);
        assert_eq!(p, MPolynomial::constant(Fr::one()));
        assert_eq!(p.degree(), 0);
    }
}
