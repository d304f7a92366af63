//! Basic polynomial operations over finite fields.

use ark_ff::Field;
use ark_poly::univariate::DensePolynomial;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Polynomial with finite field coefficients.
///
/// The polynomial is stored as a vector of coefficients, where the index represents
/// the power of x. For example, [1, 2, 3] represents 3x² + 2x + 1.
///
/// # Invariants
///
/// * The coefficients vector has no trailing zeros
/// * The zero polynomial has an empty coefficient vector
pub struct Polynomial<F: Field> {
    /// Coefficients in ascending order of power.
    pub coefficients: Vec<F>,
}

impl<F: Field> Polynomial<F> {
    /// Creates a new polynomial from coefficients.
    ///
    /// Any trailing zeros in the coefficients vector are removed.
    pub fn new(mut coefficients: Vec<F>) -> Self {
        while coefficients.last().is_some_and(|x| x.is_zero()) {
            coefficients.pop();
        }
        Self { coefficients }
    }

    /// Creates the zero polynomial.
    pub fn zero() -> Self {
        Self::new(vec![])
    }

    pub fn constant(value: F) -> Self {
        Self::new(vec![value])
    }

    /// The monomial `X`.
    pub fn x() -> Self {
        Self::new(vec![F::zero(), F::one()])
    }

    /// Returns the degree of the polynomial.
    ///
    /// For the zero polynomial, the degree is 0.
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Returns the coefficient of the highest power term, 0 for the zero polynomial.
    pub fn leading_coefficient(&self) -> F {
        self.coefficients.last().copied().unwrap_or(F::zero())
    }

    /// Checks if the polynomial is zero.
    pub fn is_zero(&self) -> bool {
        self.coefficients.iter().all(|c| c.is_zero())
    }

    /// Divides this polynomial by another, returns (quotient, remainder).
    ///
    /// # Returns
    ///
    /// `None` if the divisor is the zero polynomial.
    ///
    /// # Details
    ///
    /// Standard long division over the field. The remainder has degree
    /// less than the divisor.
    pub fn divide(&self, divisor: &Polynomial<F>) -> Option<(Polynomial<F>, Polynomial<F>)> {
        if divisor.is_zero() {
            return None;
        }

        let divisor_degree = divisor.degree();
        if self.coefficients.len() <= divisor_degree {
            return Some((Polynomial::zero(), self.clone()));
        }

        let dividend_degree = self.degree();
        let lead_inv = divisor.leading_coefficient().inverse()?;
        let mut quotient = vec![F::zero(); dividend_degree - divisor_degree + 1];
        let mut remainder = self.coefficients.clone();

        for i in (0..=dividend_degree - divisor_degree).rev() {
            let leading_coeff = remainder[i + divisor_degree];
            if leading_coeff.is_zero() {
                continue;
            }

            quotient[i] = leading_coeff * lead_inv;
            for (j, d) in divisor.coefficients.iter().enumerate() {
                remainder[i + j] -= quotient[i] * d;
            }
        }

        Some((Polynomial::new(quotient), Polynomial::new(remainder)))
    }

    /// Adds two polynomials.
    pub fn add(&self, other: &Polynomial<F>) -> Polynomial<F> {
        let max_len = std::cmp::max(self.coefficients.len(), other.coefficients.len());
        let mut result = vec![F::zero(); max_len];

        for (i, coeff) in self.coefficients.iter().enumerate() {
            result[i] += coeff;
        }
        for (i, coeff) in other.coefficients.iter().enumerate() {
            result[i] += coeff;
        }

        Polynomial::new(result)
    }

    /// Subtracts `other` from this polynomial.
    pub fn sub(&self, other: &Polynomial<F>) -> Polynomial<F> {
        self.add(&other.scale(-F::one()))
    }

    /// Multiplies two polynomials.
    pub fn multiply(&self, other: &Polynomial<F>) -> Polynomial<F> {
        if self.coefficients.is_empty() || other.coefficients.is_empty() {
            return Polynomial::zero();
        }

        let mut result = vec![F::zero(); self.coefficients.len() + other.coefficients.len() - 1];
        for (i, a) in self.coefficients.iter().enumerate() {
            for (j, b) in other.coefficients.iter().enumerate() {
                result[i + j] += *a * b;
            }
        }

        Polynomial::new(result)
    }

    /// Multiplies every coefficient by `factor`.
    pub fn scale(&self, factor: F) -> Polynomial<F> {
        Polynomial::new(self.coefficients.iter().map(|c| *c * factor).collect())
    }

    /// Returns `p(offset · X)`, i.e. coefficient `i` multiplied by `offset^i`.
    ///
    /// Evaluating the result on a subgroup evaluates the original polynomial on
    /// the coset `offset · subgroup`.
    pub fn compose_scale(&self, offset: F) -> Polynomial<F> {
        let mut power = F::one();
        let coefficients = self
            .coefficients
            .iter()
            .map(|c| {
                let scaled = *c * power;
                power *= offset;
                scaled
            })
            .collect();
        Polynomial::new(coefficients)
    }

    /// Evaluates the polynomial at point x using Horner's method.
    pub fn evaluate(&self, x: F) -> F {
        self.coefficients
            .iter()
            .rev()
            .fold(F::zero(), |acc, coeff| acc * x + coeff)
    }

    /// Vanishing polynomial `Π (X - r)` over the given roots.
    pub fn zerofier(roots: &[F]) -> Polynomial<F> {
        roots.iter().fold(Polynomial::constant(F::one()), |acc, root| {
            acc.multiply(&Polynomial::new(vec![-*root, F::one()]))
        })
    }

    /// Lagrange interpolation through the points `(xs[i], ys[i])`.
    ///
    /// # Returns
    ///
    /// `None` if the slices differ in length or the `xs` are not distinct.
    pub fn lagrange_interpolate(xs: &[F], ys: &[F]) -> Option<Polynomial<F>> {
        if xs.len() != ys.len() {
            return None;
        }

        let mut result = Polynomial::zero();
        for (i, (&xi, &yi)) in xs.iter().zip(ys).enumerate() {
            let mut basis = Polynomial::constant(F::one());
            let mut denominator = F::one();
            for (j, &xj) in xs.iter().enumerate() {
                if i != j {
                    basis = basis.multiply(&Polynomial::new(vec![-xj, F::one()]));
                    denominator *= xi - xj;
                }
            }
            let weight = yi * denominator.inverse()?;
            result = result.add(&basis.scale(weight));
        }
        Some(result)
    }

    /// Creates a polynomial from an arkworks dense polynomial.
    pub fn from_dense_poly(poly: DensePolynomial<F>) -> Self {
        Self::new(poly.coeffs)
    }

    /// Returns polynomial coefficients.
    pub fn coefficients(&self) -> &[F] {
        &self.coefficients
    }
}

impl<F: Field> fmt::Display for Polynomial<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terms = Vec::new();
        for (i, coeff) in self.coefficients.iter().enumerate() {
            if !coeff.is_zero() {
                let term = match i {
                    0 => format!("{}", coeff),
                    1 => format!("{}x", coeff),
                    _ => format!("{}x^{}", coeff, i),
                };
                terms.push(term);
            }
        }

        if terms.is_empty() {
            write!(f, "0")
        } else {
            write!(f, "{}", terms.join(" + "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::Fr;
    use ark_ff::Zero;
    use ark_poly::{DenseUVPolynomial, EvaluationDomain, Evaluations, GeneralEvaluationDomain};

    fn poly(coeffs: &[u64]) -> Polynomial<Fr> {
        Polynomial::new(coeffs.iter().map(|&c| Fr::from(c)).collect())
    }

    #[test]
    fn division_with_remainder() {
        // (x^3 + 2x^2 + 3x + 4) / (x + 1) = x^2 + x + 2, remainder 2
        let (q, r) = poly(&[4, 3, 2, 1]).divide(&poly(&[1, 1])).unwrap();
        assert_eq!(q, poly(&[2, 1, 1]));
        assert_eq!(r, poly(&[2]));
    }

    #[test]
    fn division_by_zero_is_none() {
        assert!(poly(&[1, 2, 1]).divide(&Polynomial::zero()).is_none());
    }

    #[test]
    fn zerofier_vanishes_on_roots_only() {
        let roots = [Fr::from(3u64), Fr::from(7u64), Fr::from(11u64)];
        let z = Polynomial::zerofier(&roots);
        assert_eq!(z.degree(), 3);
        for root in roots {
            assert!(z.evaluate(root).is_zero());
        }
        assert!(!z.evaluate(Fr::from(4u64)).is_zero());
    }

    #[test]
    fn interpolation_passes_through_points() {
        let xs = [Fr::from(1u64), Fr::from(2u64), Fr::from(5u64)];
        let ys = [Fr::from(9u64), Fr::from(0u64), Fr::from(4u64)];
        let p = Polynomial::lagrange_interpolate(&xs, &ys).unwrap();
        assert!(p.degree() <= 2);
        for (x, y) in xs.iter().zip(ys) {
            assert_eq!(p.evaluate(*x), y);
        }
    }

    #[test]
    fn interpolation_rejects_repeated_points() {
        let xs = [Fr::from(1u64), Fr::from(1u64)];
        let ys = [Fr::from(2u64), Fr::from(3u64)];
        assert!(Polynomial::lagrange_interpolate(&xs, &ys).is_none());
    }

    #[test]
    fn dense_poly_keeps_coefficients() {
        let dense =
            DensePolynomial::from_coefficients_vec(vec![Fr::from(4u64), Fr::zero(), Fr::from(2u64)]);
        assert_eq!(Polynomial::from_dense_poly(dense), poly(&[4, 0, 2]));

        let domain = GeneralEvaluationDomain::<Fr>::new(4).unwrap();
        let p = poly(&[1, 2, 3]);
        let values: Vec<Fr> = domain.elements().map(|x| p.evaluate(x)).collect();
        let interpolated = Evaluations::from_vec_and_domain(values, domain).interpolate();
        assert_eq!(Polynomial::from_dense_poly(interpolated), p);
    }

    #[test]
    fn compose_scale_matches_shifted_evaluation() {
        let p = poly(&[5, 0, 3, 1]);
        let offset = Fr::from(7u64);
        let x = Fr::from(13u64);
        assert_eq!(p.compose_scale(offset).evaluate(x), p.evaluate(offset * x));
    }
}
