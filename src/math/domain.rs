//! Evaluation domains and coset FFTs.

use ark_ff::FftField;
use ark_poly::{EvaluationDomain, GeneralEvaluationDomain};

use crate::error::{AttestError, Result};
use crate::math::polynomial::Polynomial;

/// Squares the first half of a domain, giving the domain of the next FRI layer.
pub fn fold_domain_points<F: FftField>(domain_points: &[F]) -> Vec<F> {
    domain_points
        .iter()
        .take(domain_points.len() / 2)
        .map(|&x| x * x)
        .collect()
}

/// Multiplicative subgroup of the given power-of-two size.
pub fn get_domain<F: FftField>(domain_size: usize) -> Result<GeneralEvaluationDomain<F>> {
    GeneralEvaluationDomain::<F>::new(domain_size)
        .filter(|domain| domain.size() == domain_size)
        .ok_or_else(|| {
            AttestError::InvalidConfig(format!("no evaluation domain of size {domain_size}"))
        })
}

/// Points `offset * ω^i` of the coset.
pub fn coset_points<F: FftField>(domain: &GeneralEvaluationDomain<F>, offset: F) -> Vec<F> {
    domain.elements().map(|w| offset * w).collect()
}

/// Evaluates `poly` on the coset `offset * domain`.
///
/// Coefficients of degree at least the domain size wrap around, since
/// `ω^size = 1`; the result is exact for any degree.
pub fn coset_evaluate<F: FftField>(
    poly: &Polynomial<F>,
    domain: &GeneralEvaluationDomain<F>,
    offset: F,
) -> Vec<F> {
    let size = domain.size();
    let mut coeffs = vec![F::zero(); size];
    for (i, c) in poly.compose_scale(offset).coefficients().iter().enumerate() {
        coeffs[i % size] += c;
    }
    domain.fft(&coeffs)
}

/// Interpolates the unique polynomial of degree below the domain size that
/// takes `values` on the coset `offset * domain`.
pub fn coset_interpolate<F: FftField>(
    values: &[F],
    domain: &GeneralEvaluationDomain<F>,
    offset: F,
) -> Polynomial<F> {
    let coeffs = domain.ifft(values);
    let offset_inv = offset.inverse().unwrap_or(F::one());
    Polynomial::new(coeffs).compose_scale(offset_inv)
}
