#[cfg(test)]
mod tests {
    use ark_bls12_381::Fr;
    use ark_ff::{FftField, UniformRand, Zero};
    use ark_poly::EvaluationDomain;
    use ark_std::test_rng;
    use cfa_stark::math::{
        domain::{coset_evaluate, coset_points, fold_domain_points, get_domain},
        fri::{Fri, fri_fold},
        polynomial::Polynomial,
    };
    use cfa_stark::transcript::FiatShamirTranscript;

    fn random_poly(degree: usize) -> Polynomial<Fr> {
        let mut rng = test_rng();
        Polynomial::new((0..=degree).map(|_| Fr::rand(&mut rng)).collect())
    }

    fn fri(domain_length: usize, num_queries: usize) -> Fri<Fr> {
        let omega = get_domain::<Fr>(domain_length).unwrap().group_gen();
        Fri::new(Fr::GENERATOR, omega, domain_length, 4, num_queries)
    }

    fn codeword(poly: &Polynomial<Fr>, domain_length: usize) -> Vec<Fr> {
        coset_evaluate(poly, &get_domain(domain_length).unwrap(), Fr::GENERATOR)
    }

    #[test]
    fn test_polynomial_division() {
        // (x^3 + 2x^2 + 3x + 4) / (x + 1)
        let dividend = Polynomial::new(vec![
            Fr::from(4u64),
            Fr::from(3u64),
            Fr::from(2u64),
            Fr::from(1u64),
        ]);
        let divisor = Polynomial::new(vec![Fr::from(1u64), Fr::from(1u64)]);
        let (quotient, remainder) = dividend.divide(&divisor).unwrap();
        assert_eq!(
            quotient.coefficients(),
            &[Fr::from(2u64), Fr::from(1u64), Fr::from(1u64)]
        );
        assert_eq!(remainder, Polynomial::constant(Fr::from(2u64)));
    }

    #[test]
    fn test_polynomial_division_zero() {
        let dividend = Polynomial::new(vec![Fr::from(1u64), Fr::from(2u64), Fr::from(1u64)]);
        assert!(dividend.divide(&Polynomial::zero()).is_none());
    }

    #[test]
    fn test_polynomial_multiplication() {
        let p1 = Polynomial::new(vec![Fr::from(1u64), Fr::from(2u64)]); // 2x + 1
        let p2 = Polynomial::new(vec![Fr::from(3u64), Fr::from(4u64)]); // 4x + 3
        let product = p1.multiply(&p2);
        assert_eq!(
            product.coefficients(),
            &[Fr::from(3u64), Fr::from(10u64), Fr::from(8u64)]
        );
        assert!(p1.multiply(&Polynomial::zero()).is_zero());
    }

    #[test]
    fn test_fri_folding() {
        let domain = get_domain::<Fr>(8).unwrap();
        let offset = Fr::GENERATOR;
        let poly = random_poly(5);
        let evals = coset_evaluate(&poly, &domain, offset);
        let xs = coset_points(&domain, offset);

        let beta = Fr::rand(&mut test_rng());
        let folded = fri_fold(&evals, &xs[..4], beta).unwrap();

        // the folded codeword is a degree <= 2 polynomial on the squared coset
        let folded_points = fold_domain_points(&xs);
        let interpolant = Polynomial::lagrange_interpolate(&folded_points[..3], &folded[..3]).unwrap();
        assert!(interpolant.degree() <= 2);
        assert_eq!(interpolant.evaluate(folded_points[3]), folded[3]);
    }

    #[test]
    fn test_fri_accepts_low_degree_codeword() {
        let fri = fri(512, 16);
        let poly = random_poly(127);

        let mut transcript = FiatShamirTranscript::new();
        let (proof, positions) = fri.prove(codeword(&poly, 512), &mut transcript).unwrap();
        assert_eq!(proof.roots.len(), fri.num_rounds());

        let mut transcript = FiatShamirTranscript::new();
        let opened = fri.verify(&proof, &mut transcript).unwrap();
        let opened_positions: Vec<usize> = opened.iter().map(|(p, _)| *p).collect();
        assert_eq!(opened_positions, positions);

        let points = coset_points(&get_domain::<Fr>(512).unwrap(), Fr::GENERATOR);
        for (position, value) in opened {
            assert_eq!(poly.evaluate(points[position]), value);
        }
    }

    #[test]
    fn test_fri_rejects_high_degree_codeword() {
        let fri = fri(512, 16);
        let poly = random_poly(300);

        let mut transcript = FiatShamirTranscript::new();
        let (proof, _) = fri.prove(codeword(&poly, 512), &mut transcript).unwrap();
        let mut transcript = FiatShamirTranscript::new();
        assert!(fri.verify(&proof, &mut transcript).is_none());
    }

    #[test]
    fn test_fri_rejects_other_transcript() {
        let fri = fri(512, 16);
        let poly = random_poly(127);

        let mut transcript = FiatShamirTranscript::new();
        let (proof, _) = fri.prove(codeword(&poly, 512), &mut transcript).unwrap();

        let mut transcript = FiatShamirTranscript::<Fr>::new();
        transcript.absorb(b"another statement");
        // the challenges move, so the committed folds no longer agree
        assert!(fri.verify(&proof, &mut transcript).is_none());
    }

    #[test]
    fn test_fri_rejects_wrong_length() {
        let fri = fri(64, 4);
        let mut transcript = FiatShamirTranscript::new();
        assert!(fri.prove(vec![Fr::zero(); 32], &mut transcript).is_err());
    }
}
