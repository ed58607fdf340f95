use crate::group::{Curve, Element, Point, Scalar};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub type PrivatePoly<C> = Poly<<C as Curve>::Scalar>;
pub type PublicPoly<C> = Poly<<C as Curve>::Point>;

pub type Idx = u32;

/// An evaluation of a polynomial at `x = index + 1`. For scalar polynomials
/// this is a Shamir share, for point polynomials a share public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eval<A> {
    pub value: A,
    pub index: Idx,
}

/// A polynomial with coefficients in `C`, evaluated at scalars. Scalar
/// coefficients give secret polynomials, point coefficients give their
/// commitments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poly<C>(Vec<C>);

impl<C> Poly<C> {
    pub fn degree(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Returns the number of coefficients
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the coefficients, free coefficient first
    pub fn coefficients(&self) -> &[C] {
        &self.0
    }

    /// Returns the free coefficient. For a secret polynomial this is the
    /// dealt secret, for a commitment polynomial its commitment.
    pub fn public_key(&self) -> &C {
        &self.0[0]
    }
}

impl<C: Element> Poly<C> {
    /// Samples `degree + 1` random coefficients from `rng`. Any `degree + 1`
    /// evaluations determine the polynomial.
    pub fn new_from<R: RngCore>(degree: usize, rng: &mut R) -> Self {
        Self((0..=degree).map(|_| C::rand(rng)).collect())
    }

    /// Same as `new_from` with the thread-local RNG
    pub fn new(degree: usize) -> Self {
        Self::new_from(degree, &mut rand::thread_rng())
    }

    /// Adds `other` coefficient-wise, growing `self` if needed
    pub fn add(&mut self, other: &Self) {
        if self.0.len() < other.0.len() {
            self.0.resize(other.0.len(), C::zero())
        }
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            a.add(b);
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolyError {
    #[error("Invalid recovery: only has {0}/{1} shares")]
    InvalidRecovery(usize, usize),
    #[error("Could not invert scalar")]
    NoInverse,
}

/// Returns the x-coordinate the share of `index` is evaluated at. It is
/// never zero, `f(0)` is the secret.
pub fn x_coordinate<X: Scalar>(index: Idx) -> X {
    let mut x = X::new();
    x.set_int(u64::from(index) + 1);
    x
}

impl<C> Poly<C>
where
    C: Element,
    C::RHS: Scalar<RHS = C::RHS>,
{
    /// Evaluates the polynomial at `x = i + 1` with Horner's rule
    pub fn eval(&self, i: Idx) -> Eval<C> {
        let x = x_coordinate::<C::RHS>(i);
        let value = self.0.iter().rev().fold(C::zero(), |mut acc, coeff| {
            acc.mul(&x);
            acc.add(coeff);
            acc
        });

        Eval { value, index: i }
    }

    /// Recovers the free coefficient from `t` evaluations of distinct indices
    pub fn recover(t: usize, shares: Vec<Eval<C>>) -> Result<C, PolyError> {
        Self::interpolate_at(t, shares, &C::RHS::zero())
    }

    /// Lagrange interpolation at `x` from the `t` evaluations with the lowest
    /// indices. Works on scalar evaluations as well as on point evaluations,
    /// in which case the interpolation happens in the exponent.
    pub fn interpolate_at(t: usize, shares: Vec<Eval<C>>, x: &C::RHS) -> Result<C, PolyError> {
        let points = Self::share_map(t, shares)?;

        let mut acc = C::zero();
        for (i, (xi, yi)) in &points {
            // l_i(x) = prod_{j != i} (x - x_j) / (x_i - x_j)
            let mut num = C::RHS::one();
            let mut den = C::RHS::one();
            for (_, (xj, _)) in points.iter().filter(|(j, _)| *j != i) {
                let mut diff = x.clone();
                diff.sub(xj);
                num.mul(&diff);

                let mut diff = xi.clone();
                diff.sub(xj);
                den.mul(&diff);
            }
            num.mul(&den.inverse().ok_or(PolyError::NoInverse)?);

            let mut term = yi.clone();
            term.mul(&num);
            acc.add(&term);
        }

        Ok(acc)
    }

    /// Keeps the first `t` evaluations by index, each index counting once
    fn share_map(
        t: usize,
        mut shares: Vec<Eval<C>>,
    ) -> Result<BTreeMap<Idx, (C::RHS, C)>, PolyError> {
        shares.sort_by_key(|share| share.index);
        shares.dedup_by_key(|share| share.index);

        if shares.len() < t {
            return Err(PolyError::InvalidRecovery(shares.len(), t));
        }

        Ok(shares
            .into_iter()
            .take(t)
            .map(|share| (share.index, (x_coordinate(share.index), share.value)))
            .collect())
    }
}

impl<X: Scalar<RHS = X>> Poly<X> {
    /// Returns the polynomial of `base * a_j` for every coefficient `a_j`
    pub fn commit_with<P: Point<RHS = X>>(&self, base: &P) -> Poly<P> {
        Poly(
            self.0
                .iter()
                .map(|coeff| {
                    let mut commitment = base.clone();
                    commitment.mul(coeff);
                    commitment
                })
                .collect(),
        )
    }

    /// Commits to the generator of the group
    pub fn commit<P: Point<RHS = X>>(&self) -> Poly<P> {
        self.commit_with(&P::one())
    }
}

/// Computes the Pedersen commitment vector `C_j = g^{a_j} h^{b_j}` of two
/// secret polynomials.
pub fn pedersen_commit<C: Curve>(f1: &PrivatePoly<C>, f2: &PrivatePoly<C>) -> PublicPoly<C> {
    let mut commitments = f1.commit_with(&C::point());
    commitments.add(&f2.commit_with(&C::blinding_point()));
    commitments
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::curve::bls12377::{G1Curve, Scalar as Sc, G1};
    use crate::group::{mul_generator, pedersen};
    use proptest::prelude::*;

    #[test]
    fn poly_degree() {
        let p = Poly::<Sc>::new(5);
        assert_eq!(p.len(), 6);
        assert_eq!(p.degree(), 5);
    }

    proptest! {

    #[test]
    fn interpolation(degree in 0..20usize, num_evals in 0..20usize) {
        let poly = Poly::<Sc>::new(degree);
        let shares = (0..num_evals)
            .map(|i| poly.eval(i as Idx))
            .collect::<Vec<_>>();

        let recovered = Poly::<Sc>::recover(num_evals, shares).unwrap();

        // too few evaluations still interpolate, to the wrong value
        if num_evals > degree {
            prop_assert_eq!(poly.public_key(), &recovered);
        } else {
            prop_assert_ne!(poly.public_key(), &recovered);
        }
    }

    #[test]
    fn interpolation_at_share_index(degree in 0..10usize, target in 0..30u32) {
        let poly = Poly::<Sc>::new(degree);
        let threshold = degree + 1;

        // the shares right after the target, which is never among them
        let shares = (target + 1..target + 1 + threshold as Idx)
            .map(|i| poly.eval(i))
            .collect::<Vec<_>>();

        let x = x_coordinate::<Sc>(target);
        let computed = Poly::<Sc>::interpolate_at(threshold, shares, &x).unwrap();
        prop_assert_eq!(computed, poly.eval(target).value);
    }

    #[test]
    fn commitments_evaluate_in_the_exponent(degree in 0..10usize, idx in 0..100u32) {
        let poly = Poly::<Sc>::new(degree);
        let commitments = poly.commit::<G1>();
        prop_assert_eq!(
            commitments.eval(idx).value,
            mul_generator::<G1Curve>(&poly.eval(idx).value)
        );
    }

    }

    #[test]
    fn eval_matches_the_power_sum() {
        let poly = Poly::<Sc>::new(3);
        let x = x_coordinate::<Sc>(6);

        let mut expected = Sc::zero();
        let mut power = Sc::one();
        for coeff in poly.coefficients() {
            let mut term = *coeff;
            term.mul(&power);
            expected.add(&term);
            power.mul(&x);
        }

        assert_eq!(poly.eval(6).value, expected);
    }

    #[test]
    fn interpolation_insufficient_shares() {
        let poly = Poly::<Sc>::new(4);
        let shares = (0..4).map(|i| poly.eval(i)).collect::<Vec<_>>();

        assert_eq!(
            Poly::<Sc>::recover(5, shares).unwrap_err(),
            PolyError::InvalidRecovery(4, 5)
        );
    }

    #[test]
    fn duplicate_shares_do_not_count_twice() {
        let poly = Poly::<Sc>::new(2);
        let share = poly.eval(0);
        let shares = vec![share.clone(), share.clone(), share];

        assert_eq!(
            Poly::<Sc>::recover(3, shares).unwrap_err(),
            PolyError::InvalidRecovery(1, 3)
        );
    }

    #[test]
    fn exponent_interpolation() {
        let threshold = 4;
        let secret = Poly::<Sc>::new(threshold - 1);
        let public = secret.commit::<G1>();

        let shares = (3..3 + threshold as Idx)
            .map(|i| public.eval(i))
            .collect::<Vec<_>>();

        let recovered = Poly::<G1>::recover(threshold, shares).unwrap();
        assert_eq!(&recovered, public.public_key());
    }

    #[test]
    fn shorter_polynomials_are_padded_when_added() {
        let mut short = Poly::<Sc>::new(1);
        let long = Poly::<Sc>::new(3);
        let before = short.clone();
        short.add(&long);

        assert_eq!(short.len(), 4);
        for (i, coeff) in short.coefficients().iter().enumerate() {
            let mut expected = long.coefficients()[i];
            if let Some(c) = before.coefficients().get(i) {
                expected.add(c);
            }
            assert_eq!(coeff, &expected);
        }
    }

    #[test]
    fn pedersen_commitment_opens_at_every_share() {
        let f1 = Poly::<Sc>::new(2);
        let f2 = Poly::<Sc>::new(2);
        let commitments = pedersen_commit::<G1Curve>(&f1, &f2);

        for i in 0..5 {
            let s1 = f1.eval(i).value;
            let s2 = f2.eval(i).value;
            assert_eq!(commitments.eval(i).value, pedersen::<G1Curve>(&s1, &s2));
        }
    }
}
