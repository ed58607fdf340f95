//! Traits for operating on Groups and Elliptic Curves.

use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

/// Element represents an element of a group with the additive notation
/// which is also equipped with a multiplication transformation.
/// Two implementations are for Scalar which forms a ring so RHS is the same
/// and Point which can be multiplied by a scalar of its prime field.
pub trait Element:
    Clone + Display + Debug + Eq + Serialize + for<'a> Deserialize<'a> + PartialEq + Send + Sync
{
    /// The right-hand-side argument for multiplication
    type RHS;

    /// Returns the zero element of the group
    fn new() -> Self;

    /// Returns the one element of the group
    fn one() -> Self;

    /// Adds the RHS  element to the LHS element in place
    fn add(&mut self, s2: &Self);

    /// Multiplies the LHS element by the RHS element in place
    fn mul(&mut self, mul: &Self::RHS);

    /// Samples a random element using the provided RNG
    fn rand<R: RngCore>(rng: &mut R) -> Self;

    /// Returns the zero element of the group
    fn zero() -> Self {
        Self::new()
    }
}

/// Checks inclusion in prime order subgroup. Only needed when underlying trait
/// does not enforce this already
pub trait PrimeOrder: Element {
    /// Checks the provided element is in the correct prime-order subgroup
    fn in_correct_subgroup(&self) -> bool;
}

/// Scalar can be multiplied by only a Scalar, no other elements.
pub trait Scalar: Element {
    fn set_int(&mut self, i: u64);
    fn inverse(&self) -> Option<Self>;
    fn negate(&mut self);
    fn sub(&mut self, other: &Self);

    /// Reduces a digest (interpreted little-endian) modulo the group order.
    /// Used to derive Fiat-Shamir challenges.
    fn from_digest(digest: &[u8]) -> Self;
}

/// Basic point functionality that can be multiplied by a scalar
pub trait Point: PrimeOrder {
    /// Error which may occur while mapping to the group
    type Error: Debug;

    /// Maps the provided data to a group element whose discrete log relative
    /// to the generator is unknown
    fn map(&mut self, data: &[u8]) -> Result<(), <Self as Point>::Error>;

    /// Checks that the point satisfies the curve equation
    fn is_on_curve(&self) -> bool;
}

/// A group holds functionalities to create scalar and points related; it is
/// similar to the Engine definition, just much more simpler.
pub trait Curve: Clone + Debug + Send + Sync + 'static {
    /// The curve's scalar
    type Scalar: Scalar<RHS = Self::Scalar>;

    /// The curve's point
    type Point: Point<RHS = Self::Scalar>;

    /// scalar returns the identity element of the field.
    fn scalar() -> Self::Scalar {
        Self::Scalar::new()
    }

    /// point returns the default additive generator of the group (`g`).
    fn point() -> Self::Point {
        Self::Point::one()
    }

    /// Returns the second generator `h` used by Pedersen commitments. Nobody
    /// knows its discrete log with respect to `point()`.
    fn blinding_point() -> Self::Point;
}

/// Returns `g * s`
pub fn mul_generator<C: Curve>(s: &C::Scalar) -> C::Point {
    let mut p = C::point();
    p.mul(s);
    p
}

/// Returns the Pedersen commitment `g * a + h * b`
pub fn pedersen<C: Curve>(a: &C::Scalar, b: &C::Scalar) -> C::Point {
    let mut commitment = mul_generator::<C>(a);
    let mut blinding = C::blinding_point();
    blinding.mul(b);
    commitment.add(&blinding);
    commitment
}
