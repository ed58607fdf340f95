//! # Threshold Primitives
//!
//! Group arithmetic, polynomials, encryption and proofs used to run an
//! asynchronous verifiable secret sharing based distributed key generation.
//!
//! ## Shamir sharing with Pedersen commitments
//!
//! ```rust
//! use threshold_primitives::{
//!     curve::bls12377::G1Curve,
//!     group::{pedersen, Curve},
//!     poly::{pedersen_commit, Idx, Poly},
//! };
//!
//! let (n, k) = (5, 3);
//! let f1 = Poly::<<G1Curve as Curve>::Scalar>::new(k - 1);
//! let f2 = Poly::<<G1Curve as Curve>::Scalar>::new(k - 1);
//!
//! // the commitment vector is public, the evaluations are sent privately
//! let commitments = pedersen_commit::<G1Curve>(&f1, &f2);
//! for i in 0..n as Idx {
//!     let (s1, s2) = (f1.eval(i).value, f2.eval(i).value);
//!     assert_eq!(commitments.eval(i).value, pedersen::<G1Curve>(&s1, &s2));
//! }
//!
//! // any k shares recover the secret
//! let shares = (0..k as Idx).map(|i| f1.eval(i)).collect();
//! let secret = Poly::recover(k, shares).unwrap();
//! assert_eq!(&secret, f1.public_key());
//! ```
//!
//! ### Supporting a new curve
//!
//! Curves are implemented in the [`curve`] module. A new curve must implement
//! the [`Curve`](group::Curve) trait, which requires its scalar field and group
//! to implement the `Scalar`, `Element` and `Point` traits, and must provide a
//! second generator for Pedersen commitments.

/// Curve implementations for the traits defined in the [`group`](group/index.html) module.
pub mod curve;

/// Public key encryption of shares
pub mod ecies;

/// Definitions of generic traits with scalars of prime fields and points on elliptic curves.
pub mod group;

/// Implementation of a polynomial suitable to be used for secret sharing schemes and DKG
/// protocols. It can evaluate and interpolate private and public shares to their corresponding
/// polynomial.
pub mod poly;

/// Zero-knowledge proof of a Pedersen commitment opening.
pub mod zkp;
