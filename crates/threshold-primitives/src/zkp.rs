//! Non-interactive proof of knowledge of the opening `(a0, b0)` of a Pedersen
//! commitment `C0 = g^{a0} h^{b0}`, which also reveals `A0 = g^{a0}`.
//!
//! Two Schnorr proofs (for `A0` over `g` and `B0 = h^{b0}` over `h`) share a
//! single Fiat-Shamir challenge that binds both generators, both revealed
//! values and both nonce commitments.
use crate::group::{Curve, Element, Scalar};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Domain separator for the challenge
const DOMAIN: &[u8] = b"avss-pedersen-opening-proof";

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("could not serialize the transcript: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("A0 + B0 does not match the committed constant term")]
    CommitmentMismatch,
    #[error("challenge does not match the transcript")]
    InvalidChallenge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PedersenProof<C: Curve> {
    /// `g^{a0}`
    pub public_a: C::Point,
    /// `h^{b0}`
    pub public_b: C::Point,
    pub challenge: C::Scalar,
    pub response_a: C::Scalar,
    pub response_b: C::Scalar,
}

impl<C: Curve> PedersenProof<C> {
    /// Proves knowledge of `a0` and `b0`
    pub fn prove<R: RngCore>(
        a0: &C::Scalar,
        b0: &C::Scalar,
        rng: &mut R,
    ) -> Result<Self, ProofError> {
        let g = C::point();
        let h = C::blinding_point();

        let public_a = mul(&g, a0);
        let public_b = mul(&h, b0);

        let r1 = C::Scalar::rand(rng);
        let r2 = C::Scalar::rand(rng);
        let nonce_a = mul(&g, &r1);
        let nonce_b = mul(&h, &r2);

        let challenge = challenge::<C>(&public_a, &public_b, &nonce_a, &nonce_b)?;

        // s = r - c * x
        let response = |r: &C::Scalar, x: &C::Scalar| {
            let mut cx = challenge.clone();
            cx.mul(x);
            let mut s = r.clone();
            s.sub(&cx);
            s
        };
        let response_a = response(&r1, a0);
        let response_b = response(&r2, b0);

        Ok(Self {
            public_a,
            public_b,
            challenge,
            response_a,
            response_b,
        })
    }

    /// Verifies the proof against the constant term `C0` of the prover's
    /// commitment vector
    pub fn verify(&self, commitment: &C::Point) -> Result<(), ProofError> {
        let mut sum = self.public_a.clone();
        sum.add(&self.public_b);
        if &sum != commitment {
            return Err(ProofError::CommitmentMismatch);
        }

        // R = base^s * X^c
        let nonce = |base: &C::Point, s: &C::Scalar, x: &C::Point| {
            let mut r = mul(base, s);
            r.add(&mul(x, &self.challenge));
            r
        };
        let nonce_a = nonce(&C::point(), &self.response_a, &self.public_a);
        let nonce_b = nonce(&C::blinding_point(), &self.response_b, &self.public_b);

        let expected = challenge::<C>(&self.public_a, &self.public_b, &nonce_a, &nonce_b)?;
        if expected != self.challenge {
            return Err(ProofError::InvalidChallenge);
        }

        Ok(())
    }
}

fn mul<P: Element>(base: &P, s: &P::RHS) -> P {
    let mut p = base.clone();
    p.mul(s);
    p
}

fn challenge<C: Curve>(
    public_a: &C::Point,
    public_b: &C::Point,
    nonce_a: &C::Point,
    nonce_b: &C::Point,
) -> Result<C::Scalar, ProofError> {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN);
    for p in [
        &C::point(),
        &C::blinding_point(),
        public_a,
        public_b,
        nonce_a,
        nonce_b,
    ] {
        hasher.update(bincode::serialize(p)?);
    }

    Ok(C::Scalar::from_digest(&hasher.finalize()))
}
