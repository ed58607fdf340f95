use crate::group::{Curve, Element, Point, PrimeOrder, Scalar as Sc};
use ark_bls12_377 as zexe;
use ark_ec::{AffineCurve, ProjectiveCurve};
use ark_ff::{Field, One, PrimeField, UniformRand, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand_core::RngCore;
use serde::{
    de::Error as DeserializeError, ser::Error as SerializationError, Deserialize, Deserializer,
    Serialize, Serializer,
};
use sha2::{Digest, Sha256};
use std::{
    fmt,
    ops::{AddAssign, MulAssign, Neg, SubAssign},
    sync::OnceLock,
};

use thiserror::Error;

/// Domain separator for mapping arbitrary data to G1
const MAP_DOMAIN: &[u8] = b"threshold-primitives/bls12-377/g1/try-and-increment";

/// Public seed from which the Pedersen generator `h` is derived
const BLINDING_SEED: &[u8] = b"nothing up my sleeve";

/// Number of counters tried before giving up on mapping data to the curve.
/// About half of all x-coordinates are on the curve.
const MAX_MAP_ATTEMPTS: u32 = 256;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("could not map data to the curve after {0} attempts")]
    HashToCurve(u32),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub struct Scalar(
    #[serde(deserialize_with = "deserialize_field")]
    #[serde(serialize_with = "serialize_field")]
    zexe::Fr,
);

type ZG1 = zexe::G1Projective;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct G1(
    #[serde(deserialize_with = "deserialize_group")]
    #[serde(serialize_with = "serialize_group")]
    ZG1,
);

impl Element for Scalar {
    type RHS = Scalar;

    fn new() -> Self {
        Self(Zero::zero())
    }

    fn one() -> Self {
        Self(One::one())
    }

    fn add(&mut self, s2: &Self) {
        self.0.add_assign(s2.0);
    }

    fn mul(&mut self, mul: &Scalar) {
        self.0.mul_assign(mul.0)
    }

    fn rand<R: RngCore>(rng: &mut R) -> Self {
        Self(zexe::Fr::rand(rng))
    }
}

impl Sc for Scalar {
    fn set_int(&mut self, i: u64) {
        *self = Self(zexe::Fr::from(i))
    }

    fn inverse(&self) -> Option<Self> {
        Some(Self(Field::inverse(&self.0)?))
    }

    fn negate(&mut self) {
        *self = Self(self.0.neg())
    }

    fn sub(&mut self, other: &Self) {
        self.0.sub_assign(other.0);
    }

    fn from_digest(digest: &[u8]) -> Self {
        Self(zexe::Fr::from_le_bytes_mod_order(digest))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}", self.0)
    }
}

/// G1 points can be multiplied by Fr elements
impl Element for G1 {
    type RHS = Scalar;

    fn new() -> Self {
        Self(Zero::zero())
    }

    fn one() -> Self {
        Self(ZG1::prime_subgroup_generator())
    }

    fn add(&mut self, s2: &Self) {
        self.0.add_assign(s2.0);
    }

    fn mul(&mut self, mul: &Scalar) {
        self.0.mul_assign(mul.0)
    }

    fn rand<R: RngCore>(rng: &mut R) -> Self {
        Self(ZG1::rand(rng))
    }
}

impl PrimeOrder for G1 {
    fn in_correct_subgroup(&self) -> bool {
        self.0
            .into_affine()
            .is_in_correct_subgroup_assuming_on_curve()
    }
}

/// Implementation of Point using G1 from BLS12-377
impl Point for G1 {
    type Error = MapError;

    /// Try-and-increment: hash `(domain, data, counter)` into an x-coordinate
    /// until it lands on the curve, then clear the cofactor.
    fn map(&mut self, data: &[u8]) -> Result<(), MapError> {
        for counter in 0..MAX_MAP_ATTEMPTS {
            let mut hasher = Sha256::new();
            hasher.update(MAP_DOMAIN);
            hasher.update(data);
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();

            let x = zexe::Fq::from_le_bytes_mod_order(&digest);
            if let Some(affine) = zexe::G1Affine::get_point_from_x(x, false) {
                let point = affine.mul_by_cofactor_to_projective();
                if !point.is_zero() {
                    *self = Self(point);
                    return Ok(());
                }
            }
        }

        Err(MapError::HashToCurve(MAX_MAP_ATTEMPTS))
    }

    fn is_on_curve(&self) -> bool {
        self.0.into_affine().is_on_curve()
    }
}

impl fmt::Display for G1 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}", self.0.into_affine())
    }
}

/// BLS12-377 G1 with Fr scalars, plus the Pedersen generator derived from a
/// public seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct G1Curve;

impl Curve for G1Curve {
    type Scalar = Scalar;
    type Point = G1;

    fn blinding_point() -> G1 {
        static BLINDING: OnceLock<G1> = OnceLock::new();
        *BLINDING.get_or_init(|| {
            let mut h = G1::new();
            h.map(BLINDING_SEED)
                .expect("the blinding seed maps to the curve");
            h
        })
    }
}

// Serde implementations: elements travel as their canonical compressed bytes

fn serialize_field<S, C>(c: &C, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    C: CanonicalSerialize,
{
    let mut bytes = Vec::with_capacity(c.serialized_size());
    c.serialize(&mut bytes)
        .map_err(|err| SerializationError::custom(err))?;

    s.serialize_bytes(&bytes)
}

fn deserialize_field<'de, D, C>(deserializer: D) -> Result<C, D::Error>
where
    D: Deserializer<'de>,
    C: CanonicalDeserialize,
{
    let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;

    // decoding rejects values outside of the field, i.e. scalars >= the group order
    C::deserialize(&bytes[..]).map_err(|err| DeserializeError::custom(err))
}

fn serialize_group<S, C>(c: &C, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    C: ProjectiveCurve,
    C::Affine: CanonicalSerialize,
{
    serialize_field(&c.into_affine(), s)
}

fn deserialize_group<'de, D, C>(deserializer: D) -> Result<C, D::Error>
where
    D: Deserializer<'de>,
    C: ProjectiveCurve,
    C::Affine: CanonicalDeserialize,
{
    let affine: C::Affine = deserialize_field(deserializer)?;
    Ok(affine.into_projective())
}
