use crate::primitives::{
    errors::{AvssResult, ErrorCondition, ProtocolError},
    status::Status,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{collections::BTreeMap, convert::TryFrom, fmt};
use threshold_primitives::{
    ecies::EciesCipher,
    group::Curve,
    poly::{Idx, PublicPoly},
    zkp::PedersenProof,
};

/// SharePair holds the two evaluations `(s, s')` of a dealer's polynomials
/// `f1` and `f2` at `x = index + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct SharePair<C: Curve> {
    /// The index of the shareholder this pair belongs to
    pub index: Idx,
    /// `f1(index + 1)`
    pub value: C::Scalar,
    /// `f2(index + 1)`
    pub blinding: C::Scalar,
}

/// EncryptedShare holds the ECIES encryption of a share pair destined to the
/// `share_idx`-th shareholder.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct EncryptedShare<C: Curve> {
    /// The index of the shareholder this share belongs to
    pub share_idx: Idx,
    /// The ECIES encrypted `SharePair`
    pub secret: EciesCipher<C>,
}

/// BundledContribution is broadcast exactly once by every dealer. It carries
/// the Pedersen commitments to the dealer's polynomials in the clear and one
/// confidential share pair per shareholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct BundledContribution<C: Curve> {
    /// `C_j = g^{a_j} h^{b_j}` for `j` in `0..k`
    pub commitments: PublicPoly<C>,
    /// The encrypted shares created by the dealer
    pub shares: Vec<EncryptedShare<C>>,
}

/// A VerificationVector announces the sender's judgment of every dealer's
/// contribution. `None` means no contribution was processed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationVector {
    pub statuses: Vec<Option<Status>>,
}

/// A `Rebuttal` is sent by a dealer that was accused by `accuser`. It reveals
/// the share pair that was sent to the accuser, in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct Rebuttal<C: Curve> {
    pub accuser: Idx,
    pub share: SharePair<C>,
}

/// For every dealer `i` of the set `R`, a proof of knowledge of the share pair
/// received from `i`, which reveals `g^{s_i}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct BulkProof<C: Curve> {
    pub proofs: BTreeMap<Idx, PedersenProof<C>>,
}

/// All messages exchanged over the broadcast channel
#[derive(Debug, Clone)]
pub enum Payload<C: Curve> {
    ShareContribution(BundledContribution<C>),
    Verification(VerificationVector),
    Rebuttal(Rebuttal<C>),
    ZkProof(PedersenProof<C>),
    BulkZkProof(BulkProof<C>),
}

/// The message type tag carried by every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    ShareContribution = 1,
    Verification = 2,
    Rebuttal = 3,
    ZkProof = 4,
    BulkZkProof = 5,
}

impl Opcode {
    /// The condition reported when a body fails to decode as this opcode's payload
    pub fn decode_failure(self) -> ErrorCondition {
        match self {
            Opcode::ShareContribution => ErrorCondition::InvalidShareContribution,
            Opcode::Verification => ErrorCondition::InvalidVerificationVector,
            Opcode::Rebuttal => ErrorCondition::BadRebuttal,
            Opcode::ZkProof => ErrorCondition::InvalidProof,
            Opcode::BulkZkProof => ErrorCondition::InvalidBulkProof,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Opcode::ShareContribution,
            2 => Opcode::Verification,
            3 => Opcode::Rebuttal,
            4 => Opcode::ZkProof,
            5 => Opcode::BulkZkProof,
            other => return Err(ProtocolError::UnknownOpcode(other)),
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Opcode::ShareContribution => "share contribution",
            Opcode::Verification => "verification vector",
            Opcode::Rebuttal => "rebuttal",
            Opcode::ZkProof => "zk proof",
            Opcode::BulkZkProof => "bulk zk proof",
        };
        f.write_str(name)
    }
}

/// Envelope is the unit appended to the broadcast channel. The channel is
/// assumed to be authenticated, so `sender` is trusted to be the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: Idx,
    pub opcode: u8,
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
}

impl<C: Curve> Payload<C> {
    pub fn opcode(&self) -> Opcode {
        match self {
            Payload::ShareContribution(_) => Opcode::ShareContribution,
            Payload::Verification(_) => Opcode::Verification,
            Payload::Rebuttal(_) => Opcode::Rebuttal,
            Payload::ZkProof(_) => Opcode::ZkProof,
            Payload::BulkZkProof(_) => Opcode::BulkZkProof,
        }
    }

    /// Wraps the payload into an envelope published by `sender`
    pub fn seal(&self, sender: Idx) -> AvssResult<Envelope> {
        let body = match self {
            Payload::ShareContribution(b) => bincode::serialize(b)?,
            Payload::Verification(v) => bincode::serialize(v)?,
            Payload::Rebuttal(r) => bincode::serialize(r)?,
            Payload::ZkProof(p) => bincode::serialize(p)?,
            Payload::BulkZkProof(p) => bincode::serialize(p)?,
        };

        Ok(Envelope {
            sender,
            opcode: self.opcode() as u8,
            body,
        })
    }
}

impl Envelope {
    /// Decodes the body according to the opcode
    pub fn open<C: Curve>(&self) -> Result<Payload<C>, ProtocolError> {
        let opcode = Opcode::try_from(self.opcode)?;
        let malformed = |source| ProtocolError::Malformed { opcode, source };

        let body = &self.body[..];
        Ok(match opcode {
            Opcode::ShareContribution => {
                Payload::ShareContribution(bincode::deserialize(body).map_err(malformed)?)
            }
            Opcode::Verification => {
                Payload::Verification(bincode::deserialize(body).map_err(malformed)?)
            }
            Opcode::Rebuttal => Payload::Rebuttal(bincode::deserialize(body).map_err(malformed)?),
            Opcode::ZkProof => Payload::ZkProof(bincode::deserialize(body).map_err(malformed)?),
            Opcode::BulkZkProof => {
                Payload::BulkZkProof(bincode::deserialize(body).map_err(malformed)?)
            }
        })
    }
}
