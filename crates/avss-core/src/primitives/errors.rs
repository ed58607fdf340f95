use crate::primitives::types::Opcode;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use thiserror::Error;
use threshold_primitives::{ecies::EciesError, poly::Idx, zkp::ProofError};

/// Result type alias which returns `AvssError`
pub type AvssResult<A> = Result<A, AvssError>;

#[derive(Debug, Error)]
/// Local errors which are returned to the caller. Faults of other
/// shareholders never surface here, they end up in the alert log.
pub enum AvssError {
    /// InvalidParameters is raised when the `(n, k, f)` triple does not
    /// satisfy `f < k <= n - 2f`.
    #[error("invalid parameters n={n}, k={k}, f={f}: require n >= 1 and f < k <= n - 2f")]
    InvalidParameters { n: usize, k: usize, f: usize },

    /// IndexOutOfRange is raised when a shareholder index is not in `[0, n)`
    #[error("index {0} is not in range [0, {1})")]
    IndexOutOfRange(Idx, usize),

    /// KeyCountMismatch is raised when the number of encryption keys differs
    /// from the number of shareholders
    #[error("got {0} public keys for {1} shareholders")]
    KeyCountMismatch(usize, usize),

    /// PrivateKeyMismatch is raised when the private key does not match the
    /// public key registered at the shareholder's index
    #[error("private key does not match the public key at index {0}")]
    PrivateKeyMismatch(Idx),

    #[error("timed out after {1:?} waiting for {0}")]
    WaitTimeout(&'static str, Duration),

    #[error("the node was stopped")]
    Stopped,

    #[error("a lock was poisoned by a panicking thread")]
    LockPoisoned,

    #[error("the worker thread panicked")]
    WorkerPanicked,

    /// Disagreement is raised by the local orchestrator when two
    /// shareholders finish with different outputs
    #[error("shareholders disagree on the {0}")]
    Disagreement(&'static str),

    /// BincodeError is raised when de(serialization) by bincode fails
    #[error("de(serialization) failed: {0}")]
    BincodeError(#[from] bincode::Error),

    #[error("could not encrypt share: {0}")]
    Encryption(EciesError),
}

/// The category of a protocol violation committed by another shareholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCondition {
    DuplicateMessage,
    InconsistentShare,
    InvalidShareContribution,
    InvalidVerificationVector,
    BadRebuttal,
    StateViolation,
    InvalidProof,
    InvalidBulkProof,
    UnrecognizedMessageType,
    InvalidCiphertext,
}

impl fmt::Display for ErrorCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
/// Error raised while handling a message of another shareholder. The message
/// dispatcher turns these into alerts against the sender.
pub enum ProtocolError {
    #[error("duplicate {0} message")]
    Duplicate(Opcode),

    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    #[error("sender {0} is not a shareholder")]
    UnknownSender(Idx),

    /// The body could not be decoded as the payload its opcode announced
    #[error("malformed {opcode} body: {source}")]
    Malformed {
        opcode: Opcode,
        source: bincode::Error,
    },

    #[error("no share addressed to us")]
    MissingShare,

    #[error("could not decrypt share: {0}")]
    Undecryptable(EciesError),

    #[error("decrypted share is malformed: {0}")]
    MalformedShare(bincode::Error),

    /// Each commitment vector must have exactly `k` entries
    #[error("commitment vector has {0} entries, expected {1}")]
    WrongCommitmentCount(usize, usize),

    #[error("commitment {0} is not a valid non-identity point of the prime-order subgroup")]
    InvalidCommitmentPoint(usize),

    #[error("share is for index {0}, expected {1}")]
    WrongShareIndex(Idx, Idx),

    #[error("share does not match the commitment vector")]
    ShareMismatch,

    #[error("verification vector has {0} entries, expected {1}")]
    WrongVectorLength(usize, usize),

    #[error("bad rebuttal: {0}")]
    BadRebuttal(&'static str),

    #[error("state violation: {0}")]
    StateViolation(&'static str),

    #[error("invalid proof: {0}")]
    InvalidProof(ProofError),

    #[error("invalid bulk proof: {0}")]
    InvalidBulkProof(&'static str),
}

impl ProtocolError {
    /// Returns the condition recorded in the alert log for this error
    pub fn condition(&self) -> ErrorCondition {
        use ErrorCondition::*;
        match self {
            ProtocolError::Duplicate(_) => DuplicateMessage,
            ProtocolError::UnknownOpcode(_) => UnrecognizedMessageType,
            ProtocolError::UnknownSender(_) => StateViolation,
            ProtocolError::Malformed { opcode, .. } => opcode.decode_failure(),
            ProtocolError::MissingShare
            | ProtocolError::Undecryptable(_)
            | ProtocolError::MalformedShare(_) => InvalidCiphertext,
            ProtocolError::WrongCommitmentCount(..)
            | ProtocolError::InvalidCommitmentPoint(_)
            | ProtocolError::WrongShareIndex(..)
            | ProtocolError::ShareMismatch => InconsistentShare,
            ProtocolError::WrongVectorLength(..) => InvalidVerificationVector,
            ProtocolError::BadRebuttal(_) => BadRebuttal,
            ProtocolError::StateViolation(_) => StateViolation,
            ProtocolError::InvalidProof(_) => InvalidProof,
            ProtocolError::InvalidBulkProof(_) => InvalidBulkProof,
        }
    }
}
