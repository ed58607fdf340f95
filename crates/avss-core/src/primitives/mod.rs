/// Primitives for grouping together the participants with the protocol thresholds
pub(crate) mod group;
pub use group::*;

pub(crate) mod types;
pub use types::*;

/// Tri-state judgments and the matrix of announced verification vectors
pub mod status;

/// Log of protocol violations committed by other shareholders
pub mod alert;
pub use alert::{Alert, AlertLog};

/// The shareholder state machine
pub mod avss;
pub use avss::{Behavior, Shareholder};

mod errors;
pub use errors::{AvssError, AvssResult, ErrorCondition, ProtocolError};
