// Domain-level errors for player membership and mass updates.
// None of these are fatal; the session absorbs them and keeps ticking.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentroidError {
    /// Mass was zero, negative or not finite.
    InvalidMass,
    /// The id does not name an active player.
    UnknownPlayer,
    /// The id is already an active player.
    DuplicateRegistration,
}

impl fmt::Display for CentroidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CentroidError::InvalidMass => f.write_str("mass must be positive and finite"),
            CentroidError::UnknownPlayer => f.write_str("unknown player"),
            CentroidError::DuplicateRegistration => f.write_str("player already registered"),
        }
    }
}

impl std::error::Error for CentroidError {}
