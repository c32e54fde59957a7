use shared::{BuildingKind, EntityId, ProtocolError, Resources};
use thiserror::Error;

/// Failures surfaced by simulation operations and the network boundary.
///
/// None of these stop the game loop; command failures are reported back to
/// the submitting client.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GameError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("insufficient resources: need {required:?}, have {available:?}")]
    InsufficientResources {
        required: Resources,
        available: Resources,
    },

    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    #[error("no {0} available")]
    MissingBuilding(BuildingKind),

    #[error("building {building} is cooling down ({remaining:.1}s left)")]
    CooldownActive { building: EntityId, remaining: f64 },

    #[error("game has stopped")]
    GameStopped,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<ProtocolError> for GameError {
    fn from(err: ProtocolError) -> Self {
        GameError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        GameError::Encoding(err.to_string())
    }
}

impl From<bincode::Error> for GameError {
    fn from(err: bincode::Error) -> Self {
        GameError::Encoding(err.to_string())
    }
}

impl From<std::io::Error> for GameError {
    fn from(err: std::io::Error) -> Self {
        GameError::Connection(err.to_string())
    }
}

pub type GameResult<T> = Result<T, GameError>;
