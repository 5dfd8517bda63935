use crate::entities::creature::CreatureId;
use thiserror::Error;

/// Reasons a world-mutating action is refused.
///
/// Every variant is raised before any state is touched, so a refused action
/// leaves the world exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("destination is too far away")]
    TooFar,
    #[error("no line of effect to the destination")]
    NoPath,
    #[error("destination rejected the thing")]
    Rejected,
    #[error("thing cannot be moved")]
    Immovable,
    #[error("protection zone rules forbid this action")]
    ProtectionZoneViolation,
    #[error("not enough mana")]
    InsufficientMana,
    #[error("actor is exhausted")]
    Exhausted,
    #[error("target is out of reach")]
    NotReachable,
    #[error("target has a higher privilege level")]
    TargetPrivileged,
    #[error("unknown creature {0:?}")]
    UnknownCreature(CreatureId),
    #[error("the world is full")]
    WorldFull,
    #[error("the referenced thing no longer exists")]
    NotPossible,
}

impl GameError {
    /// Text shown to the actor in the cancel notice.
    pub fn cancel_text(self) -> &'static str {
        match self {
            GameError::TooFar => "Too far away...",
            GameError::NoPath => "You cannot throw there.",
            GameError::Rejected => "Sorry, not possible.",
            GameError::Immovable => "You cannot move this object.",
            GameError::ProtectionZoneViolation => {
                "You can't enter a protection zone after attacking another creature."
            }
            GameError::InsufficientMana => "You do not have enough mana.",
            GameError::Exhausted => "You are exhausted.",
            GameError::NotReachable => "Target is out of reach.",
            GameError::TargetPrivileged => "Better dont touch him...",
            GameError::UnknownCreature(_) => "Creature not found.",
            GameError::WorldFull => "Too many players online.",
            GameError::NotPossible => "Sorry, not possible.",
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
