use crate::core::types::{AgentId, GridPos, Money};
use crate::world::objects::ServiceKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TavernError {
    /// Taking a service position that is not currently available. This is
    /// a caller bug, not ordinary contention: positions must come from a
    /// registry query made in the same tick.
    #[error("no available service of kind {kind:?} at {pos:?}")]
    ServiceUnavailable { kind: ServiceKind, pos: GridPos },

    #[error("service of kind {kind:?} at {pos:?} is not in use")]
    ServiceNotInUse { kind: ServiceKind, pos: GridPos },

    #[error("adding {quantity} of {goods} exceeds storage room")]
    StorageFull { goods: String, quantity: u32 },

    #[error("taking {quantity} of {goods} exceeds stock")]
    OutOfStock { goods: String, quantity: u32 },

    #[error("not enough money: need {needed}, have {available}")]
    InsufficientFunds { needed: Money, available: Money },

    #[error("cannot build border-map tile {0:?}")]
    BorderTile(GridPos),

    #[error("cannot place object at {pos:?}: {reason}")]
    PlacementRejected { pos: GridPos, reason: &'static str },

    #[error("agent not found: {0:?}")]
    AgentNotFound(AgentId),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TavernError>;
