//! Command dispatch
//!
//! Discrete world-mutating intents (build, place, buy, order, reserve,
//! attend, exit) become atomic updates against the map, the service
//! registry, storage and the ledger. Commands are dispatched synchronously
//! and never retry; a command whose precondition fails emits a status
//! signal and simply does not apply.

pub mod executor;

pub use executor::execute;

use crate::core::types::{AgentId, GridPos};
use crate::entity::agent::Agent;
use crate::entity::agent::Job;
use crate::entity::tasks::{Task, TaskKind};
use crate::world::objects::{RoomKind, ServiceKind, TemplateId};
use crate::world::store::GoodsId;
use serde::{Deserialize, Serialize};

/// A rectangular tile selection, inclusive on both corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Area {
    pub fn point(pos: GridPos) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            x2: pos.x,
            y2: pos.y,
        }
    }

    pub fn rect(x: i32, y: i32, x2: i32, y2: i32, z: i32) -> Self {
        Self { x, y, z, x2, y2 }
    }

    pub fn origin(&self) -> GridPos {
        GridPos::new(self.x, self.y, self.z)
    }

    pub fn size(&self) -> usize {
        ((self.x2 - self.x + 1).max(0) as usize) * ((self.y2 - self.y + 1).max(0) as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = GridPos> + '_ {
        let (x, x2, z) = (self.x, self.x2, self.z);
        (self.y..=self.y2).flat_map(move |y| (x..=x2).map(move |x| GridPos::new(x, y, z)))
    }
}

/// A discrete world-mutating intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Make an area built and walkable, walling its surroundings
    Build { area: Area },
    /// Put a furniture template down, anchored at the area origin for
    /// multi-tile footprints
    PlaceObject { area: Area, template: TemplateId },
    /// Designate a set of tiles as a room
    DefineRoom { kind: RoomKind, tiles: Vec<GridPos> },
    /// Buy supplies into storage, or cancel a previous buy
    BuySupplies {
        goods: GoodsId,
        quantity: u32,
        cancel: bool,
    },
    /// A patron orders the best drink their purse allows
    Order { patron: AgentId },
    /// Take or release a reserved service position
    ReserveService {
        kind: ServiceKind,
        pos: GridPos,
        release: bool,
    },
    /// An employee starts or stops attending a post
    AttendTo {
        kind: ServiceKind,
        pos: GridPos,
        stop: bool,
    },
    /// Post a chore on the employee job board
    AddJob {
        kind: ServiceKind,
        pos: Option<GridPos>,
        task: Task,
    },
    /// Withdraw a previously posted chore
    RemoveJob {
        kind: ServiceKind,
        pos: Option<GridPos>,
        task: TaskKind,
    },
    /// Consume stock out of storage
    RemoveStock { goods: GoodsId, quantity: u32 },
    /// An agent walks out of the simulation
    AgentExit { agent: AgentId },
}

/// Payload shapes accepted from the host's transport
///
/// The transport itself lives outside this crate; these are only the
/// message contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InboundMessage {
    /// `{command: <Command>}` - dispatched synchronously
    WorldCommand { command: Command },
    /// `{customer: <Agent>}` - a new patron walks in
    Customer { customer: Agent },
    /// `{recruit: <AgentId>, profile: <Job>}` - reclassify a patron
    Recruit { recruit: AgentId, profile: Job },
}
