//! Tick system - orchestrates simulation updates
//!
//! One call per simulation step: queued host commands apply first, then
//! every agent receives exactly one tick, in a fixed registration order.
//! Side effects (reservations, command emission) from an earlier-ticked
//! agent are visible to later-ticked agents within the same tick; this
//! ordering is deliberate and tested, see DESIGN.md.

use crate::core::types::AgentId;
use crate::world::world::World;
use serde::{Deserialize, Serialize};

/// Events generated during a simulation tick
///
/// Returned by `run_simulation_tick` for the host loop's observers (status
/// line, action log, sound cues).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    /// A new agent entered the simulation
    AgentSpawned { agent: AgentId, name: String },
    /// An agent left the simulation for good
    AgentLeft { agent: AgentId },
    /// An agent started running a task
    TaskStarted { agent: AgentId, task: String },
    /// An agent's running task failed; its plan was discarded
    TaskFailed { agent: AgentId, task: String },
    /// A patron gave up on the establishment
    PatronRenounced { agent: AgentId, reason: String },
    /// A class of goods is (un)available; `{status, flag}` on the wire
    GoodsStatus { category: String, available: bool },
    /// A command's precondition failed; the command did not apply
    CommandRejected { reason: String },
}

impl SimulationEvent {
    /// The pub/sub payload for status observers, `{"status": ..., "flag": ...}`
    ///
    /// Only goods-availability events cross the transport; everything else
    /// is host-internal.
    pub fn status_payload(&self) -> Option<serde_json::Value> {
        match self {
            SimulationEvent::GoodsStatus {
                category,
                available,
            } => Some(serde_json::json!({ "status": category, "flag": available })),
            _ => None,
        }
    }
}

/// Run a single simulation tick
///
/// 1. Drain and dispatch the host's queued commands
/// 2. Tick every agent in registration order (idle agents go through
///    behavior selection inside their own tick)
/// 3. Drop agents that exited, compact, advance the tick counter
pub fn run_simulation_tick(world: &mut World) -> Vec<SimulationEvent> {
    let mut events = Vec::new();

    while let Some(command) = world.pop_queued_command() {
        if let Err(error) = crate::command::execute(world, command, None, &mut events) {
            tracing::warn!(%error, "queued command failed");
        }
    }

    let slots = world.slot_count();
    for index in 0..slots {
        let Some(mut agent) = world.take_agent_slot(index) else {
            continue;
        };
        agent.tick(world, &mut events);
        if world.clear_departing(agent.id) {
            // The exit event was pushed by the command that removed them
            tracing::debug!(agent = ?agent.id, "agent left the simulation");
        } else {
            world.restore_agent_slot(index, agent);
        }
    }
    world.compact_agents();

    world.current_tick += 1;
    events
}
