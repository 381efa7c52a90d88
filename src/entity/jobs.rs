//! The employee job board
//!
//! Chores needing staff land here, keyed by the service kind they require.
//! An employee scans its supported functions in priority order and pulls
//! the most-recently-pushed chore. Pull is deliberately a stack, not a
//! queue: old chores can starve under load (see DESIGN.md). A pulled
//! chore is tracked on the ongoing ledger until its task terminates.

use crate::core::types::{AgentId, GridPos};
use crate::entity::tasks::{Task, TaskKind};
use crate::world::objects::ServiceKind;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobBoard {
    entries: AHashMap<ServiceKind, Vec<(Option<GridPos>, Task)>>,
    /// Chores currently held by an employee
    ongoing: AHashMap<AgentId, ServiceKind>,
    /// Labels of chores already carried out
    history: Vec<(ServiceKind, String)>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a chore, optionally bound to a target position
    pub fn add(&mut self, kind: ServiceKind, pos: Option<GridPos>, task: Task) {
        tracing::debug!(?kind, ?pos, task = task.label(), "chore posted");
        self.entries
            .entry(kind)
            .or_default()
            .push((pos, task.from_board()));
    }

    /// Pull the most recently posted chore of this kind
    pub fn pull(&mut self, kind: ServiceKind) -> Option<(Option<GridPos>, Task)> {
        self.entries.get_mut(&kind)?.pop()
    }

    /// Withdraw a posted chore matching position and task payload
    ///
    /// Failing to find it is reported loudly: the issuer believed the
    /// chore was still pending.
    pub fn remove(&mut self, kind: ServiceKind, pos: Option<GridPos>, task: &TaskKind) -> bool {
        let entries = self.entries.entry(kind).or_default();
        match entries
            .iter()
            .position(|(p, t)| *p == pos && t.kind == *task)
        {
            Some(index) => {
                let (_, removed) = entries.remove(index);
                self.history.push((kind, removed.label().to_string()));
                true
            }
            None => {
                tracing::warn!(?kind, ?pos, "could not withdraw chore: not on the board");
                false
            }
        }
    }

    pub fn pending(&self, kind: ServiceKind) -> usize {
        self.entries.get(&kind).map_or(0, Vec::len)
    }

    pub fn record_ongoing(&mut self, agent: AgentId, kind: ServiceKind) {
        self.ongoing.insert(agent, kind);
    }

    pub fn clear_ongoing(&mut self, agent: AgentId) {
        self.ongoing.remove(&agent);
    }

    pub fn ongoing_of(&self, agent: AgentId) -> Option<ServiceKind> {
        self.ongoing.get(&agent).copied()
    }

    pub fn history(&self) -> &[(ServiceKind, String)] {
        &self.history
    }
}
