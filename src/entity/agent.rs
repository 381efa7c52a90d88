//! Agents: patrons, employees and the publican
//!
//! An agent owns at most one current task plus an ordered pending plan.
//! Chains are pushed atomically by the behavior engine; a failed running
//! task cascades failure through the whole plan before the agent re-enters
//! behavior selection on its next tick.

use crate::core::types::{AgentId, GridPos, Money};
use crate::entity::needs::Needs;
use crate::entity::tasks::{Task, TaskSource, TaskState};
use crate::simulation::behavior;
use crate::simulation::tick::SimulationEvent;
use crate::world::objects::ServiceKind;
use crate::world::world::World;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    Human,
    Elf,
    Dwarf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreatureClass {
    Common,
    Warrior,
    Priest,
    Wizard,
    Thief,
}

/// Mutable state specific to a paying customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatronState {
    pub race: Race,
    pub class: CreatureClass,
    pub level: u8,
    pub money: Money,
    pub needs: Needs,
    pub has_drink: bool,
}

/// A job description: the functions an employee covers, most important
/// first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub title: String,
    pub functions: Vec<ServiceKind>,
}

impl Job {
    pub fn publican() -> Self {
        Self {
            title: "Publican".into(),
            functions: vec![ServiceKind::Ordering],
        }
    }

    pub fn waiter() -> Self {
        Self {
            title: "Waiter".into(),
            functions: vec![ServiceKind::OrderTaking, ServiceKind::Delivering],
        }
    }

    pub fn cook() -> Self {
        Self {
            title: "Cook".into(),
            functions: vec![ServiceKind::Cooking],
        }
    }

    pub fn barkeep() -> Self {
        Self {
            title: "Barkeep".into(),
            functions: vec![ServiceKind::Ordering, ServiceKind::Selling],
        }
    }
}

/// Mutable state specific to staff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeState {
    pub job: Job,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentKind {
    Patron(PatronState),
    Employee(EmployeeState),
}

/// An autonomous entity in the simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub pos: GridPos,
    pub kind: AgentKind,
    /// At most one owned current task
    pub task: Option<Task>,
    /// The ordered short-term plan run after the current task
    pub plan: VecDeque<Task>,
}

impl Agent {
    pub fn patron(
        id: AgentId,
        name: String,
        pos: GridPos,
        race: Race,
        class: CreatureClass,
        level: u8,
        money: Money,
        needs: Needs,
    ) -> Self {
        Self {
            id,
            name,
            pos,
            kind: AgentKind::Patron(PatronState {
                race,
                class,
                level,
                money,
                needs,
                has_drink: false,
            }),
            task: None,
            plan: VecDeque::new(),
        }
    }

    pub fn employee(id: AgentId, name: String, pos: GridPos, job: Job) -> Self {
        Self {
            id,
            name,
            pos,
            kind: AgentKind::Employee(EmployeeState { job }),
            task: None,
            plan: VecDeque::new(),
        }
    }

    pub fn patron_state(&self) -> Option<&PatronState> {
        match &self.kind {
            AgentKind::Patron(state) => Some(state),
            _ => None,
        }
    }

    pub fn patron_mut(&mut self) -> Option<&mut PatronState> {
        match &mut self.kind {
            AgentKind::Patron(state) => Some(state),
            _ => None,
        }
    }

    pub fn employee_state(&self) -> Option<&EmployeeState> {
        match &self.kind {
            AgentKind::Employee(state) => Some(state),
            _ => None,
        }
    }

    pub fn is_publican(&self) -> bool {
        self.employee_state()
            .map_or(false, |e| e.job.title == "Publican")
    }

    pub fn is_idle(&self) -> bool {
        self.task.is_none() && self.plan.is_empty()
    }

    /// Current task plus pending plan size; only ever strictly decreases
    /// except when the behavior engine enqueues a new chain while idle
    pub fn plan_size(&self) -> usize {
        self.task.iter().count() + self.plan.len()
    }

    /// Push a whole chain at once
    ///
    /// The push is atomic with respect to planning: callers validate the
    /// chain (path, reservation) before building it, and either the whole
    /// chain lands or a fallback chain is pushed instead.
    pub fn push_chain(&mut self, tasks: Vec<Task>) {
        for task in tasks {
            self.plan.push_back(task);
        }
        if self.task.is_none() {
            self.task = self.plan.pop_front();
        }
    }

    /// Fail every still-pending task so reservations and posted chores
    /// unwind, then discard the plan
    pub fn fail_plan(&mut self, world: &mut World, events: &mut Vec<SimulationEvent>) {
        let mut pending = std::mem::take(&mut self.plan);
        for task in pending.iter_mut() {
            task.on_fail(self, world, events);
            if task.source == TaskSource::Board {
                world.jobs.clear_ongoing(self.id);
            }
        }
    }

    /// One simulation step for this agent
    ///
    /// Idle agents go through behavior selection first, so a fresh chain
    /// starts running on the same tick it was decided.
    pub fn tick(&mut self, world: &mut World, events: &mut Vec<SimulationEvent>) {
        if self.task.is_none() {
            behavior::select_activity(self, world, events);
            if let Some(task) = &self.task {
                events.push(SimulationEvent::TaskStarted {
                    agent: self.id,
                    task: task.label().to_string(),
                });
            }
        }

        let Some(mut task) = self.task.take() else {
            return;
        };
        task.tick(self, world, events);
        match task.state {
            TaskState::Running => self.task = Some(task),
            TaskState::Finished => {
                if task.source == TaskSource::Board {
                    world.jobs.clear_ongoing(self.id);
                }
                self.task = self.plan.pop_front();
                if let Some(next) = &self.task {
                    events.push(SimulationEvent::TaskStarted {
                        agent: self.id,
                        task: next.label().to_string(),
                    });
                }
            }
            TaskState::Failed => {
                if task.source == TaskSource::Board {
                    world.jobs.clear_ongoing(self.id);
                }
                events.push(SimulationEvent::TaskFailed {
                    agent: self.id,
                    task: task.label().to_string(),
                });
                self.fail_plan(world, events);
            }
        }
    }
}
