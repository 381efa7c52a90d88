//! Task lifecycle and the per-kind state machine
//!
//! A task is one unit of agent work: Running until it reaches Finished or
//! Failed, terminal and one-shot. No task parks a call stack across
//! ticks; waiting is explicit tick counting. When the running task fails,
//! every still-pending task of the same plan is failed without being
//! ticked so reservations and posted chores are always unwound.

use crate::command::{execute, Command};
use crate::core::config::SimConfig;
use crate::core::types::{AgentId, GridPos};
use crate::entity::agent::Agent;
use crate::simulation::tick::SimulationEvent;
use crate::spatial::pathfinding::find_path;
use crate::world::objects::ServiceKind;
use crate::world::store::GoodsId;
use crate::world::world::World;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Terminal, one-shot lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Running,
    Finished,
    Failed,
}

/// Where a task came from; board chores are tracked on the ongoing ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskSource {
    Planned,
    Board,
}

/// The closed set of task kinds with their payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Fool around for a while before re-deciding
    Wandering,
    /// Walk to a destination, recomputing the route if it gets blocked
    Walking {
        dest: GridPos,
        #[serde(skip)]
        path: Vec<GridPos>,
        #[serde(skip)]
        step: usize,
    },
    /// Give a reserved position back to the available set
    OpenSeat { kind: ServiceKind, pos: GridPos },
    Seating,
    StandingUp,
    /// Stand at the counter and order the best affordable drink
    Ordering { placed: bool },
    Drinking,
    Eating,
    Sleeping,
    /// Wait at the seat for a waiter, posting an order-taking chore
    TableOrder {
        order: String,
        posted: bool,
        posted_at: Option<GridPos>,
        taken: bool,
    },
    /// Wait at the seat for the kitchen to deliver
    WaitForOrder { served: bool },
    /// Walk out through an entry point and despawn
    Leaving,
    /// Attend a post, keeping its service open for the duty's duration
    Serving {
        kind: ServiceKind,
        pos: GridPos,
        constant: bool,
        started: bool,
    },
    /// Read a seated patron's order and hand it to the kitchen
    TakeOrder { patron: AgentId },
    /// Plan the station legs of a recipe
    PrepareMeal { recipe: String, recipient: AgentId },
    /// Work one recipe stage at a station, consuming its ingredients
    WorkProcess {
        station: ServiceKind,
        inputs: Vec<(GoodsId, u32)>,
        consumed: bool,
    },
    /// Post the finished dish for delivery
    QueueDelivery { recipient: AgentId },
    /// Carry a dish to its recipient
    DeliverMeal { recipient: AgentId },
    /// Hand the dish over
    ServeMeal { recipient: AgentId },
}

/// What one tick of a task decided
enum Step {
    Continue,
    Finish,
    Fail,
}

/// A unit of agent work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    /// Monotonic tick counter
    pub ticks: u32,
    /// Target length or deadline, depending on the kind
    pub length: Option<u32>,
    pub state: TaskState,
    pub source: TaskSource,
}

impl Task {
    fn new(kind: TaskKind, length: Option<u32>) -> Self {
        Self {
            kind,
            ticks: 0,
            length,
            state: TaskState::Running,
            source: TaskSource::Planned,
        }
    }

    pub fn wandering(config: &SimConfig) -> Self {
        Self::new(TaskKind::Wandering, Some(config.wander_length))
    }

    pub fn walking(dest: GridPos) -> Self {
        Self::new(
            TaskKind::Walking {
                dest,
                path: Vec::new(),
                step: 0,
            },
            None,
        )
    }

    pub fn open_seat(kind: ServiceKind, pos: GridPos) -> Self {
        Self::new(TaskKind::OpenSeat { kind, pos }, None)
    }

    pub fn seating() -> Self {
        Self::new(TaskKind::Seating, None)
    }

    pub fn standing_up() -> Self {
        Self::new(TaskKind::StandingUp, None)
    }

    pub fn ordering() -> Self {
        Self::new(TaskKind::Ordering { placed: false }, None)
    }

    pub fn drinking(config: &SimConfig) -> Self {
        Self::new(TaskKind::Drinking, Some(config.drink_length))
    }

    pub fn eating(config: &SimConfig) -> Self {
        Self::new(TaskKind::Eating, Some(config.eat_length))
    }

    pub fn sleeping(config: &SimConfig) -> Self {
        Self::new(TaskKind::Sleeping, Some(config.sleep_length))
    }

    pub fn table_order(order: String, config: &SimConfig) -> Self {
        Self::new(
            TaskKind::TableOrder {
                order,
                posted: false,
                posted_at: None,
                taken: false,
            },
            Some(config.table_order_patience),
        )
    }

    pub fn wait_for_order(config: &SimConfig) -> Self {
        Self::new(
            TaskKind::WaitForOrder { served: false },
            Some(config.meal_wait_deadline),
        )
    }

    pub fn leaving() -> Self {
        Self::new(TaskKind::Leaving, None)
    }

    pub fn serving(kind: ServiceKind, pos: GridPos, constant: bool, config: &SimConfig) -> Self {
        Self::new(
            TaskKind::Serving {
                kind,
                pos,
                constant,
                started: false,
            },
            Some(config.serving_length),
        )
    }

    pub fn take_order(patron: AgentId) -> Self {
        Self::new(TaskKind::TakeOrder { patron }, None)
    }

    pub fn prepare_meal(recipe: String, recipient: AgentId) -> Self {
        Self::new(TaskKind::PrepareMeal { recipe, recipient }, None)
    }

    pub fn work_process(station: ServiceKind, time: u32, inputs: Vec<(GoodsId, u32)>) -> Self {
        Self::new(
            TaskKind::WorkProcess {
                station,
                inputs,
                consumed: false,
            },
            Some(time),
        )
    }

    pub fn queue_delivery(recipient: AgentId) -> Self {
        Self::new(TaskKind::QueueDelivery { recipient }, None)
    }

    pub fn deliver_meal(recipient: AgentId) -> Self {
        Self::new(TaskKind::DeliverMeal { recipient }, None)
    }

    pub fn serve_meal(recipient: AgentId) -> Self {
        Self::new(TaskKind::ServeMeal { recipient }, None)
    }

    pub fn from_board(mut self) -> Self {
        self.source = TaskSource::Board;
        self
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    /// Short description for status lines and the chore history
    pub fn label(&self) -> &'static str {
        match &self.kind {
            TaskKind::Wandering => "Being idle",
            TaskKind::Walking { .. } => "Going somewhere",
            TaskKind::OpenSeat { .. } => "Leaving the seat",
            TaskKind::Seating => "Seating",
            TaskKind::StandingUp => "Standing up",
            TaskKind::Ordering { .. } => "Ordering a drink",
            TaskKind::Drinking => "Drinking",
            TaskKind::Eating => "Eating",
            TaskKind::Sleeping => "Sleeping",
            TaskKind::TableOrder { .. } => "Waiting to order",
            TaskKind::WaitForOrder { .. } => "Waiting for the meal",
            TaskKind::Leaving => "Leaving",
            TaskKind::Serving { .. } => "Serving customers",
            TaskKind::TakeOrder { .. } => "Taking an order",
            TaskKind::PrepareMeal { .. } => "Starting a meal",
            TaskKind::WorkProcess { station, .. } => match station {
                ServiceKind::Workshop => "Cutting ingredients",
                ServiceKind::Cooking => "Cooking",
                ServiceKind::Brewing => "Brewing",
                _ => "Working",
            },
            TaskKind::QueueDelivery { .. } => "Sending a meal out",
            TaskKind::DeliverMeal { .. } => "Picking up a meal",
            TaskKind::ServeMeal { .. } => "Serving a customer",
        }
    }

    /// Advance the task by one tick
    pub fn tick(&mut self, agent: &mut Agent, world: &mut World, events: &mut Vec<SimulationEvent>) {
        let step = self.tick_kind(agent, world, events);
        match step {
            Step::Continue => {}
            Step::Finish => self.state = TaskState::Finished,
            Step::Fail => self.on_fail(agent, world, events),
        }
    }

    /// Mark the task failed and unwind its external side effects
    ///
    /// Also invoked, without a prior tick, on every pending task of a plan
    /// whose running task failed.
    pub fn on_fail(&mut self, agent: &mut Agent, world: &mut World, events: &mut Vec<SimulationEvent>) {
        self.state = TaskState::Failed;

        let mut cleanup: Vec<Command> = Vec::new();
        match &self.kind {
            TaskKind::OpenSeat { kind, pos } => cleanup.push(Command::ReserveService {
                kind: *kind,
                pos: *pos,
                release: true,
            }),
            TaskKind::TableOrder {
                posted: true,
                posted_at: Some(pos),
                ..
            } => cleanup.push(Command::RemoveJob {
                kind: ServiceKind::OrderTaking,
                pos: Some(*pos),
                task: TaskKind::TakeOrder { patron: agent.id },
            }),
            TaskKind::Serving {
                kind,
                pos,
                constant,
                started,
            } => {
                if *started {
                    cleanup.push(Command::AttendTo {
                        kind: *kind,
                        pos: *pos,
                        stop: true,
                    });
                }
                if *constant {
                    cleanup.push(Command::AddJob {
                        kind: *kind,
                        pos: Some(*pos),
                        task: Task::serving(*kind, *pos, true, &world.config),
                    });
                }
            }
            _ => {}
        }

        for command in cleanup {
            if let Err(error) = execute(world, command, Some(agent), events) {
                tracing::warn!(%error, "task cleanup command failed");
            }
        }
    }

    fn tick_kind(
        &mut self,
        agent: &mut Agent,
        world: &mut World,
        events: &mut Vec<SimulationEvent>,
    ) -> Step {
        match &mut self.kind {
            TaskKind::Wandering => {
                if self.length == Some(self.ticks) {
                    return Step::Finish;
                }
                if world.rng.gen_range(0..3) == 0 {
                    let moves = world.map.legit_moves_from(agent.pos);
                    if !moves.is_empty() {
                        let pick = world.rng.gen_range(0..moves.len());
                        agent.pos = moves[pick];
                    }
                }
                self.ticks += 1;
                Step::Continue
            }

            TaskKind::Walking { dest, path, step } => {
                if path.is_empty() {
                    if agent.pos == *dest {
                        return Step::Finish;
                    }
                    match find_path(&world.map, agent.pos, *dest) {
                        Some(found) => {
                            *path = found;
                            *step = 1;
                        }
                        None => return Step::Fail,
                    }
                }
                if *step < path.len() {
                    let next = path[*step];
                    if !world.map.is_walkable(next) {
                        // The route got blocked mid-traversal; recompute
                        // rather than failing, fail only if nothing is left
                        match find_path(&world.map, agent.pos, *dest) {
                            Some(found) => {
                                *path = found;
                                *step = 1;
                                self.ticks += 1;
                                Step::Continue
                            }
                            None => Step::Fail,
                        }
                    } else {
                        agent.pos = next;
                        *step += 1;
                        self.ticks += 1;
                        if agent.pos == *dest {
                            Step::Finish
                        } else {
                            Step::Continue
                        }
                    }
                } else {
                    Step::Finish
                }
            }

            TaskKind::OpenSeat { kind, pos } => {
                let command = Command::ReserveService {
                    kind: *kind,
                    pos: *pos,
                    release: true,
                };
                if let Err(error) = execute(world, command, Some(agent), events) {
                    tracing::warn!(%error, "releasing a seat that was not held");
                }
                Step::Finish
            }

            TaskKind::Seating | TaskKind::StandingUp => Step::Finish,

            TaskKind::Ordering { placed } => {
                let patience = world.config.counter_patience;
                if !*placed {
                    if self.ticks > patience {
                        renounce(agent, events, "waited too long for being served");
                        return Step::Fail;
                    }
                    if world
                        .registry
                        .is_available(ServiceKind::Ordering, agent.pos)
                    {
                        let command = Command::Order { patron: agent.id };
                        if let Err(error) = execute(world, command, Some(agent), events) {
                            tracing::warn!(%error, "order command failed");
                        }
                        *placed = true;
                    } else {
                        // Nobody is attending the counter yet; wait
                        self.ticks += 1;
                    }
                    Step::Continue
                } else if agent.patron_state().map_or(false, |p| p.has_drink) {
                    Step::Finish
                } else {
                    renounce(agent, events, "cannot find anything to drink");
                    Step::Fail
                }
            }

            TaskKind::Drinking => {
                if self.length == Some(self.ticks) {
                    if let Some(patron) = agent.patron_mut() {
                        patron.needs.thirst = patron.needs.thirst.saturating_sub(1);
                        patron.has_drink = false;
                    }
                    Step::Finish
                } else {
                    self.ticks += 1;
                    Step::Continue
                }
            }

            TaskKind::Eating => {
                if self.length == Some(self.ticks) {
                    if let Some(patron) = agent.patron_mut() {
                        patron.needs.hunger = 0;
                    }
                    Step::Finish
                } else {
                    self.ticks += 1;
                    Step::Continue
                }
            }

            TaskKind::Sleeping => {
                if self.length == Some(self.ticks) {
                    if let Some(patron) = agent.patron_mut() {
                        patron.needs.sleep = 0;
                    }
                    Step::Finish
                } else {
                    self.ticks += 1;
                    Step::Continue
                }
            }

            TaskKind::TableOrder {
                posted,
                posted_at,
                taken,
                ..
            } => {
                if !*posted {
                    let chore = Task::take_order(agent.id);
                    let command = Command::AddJob {
                        kind: ServiceKind::OrderTaking,
                        pos: Some(agent.pos),
                        task: chore,
                    };
                    if let Err(error) = execute(world, command, Some(agent), events) {
                        tracing::warn!(%error, "posting an order-taking chore failed");
                    }
                    *posted = true;
                    *posted_at = Some(agent.pos);
                    self.ticks += 1;
                    Step::Continue
                } else if *taken {
                    Step::Finish
                } else if self.length.map_or(false, |deadline| self.ticks > deadline) {
                    // Pissed off; not staying here a tick longer
                    renounce(agent, events, "waited too long for a waiter");
                    Step::Fail
                } else {
                    self.ticks += 1;
                    Step::Continue
                }
            }

            TaskKind::WaitForOrder { served } => {
                if *served {
                    Step::Finish
                } else if self.length.map_or(false, |deadline| self.ticks > deadline) {
                    renounce(agent, events, "waited too long to be served food");
                    Step::Fail
                } else {
                    self.ticks += 1;
                    Step::Continue
                }
            }

            TaskKind::Leaving => {
                if world.map.entry_points.contains(&agent.pos) {
                    let command = Command::AgentExit { agent: agent.id };
                    if let Err(error) = execute(world, command, Some(agent), events) {
                        tracing::warn!(%error, "agent exit failed");
                    }
                    Step::Finish
                } else {
                    tracing::warn!(agent = ?agent.id, pos = ?agent.pos, "agent cannot exit here");
                    Step::Fail
                }
            }

            TaskKind::Serving {
                kind,
                pos,
                constant,
                started,
            } => {
                if self.length == Some(self.ticks) {
                    // Duty is over: close the post, cycle it if constant
                    let kind = *kind;
                    let pos = *pos;
                    let requeue = constant.then(|| Command::AddJob {
                        kind,
                        pos: Some(pos),
                        task: Task::serving(kind, pos, true, &world.config),
                    });
                    let stop = Command::AttendTo {
                        kind,
                        pos,
                        stop: true,
                    };
                    if let Err(error) = execute(world, stop, Some(agent), events) {
                        tracing::warn!(%error, "closing a post failed");
                    }
                    if let Some(command) = requeue {
                        if let Err(error) = execute(world, command, Some(agent), events) {
                            tracing::warn!(%error, "re-posting a constant duty failed");
                        }
                    }
                    Step::Finish
                } else {
                    if self.ticks == 0 {
                        let command = Command::AttendTo {
                            kind: *kind,
                            pos: *pos,
                            stop: false,
                        };
                        if let Err(error) = execute(world, command, Some(agent), events) {
                            tracing::warn!(%error, "opening a post failed");
                        }
                        *started = true;
                    }
                    self.ticks += 1;
                    Step::Continue
                }
            }

            TaskKind::TakeOrder { patron } => {
                let patron = *patron;
                let order = match world.agent_mut(patron) {
                    Some(customer) => match customer.task.as_mut() {
                        Some(current) => match &mut current.kind {
                            TaskKind::TableOrder { order, taken, .. } => {
                                *taken = true;
                                Some(order.clone())
                            }
                            _ => None,
                        },
                        None => None,
                    },
                    None => None,
                };
                match order {
                    Some(recipe) => {
                        let command = Command::AddJob {
                            kind: ServiceKind::Cooking,
                            pos: None,
                            task: Task::prepare_meal(recipe, patron),
                        };
                        if let Err(error) = execute(world, command, Some(agent), events) {
                            tracing::warn!(%error, "posting a cooking chore failed");
                        }
                        Step::Finish
                    }
                    None => Step::Fail,
                }
            }

            TaskKind::PrepareMeal { recipe, recipient } => {
                let recipient = *recipient;
                let Some(recipe) = world.recipes.get(recipe).cloned() else {
                    tracing::warn!("unknown recipe ordered");
                    return Step::Fail;
                };
                let mut chain = Vec::new();
                for process in &recipe.processes {
                    let Some(station) = world
                        .registry
                        .closest_available(process.station, agent.pos)
                    else {
                        return Step::Fail;
                    };
                    let inputs: Vec<(GoodsId, u32)> = process
                        .inputs
                        .iter()
                        .filter_map(|(name, quantity)| {
                            world.goods.by_name(name).map(|g| (g.id, *quantity))
                        })
                        .collect();
                    if inputs.len() != process.inputs.len() {
                        tracing::warn!(recipe = %recipe.name, "recipe names unknown goods");
                        return Step::Fail;
                    }
                    chain.push(Task::walking(station));
                    chain.push(Task::work_process(process.station, process.time, inputs));
                }
                chain.push(Task::queue_delivery(recipient));
                agent.push_chain(chain);
                Step::Finish
            }

            TaskKind::WorkProcess {
                inputs, consumed, ..
            } => {
                if self.ticks == 0 && !*consumed {
                    let commands: Vec<Command> = inputs
                        .iter()
                        .map(|&(goods, quantity)| Command::RemoveStock { goods, quantity })
                        .collect();
                    for command in commands {
                        if execute(world, command, Some(agent), events).is_err() {
                            // Missing ingredients abort this stage only;
                            // the store itself is untouched
                            return Step::Fail;
                        }
                    }
                    *consumed = true;
                }
                if self.length == Some(self.ticks) {
                    Step::Finish
                } else {
                    self.ticks += 1;
                    Step::Continue
                }
            }

            TaskKind::QueueDelivery { recipient } => {
                let command = Command::AddJob {
                    kind: ServiceKind::Delivering,
                    pos: Some(agent.pos),
                    task: Task::deliver_meal(*recipient),
                };
                if let Err(error) = execute(world, command, Some(agent), events) {
                    tracing::warn!(%error, "posting a delivery chore failed");
                }
                Step::Finish
            }

            TaskKind::DeliverMeal { recipient } => {
                let recipient = *recipient;
                match world.agent(recipient).map(|a| a.pos) {
                    Some(target) => {
                        agent.push_chain(vec![Task::walking(target), Task::serve_meal(recipient)]);
                        Step::Finish
                    }
                    None => Step::Fail,
                }
            }

            TaskKind::ServeMeal { recipient } => {
                let recipient = *recipient;
                let served = match world.agent_mut(recipient) {
                    Some(customer) => match customer.task.as_mut() {
                        Some(current) => match &mut current.kind {
                            TaskKind::WaitForOrder { served } => {
                                *served = true;
                                true
                            }
                            _ => false,
                        },
                        None => false,
                    },
                    None => false,
                };
                if served {
                    Step::Finish
                } else {
                    Step::Fail
                }
            }
        }
    }
}

/// The patron gives up on the establishment: drop every need so the next
/// decision cycle sends them to the door
fn renounce(agent: &mut Agent, events: &mut Vec<SimulationEvent>, reason: &str) {
    if let Some(patron) = agent.patron_mut() {
        patron.needs.cancel();
    }
    events.push(SimulationEvent::PatronRenounced {
        agent: agent.id,
        reason: reason.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_starts_running() {
        let config = SimConfig::default();
        let task = Task::wandering(&config);
        assert!(task.is_running());
        assert_eq!(task.length, Some(config.wander_length));
    }

    #[test]
    fn test_labels() {
        let config = SimConfig::default();
        assert_eq!(Task::wandering(&config).label(), "Being idle");
        assert_eq!(
            Task::walking(GridPos::new(1, 1, 0)).label(),
            "Going somewhere"
        );
        assert_eq!(
            Task::work_process(ServiceKind::Workshop, 5, vec![]).label(),
            "Cutting ingredients"
        );
    }

    #[test]
    fn test_board_source() {
        let task = Task::take_order(AgentId(1)).from_board();
        assert_eq!(task.source, TaskSource::Board);
    }
}
