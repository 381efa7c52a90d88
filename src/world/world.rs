//! The world aggregate: map, registries, stock, money and agents
//!
//! The world owns everything the simulation mutates and is the single
//! dispatch point for commands. Agents are stored in registration order;
//! that order is the tick order and the contention order (see DESIGN.md).

use crate::command::{execute, Command, InboundMessage};
use crate::core::config::SimConfig;
use crate::core::error::Result;
use crate::core::types::{AgentId, GridPos, Money, Tick};
use crate::entity::agent::{Agent, CreatureClass, Job, Race};
use crate::entity::jobs::JobBoard;
use crate::entity::needs::Needs;
use crate::simulation::tick::{run_simulation_tick, SimulationEvent};
use crate::spatial::map::TavernMap;
use crate::world::ledger::Ledger;
use crate::world::objects::{catalog, ObjectTemplate};
use crate::world::registry::ServiceRegistry;
use crate::world::store::{GoodsCatalog, RecipeBook, Storage};
use ahash::AHashSet;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

pub struct World {
    pub config: SimConfig,
    pub map: TavernMap,
    pub registry: ServiceRegistry,
    pub store: Storage,
    pub goods: GoodsCatalog,
    pub recipes: RecipeBook,
    pub ledger: Ledger,
    pub jobs: JobBoard,
    pub templates: Vec<ObjectTemplate>,
    pub cash: Money,
    pub current_tick: Tick,
    pub rng: ChaCha8Rng,
    /// Registration-ordered agent slots; empty slots are compacted at the
    /// end of each tick
    agents: Vec<Option<Agent>>,
    queued: VecDeque<Command>,
    /// Agents that exited while detached from their slot this tick
    departing: AHashSet<AgentId>,
    next_agent_id: u64,
}

impl World {
    pub fn new(width: usize, height: usize, seed: u64) -> Self {
        Self::with_config(width, height, seed, SimConfig::default())
    }

    pub fn with_config(width: usize, height: usize, seed: u64, config: SimConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let map = TavernMap::new(width, height, &mut rng);
        Self {
            cash: config.starting_cash,
            config,
            map,
            registry: ServiceRegistry::new(),
            store: Storage::new(),
            goods: GoodsCatalog::with_defaults(),
            recipes: RecipeBook::with_defaults(),
            ledger: Ledger::new(),
            jobs: JobBoard::new(),
            templates: catalog(),
            current_tick: 0,
            rng,
            agents: Vec::new(),
            queued: VecDeque::new(),
            departing: AHashSet::new(),
            next_agent_id: 1,
        }
    }

    /// Advance the simulation one step
    pub fn tick(&mut self) -> Vec<SimulationEvent> {
        run_simulation_tick(self)
    }

    /// Queue a command for dispatch at the start of the next tick
    pub fn enqueue_command(&mut self, command: Command) {
        self.queued.push_back(command);
    }

    pub(crate) fn pop_queued_command(&mut self) -> Option<Command> {
        self.queued.pop_front()
    }

    /// Dispatch a command synchronously
    pub fn dispatch(
        &mut self,
        command: Command,
        events: &mut Vec<SimulationEvent>,
    ) -> Result<()> {
        execute(self, command, None, events)
    }

    /// Apply one message from the host's transport
    pub fn handle_message(&mut self, message: InboundMessage, events: &mut Vec<SimulationEvent>) {
        match message {
            InboundMessage::WorldCommand { command } => {
                if let Err(error) = self.dispatch(command, events) {
                    tracing::warn!(%error, "transport command failed");
                }
            }
            InboundMessage::Customer { customer } => {
                self.register_agent(customer, events);
            }
            InboundMessage::Recruit { recruit, profile } => {
                self.recruit(recruit, profile, events);
            }
        }
    }

    fn alloc_id(&mut self) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        id
    }

    /// Register an externally built agent, keeping ids collision-free
    pub fn register_agent(
        &mut self,
        mut agent: Agent,
        events: &mut Vec<SimulationEvent>,
    ) -> AgentId {
        if agent.id.0 == 0 || self.agent(agent.id).is_some() {
            agent.id = self.alloc_id();
        } else if agent.id.0 >= self.next_agent_id {
            self.next_agent_id = agent.id.0 + 1;
        }
        let id = agent.id;
        events.push(SimulationEvent::AgentSpawned {
            agent: id,
            name: agent.name.clone(),
        });
        self.agents.push(Some(agent));
        id
    }

    #[allow(clippy::too_many_arguments)]
    pub fn spawn_patron(
        &mut self,
        pos: GridPos,
        race: Race,
        class: CreatureClass,
        level: u8,
        money: Money,
        needs: Needs,
        events: &mut Vec<SimulationEvent>,
    ) -> AgentId {
        let id = self.alloc_id();
        let agent = Agent::patron(
            id,
            format!("patron-{}", id.0),
            pos,
            race,
            class,
            level,
            money,
            needs,
        );
        events.push(SimulationEvent::AgentSpawned {
            agent: id,
            name: agent.name.clone(),
        });
        self.agents.push(Some(agent));
        id
    }

    pub fn spawn_employee(
        &mut self,
        pos: GridPos,
        job: Job,
        events: &mut Vec<SimulationEvent>,
    ) -> AgentId {
        let id = self.alloc_id();
        let name = format!("{}-{}", job.title.to_lowercase(), id.0);
        let agent = Agent::employee(id, name.clone(), pos, job);
        events.push(SimulationEvent::AgentSpawned { agent: id, name });
        self.agents.push(Some(agent));
        id
    }

    /// The player's avatar, created by the first successful build
    pub fn spawn_publican(
        &mut self,
        pos: GridPos,
        events: &mut Vec<SimulationEvent>,
    ) -> AgentId {
        let id = self.alloc_id();
        let agent = Agent::employee(id, "You".into(), pos, Job::publican());
        events.push(SimulationEvent::AgentSpawned {
            agent: id,
            name: agent.name.clone(),
        });
        self.agents.push(Some(agent));
        id
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().flatten().find(|a| a.id == id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().flatten().find(|a| a.id == id)
    }

    /// Live agents in registration order
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().flatten()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.iter().flatten().count()
    }

    /// Remove an agent from its slot, or mark a detached agent as
    /// departing so the tick loop drops it
    pub(crate) fn remove_agent(&mut self, id: AgentId) {
        let slot = self
            .agents
            .iter_mut()
            .find(|s| s.as_ref().map_or(false, |a| a.id == id));
        match slot {
            Some(slot) => *slot = None,
            None => {
                self.departing.insert(id);
            }
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.agents.len()
    }

    pub(crate) fn take_agent_slot(&mut self, index: usize) -> Option<Agent> {
        self.agents.get_mut(index).and_then(Option::take)
    }

    pub(crate) fn restore_agent_slot(&mut self, index: usize, agent: Agent) {
        if let Some(slot) = self.agents.get_mut(index) {
            *slot = Some(agent);
        }
    }

    pub(crate) fn clear_departing(&mut self, id: AgentId) -> bool {
        self.departing.remove(&id)
    }

    pub(crate) fn compact_agents(&mut self) {
        self.agents.retain(Option::is_some);
    }

    /// Rebuild a patron as staff
    ///
    /// Outstanding tasks are unwound first so seats and chores are never
    /// leaked, then a fresh employee takes the patron's place at the end
    /// of the registration order.
    pub fn recruit(&mut self, id: AgentId, profile: Job, events: &mut Vec<SimulationEvent>) {
        let index = self
            .agents
            .iter()
            .position(|s| s.as_ref().map_or(false, |a| a.id == id));
        let Some(index) = index else {
            tracing::warn!(?id, "cannot recruit: no such agent");
            return;
        };
        let Some(mut agent) = self.agents[index].take() else {
            return;
        };
        if let Some(mut task) = agent.task.take() {
            task.on_fail(&mut agent, self, events);
        }
        agent.fail_plan(self, events);
        self.jobs.clear_ongoing(agent.id);
        self.compact_agents();

        events.push(SimulationEvent::AgentLeft { agent: id });
        self.spawn_employee(agent.pos, profile, events);
    }
}
