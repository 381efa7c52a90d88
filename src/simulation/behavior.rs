//! Behavior selection: what an idle agent does next
//!
//! Runs once per agent per idle tick and pushes exactly one task chain.
//! Every chain needing a scarce resource checks registry availability
//! first; absence means a short wandering fallback and a fresh decision
//! next cycle. Planning failures never surface as hard errors.

use crate::command::{execute, Command};
use crate::entity::agent::{Agent, AgentKind};
use crate::entity::tasks::Task;
use crate::simulation::tick::SimulationEvent;
use crate::spatial::pathfinding::find_path;
use crate::world::objects::ServiceKind;
use crate::world::world::World;

/// Decide and enqueue the next chain for an idle agent
pub fn select_activity(agent: &mut Agent, world: &mut World, events: &mut Vec<SimulationEvent>) {
    match &agent.kind {
        AgentKind::Patron(_) => patron_activity(agent, world, events),
        AgentKind::Employee(_) => employee_activity(agent, world),
    }
}

/// One need-satisfying chain per decision, in the fixed cascade: drink in
/// hand first, then a seat for drinking and eating, then sleep. A patron
/// with nothing left to want heads for the door.
fn patron_activity(agent: &mut Agent, world: &mut World, events: &mut Vec<SimulationEvent>) {
    let Some(patron) = agent.patron_state() else {
        return;
    };
    let needs = patron.needs;
    let has_drink = patron.has_drink;

    if !needs.has_needs() {
        leaving_chain(agent, world);
        return;
    }
    if needs.thirst > 0 && !has_drink {
        order_chain(agent, world, events);
        return;
    }
    if has_drink || needs.hunger > 0 {
        seat_chain(agent, world, events, has_drink, needs.hunger > 0);
        return;
    }
    if needs.sleep > 0 {
        sleep_chain(agent, world, events);
        return;
    }
    // Only gambling remains and the house has no gambling hall
    tracing::debug!(agent = ?agent.id, "no chain can satisfy this need, wandering");
    wander(agent, world);
}

/// Walk to the closest attended counter and order
fn order_chain(agent: &mut Agent, world: &mut World, events: &mut Vec<SimulationEvent>) {
    let Some(patron) = agent.patron_state() else {
        return;
    };
    // Money is a hard constraint: an unaffordable purchase is never planned
    let cheapest = world.goods.drinks().map(|g| g.selling_price).min();
    match cheapest {
        Some(price) if patron.money >= price => {}
        _ => {
            if let Some(patron) = agent.patron_mut() {
                patron.needs.thirst = 0;
            }
            events.push(SimulationEvent::PatronRenounced {
                agent: agent.id,
                reason: "cannot afford a drink".into(),
            });
            wander(agent, world);
            return;
        }
    }

    let Some(counter) = world
        .registry
        .closest_available(ServiceKind::Ordering, agent.pos)
    else {
        wander(agent, world);
        return;
    };
    if find_path(&world.map, agent.pos, counter).is_none() {
        wander(agent, world);
        return;
    }
    agent.push_chain(vec![Task::walking(counter), Task::ordering()]);
}

/// Reserve a seat now, then walk over and consume while seated
///
/// The reservation happens at planning time, inside this agent's tick, so
/// two same-tick contenders resolve deterministically: the earlier-ticked
/// agent takes the seat and the later one sees an empty available set.
fn seat_chain(
    agent: &mut Agent,
    world: &mut World,
    events: &mut Vec<SimulationEvent>,
    include_drink: bool,
    include_food: bool,
) {
    let Some(seat) = world
        .registry
        .closest_available(ServiceKind::Sitting, agent.pos)
    else {
        wander(agent, world);
        return;
    };
    if find_path(&world.map, agent.pos, seat).is_none() {
        wander(agent, world);
        return;
    }
    let reserve = Command::ReserveService {
        kind: ServiceKind::Sitting,
        pos: seat,
        release: false,
    };
    if execute(world, reserve, Some(agent), events).is_err() {
        wander(agent, world);
        return;
    }

    let mut chain = vec![Task::walking(seat), Task::seating()];
    if include_drink {
        chain.push(Task::drinking(&world.config));
    }
    if include_food {
        match world.recipes.daily_meal().map(|r| r.name.clone()) {
            Some(meal) => {
                chain.push(Task::table_order(meal, &world.config));
                chain.push(Task::wait_for_order(&world.config));
                chain.push(Task::eating(&world.config));
            }
            None => tracing::debug!("kitchen has no menu, seating without food"),
        }
    }
    chain.push(Task::standing_up());
    chain.push(Task::open_seat(ServiceKind::Sitting, seat));
    agent.push_chain(chain);
}

/// Find a free sleeping spot in a bedroom
///
/// A missing bedroom just means wandering; the chain is retried on a
/// later decision cycle.
fn sleep_chain(agent: &mut Agent, world: &mut World, events: &mut Vec<SimulationEvent>) {
    let Some(spot) = world
        .registry
        .closest_available(ServiceKind::Sleeping, agent.pos)
    else {
        wander(agent, world);
        return;
    };
    if find_path(&world.map, agent.pos, spot).is_none() {
        wander(agent, world);
        return;
    }
    let reserve = Command::ReserveService {
        kind: ServiceKind::Sleeping,
        pos: spot,
        release: false,
    };
    if execute(world, reserve, Some(agent), events).is_err() {
        wander(agent, world);
        return;
    }
    agent.push_chain(vec![
        Task::walking(spot),
        Task::sleeping(&world.config),
        Task::open_seat(ServiceKind::Sleeping, spot),
    ]);
}

/// Walk to the closest entry point and despawn
fn leaving_chain(agent: &mut Agent, world: &mut World) {
    let Some(door) = world
        .map
        .closest_in(&world.map.entry_points, agent.pos)
    else {
        // Nowhere to leave through; the tavern has swallowed this one
        wander(agent, world);
        return;
    };
    if agent.pos == door {
        agent.push_chain(vec![Task::leaving()]);
        return;
    }
    if find_path(&world.map, agent.pos, door).is_none() {
        wander(agent, world);
        return;
    }
    agent.push_chain(vec![Task::walking(door), Task::leaving()]);
}

/// Scan supported functions in priority order and pull the first chore
fn employee_activity(agent: &mut Agent, world: &mut World) {
    let Some(employee) = agent.employee_state() else {
        return;
    };
    let functions = employee.job.functions.clone();
    for kind in functions {
        let Some((target, chore)) = world.jobs.pull(kind) else {
            continue;
        };
        world.jobs.record_ongoing(agent.id, kind);
        match target {
            Some(pos) if pos != agent.pos => {
                if find_path(&world.map, agent.pos, pos).is_some() {
                    agent.push_chain(vec![Task::walking(pos), chore]);
                } else {
                    // The chore is lost, not re-posted; see DESIGN.md
                    tracing::warn!(?kind, ?pos, "chore target unreachable, dropping chore");
                    world.jobs.clear_ongoing(agent.id);
                    wander(agent, world);
                }
            }
            _ => agent.push_chain(vec![chore]),
        }
        return;
    }
    wander(agent, world);
}

/// The universal fallback: fool around and re-decide next cycle
fn wander(agent: &mut Agent, world: &mut World) {
    agent.push_chain(vec![Task::wandering(&world.config)]);
}
