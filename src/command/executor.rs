//! Command execution - atomic updates against map, registry, store and
//! ledger
//!
//! `active` carries the agent currently detached from its slot for
//! ticking, so commands issued from inside a task can still reach their
//! issuer. Precondition failures (no money, no room) emit a status event
//! and apply nothing; registry and stock misuse come back as errors for
//! the issuing task to absorb.

use crate::command::{Area, Command};
use crate::core::error::{Result, TavernError};
use crate::core::types::{GridPos, Money};
use crate::entity::agent::Agent;
use crate::simulation::tick::SimulationEvent;
use crate::world::objects::{Footprint, ObjectTemplate, PlacedEffect, RoomKind, ServiceKind};
use crate::world::placement::check_rules;
use crate::world::world::World;

/// Dispatch one command
pub fn execute(
    world: &mut World,
    command: Command,
    mut active: Option<&mut Agent>,
    events: &mut Vec<SimulationEvent>,
) -> Result<()> {
    match command {
        Command::Build { area } => build(world, area, events),
        Command::PlaceObject { area, template } => {
            let Some(template) = world.templates.get(template.0).cloned() else {
                tracing::warn!(?template, "unknown object template");
                return Ok(());
            };
            place_object(world, area, &template, events)
        }
        Command::DefineRoom { kind, tiles } => {
            if kind == RoomKind::Storage {
                world.store.add_cells(tiles.len() as u32);
            }
            world.map.define_room(kind, tiles);
            Ok(())
        }
        Command::BuySupplies {
            goods,
            quantity,
            cancel,
        } => buy_supplies(world, goods, quantity, cancel, events),
        Command::Order { patron } => order(world, patron, active.as_deref_mut(), events),
        Command::ReserveService { kind, pos, release } => {
            if release {
                world.registry.release_service(kind, pos)
            } else {
                world.registry.take_service(kind, pos)
            }
        }
        Command::AttendTo { kind, pos, stop } => {
            attend_to(world, kind, pos, stop);
            Ok(())
        }
        Command::AddJob { kind, pos, task } => {
            world.jobs.add(kind, pos, task);
            Ok(())
        }
        Command::RemoveJob { kind, pos, task } => {
            world.jobs.remove(kind, pos, &task);
            Ok(())
        }
        Command::RemoveStock { goods, quantity } => {
            let Some(goods) = world.goods.get(goods).cloned() else {
                tracing::warn!(?goods, "unknown goods in stock removal");
                return Ok(());
            };
            world.store.take(&goods, quantity)
        }
        Command::AgentExit { agent } => {
            world.remove_agent(agent);
            if let Some(current) = active {
                if current.id == agent {
                    tracing::debug!(?agent, "active agent leaves the floor");
                }
            }
            events.push(SimulationEvent::AgentLeft { agent });
            Ok(())
        }
    }
}

/// Make an area built and walkable; walls grow around it
///
/// The whole command is rejected when the till cannot cover it. A border
/// tile inside the area is rejected individually, with a reason, leaving
/// that tile untouched; the rest of the area still applies.
fn build(world: &mut World, area: Area, events: &mut Vec<SimulationEvent>) -> Result<()> {
    let preview: Money = area.size() as Money * world.config.build_cost_per_tile;
    if world.cash < preview {
        events.push(SimulationEvent::CommandRejected {
            reason: "Not enough money to do this!".into(),
        });
        return Ok(());
    }

    let mut built = 0;
    let mut first_built: Option<GridPos> = None;
    for pos in area.iter() {
        match world.map.build_tile(pos) {
            Ok(()) => {
                built += 1;
                first_built.get_or_insert(pos);
            }
            Err(error) => events.push(SimulationEvent::CommandRejected {
                reason: error.to_string(),
            }),
        }
    }
    if built == 0 {
        return Ok(());
    }

    let cost = built as Money * world.config.build_cost_per_tile;
    world.cash -= cost;
    world.ledger.record(-cost, "Construction costs");

    // The very first build stands the publican up in the new room
    if world.agent_count() == 0 {
        if let Some(pos) = first_built {
            world.spawn_publican(pos, events);
        }
    }
    Ok(())
}

fn place_object(
    world: &mut World,
    area: Area,
    template: &ObjectTemplate,
    events: &mut Vec<SimulationEvent>,
) -> Result<()> {
    match &template.footprint {
        Footprint::Multi { width, height, .. } => {
            if world.cash < template.price {
                events.push(SimulationEvent::CommandRejected {
                    reason: "Not enough money to do this!".into(),
                });
                return Ok(());
            }
            let anchor = area.origin();
            if let Err(error) = check_rules(&world.map, anchor, template) {
                events.push(SimulationEvent::CommandRejected {
                    reason: error.to_string(),
                });
                return Ok(());
            }
            for dy in 0..*height {
                for dx in 0..*width {
                    world
                        .map
                        .place_object(anchor.offset(dx, dy), template.instantiate_cell(dx, dy));
                }
            }
            world.cash -= template.price;
            world
                .ledger
                .record(-template.price, format!("Bought {}", template.name));
            apply_effect(world, template, anchor);
            Ok(())
        }
        Footprint::Single { .. } => {
            let preview: Money = area.size() as Money * template.price;
            if world.cash < preview {
                events.push(SimulationEvent::CommandRejected {
                    reason: "Not enough money to do this!".into(),
                });
                return Ok(());
            }
            let mut placed = 0;
            for pos in area.iter() {
                match check_rules(&world.map, pos, template) {
                    Ok(()) => {
                        world.map.place_object(pos, template.instantiate_cell(0, 0));
                        placed += 1;
                        apply_effect(world, template, pos);
                    }
                    Err(error) => events.push(SimulationEvent::CommandRejected {
                        reason: error.to_string(),
                    }),
                }
            }
            if placed > 0 {
                let cost = placed as Money * template.price;
                world.cash -= cost;
                world
                    .ledger
                    .record(-cost, format!("Bought {}", template.name));
            }
            Ok(())
        }
    }
}

/// Post-placement effects, run once per placed anchor
fn apply_effect(world: &mut World, template: &ObjectTemplate, anchor: GridPos) {
    match template.effect {
        None => {}
        Some(PlacedEffect::OpenService) => open_service_positions(world, template, anchor),
        Some(PlacedEffect::AddEntryPoint) => world.map.add_entry_point(anchor),
        Some(PlacedEffect::AddCounterDuty) => match world.map.closest_to_wall_neighbor(anchor) {
            Some(post) => {
                let duty =
                    crate::entity::tasks::Task::serving(template.service, post, true, &world.config);
                world.jobs.add(template.service, Some(post), duty);
            }
            None => tracing::warn!(?anchor, "counter has no attending spot"),
        },
    }
}

/// Where a fresh object grants its service
///
/// Blocking singles serve across their walkable neighbors; non-blocking
/// singles serve on their own tile; multi-tile objects name their serving
/// cells explicitly.
fn open_service_positions(world: &mut World, template: &ObjectTemplate, anchor: GridPos) {
    match &template.footprint {
        Footprint::Multi { service_cells, .. } => {
            for &(dx, dy) in service_cells {
                let pos = anchor.offset(dx, dy);
                if world.map.is_walkable(pos) {
                    world.registry.open_service(template.service, pos);
                }
            }
        }
        Footprint::Single { blocks } => {
            if *blocks {
                for pos in world.map.immediate_neighbors(anchor) {
                    if world.map.is_walkable(pos) {
                        world.registry.open_service(template.service, pos);
                    }
                }
            } else {
                world.registry.open_service(template.service, anchor);
            }
        }
    }
}

fn buy_supplies(
    world: &mut World,
    goods: crate::world::store::GoodsId,
    quantity: u32,
    cancel: bool,
    events: &mut Vec<SimulationEvent>,
) -> Result<()> {
    let Some(goods) = world.goods.get(goods).cloned() else {
        tracing::warn!(?goods, "unknown goods in buy command");
        return Ok(());
    };
    let total = goods.buying_price * quantity as Money;
    if !cancel {
        if world.cash < total {
            events.push(SimulationEvent::CommandRejected {
                reason: "Not enough money to do this!".into(),
            });
            return Ok(());
        }
        if let Err(error) = world.store.add(&goods, quantity) {
            events.push(SimulationEvent::CommandRejected {
                reason: error.to_string(),
            });
            return Ok(());
        }
        world.cash -= total;
        world
            .ledger
            .record(-total, format!("Bought {}", goods.name));
    } else {
        world.store.take(&goods, quantity)?;
        world.cash += total;
        world
            .ledger
            .record(total, format!("Refunded {}", goods.name));
    }
    Ok(())
}

/// A patron orders at the counter: the best in-stock drink the remaining
/// budget allows, keeping enough back to cover the rest of their thirst
fn order(
    world: &mut World,
    patron: crate::core::types::AgentId,
    mut active: Option<&mut Agent>,
    events: &mut Vec<SimulationEvent>,
) -> Result<()> {
    let (money, thirst) = {
        let agent = match active.as_deref() {
            Some(current) if current.id == patron => Some(&*current),
            _ => world.agent(patron),
        };
        let Some(agent) = agent else {
            tracing::error!(?patron, "order for an unknown agent");
            return Err(TavernError::AgentNotFound(patron));
        };
        let Some(state) = agent.patron_state() else {
            tracing::warn!(?patron, "order from a non-patron");
            return Ok(());
        };
        (state.money, state.needs.thirst)
    };

    let budget_per_round = money / thirst.max(1) as Money;
    let choice = world
        .goods
        .drinks()
        .filter(|g| world.store.has(g.id) && g.selling_price <= budget_per_round)
        .max_by_key(|g| g.selling_price)
        .cloned();

    let Some(drink) = choice else {
        tracing::debug!(?patron, "no affordable drink in stock");
        events.push(SimulationEvent::GoodsStatus {
            category: "drinks".into(),
            available: false,
        });
        return Ok(());
    };

    world.store.take(&drink, 1)?;
    world.cash += drink.selling_price;
    world
        .ledger
        .record(drink.selling_price, format!("Sold {}", drink.name));

    let agent = match active.as_deref_mut() {
        Some(current) if current.id == patron => Some(current),
        _ => world.agent_mut(patron),
    };
    if let Some(agent) = agent {
        if let Some(state) = agent.patron_mut() {
            state.money -= drink.selling_price;
            state.has_drink = true;
        }
    }
    events.push(SimulationEvent::GoodsStatus {
        category: "drinks".into(),
        available: true,
    });
    Ok(())
}

/// An employee begins or stops attending a post; the affected service
/// slots sit across each adjacent object from the attending position
fn attend_to(world: &mut World, kind: ServiceKind, pos: GridPos, stop: bool) {
    let targets: Vec<GridPos> = world
        .map
        .immediate_neighbors(pos)
        .into_iter()
        .filter(|&p| world.map.tile(p).map_or(false, |t| t.has_service(kind)))
        .map(|obj| GridPos::new(obj.x * 2 - pos.x, obj.y * 2 - pos.y, obj.z))
        .filter(|&p| world.map.is_walkable(p))
        .collect();
    for target in targets {
        if stop {
            world.registry.stop_service(kind, target);
        } else {
            world.registry.open_service(kind, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::agent::{CreatureClass, Race};
    use crate::entity::needs::Needs;
    use crate::world::objects::template_named;

    fn built_world() -> World {
        let mut world = World::new(16, 16, 5);
        let mut events = Vec::new();
        world
            .dispatch(
                Command::Build {
                    area: Area::rect(2, 2, 11, 11, 0),
                },
                &mut events,
            )
            .unwrap();
        let tiles = world.map.flood_fill(GridPos::new(5, 5, 0));
        world
            .dispatch(
                Command::DefineRoom {
                    kind: RoomKind::Tavern,
                    tiles,
                },
                &mut events,
            )
            .unwrap();
        world
    }

    fn place(world: &mut World, name: &str, pos: GridPos) {
        let template = template_named(&world.templates, name).unwrap();
        let mut events = Vec::new();
        world
            .dispatch(
                Command::PlaceObject {
                    area: Area::point(pos),
                    template,
                },
                &mut events,
            )
            .unwrap();
    }

    #[test]
    fn test_build_charges_and_spawns_publican() {
        let mut world = World::new(16, 16, 5);
        let cash = world.cash;
        let mut events = Vec::new();
        world
            .dispatch(
                Command::Build {
                    area: Area::rect(2, 2, 4, 4, 0),
                },
                &mut events,
            )
            .unwrap();
        assert_eq!(
            world.cash,
            cash - 9 * world.config.build_cost_per_tile
        );
        assert_eq!(world.agent_count(), 1);
        assert!(world.agents().next().unwrap().is_publican());
        // A second build does not spawn another publican
        world
            .dispatch(
                Command::Build {
                    area: Area::rect(5, 2, 6, 4, 0),
                },
                &mut events,
            )
            .unwrap();
        assert_eq!(world.agent_count(), 1);
    }

    #[test]
    fn test_build_rejects_border_tiles_individually() {
        let mut world = World::new(16, 16, 5);
        let mut events = Vec::new();
        world
            .dispatch(
                Command::Build {
                    area: Area::rect(0, 2, 2, 2, 0),
                },
                &mut events,
            )
            .unwrap();
        // (0,2) is a border tile and stays unbuilt; (1,2) and (2,2) built
        assert!(!world.map.tile(GridPos::new(0, 2, 0)).unwrap().built);
        assert!(world.map.is_walkable(GridPos::new(1, 2, 0)));
        assert!(events
            .iter()
            .any(|e| matches!(e, SimulationEvent::CommandRejected { .. })));
    }

    #[test]
    fn test_chair_opens_sitting_service() {
        let mut world = built_world();
        place(&mut world, "Chair", GridPos::new(5, 5, 0));
        assert!(world
            .registry
            .is_available(ServiceKind::Sitting, GridPos::new(5, 5, 0)));
    }

    #[test]
    fn test_counter_posts_constant_duty() {
        let mut world = built_world();
        place(&mut world, "Counter", GridPos::new(5, 5, 0));
        assert_eq!(world.jobs.pending(ServiceKind::Ordering), 1);
        // The counter itself now blocks
        assert!(!world.map.is_walkable(GridPos::new(5, 5, 0)));
    }

    #[test]
    fn test_attend_to_opens_across_the_object() {
        let mut world = built_world();
        place(&mut world, "Counter", GridPos::new(5, 5, 0));
        // Attending below the counter opens the slot above it
        attend_to(&mut world, ServiceKind::Ordering, GridPos::new(5, 6, 0), false);
        assert!(world
            .registry
            .is_available(ServiceKind::Ordering, GridPos::new(5, 4, 0)));

        attend_to(&mut world, ServiceKind::Ordering, GridPos::new(5, 6, 0), true);
        assert!(!world
            .registry
            .is_available(ServiceKind::Ordering, GridPos::new(5, 4, 0)));
    }

    #[test]
    fn test_buy_and_cancel_round_trip() {
        let mut world = built_world();
        world.store.add_cells(10);
        let ale = world.goods.by_name("Ale").unwrap().id;
        let cash = world.cash;
        let mut events = Vec::new();

        world
            .dispatch(
                Command::BuySupplies {
                    goods: ale,
                    quantity: 2,
                    cancel: false,
                },
                &mut events,
            )
            .unwrap();
        assert_eq!(world.store.amount_of(ale), 2);
        assert_eq!(world.cash, cash - 20);

        world
            .dispatch(
                Command::BuySupplies {
                    goods: ale,
                    quantity: 2,
                    cancel: true,
                },
                &mut events,
            )
            .unwrap();
        assert_eq!(world.store.amount_of(ale), 0);
        assert_eq!(world.cash, cash);
    }

    #[test]
    fn test_order_without_stock_flags_drinks() {
        let mut world = built_world();
        let mut events = Vec::new();
        let id = world.spawn_patron(
            GridPos::new(5, 5, 0),
            Race::Human,
            CreatureClass::Common,
            1,
            20,
            Needs::new(1, 0, 0, 0),
            &mut events,
        );
        events.clear();
        world.dispatch(Command::Order { patron: id }, &mut events).unwrap();
        assert!(events.contains(&SimulationEvent::GoodsStatus {
            category: "drinks".into(),
            available: false,
        }));
        let patron = world.agent(id).unwrap().patron_state().unwrap().clone();
        assert!(!patron.has_drink);
    }

    #[test]
    fn test_order_sells_best_affordable_drink() {
        let mut world = built_world();
        world.store.add_cells(10);
        let ale = world.goods.by_name("Ale").unwrap().clone();
        let wine = world.goods.by_name("Wine").unwrap().clone();
        world.store.add(&ale, 5).unwrap();
        world.store.add(&wine, 5).unwrap();

        let mut events = Vec::new();
        // Thirst 2 with 30 coppers: 15 per round, wine (20) is out, ale fits
        let id = world.spawn_patron(
            GridPos::new(5, 5, 0),
            Race::Elf,
            CreatureClass::Common,
            1,
            30,
            Needs::new(2, 0, 0, 0),
            &mut events,
        );
        let cash = world.cash;
        events.clear();
        world.dispatch(Command::Order { patron: id }, &mut events).unwrap();

        let state = world.agent(id).unwrap().patron_state().unwrap().clone();
        assert!(state.has_drink);
        assert_eq!(state.money, 30 - ale.selling_price);
        assert_eq!(world.store.amount_of(ale.id), 4);
        assert_eq!(world.store.amount_of(wine.id), 5);
        assert_eq!(world.cash, cash + ale.selling_price);
        assert!(events.contains(&SimulationEvent::GoodsStatus {
            category: "drinks".into(),
            available: true,
        }));
    }

    #[test]
    fn test_remove_stock_propagates_shortage() {
        let mut world = built_world();
        let meat = world.goods.by_name("Meat").unwrap().id;
        let mut events = Vec::new();
        let result = world.dispatch(
            Command::RemoveStock {
                goods: meat,
                quantity: 1,
            },
            &mut events,
        );
        assert!(matches!(result, Err(TavernError::OutOfStock { .. })));
    }

    #[test]
    fn test_reserve_service_misuse_is_error() {
        let mut world = built_world();
        let mut events = Vec::new();
        let result = world.dispatch(
            Command::ReserveService {
                kind: ServiceKind::Sitting,
                pos: GridPos::new(3, 3, 0),
                release: false,
            },
            &mut events,
        );
        assert!(matches!(
            result,
            Err(TavernError::ServiceUnavailable { .. })
        ));
    }
}
