//! The clientele: when and how new customers arrive
//!
//! The tavern is ready to receive customers once it has both an entry
//! point and a counter. From there a pacing counter ramps up the arrival
//! probability until someone walks in.

use crate::core::types::AgentId;
use crate::entity::agent::{CreatureClass, Race};
use crate::entity::needs::Needs;
use crate::simulation::tick::SimulationEvent;
use crate::world::objects::ServiceKind;
use crate::world::world::World;
use rand::Rng;

const RACES: [Race; 3] = [Race::Human, Race::Elf, Race::Dwarf];
const CLASSES: [CreatureClass; 4] = [
    CreatureClass::Warrior,
    CreatureClass::Priest,
    CreatureClass::Wizard,
    CreatureClass::Thief,
];

/// Handles the clientele of a tavern
#[derive(Debug, Default)]
pub struct Customers {
    tick_counter: u32,
    can_receive_customers: bool,
}

impl Customers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ready once the tavern has an entry point and a counter
    pub fn can_receive(&mut self, world: &World) -> bool {
        if self.can_receive_customers {
            return true;
        }
        let has_counter = !world.map.tiles_with_service(ServiceKind::Ordering).is_empty();
        let has_entry_point = !world.map.entry_points.is_empty();
        if has_counter && has_entry_point {
            self.can_receive_customers = true;
        }
        self.can_receive_customers
    }

    /// Called once per simulation step by the host, after the world tick
    pub fn tick(&mut self, world: &mut World, events: &mut Vec<SimulationEvent>) {
        self.tick_counter += 1;
        let warmup = world.config.spawn_warmup;
        if self.tick_counter <= warmup {
            return;
        }
        if !self.can_receive(world) {
            self.tick_counter = 0;
            return;
        }
        let probability = (self.tick_counter - warmup) / world.config.spawn_ramp_divisor;
        if world.rng.gen_range(1..=100) < probability {
            self.make_customer(world, events);
            if world.rng.gen_range(1..=5) == 1 {
                self.tick_counter = 0;
            }
        }
    }

    /// Generate a patron at a random entry point
    pub fn make_customer(
        &mut self,
        world: &mut World,
        events: &mut Vec<SimulationEvent>,
    ) -> Option<AgentId> {
        if world.map.entry_points.is_empty() {
            return None;
        }
        let which = world.rng.gen_range(0..world.map.entry_points.len());
        let door = world.map.entry_points[which];
        let race = RACES[world.rng.gen_range(0..RACES.len())];
        let class = if world.rng.gen_range(1..=10) == 1 {
            CLASSES[world.rng.gen_range(0..CLASSES.len())]
        } else {
            CreatureClass::Common
        };
        let level = world.rng.gen_range(1..=3);
        let money_min = world.config.patron_money_min;
        let money_max = world.config.patron_money_max;
        let money = world.rng.gen_range(money_min..=money_max);
        let thirst = world.rng.gen_range(1..=world.config.patron_thirst_max);
        let hunger = world.rng.gen_range(0..=world.config.patron_hunger_max);
        // Gambling and sleep drives come with rooms the player cannot
        // build yet
        let needs = Needs::new(thirst, hunger, 0, 0);

        Some(world.spawn_patron(door, race, class, level, money, needs, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Area, Command};
    use crate::core::types::GridPos;
    use crate::world::objects::{template_named, RoomKind};

    fn furnished_world() -> World {
        let mut world = World::new(16, 16, 42);
        let mut events = Vec::new();
        world
            .dispatch(
                Command::Build {
                    area: Area::rect(2, 2, 10, 10, 0),
                },
                &mut events,
            )
            .unwrap();
        let tiles = world.map.flood_fill(GridPos::new(5, 5, 0));
        world
            .dispatch(Command::DefineRoom { kind: RoomKind::Tavern, tiles }, &mut events)
            .unwrap();
        let door = template_named(&world.templates, "Door").unwrap();
        world
            .dispatch(
                Command::PlaceObject {
                    area: Area::point(GridPos::new(4, 1, 0)),
                    template: door,
                },
                &mut events,
            )
            .unwrap();
        let counter = template_named(&world.templates, "Counter").unwrap();
        world
            .dispatch(
                Command::PlaceObject {
                    area: Area::point(GridPos::new(6, 6, 0)),
                    template: counter,
                },
                &mut events,
            )
            .unwrap();
        world
    }

    #[test]
    fn test_not_ready_without_counter() {
        let mut world = World::new(16, 16, 42);
        let mut customers = Customers::new();
        assert!(!customers.can_receive(&world));

        let mut events = Vec::new();
        world
            .dispatch(
                Command::Build {
                    area: Area::rect(2, 2, 10, 10, 0),
                },
                &mut events,
            )
            .unwrap();
        assert!(!customers.can_receive(&world));
    }

    #[test]
    fn test_ready_with_door_and_counter() {
        let world = furnished_world();
        let mut customers = Customers::new();
        assert!(customers.can_receive(&world));
    }

    #[test]
    fn test_make_customer_spawns_at_entry() {
        let mut world = furnished_world();
        let mut customers = Customers::new();
        let mut events = Vec::new();
        let id = customers.make_customer(&mut world, &mut events).unwrap();
        let patron = world.agent(id).unwrap();
        assert!(world.map.entry_points.contains(&patron.pos));
        let state = patron.patron_state().unwrap();
        assert!(state.needs.thirst >= 1);
        assert!(state.money >= world.config.patron_money_min);
    }
}
