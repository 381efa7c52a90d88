//! Taproom - turn-based tavern management simulation core
//!
//! Autonomous agents (patrons, staff, the publican) pursue multi-step
//! goals inside a player-built tavern, competing for shared seats,
//! counters, ovens and beds through a reservation registry. The
//! simulation is single-threaded and tick-discrete; the host loop drives
//! it through [`world::World::tick`] and the message contracts in
//! [`command`].

pub mod command;
pub mod core;
pub mod entity;
pub mod simulation;
pub mod spatial;
pub mod world;
