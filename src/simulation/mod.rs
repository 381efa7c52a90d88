pub mod behavior;
pub mod spawner;
pub mod tick;

pub use spawner::Customers;
pub use tick::{run_simulation_tick, SimulationEvent};
