pub mod map;
pub mod pathfinding;

pub use map::{TavernMap, Tile};
pub use pathfinding::find_path;
