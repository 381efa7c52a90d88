//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Unique identifier for agents (patrons, employees, the publican)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Money amount in coppers
pub type Money = i64;

/// A tile coordinate on the tavern grid
///
/// The z component selects the floor. Pathfinding and room queries
/// operate within a single floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Manhattan distance, ignoring floors
    pub fn manhattan(&self, other: &Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Chebyshev distance, the tick count of an unobstructed 8-connected walk
    pub fn chebyshev(&self, other: &Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Offset within the same floor
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_equality() {
        let a = AgentId(1);
        let b = AgentId(1);
        let c = AgentId(2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_agent_id_hash() {
        use std::collections::HashMap;
        let mut map: HashMap<AgentId, &str> = HashMap::new();
        map.insert(AgentId(1), "publican");
        assert_eq!(map.get(&AgentId(1)), Some(&"publican"));
    }

    #[test]
    fn test_manhattan_distance() {
        let a = GridPos::new(2, 3, 0);
        let b = GridPos::new(5, 1, 0);
        assert_eq!(a.manhattan(&b), 5);
        assert_eq!(b.manhattan(&a), 5);
        assert_eq!(a.manhattan(&a), 0);
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = GridPos::new(0, 0, 0);
        let b = GridPos::new(3, 7, 0);
        assert_eq!(a.chebyshev(&b), 7);
    }

    #[test]
    fn test_offset_keeps_floor() {
        let a = GridPos::new(4, 4, 2);
        let b = a.offset(-1, 1);
        assert_eq!(b, GridPos::new(3, 5, 2));
    }
}
