//! A* pathfinding over the tavern grid
//!
//! Movement is 8-connected with a small diagonal surcharge so agents
//! prefer straight corridors. No path is a routine planning outcome, not
//! an error; callers fall back to another chain instead of retrying.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::types::GridPos;
use crate::spatial::map::TavernMap;
use ahash::AHashMap;

const DIAGONAL_COST: f32 = 1.41;

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    pos: GridPos,
    f_cost: f32, // g_cost + heuristic
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find the shortest walkable route using A*
///
/// Returns the tile sequence including both endpoints, or None if the
/// goal is unreachable.
pub fn find_path(map: &TavernMap, start: GridPos, goal: GridPos) -> Option<Vec<GridPos>> {
    if start == goal {
        return Some(vec![start]);
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<GridPos, GridPos> = AHashMap::new();
    let mut g_scores: AHashMap<GridPos, f32> = AHashMap::new();

    g_scores.insert(start, 0.0);
    open_set.push(PathNode {
        pos: start,
        f_cost: start.chebyshev(&goal) as f32,
    });

    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            return Some(reconstruct_path(&came_from, current.pos));
        }

        let current_g = *g_scores.get(&current.pos).unwrap_or(&f32::INFINITY);

        for neighbor in map.neighbors(current.pos) {
            if !map.is_walkable(neighbor) {
                continue;
            }

            let diagonal = neighbor.x != current.pos.x && neighbor.y != current.pos.y;
            let move_cost = if diagonal { DIAGONAL_COST } else { 1.0 };

            let tentative_g = current_g + move_cost;
            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.pos);
                g_scores.insert(neighbor, tentative_g);

                let f_cost = tentative_g + neighbor.chebyshev(&goal) as f32;
                open_set.push(PathNode {
                    pos: neighbor,
                    f_cost,
                });
            }
        }
    }

    None // No path found
}

/// Reconstruct path from came_from map
fn reconstruct_path(came_from: &AHashMap<GridPos, GridPos>, mut current: GridPos) -> Vec<GridPos> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::objects::{PlacedObject, ServiceKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn open_map() -> TavernMap {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut map = TavernMap::new(14, 14, &mut rng);
        for y in 1..13 {
            for x in 1..13 {
                map.build_tile(GridPos::new(x, y, 0)).unwrap();
            }
        }
        map
    }

    fn beam() -> PlacedObject {
        PlacedObject {
            name: "Beam".into(),
            service: ServiceKind::Support,
            blocks: true,
        }
    }

    #[test]
    fn test_pathfind_straight_line() {
        let map = open_map();
        let start = GridPos::new(2, 2, 0);
        let goal = GridPos::new(8, 2, 0);

        let path = find_path(&map, start, goal).expect("path should exist");
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        assert_eq!(path.len(), 7);
    }

    #[test]
    fn test_pathfind_around_obstacle() {
        let mut map = open_map();
        // Block most of a column, leaving a gap at the top
        for y in 3..13 {
            map.place_object(GridPos::new(6, y, 0), beam());
        }

        let start = GridPos::new(2, 6, 0);
        let goal = GridPos::new(10, 6, 0);

        let path = find_path(&map, start, goal).expect("path should exist");
        assert!(path.iter().all(|&p| map.is_walkable(p)));
        assert_eq!(path.last(), Some(&goal));
    }

    #[test]
    fn test_pathfind_no_path() {
        let mut map = open_map();
        // Seal the goal behind beams
        let goal = GridPos::new(6, 6, 0);
        for p in map.neighbors(goal) {
            map.place_object(p, beam());
        }

        assert!(find_path(&map, GridPos::new(2, 2, 0), goal).is_none());
    }

    #[test]
    fn test_pathfind_same_start_goal() {
        let map = open_map();
        let start = GridPos::new(5, 5, 0);
        let path = find_path(&map, start, start).unwrap();
        assert_eq!(path, vec![start]);
    }

    #[test]
    fn test_pathfind_unbuilt_goal() {
        let map = open_map();
        // (0, 0) is outside the built area
        assert!(find_path(&map, GridPos::new(2, 2, 0), GridPos::new(0, 0, 0)).is_none());
    }
}
