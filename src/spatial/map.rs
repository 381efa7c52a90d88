//! The tavern map: tiles, rooms, entry points and spatial queries
//!
//! The map owns every tile and answers walkability, neighborhood, room and
//! closest-of queries. Construction mutations go through the command
//! dispatch; walkability is derived from tile state, so a path query on the
//! next tick always reflects the latest topology.

use crate::core::types::GridPos;
use crate::world::objects::{PlacedObject, RoomKind, ServiceKind};
use ahash::{AHashMap, AHashSet};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One cell of the tavern grid
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tile {
    pub wall: bool,
    pub built: bool,
    pub room: Option<RoomKind>,
    pub object: Option<PlacedObject>,
    /// Decoration value used by the renderer for the parchment background
    pub background: f32,
}

impl Tile {
    pub fn is_walkable(&self) -> bool {
        !self.wall && self.built && self.object.as_ref().map_or(true, |o| !o.blocks)
    }

    pub fn has_service(&self, kind: ServiceKind) -> bool {
        self.object.as_ref().map_or(false, |o| o.service == kind)
    }

    /// Room separators (doors) end a flood fill without blocking movement
    pub fn is_separator(&self) -> bool {
        self.has_service(ServiceKind::RoomSeparator)
    }
}

/// The physical manifestation of the tavern
#[derive(Debug, Clone)]
pub struct TavernMap {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    tiles: Vec<Tile>,
    /// Rooms defined so far, appended per kind; never merged
    pub rooms: AHashMap<RoomKind, Vec<Vec<GridPos>>>,
    /// Doors giving onto the outside; patrons arrive and leave here
    pub entry_points: Vec<GridPos>,
}

impl TavernMap {
    pub fn new(width: usize, height: usize, rng: &mut impl Rng) -> Self {
        let mut tiles = vec![Tile::default(); width * height];
        for tile in &mut tiles {
            tile.background = rng.gen::<f32>();
        }
        Self {
            width,
            height,
            depth: 1,
            tiles,
            rooms: AHashMap::new(),
            entry_points: Vec::new(),
        }
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        if pos.x < 0
            || pos.y < 0
            || pos.z < 0
            || pos.x as usize >= self.width
            || pos.y as usize >= self.height
            || pos.z as usize >= self.depth
        {
            return None;
        }
        Some((pos.z as usize * self.height + pos.y as usize) * self.width + pos.x as usize)
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        self.index(pos).is_some()
    }

    /// True for tiles on the outer edge of the map, which may never be built
    pub fn is_border(&self, pos: GridPos) -> bool {
        pos.x == 0
            || pos.y == 0
            || pos.x as usize == self.width - 1
            || pos.y as usize == self.height - 1
    }

    pub fn tile(&self, pos: GridPos) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, pos: GridPos) -> Option<&mut Tile> {
        self.index(pos).map(move |i| &mut self.tiles[i])
    }

    pub fn is_walkable(&self, pos: GridPos) -> bool {
        self.tile(pos).map_or(false, Tile::is_walkable)
    }

    /// The 8-connected neighbor coordinates, clipped to the map
    pub fn neighbors(&self, pos: GridPos) -> Vec<GridPos> {
        let mut result = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let p = pos.offset(dx, dy);
                if self.in_bounds(p) {
                    result.push(p);
                }
            }
        }
        result
    }

    /// The 4-connected neighbor coordinates, clipped to the map
    pub fn immediate_neighbors(&self, pos: GridPos) -> Vec<GridPos> {
        [(0, -1), (-1, 0), (1, 0), (0, 1)]
            .iter()
            .map(|&(dx, dy)| pos.offset(dx, dy))
            .filter(|&p| self.in_bounds(p))
            .collect()
    }

    /// Tiles an agent may step onto from `pos`
    pub fn legit_moves_from(&self, pos: GridPos) -> Vec<GridPos> {
        self.neighbors(pos)
            .into_iter()
            .filter(|&p| self.is_walkable(p))
            .collect()
    }

    /// All tiles forming one architectural unit around `seed`
    ///
    /// Expands through built, unwalled tiles, stopping at walls and room
    /// separators. Used for room definition and closest-room queries.
    pub fn flood_fill(&self, seed: GridPos) -> Vec<GridPos> {
        let fillable = |tile: &Tile| tile.built && !tile.wall && !tile.is_separator();

        let mut fill = Vec::new();
        let mut seen = AHashSet::new();
        let mut open = Vec::new();
        if self.tile(seed).map_or(false, fillable) {
            open.push(seed);
            seen.insert(seed);
        }
        while let Some(pos) = open.pop() {
            fill.push(pos);
            for next in self.immediate_neighbors(pos) {
                if !seen.contains(&next) && self.tile(next).map_or(false, fillable) {
                    seen.insert(next);
                    open.push(next);
                }
            }
        }
        fill
    }

    /// A wall giving onto the exterior: next to the map edge or touching an
    /// unbuilt tile. Entry points (main doors) may only go on such walls.
    pub fn is_outside_wall(&self, pos: GridPos) -> bool {
        let neighbors = self.immediate_neighbors(pos);
        if neighbors.len() < 4 {
            return true;
        }
        neighbors
            .iter()
            .any(|&p| self.tile(p).map_or(true, |t| !t.built))
    }

    /// The member of `coords` closest to `origin` by manhattan distance,
    /// ties broken by list order
    pub fn closest_in(&self, coords: &[GridPos], origin: GridPos) -> Option<GridPos> {
        coords
            .iter()
            .copied()
            .min_by_key(|p| p.manhattan(&origin))
    }

    /// All tiles of the closest room of the given kind, if one exists
    pub fn closest_room(&self, kind: RoomKind, origin: GridPos) -> Option<&Vec<GridPos>> {
        let rooms = self.rooms.get(&kind)?;
        rooms.iter().min_by_key(|tiles| {
            tiles
                .iter()
                .map(|p| p.manhattan(&origin))
                .min()
                .unwrap_or(u32::MAX)
        })
    }

    pub fn room_at(&self, pos: GridPos) -> Option<RoomKind> {
        self.tile(pos).and_then(|t| t.room)
    }

    /// Record a defined room and tag its tiles
    pub fn define_room(&mut self, kind: RoomKind, tiles: Vec<GridPos>) {
        for &pos in &tiles {
            if let Some(tile) = self.tile_mut(pos) {
                tile.room = Some(kind);
            }
        }
        self.rooms.entry(kind).or_default().push(tiles);
    }

    /// Count tiles to the nearest wall from `pos` going in direction `dir`.
    /// The map edge counts as a wall.
    pub fn distance_to_wall(&self, pos: GridPos, dir: (i32, i32)) -> u32 {
        match self.tile(pos) {
            Some(t) if !t.wall && t.built => {}
            _ => return 0,
        }
        let mut counter = 0;
        let mut p = pos;
        loop {
            p = p.offset(dir.0, dir.1);
            match self.tile(p) {
                None => return counter,
                Some(t) if t.wall => return counter,
                Some(_) => counter += 1,
            }
        }
    }

    /// The walkable orthogonal neighbor of `pos` closest to a wall
    ///
    /// Used to pick the attending spot behind a counter.
    pub fn closest_to_wall_neighbor(&self, pos: GridPos) -> Option<GridPos> {
        let legit: Vec<GridPos> = self
            .immediate_neighbors(pos)
            .into_iter()
            .filter(|&p| self.is_walkable(p))
            .collect();
        legit.into_iter().min_by_key(|&p| {
            let dir = (p.x - pos.x, p.y - pos.y);
            self.distance_to_wall(p, dir)
        })
    }

    /// Coordinates of every tile bearing an object of the given service kind
    pub fn tiles_with_service(&self, kind: ServiceKind) -> Vec<GridPos> {
        let mut coords = Vec::new();
        for z in 0..self.depth {
            for y in 0..self.height {
                for x in 0..self.width {
                    let pos = GridPos::new(x as i32, y as i32, z as i32);
                    if self.tile(pos).map_or(false, |t| t.has_service(kind)) {
                        coords.push(pos);
                    }
                }
            }
        }
        coords
    }

    /// Make a tile built and walkable, surrounding it with walls where the
    /// neighborhood is still unbuilt. Border tiles are rejected outright.
    pub fn build_tile(&mut self, pos: GridPos) -> crate::core::error::Result<()> {
        if !self.in_bounds(pos) || self.is_border(pos) {
            return Err(crate::core::error::TavernError::BorderTile(pos));
        }
        if let Some(tile) = self.tile_mut(pos) {
            tile.built = true;
            tile.wall = false;
        }
        for p in self.neighbors(pos) {
            if let Some(tile) = self.tile_mut(p) {
                if !tile.built {
                    tile.built = true;
                    tile.wall = true;
                }
            }
        }
        Ok(())
    }

    /// Turn a wall tile into an entry point (a main door)
    pub fn add_entry_point(&mut self, pos: GridPos) {
        let is_wall = self.tile(pos).map_or(false, |t| t.wall);
        if !is_wall {
            return;
        }
        if let Some(tile) = self.tile_mut(pos) {
            tile.wall = false;
            tile.built = true;
        }
        self.entry_points.push(pos);
    }

    pub fn place_object(&mut self, pos: GridPos, object: PlacedObject) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.object = Some(object);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_map() -> TavernMap {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut map = TavernMap::new(12, 12, &mut rng);
        for y in 2..8 {
            for x in 2..8 {
                map.build_tile(GridPos::new(x, y, 0)).unwrap();
            }
        }
        map
    }

    #[test]
    fn test_build_walls_in_the_room() {
        let map = test_map();
        assert!(map.is_walkable(GridPos::new(3, 3, 0)));
        // The ring around the built area became walls
        let edge = map.tile(GridPos::new(1, 1, 0)).unwrap();
        assert!(edge.built && edge.wall);
        assert!(!map.is_walkable(GridPos::new(1, 1, 0)));
    }

    #[test]
    fn test_border_build_rejected() {
        let mut map = test_map();
        assert!(map.build_tile(GridPos::new(0, 4, 0)).is_err());
        assert!(map.build_tile(GridPos::new(4, 11, 0)).is_err());
    }

    #[test]
    fn test_neighbors_clipped_at_edges() {
        let map = test_map();
        assert_eq!(map.neighbors(GridPos::new(0, 0, 0)).len(), 3);
        assert_eq!(map.neighbors(GridPos::new(5, 5, 0)).len(), 8);
        assert_eq!(map.immediate_neighbors(GridPos::new(0, 5, 0)).len(), 3);
    }

    #[test]
    fn test_flood_fill_stops_at_walls() {
        let map = test_map();
        let fill = map.flood_fill(GridPos::new(4, 4, 0));
        assert_eq!(fill.len(), 36);
        assert!(!fill.contains(&GridPos::new(1, 1, 0)));
    }

    #[test]
    fn test_flood_fill_from_wall_is_empty() {
        let map = test_map();
        assert!(map.flood_fill(GridPos::new(1, 1, 0)).is_empty());
    }

    #[test]
    fn test_outside_wall() {
        let map = test_map();
        // Wall next to unbuilt terrain gives outside
        assert!(map.is_outside_wall(GridPos::new(1, 4, 0)));
        // An interior floor tile surrounded by built tiles does not
        assert!(!map.is_outside_wall(GridPos::new(4, 4, 0)));
    }

    #[test]
    fn test_closest_in_prefers_manhattan() {
        let map = test_map();
        let coords = vec![GridPos::new(7, 7, 0), GridPos::new(3, 3, 0)];
        assert_eq!(
            map.closest_in(&coords, GridPos::new(2, 2, 0)),
            Some(GridPos::new(3, 3, 0))
        );
        assert_eq!(map.closest_in(&[], GridPos::new(2, 2, 0)), None);
    }

    #[test]
    fn test_define_room_tags_tiles() {
        let mut map = test_map();
        let tiles = map.flood_fill(GridPos::new(4, 4, 0));
        map.define_room(RoomKind::Tavern, tiles);
        assert_eq!(map.room_at(GridPos::new(4, 4, 0)), Some(RoomKind::Tavern));
        assert_eq!(map.rooms[&RoomKind::Tavern].len(), 1);
    }

    #[test]
    fn test_closest_room_of_kind() {
        let mut rng = ChaCha8Rng::seed_from_u64(19);
        let mut map = TavernMap::new(20, 20, &mut rng);
        for y in 2..6 {
            for x in 2..6 {
                map.build_tile(GridPos::new(x, y, 0)).unwrap();
            }
        }
        for y in 12..16 {
            for x in 12..16 {
                map.build_tile(GridPos::new(x, y, 0)).unwrap();
            }
        }
        let near = map.flood_fill(GridPos::new(3, 3, 0));
        let far = map.flood_fill(GridPos::new(13, 13, 0));
        map.define_room(RoomKind::Bedroom, near.clone());
        map.define_room(RoomKind::Bedroom, far);

        let found = map
            .closest_room(RoomKind::Bedroom, GridPos::new(0, 0, 0))
            .unwrap();
        assert_eq!(found.len(), near.len());
        assert!(found.contains(&GridPos::new(3, 3, 0)));
        assert!(map.closest_room(RoomKind::Kitchen, GridPos::new(0, 0, 0)).is_none());
    }

    #[test]
    fn test_entry_point_becomes_walkable() {
        let mut map = test_map();
        let door = GridPos::new(2, 1, 0);
        assert!(map.tile(door).unwrap().wall);
        map.add_entry_point(door);
        assert!(map.is_walkable(door));
        assert!(map.entry_points.contains(&door));
    }

    #[test]
    fn test_distance_to_wall() {
        let map = test_map();
        // From (3, 4) going left the wall is at x = 1
        assert_eq!(map.distance_to_wall(GridPos::new(3, 4, 0), (-1, 0)), 1);
        // Walls themselves count zero
        assert_eq!(map.distance_to_wall(GridPos::new(1, 4, 0), (-1, 0)), 0);
    }
}
