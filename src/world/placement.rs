//! Placement rules for furniture
//!
//! Every template carries a list of rules checked before it lands on a
//! tile; the implicit default rule (tile built, no existing object) always
//! applies last. A violated rule rejects the placement with a descriptive
//! reason and no partial mutation.

use crate::core::error::{Result, TavernError};
use crate::core::types::GridPos;
use crate::spatial::map::TavernMap;
use crate::world::objects::{Footprint, ObjectTemplate, RoomKind};

/// One placement constraint
#[derive(Debug, Clone)]
pub enum PlacementRule {
    /// The tile must belong to one of the listed room kinds
    InRoom(Vec<RoomKind>),
    /// The tile must not be a wall
    NotWall,
    /// A wall must border the tile (8-connected)
    NextToWall,
    /// The tile must be a wall giving onto the outside
    ExteriorWall,
    /// Either of two rules must hold
    Any(Box<PlacementRule>, Box<PlacementRule>),
}

impl PlacementRule {
    pub fn check(&self, map: &TavernMap, pos: GridPos) -> Result<()> {
        let reject = |reason| Err(TavernError::PlacementRejected { pos, reason });
        match self {
            PlacementRule::InRoom(rooms) => match map.room_at(pos) {
                Some(kind) if rooms.contains(&kind) => Ok(()),
                _ => reject("can only be put in certain rooms"),
            },
            PlacementRule::NotWall => {
                if map.tile(pos).map_or(true, |t| t.wall) {
                    reject("cannot put this object on a wall")
                } else {
                    Ok(())
                }
            }
            PlacementRule::NextToWall => {
                let next_to = map
                    .neighbors(pos)
                    .into_iter()
                    .any(|p| map.tile(p).map_or(false, |t| t.wall));
                if next_to {
                    Ok(())
                } else {
                    reject("must be put against a wall")
                }
            }
            PlacementRule::ExteriorWall => {
                if map.is_outside_wall(pos) {
                    Ok(())
                } else {
                    reject("must be put on an exterior wall")
                }
            }
            PlacementRule::Any(one, two) => {
                if one.check(map, pos).is_ok() || two.check(map, pos).is_ok() {
                    Ok(())
                } else {
                    reject("no placement alternative holds")
                }
            }
        }
    }
}

/// The rule that always applies: the tile is built and unoccupied
fn check_default(map: &TavernMap, pos: GridPos) -> Result<()> {
    let tile = map
        .tile(pos)
        .ok_or(TavernError::PlacementRejected {
            pos,
            reason: "outside the map",
        })?;
    if tile.object.is_some() {
        return Err(TavernError::PlacementRejected {
            pos,
            reason: "there is already an object here",
        });
    }
    if !tile.built {
        return Err(TavernError::PlacementRejected {
            pos,
            reason: "the area is not built",
        });
    }
    Ok(())
}

/// Check every rule of `template` for an anchor at `pos`
///
/// Multi-tile templates are all-or-nothing: every covered cell must pass
/// every rule before any tile is mutated.
pub fn check_rules(map: &TavernMap, pos: GridPos, template: &ObjectTemplate) -> Result<()> {
    match &template.footprint {
        Footprint::Single { .. } => {
            for rule in &template.rules {
                rule.check(map, pos)?;
            }
            check_default(map, pos)
        }
        Footprint::Multi { width, height, .. } => {
            for dy in 0..*height {
                for dx in 0..*width {
                    let cell = pos.offset(dx, dy);
                    for rule in &template.rules {
                        rule.check(map, cell)?;
                    }
                    check_default(map, cell)?;
                }
            }
            Ok(())
        }
    }
}
