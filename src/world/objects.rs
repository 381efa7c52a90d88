//! Placeable object templates and their instances
//!
//! A template describes a kind of furniture (name, service, price,
//! footprint, placement rules, post-placement effect); an instance is the
//! per-tile object actually bound to the map. Multi-tile footprints carry
//! per-cell blocking masks plus the subset of cells that grant service.

use crate::core::types::Money;
use crate::world::placement::PlacementRule;
use serde::{Deserialize, Serialize};

/// What activity a position or object supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    /// Object you can use to sit
    Sitting,
    /// Object you can eat or drink at
    Eating,
    /// Commonly known as doors
    RoomSeparator,
    /// Counter
    Ordering,
    /// Support for floors
    Support,
    /// Preparation of food
    Workshop,
    /// Making warm food
    Cooking,
    /// Going to someone to take their order
    OrderTaking,
    /// Bringing something to someone
    Delivering,
    /// Cleaning rooms
    Cleaning,
    /// Preparing beer
    Brewing,
    /// Selling stock over a shop counter
    Selling,
    /// A place to sleep in
    Sleeping,
}

/// The kinds of rooms the player can designate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomKind {
    Tavern,
    Storage,
    Kitchen,
    Brewery,
    Bedroom,
}

/// Index into the template catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub usize);

/// Tile coverage of a template
#[derive(Debug, Clone)]
pub enum Footprint {
    Single {
        blocks: bool,
    },
    Multi {
        width: i32,
        height: i32,
        /// Row-major per-cell blocking mask
        blocks: Vec<Vec<bool>>,
        /// Cells (relative to the anchor) that actually grant the service
        service_cells: Vec<(i32, i32)>,
    },
}

impl Footprint {
    pub fn is_multi_tile(&self) -> bool {
        matches!(self, Footprint::Multi { .. })
    }
}

/// Code run right after a template lands on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacedEffect {
    /// Open the object's service positions in the registry
    OpenService,
    /// Doors on exterior walls become tavern entry points
    AddEntryPoint,
    /// Post the constant counter-attending duty on the job board
    AddCounterDuty,
}

/// A template for an object in the tavern
#[derive(Debug, Clone)]
pub struct ObjectTemplate {
    pub name: &'static str,
    pub service: ServiceKind,
    pub price: Money,
    pub footprint: Footprint,
    pub rules: Vec<PlacementRule>,
    pub effect: Option<PlacedEffect>,
}

/// A real object bound to one tile, with properties taken from its template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedObject {
    pub name: String,
    pub service: ServiceKind,
    pub blocks: bool,
}

/// The default furniture catalog
pub fn catalog() -> Vec<ObjectTemplate> {
    let kitchen_appliance_mask = vec![
        vec![true, true, true],
        vec![true, true, true],
        vec![true, false, true],
    ];
    vec![
        ObjectTemplate {
            name: "Door",
            service: ServiceKind::RoomSeparator,
            price: 15,
            footprint: Footprint::Single { blocks: false },
            rules: vec![PlacementRule::Any(
                Box::new(PlacementRule::NextToWall),
                Box::new(PlacementRule::ExteriorWall),
            )],
            effect: Some(PlacedEffect::AddEntryPoint),
        },
        ObjectTemplate {
            name: "Chair",
            service: ServiceKind::Sitting,
            price: 5,
            footprint: Footprint::Single { blocks: false },
            rules: vec![PlacementRule::NotWall],
            effect: Some(PlacedEffect::OpenService),
        },
        ObjectTemplate {
            name: "Table",
            service: ServiceKind::Eating,
            price: 10,
            footprint: Footprint::Single { blocks: true },
            rules: vec![
                PlacementRule::InRoom(vec![RoomKind::Tavern]),
                PlacementRule::NotWall,
            ],
            effect: None,
        },
        ObjectTemplate {
            name: "Counter",
            service: ServiceKind::Ordering,
            price: 30,
            footprint: Footprint::Single { blocks: true },
            rules: vec![
                PlacementRule::InRoom(vec![RoomKind::Tavern]),
                PlacementRule::NotWall,
            ],
            effect: Some(PlacedEffect::AddCounterDuty),
        },
        ObjectTemplate {
            name: "Beam",
            service: ServiceKind::Support,
            price: 10,
            footprint: Footprint::Single { blocks: true },
            rules: vec![PlacementRule::NotWall],
            effect: None,
        },
        ObjectTemplate {
            name: "Oven",
            service: ServiceKind::Cooking,
            price: 100,
            footprint: Footprint::Multi {
                width: 3,
                height: 3,
                blocks: kitchen_appliance_mask.clone(),
                service_cells: vec![(1, 2)],
            },
            rules: vec![
                PlacementRule::InRoom(vec![RoomKind::Kitchen]),
                PlacementRule::NotWall,
            ],
            effect: Some(PlacedEffect::OpenService),
        },
        ObjectTemplate {
            name: "Brewing vat",
            service: ServiceKind::Brewing,
            price: 2000,
            footprint: Footprint::Multi {
                width: 3,
                height: 3,
                blocks: kitchen_appliance_mask,
                service_cells: vec![(1, 2)],
            },
            rules: vec![
                PlacementRule::InRoom(vec![RoomKind::Brewery]),
                PlacementRule::NotWall,
            ],
            effect: Some(PlacedEffect::OpenService),
        },
        ObjectTemplate {
            name: "Work station",
            service: ServiceKind::Workshop,
            price: 20,
            footprint: Footprint::Single { blocks: true },
            rules: vec![
                PlacementRule::InRoom(vec![RoomKind::Kitchen]),
                PlacementRule::NotWall,
            ],
            effect: Some(PlacedEffect::OpenService),
        },
        ObjectTemplate {
            name: "Bed",
            service: ServiceKind::Sleeping,
            price: 25,
            footprint: Footprint::Single { blocks: false },
            rules: vec![
                PlacementRule::InRoom(vec![RoomKind::Bedroom]),
                PlacementRule::NotWall,
            ],
            effect: Some(PlacedEffect::OpenService),
        },
    ]
}

/// Look up a template id by name
pub fn template_named(templates: &[ObjectTemplate], name: &str) -> Option<TemplateId> {
    templates
        .iter()
        .position(|t| t.name == name)
        .map(TemplateId)
}

impl ObjectTemplate {
    /// The per-tile instance for the cell at `(dx, dy)` of the footprint
    pub fn instantiate_cell(&self, dx: i32, dy: i32) -> PlacedObject {
        let blocks = match &self.footprint {
            Footprint::Single { blocks } => *blocks,
            Footprint::Multi { blocks, .. } => blocks[dy as usize][dx as usize],
        };
        PlacedObject {
            name: self.name.to_string(),
            service: self.service,
            blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let templates = catalog();
        let counter = template_named(&templates, "Counter").unwrap();
        assert_eq!(templates[counter.0].service, ServiceKind::Ordering);
        assert!(template_named(&templates, "Throne").is_none());
    }

    #[test]
    fn test_oven_footprint() {
        let templates = catalog();
        let oven = &templates[template_named(&templates, "Oven").unwrap().0];
        assert!(oven.footprint.is_multi_tile());
        // The mouth of the oven is open and grants the cooking service
        assert!(!oven.instantiate_cell(1, 2).blocks);
        assert!(oven.instantiate_cell(0, 0).blocks);
        match &oven.footprint {
            Footprint::Multi { service_cells, .. } => {
                assert_eq!(service_cells.as_slice(), &[(1, 2)])
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_chair_is_walkable_service() {
        let templates = catalog();
        let chair = &templates[template_named(&templates, "Chair").unwrap().0];
        assert!(!chair.instantiate_cell(0, 0).blocks);
        assert_eq!(chair.service, ServiceKind::Sitting);
    }
}
