//! The tavern itself: furniture, reservations, stock, money and the
//! world aggregate

pub mod ledger;
pub mod objects;
pub mod placement;
pub mod registry;
pub mod store;
pub mod world;

pub use objects::{ObjectTemplate, PlacedObject, RoomKind, ServiceKind};
pub use registry::ServiceRegistry;
pub use store::{Goods, GoodsCatalog, GoodsKind, RecipeBook, Storage};
pub use world::World;
