//! Goods, tavern storage and kitchen recipes
//!
//! Storage is abstract: goods occupy cells granted by Storage rooms, and
//! an employee who needs something simply takes it. Room and stock checks
//! are loud errors so a caller bug never silently corrupts the stock.

use crate::core::error::{Result, TavernError};
use crate::core::types::Money;
use crate::world::objects::ServiceKind;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Broad category of a tradeable good
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoodsKind {
    ClassicDrinks,
    FancyDrinks,
    Food,
}

impl GoodsKind {
    /// Storage cells one unit occupies
    pub fn cell_cost(&self) -> f32 {
        match self {
            GoodsKind::ClassicDrinks | GoodsKind::FancyDrinks => 0.01,
            GoodsKind::Food => 0.1,
        }
    }

    pub fn is_drink(&self) -> bool {
        matches!(self, GoodsKind::ClassicDrinks | GoodsKind::FancyDrinks)
    }
}

/// Index into the goods catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoodsId(pub usize);

/// One brand of goods the tavern can stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goods {
    pub id: GoodsId,
    pub name: String,
    pub kind: GoodsKind,
    pub buying_price: Money,
    pub selling_price: Money,
}

/// Everything the tavern can buy or produce
#[derive(Debug, Clone, Default)]
pub struct GoodsCatalog {
    goods: Vec<Goods>,
}

impl GoodsCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.add("Ale", GoodsKind::ClassicDrinks, 10, 12);
        catalog.add("Wine", GoodsKind::FancyDrinks, 15, 20);
        catalog.add("Spirits", GoodsKind::ClassicDrinks, 10, 13);
        catalog.add("Meat", GoodsKind::Food, 8, 0);
        catalog.add("Vegetables", GoodsKind::Food, 4, 0);
        catalog
    }

    pub fn add(
        &mut self,
        name: &str,
        kind: GoodsKind,
        buying_price: Money,
        selling_price: Money,
    ) -> GoodsId {
        let id = GoodsId(self.goods.len());
        self.goods.push(Goods {
            id,
            name: name.to_string(),
            kind,
            buying_price,
            selling_price,
        });
        id
    }

    pub fn get(&self, id: GoodsId) -> Option<&Goods> {
        self.goods.get(id.0)
    }

    pub fn by_name(&self, name: &str) -> Option<&Goods> {
        self.goods.iter().find(|g| g.name == name)
    }

    pub fn drinks(&self) -> impl Iterator<Item = &Goods> {
        self.goods.iter().filter(|g| g.kind.is_drink())
    }

    pub fn all(&self) -> &[Goods] {
        &self.goods
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredGoods {
    quantity: u32,
    cell_cost: f32,
}

/// The tavern's storage space
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Storage {
    cells: u32,
    stock: AHashMap<GoodsId, StoredGoods>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant cells; called when a Storage room is defined
    pub fn add_cells(&mut self, quantity: u32) {
        self.cells += quantity;
    }

    pub fn cells(&self) -> u32 {
        self.cells
    }

    pub fn occupied_cells(&self) -> u32 {
        self.stock
            .values()
            .map(|s| (s.quantity as f32 * s.cell_cost).ceil() as u32)
            .sum()
    }

    pub fn available_cells(&self) -> u32 {
        self.cells.saturating_sub(self.occupied_cells())
    }

    /// Add goods to the store; there must be room
    pub fn add(&mut self, goods: &Goods, quantity: u32) -> Result<()> {
        let needed = (quantity as f32 * goods.kind.cell_cost()).ceil() as u32;
        if needed > self.available_cells() {
            return Err(TavernError::StorageFull {
                goods: goods.name.clone(),
                quantity,
            });
        }
        let entry = self.stock.entry(goods.id).or_insert(StoredGoods {
            quantity: 0,
            cell_cost: goods.kind.cell_cost(),
        });
        entry.quantity += quantity;
        Ok(())
    }

    /// Take goods out of the store; there must be enough stock
    pub fn take(&mut self, goods: &Goods, quantity: u32) -> Result<()> {
        let entry = self.stock.get_mut(&goods.id);
        match entry {
            Some(stored) if stored.quantity >= quantity => {
                stored.quantity -= quantity;
                Ok(())
            }
            _ => Err(TavernError::OutOfStock {
                goods: goods.name.clone(),
                quantity,
            }),
        }
    }

    pub fn amount_of(&self, id: GoodsId) -> u32 {
        self.stock.get(&id).map_or(0, |s| s.quantity)
    }

    pub fn has(&self, id: GoodsId) -> bool {
        self.amount_of(id) > 0
    }

    pub fn can_take(&self, id: GoodsId, quantity: u32) -> bool {
        self.amount_of(id) >= quantity
    }
}

/// One stage of a recipe: a station kind, a duration and ingredients
/// consumed when the stage starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub station: ServiceKind,
    pub time: u32,
    pub inputs: Vec<(String, u32)>,
}

/// A kitchen recipe followed stage by stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub output: String,
    pub processes: Vec<Process>,
}

/// Catalog of everything the kitchen knows how to make
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: Vec<Recipe>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut book = Self::new();
        book.add(Recipe {
            name: "Stew".into(),
            output: "Stew".into(),
            processes: vec![
                Process {
                    station: ServiceKind::Workshop,
                    time: 10,
                    inputs: vec![("Vegetables".into(), 1)],
                },
                Process {
                    station: ServiceKind::Cooking,
                    time: 15,
                    inputs: vec![("Meat".into(), 1)],
                },
            ],
        });
        book
    }

    pub fn add(&mut self, recipe: Recipe) {
        self.recipes.push(recipe);
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.name == name)
    }

    /// The dish on today's menu
    pub fn daily_meal(&self) -> Option<&Recipe> {
        self.recipes.first()
    }

    pub fn all(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Parse recipes from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let data: TomlRecipes =
            toml::from_str(content).map_err(|e| TavernError::Config(e.to_string()))?;
        let mut book = Self::new();
        for recipe in data.recipes {
            book.add(recipe.into_recipe()?);
        }
        Ok(book)
    }
}

/// TOML representation of a recipes file
#[derive(Debug, Deserialize)]
struct TomlRecipes {
    recipes: Vec<TomlRecipe>,
}

#[derive(Debug, Deserialize)]
struct TomlRecipe {
    name: String,
    output: String,
    processes: Vec<TomlProcess>,
}

#[derive(Debug, Deserialize)]
struct TomlProcess {
    station: String,
    time: u32,
    #[serde(default)]
    inputs: Vec<TomlGoodsAmount>,
}

#[derive(Debug, Deserialize)]
struct TomlGoodsAmount {
    goods: String,
    amount: u32,
}

impl TomlRecipe {
    fn into_recipe(self) -> Result<Recipe> {
        let processes = self
            .processes
            .into_iter()
            .map(|p| {
                let station = match p.station.to_lowercase().as_str() {
                    "workshop" => ServiceKind::Workshop,
                    "cooking" => ServiceKind::Cooking,
                    "brewing" => ServiceKind::Brewing,
                    other => {
                        return Err(TavernError::Config(format!(
                            "unknown recipe station: {other}"
                        )))
                    }
                };
                Ok(Process {
                    station,
                    time: p.time,
                    inputs: p.inputs.into_iter().map(|i| (i.goods, i.amount)).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Recipe {
            name: self.name,
            output: self.output,
            processes,
        })
    }
}
