//! Patron needs that drive behavior selection

use serde::{Deserialize, Serialize};

/// The drives a patron walks in with
///
/// Counters tick down as chains complete; a patron with no needs left
/// heads for the door.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Needs {
    pub thirst: u32,
    pub hunger: u32,
    pub gamble: u32,
    pub sleep: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeedKind {
    Thirst,
    Hunger,
    Gamble,
    Sleep,
}

impl Needs {
    pub fn new(thirst: u32, hunger: u32, gamble: u32, sleep: u32) -> Self {
        Self {
            thirst,
            hunger,
            gamble,
            sleep,
        }
    }

    /// True while any drive remains
    pub fn has_needs(&self) -> bool {
        self.thirst > 0 || self.hunger > 0 || self.gamble > 0 || self.sleep > 0
    }

    /// The most pressing need: the largest counter, ties broken by the
    /// fixed ordering thirst, hunger, gamble, sleep
    pub fn priority(&self) -> Option<NeedKind> {
        let candidates = [
            (NeedKind::Thirst, self.thirst),
            (NeedKind::Hunger, self.hunger),
            (NeedKind::Gamble, self.gamble),
            (NeedKind::Sleep, self.sleep),
        ];
        candidates
            .into_iter()
            .filter(|&(_, value)| value > 0)
            .max_by_key(|&(_, value)| value)
            .map(|(kind, _)| kind)
    }

    /// Lower one drive after a satisfying activity
    pub fn satisfy(&mut self, kind: NeedKind, amount: u32) {
        let counter = match kind {
            NeedKind::Thirst => &mut self.thirst,
            NeedKind::Hunger => &mut self.hunger,
            NeedKind::Gamble => &mut self.gamble,
            NeedKind::Sleep => &mut self.sleep,
        };
        *counter = counter.saturating_sub(amount);
    }

    /// Drop everything; the patron has given up on this establishment
    pub fn cancel(&mut self) {
        *self = Self::default();
    }
}
