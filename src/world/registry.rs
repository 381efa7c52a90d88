//! Service registry - arbiter of contended positions
//!
//! Every seat, counter slot, oven mouth or bed goes through here. A
//! position of a given kind is *available*, *in use*, or absent (not yet
//! staffed); it is never in both sets at once, and reservation is
//! at-most-one-holder: take and release are strictly paired.

use crate::core::error::{Result, TavernError};
use crate::core::types::GridPos;
use crate::world::objects::ServiceKind;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ServiceEntry {
    available: Vec<GridPos>,
    in_use: Vec<GridPos>,
}

/// Tracks which positions offer a service kind and in what state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceRegistry {
    entries: AHashMap<ServiceKind, ServiceEntry>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a service available for all
    ///
    /// Idempotent: re-opening an already-available position is a no-op,
    /// and an in-use position stays with its holder.
    pub fn open_service(&mut self, kind: ServiceKind, pos: GridPos) {
        let entry = self.entries.entry(kind).or_default();
        if entry.available.contains(&pos) || entry.in_use.contains(&pos) {
            return;
        }
        entry.available.push(pos);
    }

    /// Reserve an available position for a single holder
    ///
    /// Taking a position that is not available is a caller bug, reported
    /// loudly rather than silently ignored.
    pub fn take_service(&mut self, kind: ServiceKind, pos: GridPos) -> Result<()> {
        let entry = self.entries.entry(kind).or_default();
        match entry.available.iter().position(|&p| p == pos) {
            Some(index) => {
                entry.available.remove(index);
                entry.in_use.push(pos);
                Ok(())
            }
            None => {
                tracing::error!(?kind, ?pos, "take_service on a position not available");
                Err(TavernError::ServiceUnavailable { kind, pos })
            }
        }
    }

    /// Release a previously taken position back to the available set
    pub fn release_service(&mut self, kind: ServiceKind, pos: GridPos) -> Result<()> {
        let entry = self.entries.entry(kind).or_default();
        match entry.in_use.iter().position(|&p| p == pos) {
            Some(index) => {
                entry.in_use.remove(index);
                entry.available.push(pos);
                Ok(())
            }
            None => {
                tracing::error!(?kind, ?pos, "release_service on a position not in use");
                Err(TavernError::ServiceNotInUse { kind, pos })
            }
        }
    }

    /// Withdraw an available position when its attendant walks away
    ///
    /// A position currently in use stays with its holder; releasing it
    /// later will make it available again.
    pub fn stop_service(&mut self, kind: ServiceKind, pos: GridPos) -> bool {
        let entry = self.entries.entry(kind).or_default();
        match entry.available.iter().position(|&p| p == pos) {
            Some(index) => {
                entry.available.remove(index);
                true
            }
            None => {
                tracing::debug!(?kind, ?pos, "stop_service on a position not available");
                false
            }
        }
    }

    pub fn is_available(&self, kind: ServiceKind, pos: GridPos) -> bool {
        self.entries
            .get(&kind)
            .map_or(false, |e| e.available.contains(&pos))
    }

    pub fn is_in_use(&self, kind: ServiceKind, pos: GridPos) -> bool {
        self.entries
            .get(&kind)
            .map_or(false, |e| e.in_use.contains(&pos))
    }

    pub fn list_available(&self, kind: ServiceKind) -> &[GridPos] {
        match self.entries.get(&kind) {
            Some(entry) => &entry.available,
            None => &[],
        }
    }

    pub fn available_len(&self, kind: ServiceKind) -> usize {
        self.entries.get(&kind).map_or(0, |e| e.available.len())
    }

    pub fn in_use_len(&self, kind: ServiceKind) -> usize {
        self.entries.get(&kind).map_or(0, |e| e.in_use.len())
    }

    /// The available position of this kind closest to `origin`, by
    /// manhattan distance, ties broken by opening order
    pub fn closest_available(&self, kind: ServiceKind, origin: GridPos) -> Option<GridPos> {
        self.list_available(kind)
            .iter()
            .copied()
            .min_by_key(|p| p.manhattan(&origin))
    }
}
