use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use super::{Tile, TileId, VOID};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tile id {id} is already registered")]
    DuplicateId { id: TileId },
    #[error("tile id {id} is reserved for the void tile")]
    ReservedId { id: TileId },
}

/// Id to descriptor lookup. Filled at startup, then shared read-only.
#[derive(Default)]
pub struct TileRegistry {
    tiles: BTreeMap<TileId, Box<dyn Tile>>,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tile: Box<dyn Tile>) -> Result<(), RegistryError> {
        let id = tile.id();
        if id.is_void() {
            return Err(RegistryError::ReservedId { id });
        }
        if self.tiles.contains_key(&id) {
            return Err(RegistryError::DuplicateId { id });
        }
        self.tiles.insert(id, tile);
        debug!(id = %id, "tile_registered");
        Ok(())
    }

    pub fn get(&self, id: TileId) -> Option<&dyn Tile> {
        self.tiles.get(&id).map(|tile| &**tile)
    }

    /// Like [`TileRegistry::get`], falling back to [`VOID`].
    pub fn resolve(&self, id: TileId) -> &dyn Tile {
        self.get(id).unwrap_or(&VOID)
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.tiles.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.tiles.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl fmt::Debug for TileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileRegistry")
            .field("ids", &self.tiles.keys().collect::<Vec<_>>())
            .finish()
    }
}
