mod map_format;
mod property;
mod registry;
mod tile;
mod tilemap;

pub use map_format::{
    parse_map, LastToken, MapData, MapFormatError, MapParser, MAX_MAP_CELLS, MAX_MAP_DIMENSION,
};
pub use property::{Property, PropertyConstraint, PropertyError, PropertyValue, TileStateContainer};
pub use registry::{RegistryError, TileRegistry};
pub use tile::{Tile, TileId, TileRenderContext, VoidTile, VOID};
pub use tilemap::{CellWindow, MapLoadCause, MapLoadError, TileMap, DEFAULT_TWEEN};
