use std::fmt;

use crate::gfx::Renderer;

use super::{TileMap, TileStateContainer};

/// Numeric tile id as written in map files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u16);

impl TileId {
    /// Reserved for [`VoidTile`]; never registrable.
    pub const VOID: TileId = TileId(u16::MAX);

    pub fn is_void(self) -> bool {
        self == Self::VOID
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a tile sees while drawing one cell.
pub struct TileRenderContext<'a> {
    /// Screen position of the cell's top-left corner.
    pub x: i32,
    pub y: i32,
    pub col: i32,
    pub row: i32,
    pub tile_size: u32,
    pub mouse_x: i32,
    pub mouse_y: i32,
    pub partial_ticks: f32,
    /// Container most recently bound to this tile by [`TileMap::update`].
    pub container: Option<&'a TileStateContainer>,
    pub map: &'a TileMap,
}

impl TileRenderContext<'_> {
    pub fn is_hovered(&self) -> bool {
        let size = self.tile_size as i32;
        self.mouse_x >= self.x
            && self.mouse_x < self.x.saturating_add(size)
            && self.mouse_y >= self.y
            && self.mouse_y < self.y.saturating_add(size)
    }
}

/// Stateless tile descriptor shared by every cell holding its id. Per-cell
/// state lives in the container the map lends to each hook.
pub trait Tile {
    fn id(&self) -> TileId;

    fn should_render(&self) -> bool {
        true
    }

    fn create_container(&self) -> Option<TileStateContainer> {
        None
    }

    fn update(&self, _col: i32, _row: i32, _container: Option<&mut TileStateContainer>) {}

    fn render(&self, _renderer: &mut dyn Renderer, _ctx: &TileRenderContext<'_>) {}
}

impl fmt::Debug for dyn Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile").field("id", &self.id()).finish()
    }
}

/// Stand-in for out-of-range cells and unregistered ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidTile;

pub static VOID: VoidTile = VoidTile;

impl Tile for VoidTile {
    fn id(&self) -> TileId {
        TileId::VOID
    }

    fn should_render(&self) -> bool {
        false
    }
}
