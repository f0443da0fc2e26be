use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;
use tracing::{info, warn};

use crate::gfx::{Renderer, Viewport};
use crate::resources::{
    content_digest, ReloadError, ReloadListener, ResourceError, ResourceLocation,
    ResourceProvider,
};

use super::map_format::{LastToken, MapFormatError, MapParser};
use super::{
    PropertyError, PropertyValue, Tile, TileId, TileRegistry, TileRenderContext,
    TileStateContainer, VOID,
};

pub const DEFAULT_TWEEN: f64 = 0.07;

#[derive(Debug, Error)]
pub enum MapLoadCause {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Format(#[from] MapFormatError),
}

#[derive(Debug, Error)]
#[error("Could not load map {location}! Tile errored at {last_token}")]
pub struct MapLoadError {
    location: ResourceLocation,
    last_token: LastToken,
    #[source]
    cause: MapLoadCause,
}

impl MapLoadError {
    pub fn location(&self) -> &ResourceLocation {
        &self.location
    }

    pub fn last_token(&self) -> &LastToken {
        &self.last_token
    }

    pub fn cause(&self) -> &MapLoadCause {
        &self.cause
    }
}

/// Rectangle of cells visited by one pass, in row-major order. Columns stop
/// at `col_limit`; rows do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellWindow {
    pub col_start: i32,
    pub col_end: i32,
    pub row_start: i32,
    pub row_end: i32,
    pub col_limit: i32,
}

impl CellWindow {
    pub fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        let col_end = self.col_end.min(self.col_limit);
        let col_start = self.col_start;
        (self.row_start..self.row_end)
            .flat_map(move |row| (col_start..col_end).map(move |col| (col, row)))
    }
}

/// Grid of tile ids with per-cell state, a smoothed camera and culled
/// update/render passes.
#[derive(Debug)]
pub struct TileMap {
    tile_size: u32,
    view: Viewport,
    registry: Rc<TileRegistry>,

    num_cols: i32,
    num_rows: i32,
    width: i64,
    height: i64,
    ids: Vec<TileId>,
    containers: Vec<Option<TileStateContainer>>,
    // Cell index whose container each tile currently sees.
    bindings: HashMap<TileId, usize>,

    x: f64,
    y: f64,
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
    tween: f64,

    col_offset: i32,
    row_offset: i32,
    num_cols_to_draw: i32,
    num_rows_to_draw: i32,

    map_location: Option<ResourceLocation>,
}

impl TileMap {
    pub fn new(tile_size: u32, view: Viewport, registry: Rc<TileRegistry>) -> Self {
        if tile_size == 0 {
            warn!("tile_size_zero_clamped");
        }
        let tile_size = tile_size.max(1);
        let num_cols_to_draw = i32::try_from(view.width / tile_size + 2).unwrap_or(i32::MAX);
        let num_rows_to_draw = i32::try_from(view.height / tile_size + 2).unwrap_or(i32::MAX);

        Self {
            tile_size,
            view,
            registry,
            num_cols: 0,
            num_rows: 0,
            width: 0,
            height: 0,
            ids: Vec::new(),
            containers: Vec::new(),
            bindings: HashMap::new(),
            x: 0.0,
            y: 0.0,
            xmin: 0.0,
            xmax: 0.0,
            ymin: 0.0,
            ymax: 0.0,
            tween: DEFAULT_TWEEN,
            col_offset: 0,
            row_offset: 0,
            num_cols_to_draw,
            num_rows_to_draw,
            map_location: None,
        }
    }

    /// Replaces the whole grid with the map at `location`. Mutated cell state
    /// is discarded. On error the previous grid is kept, but the location is
    /// already recorded for the next reload.
    pub fn load_map(
        &mut self,
        resources: &dyn ResourceProvider,
        location: ResourceLocation,
    ) -> Result<(), MapLoadError> {
        self.map_location = Some(location.clone());

        let bytes = match resources.read_bytes(&location) {
            Ok(bytes) => bytes,
            Err(err) => {
                return Err(MapLoadError {
                    location,
                    last_token: LastToken::default(),
                    cause: err.into(),
                })
            }
        };

        let registry = Rc::clone(&self.registry);
        let mut parser = MapParser::new(&registry);
        let data = match parser.parse(bytes.as_slice()) {
            Ok(data) => data,
            Err(err) => {
                return Err(MapLoadError {
                    location,
                    last_token: parser.last_token().clone(),
                    cause: err.into(),
                })
            }
        };

        self.containers = data
            .ids
            .iter()
            .map(|id| registry.resolve(*id).create_container())
            .collect();
        self.ids = data.ids;
        self.bindings.clear();

        // Dimensions are bounded by the map format.
        self.num_cols = data.num_cols as i32;
        self.num_rows = data.num_rows as i32;
        self.width = i64::from(self.num_cols) * i64::from(self.tile_size);
        self.height = i64::from(self.num_rows) * i64::from(self.tile_size);
        self.xmin = 0.0;
        self.ymin = 0.0;
        self.xmax = (self.width - i64::from(self.view.width)).max(0) as f64;
        self.ymax = (self.height - i64::from(self.view.height)).max(0) as f64;

        info!(
            location = %location,
            cols = self.num_cols,
            rows = self.num_rows,
            digest = %content_digest(&bytes),
            "map_loaded"
        );
        Ok(())
    }

    /// Clamps the target into the camera bounds and moves `tween` of the way
    /// towards it.
    pub fn set_position(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            warn!(x, y, "camera_target_rejected");
            return;
        }
        let target_x = x.clamp(self.xmin, self.xmax);
        let target_y = y.clamp(self.ymin, self.ymax);

        self.x = (self.x + (target_x - self.x) * self.tween).clamp(self.xmin, self.xmax);
        self.y = (self.y + (target_y - self.y) * self.tween).clamp(self.ymin, self.ymax);

        let tile_size = f64::from(self.tile_size);
        self.col_offset = (self.x / tile_size).floor() as i32;
        self.row_offset = (self.y / tile_size).floor() as i32;
    }

    /// Accepts values in `(0, 1]`; anything else is logged and ignored.
    pub fn set_tween(&mut self, tween: f64) -> &mut Self {
        if tween > 0.0 && tween <= 1.0 {
            self.tween = tween;
        } else {
            warn!(tween, current = self.tween, "tween_rejected");
        }
        self
    }

    pub fn update_window(&self) -> CellWindow {
        CellWindow {
            col_start: self.col_offset,
            col_end: self.col_offset.saturating_add(self.num_cols_to_draw),
            row_start: self.row_offset,
            row_end: self.row_offset.saturating_add(self.num_rows_to_draw),
            col_limit: self.num_cols,
        }
    }

    /// The update window plus one cell above and to the left, so partially
    /// scrolled-in cells still draw.
    pub fn render_window(&self) -> CellWindow {
        let window = self.update_window();
        CellWindow {
            col_start: window.col_start - 1,
            row_start: window.row_start - 1,
            ..window
        }
    }

    pub fn update(&mut self) {
        let registry = Rc::clone(&self.registry);
        for (col, row) in self.update_window().cells() {
            let index = self.index(col, row);
            let tile: &dyn Tile = match index {
                Some(index) => registry.resolve(self.ids[index]),
                None => &VOID,
            };
            let id = tile.id();
            if id.is_void() {
                continue;
            }

            if let Some(index) = index.filter(|_| self.is_interior(col, row)) {
                self.bindings.insert(id, index);
            }
            let container = match self.bindings.get(&id) {
                Some(&bound) => self.containers.get_mut(bound).and_then(Option::as_mut),
                None => None,
            };
            tile.update(col, row, container);
        }
    }

    pub fn render(
        &self,
        renderer: &mut dyn Renderer,
        mouse_x: i32,
        mouse_y: i32,
        partial_ticks: f32,
    ) {
        let tile_size = self.tile_size as i32;
        let origin_x = (-self.x) as i32;
        let origin_y = (-self.y) as i32;
        for (col, row) in self.render_window().cells() {
            let tile = self.get_tile(col, row);
            if !tile.should_render() {
                continue;
            }
            let ctx = TileRenderContext {
                x: origin_x.saturating_add(col.saturating_mul(tile_size)),
                y: origin_y.saturating_add(row.saturating_mul(tile_size)),
                col,
                row,
                tile_size: self.tile_size,
                mouse_x,
                mouse_y,
                partial_ticks,
                container: self.bound_container(tile.id()),
                map: self,
            };
            tile.render(renderer, &ctx);
        }
    }

    /// [`VOID`] outside the grid and for ids the registry does not know.
    pub fn get_tile(&self, col: i32, row: i32) -> &dyn Tile {
        match self.index(col, row) {
            Some(index) => self.registry.resolve(self.ids[index]),
            None => &VOID,
        }
    }

    /// Writes `tile` and a fresh container into the cell. Ignored out of range.
    pub fn set_tile(&mut self, col: i32, row: i32, tile: &dyn Tile) {
        let Some(index) = self.index(col, row) else {
            return;
        };
        self.ids[index] = tile.id();
        self.containers[index] = tile.create_container();
        self.bindings.retain(|_, bound| *bound != index);
    }

    /// Ignored out of range and on cells without a container.
    pub fn set_value(
        &mut self,
        col: i32,
        row: i32,
        property: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<(), PropertyError> {
        let Some(index) = self.index(col, row) else {
            return Ok(());
        };
        match self.containers[index].as_mut() {
            Some(container) => container.set_value(property, value),
            None => Ok(()),
        }
    }

    pub fn container(&self, col: i32, row: i32) -> Option<&TileStateContainer> {
        self.index(col, row)
            .and_then(|index| self.containers[index].as_ref())
    }

    /// Cell under a screen-space point, given the current camera.
    pub fn screen_to_cell(&self, screen_x: i32, screen_y: i32) -> (i32, i32) {
        let tile_size = f64::from(self.tile_size);
        let col = ((f64::from(screen_x) + self.x.trunc()) / tile_size).floor() as i32;
        let row = ((f64::from(screen_y) + self.y.trunc()) / tile_size).floor() as i32;
        (col, row)
    }

    pub fn tile_ids(&self) -> &[TileId] {
        &self.ids
    }

    pub fn registry(&self) -> &Rc<TileRegistry> {
        &self.registry
    }

    pub fn map_location(&self) -> Option<&ResourceLocation> {
        self.map_location.as_ref()
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn view(&self) -> Viewport {
        self.view
    }

    pub fn num_cols(&self) -> i32 {
        self.num_cols
    }

    pub fn num_rows(&self) -> i32 {
        self.num_rows
    }

    pub fn width(&self) -> i64 {
        self.width
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.xmin, self.xmax, self.ymin, self.ymax)
    }

    pub fn tween(&self) -> f64 {
        self.tween
    }

    pub fn col_offset(&self) -> i32 {
        self.col_offset
    }

    pub fn row_offset(&self) -> i32 {
        self.row_offset
    }

    pub fn num_cols_to_draw(&self) -> i32 {
        self.num_cols_to_draw
    }

    pub fn num_rows_to_draw(&self) -> i32 {
        self.num_rows_to_draw
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        if col < 0 || row < 0 || col >= self.num_cols || row >= self.num_rows {
            return None;
        }
        Some(col as usize + row as usize * self.num_cols as usize)
    }

    fn is_interior(&self, col: i32, row: i32) -> bool {
        col > 0 && col < self.num_cols - 1 && row > 0 && row < self.num_rows - 1
    }

    fn bound_container(&self, id: TileId) -> Option<&TileStateContainer> {
        self.bindings
            .get(&id)
            .and_then(|&index| self.containers.get(index))
            .and_then(Option::as_ref)
    }
}

impl ReloadListener for TileMap {
    fn on_resource_reload(&mut self, resources: &dyn ResourceProvider) -> Result<(), ReloadError> {
        let Some(location) = self.map_location.clone() else {
            return Ok(());
        };
        self.load_map(resources, location)
            .map_err(ReloadError::listener)
    }
}
