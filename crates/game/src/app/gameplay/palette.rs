use std::collections::HashMap;
use std::rc::Rc;

use serde::Deserialize;
use thiserror::Error;
use tile_engine::resources::ResourceLocationError;
use tile_engine::{
    Property, PropertyConstraint, PropertyError, PropertyValue, RegistryError, Renderer, ResourceError,
    ResourceLocation, ResourceProvider, Rgba, Sprite, SpriteSheet, Tile, TileId, TileRegistry,
    TileRenderContext, TileStateContainer,
};
use tracing::{debug, info, warn};

pub(crate) const PALETTE_LOCATION: &str = "base:tiles.json";
pub(crate) const LIT: &str = "lit";
pub(crate) const GLOW: &str = "glow";

#[derive(Debug, Error)]
pub(crate) enum PaletteError {
    #[error("invalid palette location: {0}")]
    Location(#[from] ResourceLocationError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("failed to parse {location}{}: {source}", at_path(.path))]
    Parse {
        location: ResourceLocation,
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("palette tile_size must be at least 1")]
    InvalidTileSize,
    #[error("tile '{tile}' has an invalid sprite sheet location '{sheet}': {source}")]
    SheetLocation {
        tile: String,
        sheet: String,
        #[source]
        source: ResourceLocationError,
    },
    #[error("tile '{tile}' property '{property}' has an invalid default: {source}")]
    PropertyDefault {
        tile: String,
        property: String,
        #[source]
        source: PropertyError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn at_path(path: &str) -> String {
    if path.is_empty() || path == "." {
        String::new()
    } else {
        format!(" at {path}")
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PaletteFile {
    pub(crate) tile_size: u32,
    pub(crate) tiles: Vec<PaletteEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PaletteEntry {
    pub(crate) id: u16,
    pub(crate) name: String,
    pub(crate) color: [u8; 4],
    #[serde(default = "default_render")]
    pub(crate) render: bool,
    #[serde(default)]
    pub(crate) sprite: Option<SpriteRef>,
    #[serde(default)]
    pub(crate) properties: Vec<PropertyEntry>,
}

fn default_render() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SpriteRef {
    pub(crate) sheet: String,
    pub(crate) frame: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PropertyEntry {
    pub(crate) name: String,
    pub(crate) default: JsonValue,
    #[serde(default)]
    pub(crate) range: Option<[i64; 2]>,
    #[serde(default)]
    pub(crate) one_of: Vec<JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum JsonValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<JsonValue> for PropertyValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Bool(value) => PropertyValue::Bool(value),
            JsonValue::Int(value) => PropertyValue::Int(value),
            JsonValue::Float(value) => PropertyValue::Float(value),
            JsonValue::Text(value) => PropertyValue::Text(value),
        }
    }
}

pub(crate) fn parse_palette(
    raw: &[u8],
    location: &ResourceLocation,
) -> Result<PaletteFile, PaletteError> {
    let mut deserializer = serde_json::Deserializer::from_slice(raw);
    let palette: PaletteFile =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let path = error.path().to_string();
            PaletteError::Parse {
                location: location.clone(),
                path,
                source: error.into_inner(),
            }
        })?;
    if palette.tile_size == 0 {
        return Err(PaletteError::InvalidTileSize);
    }
    Ok(palette)
}

pub(crate) fn load_palette(resources: &dyn ResourceProvider) -> Result<PaletteFile, PaletteError> {
    let location = ResourceLocation::parse(PALETTE_LOCATION)?;
    let raw = resources.read_bytes(&location)?;
    let palette = parse_palette(&raw, &location)?;
    info!(
        location = %location,
        tiles = palette.tiles.len(),
        tile_size = palette.tile_size,
        "palette_loaded"
    );
    Ok(palette)
}

/// Builds one [`PaletteTile`] per entry. Sprite sheets that fail to load are
/// reported once and the affected tiles draw their flat colour instead.
pub(crate) fn build_registry(
    palette: PaletteFile,
    resources: &dyn ResourceProvider,
) -> Result<TileRegistry, PaletteError> {
    let mut sheets = SheetCache::new(resources, palette.tile_size);
    let mut registry = TileRegistry::new();
    for entry in palette.tiles {
        let sprite = match &entry.sprite {
            Some(sprite_ref) => {
                let sheet = ResourceLocation::parse(&sprite_ref.sheet).map_err(|source| {
                    PaletteError::SheetLocation {
                        tile: entry.name.clone(),
                        sheet: sprite_ref.sheet.clone(),
                        source,
                    }
                })?;
                sheets.frame(&sheet, sprite_ref.frame)
            }
            None => None,
        };
        let properties = build_properties(&entry.name, entry.properties)?;
        registry.register(Box::new(PaletteTile {
            id: TileId(entry.id),
            name: entry.name,
            color: entry.color,
            render: entry.render,
            sprite,
            properties: Rc::from(properties),
        }))?;
    }
    Ok(registry)
}

fn build_properties(
    tile: &str,
    entries: Vec<PropertyEntry>,
) -> Result<Vec<Property>, PaletteError> {
    entries
        .into_iter()
        .map(|entry| {
            let constraint = match (entry.range, entry.one_of.is_empty()) {
                (Some([min, max]), _) => PropertyConstraint::IntRange { min, max },
                (None, false) => PropertyConstraint::OneOf(
                    entry.one_of.into_iter().map(PropertyValue::from).collect(),
                ),
                (None, true) => PropertyConstraint::Any,
            };
            let default = PropertyValue::from(entry.default);
            let property = Property::new(entry.name.clone(), default.clone())
                .with_constraint(constraint);
            property
                .validate(&default)
                .map_err(|source| PaletteError::PropertyDefault {
                    tile: tile.to_string(),
                    property: entry.name,
                    source,
                })?;
            Ok(property)
        })
        .collect()
}

struct SheetCache<'a> {
    resources: &'a dyn ResourceProvider,
    tile_size: u32,
    sheets: HashMap<ResourceLocation, Option<Vec<Sprite>>>,
}

impl<'a> SheetCache<'a> {
    fn new(resources: &'a dyn ResourceProvider, tile_size: u32) -> Self {
        Self {
            resources,
            tile_size,
            sheets: HashMap::new(),
        }
    }

    fn frame(&mut self, sheet: &ResourceLocation, frame: usize) -> Option<Sprite> {
        let resources = self.resources;
        let tile_size = self.tile_size;
        let frames = self
            .sheets
            .entry(sheet.clone())
            .or_insert_with(|| load_frames(resources, sheet, tile_size));
        let sprite = frames.as_ref()?.get(frame).cloned();
        if sprite.is_none() {
            warn!(sheet = %sheet, frame, "sprite_frame_missing");
        }
        sprite
    }
}

fn load_frames(
    resources: &dyn ResourceProvider,
    sheet: &ResourceLocation,
    tile_size: u32,
) -> Option<Vec<Sprite>> {
    let loaded = SpriteSheet::load(resources, sheet)
        .and_then(|sheet| Rc::new(sheet).split(tile_size, tile_size));
    match loaded {
        Ok(frames) => {
            debug!(sheet = %sheet, frames = frames.len(), "sprite_frames_ready");
            Some(frames)
        }
        Err(error) => {
            warn!(sheet = %sheet, error = %error, "sprite_sheet_unavailable");
            None
        }
    }
}

/// Tile described by a palette entry. Tiles with a `glow` property brighten
/// while `lit` and fade otherwise.
pub(crate) struct PaletteTile {
    id: TileId,
    name: String,
    color: Rgba,
    render: bool,
    sprite: Option<Sprite>,
    properties: Rc<[Property]>,
}

impl Tile for PaletteTile {
    fn id(&self) -> TileId {
        self.id
    }

    fn should_render(&self) -> bool {
        self.render
    }

    fn create_container(&self) -> Option<TileStateContainer> {
        if self.properties.is_empty() {
            None
        } else {
            Some(TileStateContainer::new(Rc::clone(&self.properties)))
        }
    }

    fn update(&self, _col: i32, _row: i32, container: Option<&mut TileStateContainer>) {
        let Some(container) = container else {
            return;
        };
        let Some(glow) = container.get_int(GLOW) else {
            return;
        };
        let step = if container.get_bool(LIT).unwrap_or(false) {
            1
        } else {
            -1
        };
        match container.set_value(GLOW, glow + step) {
            Ok(()) | Err(PropertyError::InvalidValue { .. }) => {}
            Err(error) => debug!(tile = %self.name, error = %error, "glow_update_skipped"),
        }
    }

    fn render(&self, renderer: &mut dyn Renderer, ctx: &TileRenderContext<'_>) {
        let size = ctx.tile_size;
        match &self.sprite {
            Some(sprite) => renderer.draw_sprite(ctx.x, ctx.y, sprite),
            None => renderer.fill_rect(ctx.x, ctx.y, size, size, self.color),
        }

        let cell = ctx.map.container(ctx.col, ctx.row).or(ctx.container);
        let glow = cell.and_then(|cell| cell.get_int(GLOW)).unwrap_or(0);
        if glow > 0 {
            let inset = (size / 4).max(1);
            let inner = size.saturating_sub(inset * 2).max(1);
            renderer.fill_rect(
                ctx.x + inset as i32,
                ctx.y + inset as i32,
                inner,
                inner,
                brighten(self.color, glow),
            );
        }
    }
}

fn brighten(color: Rgba, glow: i64) -> Rgba {
    let amount = (glow.clamp(0, 8) * 24) as u8;
    [
        color[0].saturating_add(amount),
        color[1].saturating_add(amount),
        color[2].saturating_add(amount / 2),
        255,
    ]
}
