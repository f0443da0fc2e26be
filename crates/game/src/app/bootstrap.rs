use std::env;
use std::rc::Rc;

use thiserror::Error;
use tile_engine::resources::ResourceLocationError;
use tile_engine::{
    resolve_app_paths, Clock, DirectoryResourceProvider, Game, GameContext, GameError,
    LoopConfig, ResourceLocation, ResourceProvider, StartupError, StateError, StateManager,
    SystemClock, TileMap,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, PaletteError, PlayState, TitleState};

const MAP_ENV_VAR: &str = "TILE_GAME_MAP";
const TWEEN_ENV_VAR: &str = "TILE_GAME_TWEEN";
const DEFAULT_MAP: &str = "base:maps/level1.map";

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("TILE_GAME_MAP is not a valid resource location: {0}")]
    MapLocation(#[source] ResourceLocationError),
    #[error("failed to load tile palette: {0}")]
    Palette(#[from] PaletteError),
    #[error("failed to register game states: {0}")]
    States(#[from] StateError),
    #[error("failed to start game: {0}")]
    Start(#[from] GameError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) game: Game,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Tile Game Startup ===");

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), assets = %paths.assets_dir.display(), "paths_resolved");

    let config = LoopConfig {
        window_title: "Tile Game".to_string(),
        ..LoopConfig::default()
    };
    let viewport = config.viewport();
    let clock: Rc<dyn Clock> = Rc::new(SystemClock::new());
    let resources: Rc<dyn ResourceProvider> =
        Rc::new(DirectoryResourceProvider::new(paths.assets_dir));

    let palette = gameplay::load_palette(resources.as_ref())?;
    let tile_size = palette.tile_size;
    let registry = Rc::new(gameplay::build_registry(palette, resources.as_ref())?);

    let mut map = TileMap::new(tile_size, viewport, registry);
    if let Some(tween) = parse_tween_from_env() {
        map.set_tween(tween);
    }
    let map_location = map_location_from_env()?;
    info!(map = %map_location, tween = map.tween(), "map_selected");

    let mut states = StateManager::new();
    states.register(
        gameplay::TITLE,
        Box::new(TitleState::new(Rc::clone(&clock))),
    )?;
    states.register(
        gameplay::PLAY,
        Box::new(PlayState::new(map, map_location, Rc::clone(&clock))),
    )?;

    let mut game = Game::new(GameContext::new(viewport, clock, resources), states);
    game.start(gameplay::TITLE)?;

    Ok(AppWiring { config, game })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn map_location_from_env() -> Result<ResourceLocation, BootstrapError> {
    let raw = env::var(MAP_ENV_VAR).unwrap_or_else(|_| DEFAULT_MAP.to_string());
    parse_map_location(&raw)
}

fn parse_map_location(raw: &str) -> Result<ResourceLocation, BootstrapError> {
    ResourceLocation::parse(raw.trim()).map_err(BootstrapError::MapLocation)
}

fn parse_tween_from_env() -> Option<f64> {
    let raw = env::var(TWEEN_ENV_VAR).ok()?;
    parse_tween(&raw)
}

fn parse_tween(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(tween) => Some(tween),
        Err(error) => {
            warn!(value = raw, error = %error, "tween_env_ignored");
            None
        }
    }
}
