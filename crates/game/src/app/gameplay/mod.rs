mod palette;
mod play_state;
mod title_state;

use tile_engine::StateKey;

pub(crate) use palette::{build_registry, load_palette, PaletteError};
pub(crate) use play_state::PlayState;
pub(crate) use title_state::TitleState;

pub(crate) const TITLE: StateKey = StateKey("title");
pub(crate) const PLAY: StateKey = StateKey("play");
