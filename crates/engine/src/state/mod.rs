mod game;
mod game_state;
mod manager;

pub use game::{Game, GameContext, GameError};
pub use game_state::{GameState, StateCommand, StateKey};
pub use manager::{StateError, StateManager};
pub use winit::keyboard::KeyCode;
