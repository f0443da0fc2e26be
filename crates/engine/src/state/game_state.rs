use std::fmt;

use winit::keyboard::KeyCode;

use crate::gfx::Renderer;

use super::GameContext;

/// Name a state is registered under in the [`StateManager`](super::StateManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey(pub &'static str);

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// What a state asks of its manager after a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCommand {
    None,
    SwitchTo(StateKey),
    Quit,
}

/// One scene of the game. Only the active state receives hooks; the game's
/// shared services arrive through the context instead of back-references.
pub trait GameState {
    /// Runs on every activation, not just the first.
    fn init(&mut self, ctx: &mut GameContext);

    fn update(&mut self, ctx: &mut GameContext) -> StateCommand;

    fn render(
        &mut self,
        ctx: &GameContext,
        renderer: &mut dyn Renderer,
        mouse_x: i32,
        mouse_y: i32,
        partial_ticks: f32,
    );

    fn on_key_pressed(
        &mut self,
        ctx: &mut GameContext,
        key: KeyCode,
        typed: Option<char>,
    ) -> StateCommand;

    fn on_key_released(
        &mut self,
        ctx: &mut GameContext,
        key: KeyCode,
        typed: Option<char>,
    ) -> StateCommand;

    fn on_lose_focus(&mut self, _ctx: &mut GameContext) {}

    /// Concrete type name, without its module path.
    fn name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

impl fmt::Display for dyn GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for dyn GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GameState").field(&self.name()).finish()
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_type_name_strips_paths_and_generics() {
        assert_eq!(short_type_name("tile_game::gameplay::PlayState"), "PlayState");
        assert_eq!(short_type_name("a::Wrapper<b::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn state_key_displays_its_name() {
        assert_eq!(StateKey("play").to_string(), "play");
    }
}
