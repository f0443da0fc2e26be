use thiserror::Error;
use tracing::info;
use winit::keyboard::KeyCode;

use crate::gfx::Renderer;

use super::{GameContext, GameState, StateCommand, StateKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("no game state registered under '{key}'")]
    UnknownState { key: StateKey },
    #[error("a game state is already registered under '{key}'")]
    DuplicateState { key: StateKey },
}

struct StateSlot {
    key: StateKey,
    state: Box<dyn GameState>,
}

/// Owns every registered state and forwards hooks to the active one.
#[derive(Default)]
pub struct StateManager {
    slots: Vec<StateSlot>,
    active: Option<usize>,
}

impl StateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        key: StateKey,
        state: Box<dyn GameState>,
    ) -> Result<(), StateError> {
        if self.position(key).is_some() {
            return Err(StateError::DuplicateState { key });
        }
        self.slots.push(StateSlot { key, state });
        Ok(())
    }

    /// Activates `key` and runs its `init`, even if it is already active.
    pub fn set_state(&mut self, key: StateKey, ctx: &mut GameContext) -> Result<(), StateError> {
        let index = self
            .position(key)
            .ok_or(StateError::UnknownState { key })?;
        let previous = self.active_key();
        self.active = Some(index);

        let slot = &mut self.slots[index];
        info!(
            from = previous.map(|key| key.0).unwrap_or("none"),
            to = %key,
            state = slot.state.name(),
            "state_switched"
        );
        slot.state.init(ctx);
        Ok(())
    }

    pub fn update(&mut self, ctx: &mut GameContext) -> StateCommand {
        match self.active_state_mut() {
            Some(state) => state.update(ctx),
            None => StateCommand::None,
        }
    }

    pub fn render(
        &mut self,
        ctx: &GameContext,
        renderer: &mut dyn Renderer,
        mouse_x: i32,
        mouse_y: i32,
        partial_ticks: f32,
    ) {
        if let Some(state) = self.active_state_mut() {
            state.render(ctx, renderer, mouse_x, mouse_y, partial_ticks);
        }
    }

    pub fn key_pressed(
        &mut self,
        ctx: &mut GameContext,
        key: KeyCode,
        typed: Option<char>,
    ) -> StateCommand {
        match self.active_state_mut() {
            Some(state) => state.on_key_pressed(ctx, key, typed),
            None => StateCommand::None,
        }
    }

    pub fn key_released(
        &mut self,
        ctx: &mut GameContext,
        key: KeyCode,
        typed: Option<char>,
    ) -> StateCommand {
        match self.active_state_mut() {
            Some(state) => state.on_key_released(ctx, key, typed),
            None => StateCommand::None,
        }
    }

    pub fn lose_focus(&mut self, ctx: &mut GameContext) {
        if let Some(state) = self.active_state_mut() {
            state.on_lose_focus(ctx);
        }
    }

    pub fn active_key(&self) -> Option<StateKey> {
        self.active.map(|index| self.slots[index].key)
    }

    pub fn active_name(&self) -> Option<&'static str> {
        self.active.map(|index| self.slots[index].state.name())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn position(&self, key: StateKey) -> Option<usize> {
        self.slots.iter().position(|slot| slot.key == key)
    }

    fn active_state_mut(&mut self) -> Option<&mut (dyn GameState + 'static)> {
        let index = self.active?;
        Some(self.slots[index].state.as_mut())
    }
}
