use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use tracing::{error, info};
use winit::keyboard::KeyCode;

use crate::clock::Clock;
use crate::gfx::{Renderer, SpriteError, Viewport};
use crate::level::{MapLoadError, PropertyError};
use crate::resources::{
    ReloadError, ReloadListener, ResourceError, ResourceProvider, ResourceReloadBus,
};

use super::{StateCommand, StateError, StateKey, StateManager};

/// Failures that end the game.
#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    MapLoad(#[from] MapLoadError),
    #[error(transparent)]
    Reload(#[from] ReloadError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Sprite(#[from] SpriteError),
    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Services shared by every state: view size, clock, resources and the
/// reload bus, plus the slot a fatal error lands in.
pub struct GameContext {
    viewport: Viewport,
    clock: Rc<dyn Clock>,
    resources: Rc<dyn ResourceProvider>,
    reload_bus: ResourceReloadBus,
    ticks: u64,
    fatal: Option<GameError>,
}

impl GameContext {
    pub fn new(
        viewport: Viewport,
        clock: Rc<dyn Clock>,
        resources: Rc<dyn ResourceProvider>,
    ) -> Self {
        Self {
            viewport,
            clock,
            resources,
            reload_bus: ResourceReloadBus::new(),
            ticks: 0,
            fatal: None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn clock(&self) -> &Rc<dyn Clock> {
        &self.clock
    }

    pub fn resources(&self) -> &Rc<dyn ResourceProvider> {
        &self.resources
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn subscribe_reload<L>(&mut self, listener: &Rc<RefCell<L>>)
    where
        L: ReloadListener + 'static,
    {
        self.reload_bus.subscribe(listener);
    }

    pub fn reload_listener_count(&self) -> usize {
        self.reload_bus.listener_count()
    }

    pub fn reload_resources(&mut self) -> Result<usize, ReloadError> {
        let resources = Rc::clone(&self.resources);
        self.reload_bus.reload(resources.as_ref())
    }

    /// Records a fatal error. Only the first one is kept; the host ends the
    /// loop once it sees it.
    pub fn stop(&mut self, err: impl Into<GameError>) {
        let err = err.into();
        error!(error = %err, tick = self.ticks, "game_stopped");
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.fatal.is_some()
    }

    pub fn fatal_error(&self) -> Option<&GameError> {
        self.fatal.as_ref()
    }

    pub fn take_fatal_error(&mut self) -> Option<GameError> {
        self.fatal.take()
    }
}

/// A state manager together with the context its states run in.
pub struct Game {
    context: GameContext,
    states: StateManager,
    quit_requested: bool,
}

impl Game {
    pub fn new(context: GameContext, states: StateManager) -> Self {
        Self {
            context,
            states,
            quit_requested: false,
        }
    }

    pub fn start(&mut self, key: StateKey) -> Result<(), GameError> {
        self.states.set_state(key, &mut self.context)?;
        Ok(())
    }

    pub fn tick(&mut self) {
        if self.should_exit() {
            return;
        }
        self.context.ticks += 1;
        let command = self.states.update(&mut self.context);
        self.apply(command);
    }

    pub fn render(
        &mut self,
        renderer: &mut dyn Renderer,
        mouse_x: i32,
        mouse_y: i32,
        partial_ticks: f32,
    ) {
        self.states
            .render(&self.context, renderer, mouse_x, mouse_y, partial_ticks);
    }

    pub fn key_pressed(&mut self, key: KeyCode, typed: Option<char>) {
        let command = self.states.key_pressed(&mut self.context, key, typed);
        self.apply(command);
    }

    pub fn key_released(&mut self, key: KeyCode, typed: Option<char>) {
        let command = self.states.key_released(&mut self.context, key, typed);
        self.apply(command);
    }

    pub fn lose_focus(&mut self) {
        self.states.lose_focus(&mut self.context);
    }

    /// Fans a resource refresh out to every subscribed listener; a failure
    /// is fatal.
    pub fn reload_resources(&mut self) {
        if let Err(err) = self.context.reload_resources() {
            self.context.stop(err);
        }
    }

    pub fn context(&self) -> &GameContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut GameContext {
        &mut self.context
    }

    pub fn states(&self) -> &StateManager {
        &self.states
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn fatal_error(&self) -> Option<&GameError> {
        self.context.fatal_error()
    }

    pub fn take_fatal_error(&mut self) -> Option<GameError> {
        self.context.take_fatal_error()
    }

    pub fn should_exit(&self) -> bool {
        self.quit_requested || self.context.is_stopped()
    }

    fn apply(&mut self, command: StateCommand) {
        match command {
            StateCommand::None => {}
            StateCommand::SwitchTo(key) => {
                if let Err(err) = self.states.set_state(key, &mut self.context) {
                    self.context.stop(err);
                }
            }
            StateCommand::Quit => {
                info!(ticks = self.context.ticks, "quit_requested");
                self.quit_requested = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::resources::{MemoryResourceProvider, ResourceLocation};
    use crate::state::GameState;

    /// Switches to `next` after `switch_after` ticks, quits on Q.
    struct Scripted {
        next: Option<StateKey>,
        switch_after: u64,
        updates: u64,
        inits: Rc<RefCell<u32>>,
    }

    impl Scripted {
        fn new(next: Option<StateKey>, switch_after: u64, inits: &Rc<RefCell<u32>>) -> Self {
            Self {
                next,
                switch_after,
                updates: 0,
                inits: Rc::clone(inits),
            }
        }
    }

    impl GameState for Scripted {
        fn init(&mut self, _ctx: &mut GameContext) {
            self.updates = 0;
            *self.inits.borrow_mut() += 1;
        }

        fn update(&mut self, _ctx: &mut GameContext) -> StateCommand {
            self.updates += 1;
            match self.next {
                Some(next) if self.updates >= self.switch_after => StateCommand::SwitchTo(next),
                _ => StateCommand::None,
            }
        }

        fn render(
            &mut self,
            _ctx: &GameContext,
            _renderer: &mut dyn Renderer,
            _mouse_x: i32,
            _mouse_y: i32,
            _partial_ticks: f32,
        ) {
        }

        fn on_key_pressed(
            &mut self,
            _ctx: &mut GameContext,
            key: KeyCode,
            _typed: Option<char>,
        ) -> StateCommand {
            if key == KeyCode::KeyQ {
                StateCommand::Quit
            } else {
                StateCommand::None
            }
        }

        fn on_key_released(
            &mut self,
            _ctx: &mut GameContext,
            _key: KeyCode,
            _typed: Option<char>,
        ) -> StateCommand {
            StateCommand::None
        }
    }

    struct FailingListener;

    impl ReloadListener for FailingListener {
        fn on_resource_reload(
            &mut self,
            _resources: &dyn ResourceProvider,
        ) -> Result<(), ReloadError> {
            let location = ResourceLocation::parse("base:gone").expect("location");
            Err(ReloadError::listener(ResourceError::Missing { location }))
        }
    }

    fn context() -> GameContext {
        GameContext::new(
            Viewport::new(32, 32),
            Rc::new(ManualClock::new(0)),
            Rc::new(MemoryResourceProvider::new()),
        )
    }

    #[test]
    fn commands_switch_states_and_quit() {
        let title_inits = Rc::new(RefCell::new(0));
        let play_inits = Rc::new(RefCell::new(0));
        let mut states = StateManager::new();
        states
            .register(
                StateKey("title"),
                Box::new(Scripted::new(Some(StateKey("play")), 2, &title_inits)),
            )
            .expect("title");
        states
            .register(StateKey("play"), Box::new(Scripted::new(None, 0, &play_inits)))
            .expect("play");

        let mut game = Game::new(context(), states);
        game.start(StateKey("title")).expect("start");
        game.tick();
        assert_eq!(game.states().active_key(), Some(StateKey("title")));
        game.tick();
        assert_eq!(game.states().active_key(), Some(StateKey("play")));
        assert_eq!((*title_inits.borrow(), *play_inits.borrow()), (1, 1));

        game.key_pressed(KeyCode::KeyQ, Some('q'));
        assert!(game.quit_requested());
        assert!(game.should_exit());
        let ticks = game.context().ticks();
        game.tick();
        assert_eq!(game.context().ticks(), ticks);
    }

    #[test]
    fn switching_to_unknown_state_is_fatal() {
        let inits = Rc::new(RefCell::new(0));
        let mut states = StateManager::new();
        states
            .register(
                StateKey("title"),
                Box::new(Scripted::new(Some(StateKey("missing")), 1, &inits)),
            )
            .expect("title");
        let mut game = Game::new(context(), states);
        game.start(StateKey("title")).expect("start");
        game.tick();

        assert!(matches!(
            game.fatal_error(),
            Some(GameError::State(StateError::UnknownState { .. }))
        ));
        assert!(game.should_exit());
    }

    #[test]
    fn stop_keeps_the_first_error() {
        let mut ctx = context();
        ctx.stop(StateError::UnknownState { key: StateKey("a") });
        ctx.stop(StateError::UnknownState { key: StateKey("b") });
        let err = ctx.take_fatal_error().expect("fatal");
        assert_eq!(err.to_string(), "no game state registered under 'a'");
        assert!(!ctx.is_stopped());
    }

    #[test]
    fn failed_resource_reload_stops_the_game() {
        let mut game = Game::new(context(), StateManager::new());
        let listener = Rc::new(RefCell::new(FailingListener));
        game.context_mut().subscribe_reload(&listener);
        assert_eq!(game.context().reload_listener_count(), 1);

        game.reload_resources();
        assert!(matches!(game.fatal_error(), Some(GameError::Reload(_))));
    }

    #[test]
    fn start_with_unknown_state_returns_error() {
        let mut game = Game::new(context(), StateManager::new());
        assert!(matches!(
            game.start(StateKey("title")),
            Err(GameError::State(StateError::UnknownState { .. }))
        ));
    }
}
