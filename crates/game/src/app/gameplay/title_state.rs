use std::rc::Rc;

use tile_engine::{
    Animation, Clock, GameContext, GameState, KeyCode, Renderer, Rgba, StateCommand,
};

use super::PLAY;

const BACKGROUND: Rgba = [12, 14, 28, 255];
const BANNER: Rgba = [64, 120, 72, 255];
const PROMPT_ON: Rgba = [232, 232, 200, 255];
const PROMPT_OFF: Rgba = [40, 44, 60, 255];
const PROMPT_BLINK_MILLIS: i64 = 450;

/// Opening screen. Enter starts play, Q quits.
pub(crate) struct TitleState {
    prompt: Animation<Rgba>,
}

impl TitleState {
    pub(crate) fn new(clock: Rc<dyn Clock>) -> Self {
        let mut prompt = Animation::new(clock);
        prompt.set_frames([PROMPT_ON, PROMPT_OFF]);
        prompt.set_delay(PROMPT_BLINK_MILLIS);
        Self { prompt }
    }

    fn prompt_color(&self) -> Rgba {
        self.prompt.sprite().copied().unwrap_or(PROMPT_ON)
    }
}

impl GameState for TitleState {
    fn init(&mut self, _ctx: &mut GameContext) {
        self.prompt.restart();
    }

    fn update(&mut self, _ctx: &mut GameContext) -> StateCommand {
        self.prompt.update();
        StateCommand::None
    }

    fn render(
        &mut self,
        ctx: &GameContext,
        renderer: &mut dyn Renderer,
        _mouse_x: i32,
        _mouse_y: i32,
        _partial_ticks: f32,
    ) {
        let view = ctx.viewport();
        renderer.clear(BACKGROUND);

        let banner_width = view.width * 2 / 3;
        let banner_height = (view.height / 6).max(1);
        let banner_x = ((view.width - banner_width) / 2) as i32;
        let banner_y = (view.height / 4) as i32;
        renderer.fill_rect(banner_x, banner_y, banner_width, banner_height, BANNER);
        renderer.stroke_rect(banner_x, banner_y, banner_width, banner_height, PROMPT_ON);

        let prompt_width = view.width / 3;
        let prompt_height = (view.height / 24).max(1);
        renderer.fill_rect(
            ((view.width - prompt_width) / 2) as i32,
            (view.height * 2 / 3) as i32,
            prompt_width,
            prompt_height,
            self.prompt_color(),
        );
    }

    fn on_key_pressed(
        &mut self,
        _ctx: &mut GameContext,
        key: KeyCode,
        _typed: Option<char>,
    ) -> StateCommand {
        match key {
            KeyCode::Enter | KeyCode::NumpadEnter => StateCommand::SwitchTo(PLAY),
            KeyCode::KeyQ => StateCommand::Quit,
            _ => StateCommand::None,
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

#[cfg(test)]
mod tests {
    use tile_engine::{ManualClock, MemoryResourceProvider, Viewport};

    use super::*;

    fn context(clock: &Rc<ManualClock>) -> GameContext {
        let clock: Rc<dyn Clock> = clock.clone();
        GameContext::new(
            Viewport::new(96, 72),
            clock,
            Rc::new(MemoryResourceProvider::new()),
        )
    }

    #[test]
    fn enter_starts_play_and_q_quits() {
        let clock = Rc::new(ManualClock::new(0));
        let mut ctx = context(&clock);
        let mut title = TitleState::new(clock.clone());
        title.init(&mut ctx);

        assert_eq!(
            title.on_key_pressed(&mut ctx, KeyCode::Enter, Some('\r')),
            StateCommand::SwitchTo(PLAY)
        );
        assert_eq!(
            title.on_key_pressed(&mut ctx, KeyCode::KeyQ, Some('q')),
            StateCommand::Quit
        );
        assert_eq!(
            title.on_key_pressed(&mut ctx, KeyCode::KeyX, Some('x')),
            StateCommand::None
        );
    }

    #[test]
    fn prompt_blinks_on_the_clock() {
        let clock = Rc::new(ManualClock::new(0));
        let mut ctx = context(&clock);
        let mut title = TitleState::new(clock.clone());
        title.init(&mut ctx);
        assert_eq!(title.prompt_color(), PROMPT_ON);

        clock.advance(PROMPT_BLINK_MILLIS + 1);
        title.update(&mut ctx);
        assert_eq!(title.prompt_color(), PROMPT_OFF);

        clock.advance(PROMPT_BLINK_MILLIS + 1);
        title.update(&mut ctx);
        assert_eq!(title.prompt_color(), PROMPT_ON);
    }

    #[test]
    fn reactivation_restarts_the_blink() {
        let clock = Rc::new(ManualClock::new(0));
        let mut ctx = context(&clock);
        let mut title = TitleState::new(clock.clone());
        clock.advance(PROMPT_BLINK_MILLIS + 1);
        title.update(&mut ctx);
        assert_eq!(title.prompt_color(), PROMPT_OFF);

        title.init(&mut ctx);
        assert_eq!(title.prompt_color(), PROMPT_ON);
    }
}
