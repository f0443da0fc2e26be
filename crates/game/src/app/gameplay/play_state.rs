use std::cell::RefCell;
use std::rc::Rc;

use tile_engine::{
    Animation, Clock, GameContext, GameState, KeyCode, Renderer, ResourceLocation, Rgba,
    StateCommand, TileMap,
};
use tracing::{debug, info, warn};

use super::palette::LIT;
use super::TITLE;

const BACKGROUND: Rgba = [0, 0, 0, 255];
const PAN_PIXELS_PER_TICK: f64 = 6.0;
const HIGHLIGHT_FRAMES: [Rgba; 3] = [
    [255, 255, 255, 255],
    [255, 230, 120, 255],
    [255, 180, 60, 255],
];
const HIGHLIGHT_FRAME_MILLIS: i64 = 120;

#[derive(Debug, Default, Clone, Copy)]
struct PanKeys {
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl PanKeys {
    fn set(&mut self, key: KeyCode, held: bool) -> bool {
        let slot = match key {
            KeyCode::ArrowLeft | KeyCode::KeyA => &mut self.left,
            KeyCode::ArrowRight | KeyCode::KeyD => &mut self.right,
            KeyCode::ArrowUp | KeyCode::KeyW => &mut self.up,
            KeyCode::ArrowDown | KeyCode::KeyS => &mut self.down,
            _ => return false,
        };
        *slot = held;
        true
    }

    fn direction(self) -> (f64, f64) {
        let axis = |neg: bool, pos: bool| f64::from(i8::from(pos) - i8::from(neg));
        (axis(self.left, self.right), axis(self.up, self.down))
    }
}

/// Scrolls a tile map with the keyboard and lets the hovered cell be toggled.
pub(crate) struct PlayState {
    map: Rc<RefCell<TileMap>>,
    map_location: ResourceLocation,
    subscribed: bool,
    target_x: f64,
    target_y: f64,
    pan: PanKeys,
    highlight: Animation<Rgba>,
    mouse_x: i32,
    mouse_y: i32,
}

impl PlayState {
    pub(crate) fn new(map: TileMap, map_location: ResourceLocation, clock: Rc<dyn Clock>) -> Self {
        let mut highlight = Animation::new(clock);
        highlight.set_frames(HIGHLIGHT_FRAMES);
        highlight.set_delay(HIGHLIGHT_FRAME_MILLIS);
        Self {
            map: Rc::new(RefCell::new(map)),
            map_location,
            subscribed: false,
            target_x: 0.0,
            target_y: 0.0,
            pan: PanKeys::default(),
            highlight,
            mouse_x: -1,
            mouse_y: -1,
        }
    }

    #[cfg(test)]
    fn map(&self) -> std::cell::Ref<'_, TileMap> {
        self.map.borrow()
    }

    fn hovered_cell(&self) -> Option<(i32, i32)> {
        if self.mouse_x < 0 || self.mouse_y < 0 {
            return None;
        }
        let map = self.map.borrow();
        let (col, row) = map.screen_to_cell(self.mouse_x, self.mouse_y);
        let inside = col >= 0 && row >= 0 && col < map.num_cols() && row < map.num_rows();
        inside.then_some((col, row))
    }

    fn toggle_hovered(&mut self) {
        let Some((col, row)) = self.hovered_cell() else {
            return;
        };
        let mut map = self.map.borrow_mut();
        let Some(lit) = map.container(col, row).and_then(|cell| cell.get_bool(LIT)) else {
            debug!(col, row, "toggle_ignored");
            return;
        };
        match map.set_value(col, row, LIT, !lit) {
            Ok(()) => info!(col, row, lit = !lit, "cell_toggled"),
            Err(error) => warn!(col, row, error = %error, "cell_toggle_failed"),
        }
    }
}

impl GameState for PlayState {
    fn init(&mut self, ctx: &mut GameContext) {
        let loaded = self
            .map
            .borrow_mut()
            .load_map(ctx.resources().as_ref(), self.map_location.clone());
        if let Err(error) = loaded {
            ctx.stop(error);
            return;
        }
        if !self.subscribed {
            ctx.subscribe_reload(&self.map);
            self.subscribed = true;
        }
        self.target_x = 0.0;
        self.target_y = 0.0;
        self.pan = PanKeys::default();
        self.highlight.restart();
    }

    fn update(&mut self, _ctx: &mut GameContext) -> StateCommand {
        let (dx, dy) = self.pan.direction();
        let mut map = self.map.borrow_mut();
        let (xmin, xmax, ymin, ymax) = map.bounds();
        self.target_x = (self.target_x + dx * PAN_PIXELS_PER_TICK).clamp(xmin, xmax);
        self.target_y = (self.target_y + dy * PAN_PIXELS_PER_TICK).clamp(ymin, ymax);
        map.set_position(self.target_x, self.target_y);
        map.update();
        drop(map);

        self.highlight.update();
        StateCommand::None
    }

    fn render(
        &mut self,
        _ctx: &GameContext,
        renderer: &mut dyn Renderer,
        mouse_x: i32,
        mouse_y: i32,
        partial_ticks: f32,
    ) {
        self.mouse_x = mouse_x;
        self.mouse_y = mouse_y;

        renderer.clear(BACKGROUND);
        let map = self.map.borrow();
        map.render(renderer, mouse_x, mouse_y, partial_ticks);

        let Some((col, row)) = self.hovered_cell() else {
            return;
        };
        let Some(&color) = self.highlight.sprite() else {
            return;
        };
        let size = map.tile_size();
        let x = col * size as i32 - map.x() as i32;
        let y = row * size as i32 - map.y() as i32;
        renderer.stroke_rect(x, y, size, size, color);
    }

    fn on_key_pressed(
        &mut self,
        _ctx: &mut GameContext,
        key: KeyCode,
        _typed: Option<char>,
    ) -> StateCommand {
        if self.pan.set(key, true) {
            return StateCommand::None;
        }
        match key {
            KeyCode::Space => {
                self.toggle_hovered();
                StateCommand::None
            }
            KeyCode::Backspace | KeyCode::Tab => StateCommand::SwitchTo(TITLE),
            _ => StateCommand::None,
        }
    }

    fn on_key_released(
        &mut self,
        _ctx: &mut GameContext,
        key: KeyCode,
        _typed: Option<char>,
    ) -> StateCommand {
        self.pan.set(key, false);
        StateCommand::None
    }

    fn on_lose_focus(&mut self, _ctx: &mut GameContext) {
        self.pan = PanKeys::default();
    }
}
