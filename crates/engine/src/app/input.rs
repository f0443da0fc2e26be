use std::collections::HashSet;

use winit::event::ElementState;
use winit::keyboard::KeyCode;

/// Key transition forwarded to the active game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyInput {
    Pressed(KeyCode, Option<char>),
    Released(KeyCode, Option<char>),
}

/// Turns raw window input into edge-triggered key transitions, the cursor
/// position in view pixels and the host's own requests (quit, reload).
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    held: HashSet<KeyCode>,
    cursor: Option<(i32, i32)>,
    quit_requested: bool,
    reload_pressed_edge: bool,
}

impl InputCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the transition to forward, if any. Host keys and OS key
    /// repeats are swallowed.
    pub(crate) fn handle_key(
        &mut self,
        key: KeyCode,
        state: ElementState,
        text: Option<&str>,
    ) -> Option<KeyInput> {
        match (key, state) {
            (KeyCode::Escape, ElementState::Pressed) => {
                self.quit_requested = true;
                return None;
            }
            (KeyCode::F5, ElementState::Pressed) => {
                if !self.held.contains(&key) {
                    self.reload_pressed_edge = true;
                }
                self.held.insert(key);
                return None;
            }
            (KeyCode::Escape | KeyCode::F5, ElementState::Released) => {
                self.held.remove(&key);
                return None;
            }
            _ => {}
        }

        let typed = typed_char(text);
        match state {
            ElementState::Pressed => self
                .held
                .insert(key)
                .then_some(KeyInput::Pressed(key, typed)),
            ElementState::Released => self
                .held
                .remove(&key)
                .then_some(KeyInput::Released(key, typed)),
        }
    }

    /// Forgets held keys without emitting releases; states reset their own
    /// held input in `on_lose_focus`.
    pub(crate) fn clear_held(&mut self) {
        self.held.clear();
    }

    pub(crate) fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub(crate) fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    pub(crate) fn take_reload_pressed(&mut self) -> bool {
        let was_pressed = self.reload_pressed_edge;
        self.reload_pressed_edge = false;
        was_pressed
    }

    pub(crate) fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor = Some((x, y));
    }

    pub(crate) fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    /// Cursor in view pixels; `(-1, -1)` while it is outside the window.
    pub(crate) fn cursor_or_offscreen(&self) -> (i32, i32) {
        self.cursor.unwrap_or((-1, -1))
    }
}

fn typed_char(text: Option<&str>) -> Option<char> {
    text.and_then(|text| text.chars().next())
        .filter(|ch| !ch.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_forwarded_once_until_released() {
        let mut input = InputCollector::new();
        assert_eq!(
            input.handle_key(KeyCode::KeyA, ElementState::Pressed, Some("a")),
            Some(KeyInput::Pressed(KeyCode::KeyA, Some('a')))
        );
        assert_eq!(
            input.handle_key(KeyCode::KeyA, ElementState::Pressed, Some("a")),
            None
        );
        assert_eq!(
            input.handle_key(KeyCode::KeyA, ElementState::Released, None),
            Some(KeyInput::Released(KeyCode::KeyA, None))
        );
        assert_eq!(
            input.handle_key(KeyCode::KeyA, ElementState::Released, None),
            None
        );
    }

    #[test]
    fn control_characters_are_not_typed() {
        let mut input = InputCollector::new();
        assert_eq!(
            input.handle_key(KeyCode::Enter, ElementState::Pressed, Some("\r")),
            Some(KeyInput::Pressed(KeyCode::Enter, None))
        );
    }

    #[test]
    fn escape_requests_quit_without_forwarding() {
        let mut input = InputCollector::new();
        assert!(!input.quit_requested());
        assert_eq!(
            input.handle_key(KeyCode::Escape, ElementState::Pressed, None),
            None
        );
        assert!(input.quit_requested());
    }

    #[test]
    fn reload_key_is_edge_triggered() {
        let mut input = InputCollector::new();
        input.handle_key(KeyCode::F5, ElementState::Pressed, None);
        input.handle_key(KeyCode::F5, ElementState::Pressed, None);
        assert!(input.take_reload_pressed());
        assert!(!input.take_reload_pressed());

        input.handle_key(KeyCode::F5, ElementState::Released, None);
        input.handle_key(KeyCode::F5, ElementState::Pressed, None);
        assert!(input.take_reload_pressed());
    }

    #[test]
    fn focus_loss_forgets_held_keys() {
        let mut input = InputCollector::new();
        input.handle_key(KeyCode::ArrowLeft, ElementState::Pressed, None);
        input.clear_held();
        assert_eq!(
            input.handle_key(KeyCode::ArrowLeft, ElementState::Released, None),
            None
        );
        assert_eq!(
            input.handle_key(KeyCode::ArrowLeft, ElementState::Pressed, None),
            Some(KeyInput::Pressed(KeyCode::ArrowLeft, None))
        );
    }

    #[test]
    fn cursor_defaults_offscreen() {
        let mut input = InputCollector::new();
        assert_eq!(input.cursor_or_offscreen(), (-1, -1));
        input.set_cursor(10, 20);
        assert_eq!(input.cursor_or_offscreen(), (10, 20));
        input.clear_cursor();
        assert_eq!(input.cursor_or_offscreen(), (-1, -1));
    }
}
