mod animation;
mod renderer;
mod sprite;

pub use animation::{Animation, FROZEN_DELAY};
pub use renderer::{FrameRenderer, Renderer, Rgba, Viewport};
pub use sprite::{Sprite, SpriteError, SpriteSheet};
