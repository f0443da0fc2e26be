use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use winit::window::Window;

use crate::gfx::{FrameRenderer, Renderer, Rgba, Viewport};
use crate::state::Game;

const CLEAR_COLOR: Rgba = [0, 0, 0, 255];

/// Fixed-size `pixels` frame scaled onto the window surface.
pub(crate) struct Presenter {
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Presenter {
    pub(crate) fn new(window: Arc<Window>, viewport: Viewport) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, window);
        let pixels = Pixels::new(viewport.width, viewport.height, surface)?;
        Ok(Self { pixels, viewport })
    }

    pub(crate) fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    /// Maps a physical window position into view pixels, clamped to the
    /// frame edge.
    pub(crate) fn cursor_to_view(&self, x: f32, y: f32) -> (i32, i32) {
        match self.pixels.window_pos_to_pixel((x, y)) {
            Ok((x, y)) => (x as i32, y as i32),
            Err((x, y)) => (x as i32, y as i32),
        }
    }

    pub(crate) fn draw(
        &mut self,
        game: &mut Game,
        mouse_x: i32,
        mouse_y: i32,
        partial_ticks: f32,
    ) -> Result<(), Error> {
        {
            let mut renderer = FrameRenderer::new(self.pixels.frame_mut(), self.viewport);
            renderer.clear(CLEAR_COLOR);
            game.render(&mut renderer, mouse_x, mouse_y, partial_ticks);
        }
        self.pixels.render()
    }
}
