use super::Sprite;

pub type Rgba = [u8; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Drawing surface handed through game states and tiles.
pub trait Renderer {
    fn viewport(&self) -> Viewport;
    fn clear(&mut self, color: Rgba);
    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba);
    fn draw_sprite(&mut self, x: i32, y: i32, sprite: &Sprite);

    fn stroke_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba) {
        if width == 0 || height == 0 {
            return;
        }
        let right = x + width as i32 - 1;
        let bottom = y + height as i32 - 1;
        self.fill_rect(x, y, width, 1, color);
        self.fill_rect(x, bottom, width, 1, color);
        self.fill_rect(x, y, 1, height, color);
        self.fill_rect(right, y, 1, height, color);
    }
}

/// Software renderer over a row-major RGBA8 frame.
pub struct FrameRenderer<'a> {
    frame: &'a mut [u8],
    viewport: Viewport,
}

impl<'a> FrameRenderer<'a> {
    pub fn new(frame: &'a mut [u8], viewport: Viewport) -> Self {
        Self { frame, viewport }
    }
}

impl Renderer for FrameRenderer<'_> {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn clear(&mut self, color: Rgba) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba) {
        let left = x.max(0);
        let top = y.max(0);
        let right = x.saturating_add(width as i32).min(self.viewport.width as i32);
        let bottom = y.saturating_add(height as i32).min(self.viewport.height as i32);
        for py in top..bottom {
            for px in left..right {
                write_pixel_rgba_clipped(self.frame, self.viewport.width as usize, px, py, color);
            }
        }
    }

    fn draw_sprite(&mut self, x: i32, y: i32, sprite: &Sprite) {
        let view_w = self.viewport.width as i32;
        let view_h = self.viewport.height as i32;
        for sy in 0..sprite.height() {
            let out_y = y + sy as i32;
            if out_y < 0 || out_y >= view_h {
                continue;
            }
            for sx in 0..sprite.width() {
                let out_x = x + sx as i32;
                if out_x < 0 || out_x >= view_w {
                    continue;
                }
                let Some(color) = sprite.pixel(sx, sy) else {
                    continue;
                };
                if color[3] == 0 {
                    continue;
                }
                write_pixel_rgba_clipped(
                    self.frame,
                    self.viewport.width as usize,
                    out_x,
                    out_y,
                    color,
                );
            }
        }
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: Rgba) {
    if x < 0 || y < 0 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    if x >= width {
        return;
    }
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::gfx::{Sprite, SpriteSheet};

    const RED: Rgba = [255, 0, 0, 255];
    const BLUE: Rgba = [0, 0, 255, 255];
    const CLEAR: Rgba = [0, 0, 0, 0];

    fn pixel_at(frame: &[u8], viewport: Viewport, x: u32, y: u32) -> Rgba {
        let offset = ((y * viewport.width + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn fill_rect_clips_to_viewport() {
        let viewport = Viewport::new(4, 3);
        let mut frame = vec![0u8; viewport.pixel_count() * 4];
        let mut renderer = FrameRenderer::new(&mut frame, viewport);
        renderer.fill_rect(-2, 1, 4, 10, RED);

        assert_eq!(pixel_at(&frame, viewport, 0, 0), CLEAR);
        assert_eq!(pixel_at(&frame, viewport, 0, 1), RED);
        assert_eq!(pixel_at(&frame, viewport, 1, 2), RED);
        assert_eq!(pixel_at(&frame, viewport, 2, 1), CLEAR);
    }

    #[test]
    fn stroke_rect_leaves_interior_untouched() {
        let viewport = Viewport::new(5, 5);
        let mut frame = vec![0u8; viewport.pixel_count() * 4];
        let mut renderer = FrameRenderer::new(&mut frame, viewport);
        renderer.stroke_rect(0, 0, 5, 5, BLUE);

        assert_eq!(pixel_at(&frame, viewport, 0, 0), BLUE);
        assert_eq!(pixel_at(&frame, viewport, 4, 4), BLUE);
        assert_eq!(pixel_at(&frame, viewport, 4, 2), BLUE);
        assert_eq!(pixel_at(&frame, viewport, 2, 2), CLEAR);
    }

    #[test]
    fn draw_sprite_skips_transparent_pixels_and_clips() {
        let rgba = [RED, CLEAR, CLEAR, BLUE].concat();
        let sheet = Rc::new(SpriteSheet::from_rgba(2, 2, rgba).expect("sheet"));
        let sprite = Sprite::whole(&sheet);
        let viewport = Viewport::new(3, 3);
        let mut frame = vec![0u8; viewport.pixel_count() * 4];
        let mut renderer = FrameRenderer::new(&mut frame, viewport);
        renderer.clear([9, 9, 9, 255]);
        renderer.draw_sprite(-1, 1, &sprite);

        assert_eq!(pixel_at(&frame, viewport, 0, 1), [9, 9, 9, 255]);
        assert_eq!(pixel_at(&frame, viewport, 0, 2), BLUE);
        assert_eq!(pixel_at(&frame, viewport, 1, 1), [9, 9, 9, 255]);
    }

    #[test]
    fn short_frame_buffer_is_never_overrun() {
        let viewport = Viewport::new(4, 4);
        let mut frame = vec![0u8; 8];
        let mut renderer = FrameRenderer::new(&mut frame, viewport);
        renderer.fill_rect(0, 0, 4, 4, RED);
        assert_eq!(&frame[..4], &RED);
        assert_eq!(&frame[4..8], &RED);
    }
}
