use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::resources::{ResourceError, ResourceLocation, ResourceProvider};

use super::Rgba;

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("failed to decode image {location}: {source}")]
    Decode {
        location: ResourceLocation,
        #[source]
        source: image::ImageError,
    },
    #[error("rgba buffer has {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("sprite region {x},{y} {width}x{height} exceeds sheet {sheet_width}x{sheet_height}")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        sheet_width: u32,
        sheet_height: u32,
    },
    #[error("sprite frames must be at least 1x1 pixels")]
    ZeroSizedFrame,
}

/// Decoded RGBA8 image that sprites slice into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteSheet {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl SpriteSheet {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, SpriteError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(SpriteError::SizeMismatch {
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn load(
        resources: &dyn ResourceProvider,
        location: &ResourceLocation,
    ) -> Result<Self, SpriteError> {
        let bytes = resources.read_bytes(location)?;
        let decoded = image::load_from_memory(&bytes).map_err(|source| SpriteError::Decode {
            location: location.clone(),
            source,
        })?;
        let image = decoded.to_rgba8();
        debug!(
            location = %location,
            width = image.width(),
            height = image.height(),
            "sprite_sheet_loaded"
        );
        Self::from_rgba(image.width(), image.height(), image.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.rgba.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Cuts the sheet into `frame_width`x`frame_height` sprites, row-major.
    /// Partial frames at the right and bottom edges are dropped.
    pub fn split(
        self: &Rc<Self>,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Vec<Sprite>, SpriteError> {
        if frame_width == 0 || frame_height == 0 {
            return Err(SpriteError::ZeroSizedFrame);
        }
        let cols = self.width / frame_width;
        let rows = self.height / frame_height;
        let mut frames = Vec::with_capacity(cols as usize * rows as usize);
        for row in 0..rows {
            for col in 0..cols {
                frames.push(Sprite::new(
                    self,
                    col * frame_width,
                    row * frame_height,
                    frame_width,
                    frame_height,
                )?);
            }
        }
        Ok(frames)
    }
}

/// Rectangular region of a shared [`SpriteSheet`].
#[derive(Debug, Clone)]
pub struct Sprite {
    sheet: Rc<SpriteSheet>,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Sprite {
    pub fn new(
        sheet: &Rc<SpriteSheet>,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Self, SpriteError> {
        let fits_x = x.checked_add(width).is_some_and(|end| end <= sheet.width);
        let fits_y = y.checked_add(height).is_some_and(|end| end <= sheet.height);
        if !fits_x || !fits_y {
            return Err(SpriteError::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                sheet_width: sheet.width,
                sheet_height: sheet.height,
            });
        }
        Ok(Self {
            sheet: Rc::clone(sheet),
            x,
            y,
            width,
            height,
        })
    }

    pub fn whole(sheet: &Rc<SpriteSheet>) -> Self {
        Self {
            sheet: Rc::clone(sheet),
            x: 0,
            y: 0,
            width: sheet.width,
            height: sheet.height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel relative to the sprite's top-left corner.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.sheet.pixel(self.x + x, self.y + y)
    }
}
